use std::path::PathBuf;

use crate::error::{Result, SandboxError};

/// Resource ceilings for one sandbox.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    pub memory_bytes: u64,
    /// Logical-CPU budget: the sandboxed program may use at most this many
    /// cores.
    pub cpu_count: u32,
}

/// Everything a factory needs to build one sandbox.
#[derive(Debug, Clone)]
pub struct SandboxSpec {
    pub id: uuid::Uuid,
    /// Snapshot root the program runs in; read-only to the sandboxed
    /// process.
    pub root_dir: PathBuf,
    /// Entry file path, relative to `root_dir`.
    pub entry_file: String,
    pub limits: ResourceLimits,
}

/// Parse a memory ceiling like `"512m"`, `"2g"`, `"1024k"`, or a plain byte
/// count into bytes.
pub fn parse_memory_limit(value: &str) -> Result<u64> {
    let normalized = value.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(rest) = normalized.strip_suffix('g') {
        (rest, 1024 * 1024 * 1024)
    } else if let Some(rest) = normalized.strip_suffix('m') {
        (rest, 1024 * 1024)
    } else if let Some(rest) = normalized.strip_suffix('k') {
        (rest, 1024)
    } else {
        (normalized.as_str(), 1)
    };

    let count: u64 = digits
        .parse()
        .map_err(|_| SandboxError::InvalidConfig(format!("invalid memory limit: {value:?}")))?;
    count
        .checked_mul(multiplier)
        .ok_or_else(|| SandboxError::InvalidConfig(format!("memory limit overflows: {value:?}")))
}
