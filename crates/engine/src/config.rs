use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration. Defaults mirror a small single-tenant install.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Memory ceiling per sandbox, e.g. "512m".
    pub memory_limit: String,
    /// Logical-CPU budget per sandbox.
    pub cpu_count: u32,
    /// Interpreter invoked on the entry file, e.g. "python3".
    pub runtime: String,
    /// How long `terminate` waits after the stop signal before
    /// force-killing.
    pub grace_period: Duration,
    /// Root directory for per-execution scratch snapshots.
    pub scratch_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit: "512m".into(),
            cpu_count: 1,
            runtime: "python3".into(),
            grace_period: Duration::from_secs(1),
            scratch_root: std::env::temp_dir().join("codeyard"),
        }
    }
}
