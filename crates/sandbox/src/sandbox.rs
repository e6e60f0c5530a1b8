use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Live state of a sandboxed program, as reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxStatus {
    /// The program is still running.
    Running,
    /// The program exited. `finished_at` is the backend's observation of
    /// the exit time; `None` when the backend cannot report one.
    Exited {
        exit_code: i32,
        finished_at: Option<DateTime<Utc>>,
    },
}

/// Captured output so far. Buffers grow monotonically; once the program
/// exits they are final.
#[derive(Debug, Clone, Default)]
pub struct OutputSnapshot {
    pub stdout: String,
    pub stderr: String,
}

/// Best-effort resource usage sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageSample {
    /// Resident set size in MB.
    pub memory_mb: f64,
    /// Total CPU time (user + system) in seconds.
    pub cpu_secs: f64,
}

/// An isolated execution context running one program under enforced
/// resource limits.
///
/// Handles are owned exclusively by the engine for the lifetime of their
/// execution record and never escape it.
#[async_trait]
pub trait Sandbox: Send + Sync {
    fn id(&self) -> &str;

    /// Launch the program. Fails if already started.
    async fn start(&mut self) -> Result<()>;

    /// Probe the live state. Cheap; safe to call repeatedly. Once the
    /// program has exited, repeated probes report the same exit.
    async fn probe(&mut self) -> Result<SandboxStatus>;

    /// Captured stdout/stderr so far.
    async fn output(&self) -> OutputSnapshot;

    /// Best-effort usage sample; reports the last known values once the
    /// program has exited.
    async fn usage(&self) -> UsageSample;

    /// Ask the program to stop: stop signal, wait up to `grace`, then
    /// force-kill. A no-op once the program has exited.
    async fn stop(&mut self, grace: Duration) -> Result<()>;

    /// Force-kill without a grace period. A no-op once the program has
    /// exited.
    async fn kill(&mut self) -> Result<()>;
}
