use async_trait::async_trait;

use crate::config::SandboxSpec;
use crate::error::Result;
use crate::sandbox::Sandbox;

/// Builds and tears down sandboxes for one isolation backend.
#[async_trait]
pub trait SandboxFactory: Send + Sync {
    /// Human-readable name for this backend (e.g. "process").
    fn name(&self) -> &str;

    /// Create an unstarted sandbox for `spec`.
    async fn create(&self, spec: SandboxSpec) -> Result<Box<dyn Sandbox>>;

    /// Tear down a sandbox, force-stopping it if needed. Best-effort:
    /// failures are logged by the implementation, never returned.
    async fn destroy(&self, sandbox: Box<dyn Sandbox>);
}
