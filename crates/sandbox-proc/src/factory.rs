use std::path::PathBuf;

use async_trait::async_trait;
use sandbox::{Result, Sandbox, SandboxError, SandboxFactory, SandboxSpec};
use tracing::warn;

use crate::sandbox::ProcessSandbox;

/// Builds process sandboxes around a fixed interpreter.
#[derive(Debug)]
pub struct ProcessFactory {
    /// Interpreter binary, resolved once at construction.
    interpreter: PathBuf,
}

impl ProcessFactory {
    /// Resolve `runtime` (e.g. "python3") on PATH.
    pub fn new(runtime: &str) -> Result<Self> {
        let interpreter = which::which(runtime)
            .map_err(|e| SandboxError::InvalidConfig(format!("runtime {runtime}: {e}")))?;
        Ok(Self { interpreter })
    }
}

#[async_trait]
impl SandboxFactory for ProcessFactory {
    fn name(&self) -> &str {
        "process"
    }

    async fn create(&self, spec: SandboxSpec) -> Result<Box<dyn Sandbox>> {
        if !spec.root_dir.is_dir() {
            return Err(SandboxError::CreationFailed(format!(
                "snapshot root is not a directory: {}",
                spec.root_dir.display()
            )));
        }
        Ok(Box::new(ProcessSandbox::new(self.interpreter.clone(), spec)))
    }

    async fn destroy(&self, mut sandbox: Box<dyn Sandbox>) {
        if let Err(e) = sandbox.kill().await {
            warn!(id = %sandbox.id(), error = %e, "failed to kill sandbox during destroy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_runtime() {
        assert!(ProcessFactory::new("sh").is_ok());
    }

    #[test]
    fn unknown_runtime_is_invalid_config() {
        let err = ProcessFactory::new("definitely-not-a-real-interpreter").unwrap_err();
        assert!(matches!(err, SandboxError::InvalidConfig(_)));
    }
}
