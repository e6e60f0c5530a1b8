//! Environment provisioning backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use platform::{EnvError, EnvResult};
use tracing::debug;

/// Creates environments and installs packages into them.
///
/// Abstracted as a trait so tests can inject a lightweight provisioner
/// instead of shelling out to `python -m venv` and `pip`.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a fresh environment rooted at `path`.
    async fn create(&self, path: &Path) -> EnvResult<()>;

    /// Install `deps` into the environment at `path`. Specifiers are passed
    /// to the package manager verbatim, in order.
    async fn install(&self, path: &Path, deps: &[String]) -> EnvResult<()>;
}

/// Python virtualenv provisioner: `python -m venv` to create,
/// `<env>/bin/pip install` to provision.
pub struct VenvProvisioner {
    python: PathBuf,
}

impl VenvProvisioner {
    /// Resolve the python binary (e.g. "python3") on PATH.
    pub fn new(python: &str) -> EnvResult<Self> {
        let python = which::which(python)
            .map_err(|e| EnvError::Provision(format!("{python}: {e}")))?;
        Ok(Self { python })
    }
}

#[async_trait]
impl Provisioner for VenvProvisioner {
    async fn create(&self, path: &Path) -> EnvResult<()> {
        debug!(path = %path.display(), "creating virtualenv");
        let output = tokio::process::Command::new(&self.python)
            .arg("-m")
            .arg("venv")
            .arg(path)
            .output()
            .await
            .map_err(|e| EnvError::Provision(format!("spawn venv: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EnvError::Provision(format!(
                "venv failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn install(&self, path: &Path, deps: &[String]) -> EnvResult<()> {
        let pip = path.join("bin").join("pip");
        debug!(pip = %pip.display(), count = deps.len(), "installing dependencies");
        let output = tokio::process::Command::new(&pip)
            .arg("install")
            .args(deps)
            .output()
            .await
            .map_err(|e| EnvError::Dependency {
                output: format!("spawn pip: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EnvError::Dependency {
                output: stderr.trim().to_owned(),
            });
        }
        Ok(())
    }
}
