use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("environment {0} not found")]
    NotFound(String),

    #[error("environment {0} already exists")]
    Duplicate(String),

    #[error("dependency install failed: {output}")]
    Dependency { output: String },

    #[error("dependency {0} is not allowed")]
    Security(String),

    #[error("environment provisioning failed: {0}")]
    Provision(String),
}

pub type EnvResult<T> = Result<T, EnvError>;

/// Isolated dependency-environment contract.
///
/// Environment ids are deterministically derived from the project id.
/// State machine: `CREATED -> (install success) -> READY -> (cleanup) ->
/// DESTROYED`; `DESTROYED` is terminal and invalidates the id.
#[async_trait]
pub trait RuntimeEnvironment: Send + Sync {
    /// Allocate an isolated environment for a project. A second call for
    /// the same project fails with [`EnvError::Duplicate`].
    async fn create_environment(&self, project_id: Uuid) -> EnvResult<String>;

    /// Install packages into the environment, passing the specifiers
    /// (`name[==version]`) to the package manager verbatim and in order.
    /// A nonzero install exit fails with [`EnvError::Dependency`] carrying
    /// the captured error output; there is no automatic retry. May be
    /// invoked repeatedly while the environment exists.
    async fn install_dependencies(&self, env_id: &str, deps: &[String]) -> EnvResult<()>;

    /// Delete the environment's filesystem state and bookkeeping. Fails
    /// with [`EnvError::NotFound`] if already removed.
    async fn cleanup_environment(&self, env_id: &str) -> EnvResult<()>;
}
