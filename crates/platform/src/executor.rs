use async_trait::async_trait;
use uuid::Uuid;

use crate::model::ExecutionRecord;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("execution {0} not found")]
    NotFound(Uuid),

    #[error("entry file not found: {0}")]
    EntryNotFound(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("resource limits exceeded: {0}")]
    Resource(String),

    /// Collaborator failures propagate unmodified.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Code execution contract.
///
/// `execute` is non-blocking: it returns as soon as the sandbox is launched,
/// with a non-terminal record. Callers poll `get_status` for resolution and
/// may `terminate` at any point; there is no implicit timeout.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `entry_file` from the project's file snapshot in an isolated,
    /// resource-bounded sandbox. Returns immediately with a non-terminal
    /// record. If the sandbox cannot be created, fails synchronously with
    /// all partial state reclaimed and no record retained.
    async fn execute(&self, project_id: Uuid, entry_file: &str) -> ExecResult<ExecutionRecord>;

    /// Stop a running execution: stop signal, bounded grace period, then
    /// forced kill. The record becomes terminal `ERROR`. Unknown ids fail
    /// with [`ExecError::NotFound`]; already-terminal executions are a
    /// no-op success.
    async fn terminate(&self, execution_id: Uuid) -> ExecResult<()>;

    /// Current record snapshot. Queries the sandbox's live state and
    /// classifies it; once terminal, the cached record is returned as-is.
    /// Unknown ids fail with [`ExecError::NotFound`].
    async fn get_status(&self, execution_id: Uuid) -> ExecResult<ExecutionRecord>;

    /// Best-effort shutdown: force-stops and releases every tracked sandbox
    /// and its scratch space. Individual failures are logged, never
    /// propagated.
    async fn cleanup(&self);
}
