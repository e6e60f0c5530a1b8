use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Project, ProjectFile};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Project persistence contract.
///
/// `get`/`delete` on an unknown id fail with [`StorageError::NotFound`];
/// `create` on a colliding id fails with [`StorageError::Duplicate`].
/// Backend malfunctions surface as [`StorageError::Backend`].
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn create_project(&self, project: Project) -> StorageResult<Project>;
    async fn get_project(&self, project_id: Uuid) -> StorageResult<Project>;
    async fn list_projects(&self, owner_id: &str) -> StorageResult<Vec<Project>>;
    async fn delete_project(&self, project_id: Uuid) -> StorageResult<()>;
}

/// File persistence contract.
///
/// The execution engine consumes this solely to materialize a point-in-time,
/// read-only snapshot of a project's files before sandbox creation; it never
/// mutates stored files.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save_file(&self, file: ProjectFile) -> StorageResult<ProjectFile>;
    async fn get_file(&self, file_id: Uuid) -> StorageResult<ProjectFile>;
    /// List every file in a project. An unknown project fails with
    /// [`StorageError::NotFound`].
    async fn list_files(&self, project_id: Uuid) -> StorageResult<Vec<ProjectFile>>;
    async fn delete_file(&self, file_id: Uuid) -> StorageResult<()>;
}
