//! Shared test doubles: in-memory storage backends and scripted sandbox
//! factories for exercising engine failure paths.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use platform::{
    FileStorage, Language, Project, ProjectFile, ProjectStorage, StorageError, StorageResult,
};
use sandbox::{
    OutputSnapshot, Sandbox, SandboxError, SandboxFactory, SandboxSpec, SandboxStatus, UsageSample,
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryProjectStorage {
    projects: Mutex<HashMap<Uuid, Project>>,
}

#[async_trait]
impl ProjectStorage for MemoryProjectStorage {
    async fn create_project(&self, project: Project) -> StorageResult<Project> {
        let mut projects = self.projects.lock().await;
        if projects.contains_key(&project.id) {
            return Err(StorageError::Duplicate(format!("project {}", project.id)));
        }
        projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, project_id: Uuid) -> StorageResult<Project> {
        self.projects
            .lock()
            .await
            .get(&project_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("project {project_id}")))
    }

    async fn list_projects(&self, owner_id: &str) -> StorageResult<Vec<Project>> {
        Ok(self
            .projects
            .lock()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_project(&self, project_id: Uuid) -> StorageResult<()> {
        self.projects
            .lock()
            .await
            .remove(&project_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("project {project_id}")))
    }
}

/// In-memory file storage. Projects must be registered before files can be
/// saved or listed, matching the contract that `list_files` on an unknown
/// project is a not-found.
#[derive(Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<Uuid, ProjectFile>>,
    known_projects: Mutex<HashSet<Uuid>>,
}

impl MemoryFileStorage {
    pub async fn register_project(&self, project_id: Uuid) {
        self.known_projects.lock().await.insert(project_id);
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn save_file(&self, file: ProjectFile) -> StorageResult<ProjectFile> {
        if !self.known_projects.lock().await.contains(&file.project_id) {
            return Err(StorageError::NotFound(format!(
                "project {}",
                file.project_id
            )));
        }
        let mut files = self.files.lock().await;
        let collision = files
            .values()
            .any(|f| f.project_id == file.project_id && f.path == file.path && f.id != file.id);
        if collision {
            return Err(StorageError::Duplicate(format!(
                "file {} in project {}",
                file.path, file.project_id
            )));
        }
        files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn get_file(&self, file_id: Uuid) -> StorageResult<ProjectFile> {
        self.files
            .lock()
            .await
            .get(&file_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("file {file_id}")))
    }

    async fn list_files(&self, project_id: Uuid) -> StorageResult<Vec<ProjectFile>> {
        if !self.known_projects.lock().await.contains(&project_id) {
            return Err(StorageError::NotFound(format!("project {project_id}")));
        }
        Ok(self
            .files
            .lock()
            .await
            .values()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_file(&self, file_id: Uuid) -> StorageResult<()> {
        self.files
            .lock()
            .await
            .remove(&file_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("file {file_id}")))
    }
}

pub fn project(owner_id: &str) -> Project {
    Project {
        id: Uuid::new_v4(),
        name: "demo".into(),
        description: None,
        language: Language::Python,
        owner_id: owner_id.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn file(project_id: Uuid, path: &str, content: &str) -> ProjectFile {
    ProjectFile {
        id: Uuid::new_v4(),
        project_id,
        path: path.into(),
        content: content.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Register a project and seed its files. Returns the project id.
pub async fn seed_project(storage: &MemoryFileStorage, files: &[(&str, &str)]) -> Uuid {
    let project_id = Uuid::new_v4();
    storage.register_project(project_id).await;
    for (path, content) in files {
        let saved = storage.save_file(file(project_id, path, content)).await;
        assert!(saved.is_ok(), "seeding {path} failed");
    }
    project_id
}

/// Factory whose sandboxes cannot be created; exercises rollback on
/// creation failure.
pub struct FailingFactory;

#[async_trait]
impl SandboxFactory for FailingFactory {
    fn name(&self) -> &str {
        "failing"
    }

    async fn create(&self, _spec: SandboxSpec) -> sandbox::Result<Box<dyn Sandbox>> {
        Err(SandboxError::CreationFailed("backend offline".into()))
    }

    async fn destroy(&self, _sandbox: Box<dyn Sandbox>) {}
}

/// Factory producing sandboxes that start fine but fail every status probe,
/// as if the sandbox runtime vanished underneath the engine.
pub struct UnreachableProbeFactory;

struct UnreachableProbeSandbox {
    id: String,
}

#[async_trait]
impl Sandbox for UnreachableProbeSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&mut self) -> sandbox::Result<()> {
        Ok(())
    }

    async fn probe(&mut self) -> sandbox::Result<SandboxStatus> {
        Err(SandboxError::ProbeFailed("runtime unreachable".into()))
    }

    async fn output(&self) -> OutputSnapshot {
        OutputSnapshot::default()
    }

    async fn usage(&self) -> UsageSample {
        UsageSample::default()
    }

    async fn stop(&mut self, _grace: Duration) -> sandbox::Result<()> {
        Ok(())
    }

    async fn kill(&mut self) -> sandbox::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SandboxFactory for UnreachableProbeFactory {
    fn name(&self) -> &str {
        "unreachable-probe"
    }

    async fn create(&self, spec: SandboxSpec) -> sandbox::Result<Box<dyn Sandbox>> {
        Ok(Box::new(UnreachableProbeSandbox {
            id: spec.id.to_string(),
        }))
    }

    async fn destroy(&self, _sandbox: Box<dyn Sandbox>) {}
}
