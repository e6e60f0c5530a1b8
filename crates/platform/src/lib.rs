//! Contracts and data model for the codeyard execution platform.
//!
//! This crate defines what the execution core consumes, not how it is
//! implemented: the project/file models, the storage capability traits, the
//! executor and runtime-environment contracts, and the error taxonomy shared
//! across backends. Concrete backends are selected at construction time via
//! dependency injection.

mod environment;
mod executor;
mod model;
mod storage;

pub use environment::{EnvError, EnvResult, RuntimeEnvironment};
pub use executor::{CodeExecutor, ExecError, ExecResult};
pub use model::{
    EnvironmentRecord, EnvironmentState, ExecutionRecord, ExecutionStatus, Language, Project,
    ProjectFile, ResourceUsage,
};
pub use storage::{FileStorage, ProjectStorage, StorageError, StorageResult};
