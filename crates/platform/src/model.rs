use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported language runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Ruby,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => f.write_str("python"),
            Self::Javascript => f.write_str("javascript"),
            Self::Ruby => f.write_str("ruby"),
        }
    }
}

/// Lifecycle state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Requested but not yet launched.
    Queued,
    /// The program is executing.
    Running,
    /// Exited with code 0.
    Completed,
    /// Exited nonzero, failed to run, or was terminated.
    Error,
}

impl ExecutionStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => f.write_str("QUEUED"),
            Self::Running => f.write_str("RUNNING"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// A coding project workspace: the top-level container for files and an
/// execution environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub language: Language,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One file in a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Path relative to the project root. Absolute paths and parent
    /// traversal are rejected at snapshot time.
    pub path: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Best-effort resource usage sample for one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Resident set size in MB at the last sample.
    pub memory_mb: f64,
    /// Total CPU time (user + system) in seconds.
    pub cpu_secs: f64,
}

/// Mutable snapshot of one execution's lifecycle.
///
/// Invariants, maintained by the engine:
/// - `exit_code` and `completed_at` are `Some` iff `status` is terminal.
/// - Status only moves forward: `QUEUED -> RUNNING -> {COMPLETED, ERROR}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: Uuid,
    pub project_id: Uuid,
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub usage: ResourceUsage,
}

/// Lifecycle state of one dependency environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentState {
    /// Provisioned, no dependencies installed yet.
    Created,
    /// At least one successful dependency install.
    Ready,
    /// Removed; the id is invalid forever.
    Destroyed,
}

impl std::fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("CREATED"),
            Self::Ready => f.write_str("READY"),
            Self::Destroyed => f.write_str("DESTROYED"),
        }
    }
}

/// Snapshot of one environment's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub env_id: String,
    pub root: PathBuf,
    pub installed: Vec<String>,
    pub state: EnvironmentState,
}
