use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use platform::{
    CodeExecutor, ExecError, ExecResult, ExecutionRecord, ExecutionStatus, FileStorage,
    ResourceUsage,
};
use sandbox::{
    ResourceLimits, Sandbox, SandboxFactory, SandboxSpec, SandboxStatus, UsageSample,
    parse_memory_limit,
};
use sandbox_proc::ProcessFactory;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::snapshot;

/// One tracked execution: the record plus the exclusively owned sandbox
/// handle and scratch directory.
///
/// The per-entry mutex is the single writer for the record's fields; the
/// engine's map lock only guards membership.
struct Execution {
    record: ExecutionRecord,
    sandbox: Box<dyn Sandbox>,
    scratch: PathBuf,
}

/// The execution engine.
///
/// Collaborators are injected at construction: file storage supplies the
/// snapshot source, the sandbox factory supplies the isolation backend.
/// Sandbox handles never leave the engine.
pub struct ExecutionEngine {
    files: Arc<dyn FileStorage>,
    factory: Arc<dyn SandboxFactory>,
    limits: ResourceLimits,
    config: EngineConfig,
    executions: RwLock<HashMap<Uuid, Arc<Mutex<Execution>>>>,
}

impl ExecutionEngine {
    /// Engine over the default process backend, running entry files with
    /// `config.runtime`.
    pub fn new(files: Arc<dyn FileStorage>, config: EngineConfig) -> ExecResult<Self> {
        let factory = ProcessFactory::new(&config.runtime)
            .map_err(|e| ExecError::Execution(e.to_string()))?;
        Self::with_factory(files, Arc::new(factory), config)
    }

    /// Engine over an injected sandbox backend.
    ///
    /// Validates the configured limits up front; a bad memory string fails
    /// here, not at first execution.
    pub fn with_factory(
        files: Arc<dyn FileStorage>,
        factory: Arc<dyn SandboxFactory>,
        config: EngineConfig,
    ) -> ExecResult<Self> {
        let memory_bytes =
            parse_memory_limit(&config.memory_limit).map_err(|e| ExecError::Execution(e.to_string()))?;
        Ok(Self {
            files,
            factory,
            limits: ResourceLimits {
                memory_bytes,
                cpu_count: config.cpu_count,
            },
            config,
            executions: RwLock::new(HashMap::new()),
        })
    }

    async fn entry(&self, execution_id: Uuid) -> ExecResult<Arc<Mutex<Execution>>> {
        self.executions
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .ok_or_else(|| ExecError::NotFound(execution_id))
    }

    /// Move a live record to its terminal state. Caller holds the entry
    /// lock; terminal records are never touched again.
    async fn seal(execution: &mut Execution, status: ExecutionStatus, exit_code: i32) {
        let output = execution.sandbox.output().await;
        execution.record.status = status;
        execution.record.exit_code = Some(exit_code);
        execution.record.stdout = output.stdout;
        execution.record.stderr = output.stderr;
        execution.record.usage = usage_of(execution.sandbox.usage().await);
        if execution.record.completed_at.is_none() {
            execution.record.completed_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl CodeExecutor for ExecutionEngine {
    async fn execute(&self, project_id: Uuid, entry_file: &str) -> ExecResult<ExecutionRecord> {
        // Storage errors (unknown project included) propagate unmodified.
        let files = self.files.list_files(project_id).await?;

        if !files.iter().any(|f| f.path == entry_file) {
            return Err(ExecError::EntryNotFound(entry_file.to_owned()));
        }

        let execution_id = Uuid::new_v4();
        let scratch = self.config.scratch_root.join(execution_id.to_string());
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| ExecError::Execution(format!("create scratch dir: {e}")))?;

        if let Err(e) = snapshot::materialize(&scratch, &files).await {
            remove_scratch(&scratch).await;
            return Err(e);
        }

        let spec = SandboxSpec {
            id: execution_id,
            root_dir: scratch.clone(),
            entry_file: entry_file.to_owned(),
            limits: self.limits.clone(),
        };

        let mut sandbox = match self.factory.create(spec).await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                remove_scratch(&scratch).await;
                return Err(ExecError::Execution(e.to_string()));
            }
        };

        if let Err(e) = sandbox.start().await {
            self.factory.destroy(sandbox).await;
            remove_scratch(&scratch).await;
            return Err(ExecError::Execution(e.to_string()));
        }

        let record = ExecutionRecord {
            execution_id,
            project_id,
            status: ExecutionStatus::Running,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            started_at: Utc::now(),
            completed_at: None,
            usage: ResourceUsage::default(),
        };

        let execution = Execution {
            record: record.clone(),
            sandbox,
            scratch,
        };
        self.executions
            .write()
            .await
            .insert(execution_id, Arc::new(Mutex::new(execution)));

        info!(execution_id = %execution_id, project_id = %project_id, "execution started");
        Ok(record)
    }

    async fn get_status(&self, execution_id: Uuid) -> ExecResult<ExecutionRecord> {
        let entry = self.entry(execution_id).await?;
        let mut execution = entry.lock().await;

        if execution.record.status.is_terminal() {
            return Ok(execution.record.clone());
        }

        match execution.sandbox.probe().await {
            Ok(SandboxStatus::Running) => {
                execution.record.usage = usage_of(execution.sandbox.usage().await);
            }
            Ok(SandboxStatus::Exited {
                exit_code,
                finished_at,
            }) => {
                let status = if exit_code == 0 {
                    ExecutionStatus::Completed
                } else {
                    ExecutionStatus::Error
                };
                execution.record.completed_at = Some(finished_at.unwrap_or_else(Utc::now));
                Self::seal(&mut execution, status, exit_code).await;
                info!(execution_id = %execution_id, exit_code, status = %status, "execution finished");
            }
            Err(e) => {
                // Probe failures degrade the record rather than surfacing
                // to the caller.
                warn!(execution_id = %execution_id, error = %e, "status probe failed");
                Self::seal(&mut execution, ExecutionStatus::Error, 1).await;
                execution.record.stderr =
                    push_line(&execution.record.stderr, &format!("status probe failed: {e}"));
            }
        }

        Ok(execution.record.clone())
    }

    async fn terminate(&self, execution_id: Uuid) -> ExecResult<()> {
        let entry = self.entry(execution_id).await?;
        let mut execution = entry.lock().await;

        if execution.record.status.is_terminal() {
            // Fixed policy: terminating a finished execution is a no-op.
            return Ok(());
        }

        let grace = self.config.grace_period;
        execution
            .sandbox
            .stop(grace)
            .await
            .map_err(|e| ExecError::Execution(format!("terminate {execution_id}: {e}")))?;

        let exit_code = match execution.sandbox.probe().await {
            Ok(SandboxStatus::Exited { exit_code, .. }) => exit_code,
            _ => 1,
        };
        Self::seal(&mut execution, ExecutionStatus::Error, exit_code).await;
        execution.record.stderr = push_line(&execution.record.stderr, "terminated by request");
        info!(execution_id = %execution_id, "execution terminated");
        Ok(())
    }

    async fn cleanup(&self) {
        let entries: Vec<(Uuid, Arc<Mutex<Execution>>)> =
            self.executions.write().await.drain().collect();

        for (execution_id, entry) in entries {
            match Arc::try_unwrap(entry) {
                Ok(mutex) => {
                    let execution = mutex.into_inner();
                    self.factory.destroy(execution.sandbox).await;
                    remove_scratch(&execution.scratch).await;
                }
                Err(entry) => {
                    // A concurrent caller still holds the entry; kill in
                    // place instead of handing it to the factory.
                    let mut execution = entry.lock().await;
                    if let Err(e) = execution.sandbox.kill().await {
                        warn!(execution_id = %execution_id, error = %e, "failed to kill sandbox during cleanup");
                    }
                    remove_scratch(&execution.scratch).await;
                }
            }
        }
        info!("engine cleanup complete");
    }
}

fn usage_of(sample: UsageSample) -> ResourceUsage {
    ResourceUsage {
        memory_mb: sample.memory_mb,
        cpu_secs: sample.cpu_secs,
    }
}

fn push_line(buffer: &str, line: &str) -> String {
    if buffer.is_empty() {
        line.to_owned()
    } else if buffer.ends_with('\n') {
        format!("{buffer}{line}\n")
    } else {
        format!("{buffer}\n{line}")
    }
}

/// Best-effort scratch removal; failures are logged, never propagated.
async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove scratch dir");
    }
}
