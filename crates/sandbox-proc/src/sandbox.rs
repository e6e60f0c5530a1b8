use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nix::sys::signal::Signal;
use sandbox::{
    OutputSnapshot, ResourceLimits, Result, Sandbox, SandboxError, SandboxSpec, SandboxStatus,
    UsageSample,
};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::proc_stats;

/// Poll interval while waiting out the stop grace period.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// First observation of the child's exit, cached so repeated probes report
/// a stable exit code and time.
#[derive(Debug, Clone, Copy)]
struct ExitObservation {
    exit_code: i32,
    finished_at: DateTime<Utc>,
}

/// One sandboxed child process.
///
/// The child is spawned in its own process group with cwd at the snapshot
/// root, `RLIMIT_AS` set to the memory ceiling, and CPU affinity restricted
/// to the configured logical-CPU budget. Stdout/stderr are drained into
/// in-memory buffers by background tasks.
pub struct ProcessSandbox {
    id: String,
    interpreter: PathBuf,
    spec: SandboxSpec,
    child: Option<Child>,
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
    readers: Vec<JoinHandle<()>>,
    exit: Option<ExitObservation>,
    last_usage: UsageSample,
}

impl ProcessSandbox {
    pub(crate) fn new(interpreter: PathBuf, spec: SandboxSpec) -> Self {
        Self {
            id: spec.id.to_string(),
            interpreter,
            spec,
            child: None,
            stdout: Arc::new(Mutex::new(Vec::new())),
            stderr: Arc::new(Mutex::new(Vec::new())),
            readers: Vec::new(),
            exit: None,
            last_usage: UsageSample::default(),
        }
    }

    /// Signal the child's entire process group. The child is spawned with
    /// `process_group(0)`, so its PGID equals its PID. No-op once the child
    /// has exited or the PID cannot be represented as `i32`.
    fn signal_group(&self, signal: Signal) {
        if let Some(child) = self.child.as_ref()
            && let Some(pid) = child.id()
            && let Ok(pid) = i32::try_from(pid)
        {
            let pgid = nix::unistd::Pid::from_raw(pid);
            let _ = nix::sys::signal::killpg(pgid, signal);
        }
    }

    /// Record the exit, drop the reaped child, and wait for the output
    /// readers to hit EOF so captured output is final.
    async fn seal_exit(&mut self, exit_code: i32) -> ExitObservation {
        let observed = ExitObservation {
            exit_code,
            finished_at: Utc::now(),
        };
        self.exit = Some(observed);
        self.child = None;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        observed
    }

    /// SIGKILL the group and reap the child.
    async fn force_kill(&mut self) -> Result<()> {
        self.signal_group(Signal::SIGKILL);
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match child.wait().await {
            Ok(status) => {
                let code = exit_code_of(status);
                self.seal_exit(code).await;
                info!(id = %self.id, "sandbox force-killed");
                Ok(())
            }
            Err(e) => Err(SandboxError::StopFailed(format!("reap child: {e}"))),
        }
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&mut self) -> Result<()> {
        if self.child.is_some() || self.exit.is_some() {
            return Err(SandboxError::StartFailed("sandbox already started".into()));
        }

        let limits = self.spec.limits.clone();
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.spec.entry_file)
            .current_dir(&self.spec.root_dir)
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // SAFETY: apply_limits only performs async-signal-safe syscalls
        // (setrlimit, sched_setaffinity) between fork and exec.
        unsafe {
            command.pre_exec(move || apply_limits(&limits));
        }

        let mut child = command.spawn().map_err(|e| {
            SandboxError::StartFailed(format!("spawn {}: {e}", self.interpreter.display()))
        })?;

        if let Some(stdout) = child.stdout.take() {
            self.readers.push(drain(stdout, Arc::clone(&self.stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            self.readers.push(drain(stderr, Arc::clone(&self.stderr)));
        }

        self.child = Some(child);
        info!(id = %self.id, entry = %self.spec.entry_file, "process sandbox started");
        Ok(())
    }

    async fn probe(&mut self) -> Result<SandboxStatus> {
        if let Some(exit) = self.exit {
            return Ok(SandboxStatus::Exited {
                exit_code: exit.exit_code,
                finished_at: Some(exit.finished_at),
            });
        }

        let Some(child) = self.child.as_mut() else {
            return Err(SandboxError::ProbeFailed("sandbox not started".into()));
        };

        if let Some(pid) = child.id()
            && let Some(sample) = proc_stats::sample(pid)
        {
            self.last_usage = sample;
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                let code = exit_code_of(status);
                let observed = self.seal_exit(code).await;
                debug!(id = %self.id, exit_code = code, "process exited");
                Ok(SandboxStatus::Exited {
                    exit_code: code,
                    finished_at: Some(observed.finished_at),
                })
            }
            Ok(None) => Ok(SandboxStatus::Running),
            Err(e) => Err(SandboxError::ProbeFailed(e.to_string())),
        }
    }

    async fn output(&self) -> OutputSnapshot {
        OutputSnapshot {
            stdout: String::from_utf8_lossy(&self.stdout.lock().await).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr.lock().await).into_owned(),
        }
    }

    async fn usage(&self) -> UsageSample {
        self.last_usage
    }

    async fn stop(&mut self, grace: Duration) -> Result<()> {
        if self.exit.is_some() || self.child.is_none() {
            return Ok(());
        }

        self.signal_group(Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let Some(child) = self.child.as_mut() else {
                return Ok(());
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = exit_code_of(status);
                    self.seal_exit(code).await;
                    info!(id = %self.id, "sandbox stopped within grace period");
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => return Err(SandboxError::StopFailed(e.to_string())),
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        self.force_kill().await
    }

    async fn kill(&mut self) -> Result<()> {
        if self.exit.is_some() || self.child.is_none() {
            return Ok(());
        }
        self.force_kill().await
    }
}

/// Read a child pipe to EOF into a shared buffer.
fn drain<R>(mut pipe: R, buffer: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Some(read) = chunk.get(..n) {
                        buffer.lock().await.extend_from_slice(read);
                    }
                }
            }
        }
    })
}

/// Map an exit status to a single code: the real exit code, or 128 + signal
/// for signal deaths (shell convention).
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Apply resource limits to the current process.
///
/// Runs in the child between fork and exec; restricted to async-signal-safe
/// syscalls.
fn apply_limits(limits: &ResourceLimits) -> std::io::Result<()> {
    use nix::sched::{CpuSet, sched_getaffinity, sched_setaffinity};
    use nix::sys::resource::{Resource, setrlimit};
    use nix::unistd::Pid;

    setrlimit(
        Resource::RLIMIT_AS,
        limits.memory_bytes,
        limits.memory_bytes,
    )
    .map_err(std::io::Error::from)?;
    // Limit kills would otherwise drop core files into the snapshot dir.
    setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(std::io::Error::from)?;

    // Restrict to the first `cpu_count` cores of the inherited affinity
    // mask; the process may already be confined to a subset of the machine.
    let inherited = sched_getaffinity(Pid::from_raw(0)).map_err(std::io::Error::from)?;
    let budget = limits.cpu_count.max(1) as usize;
    let mut cpus = CpuSet::new();
    let mut kept = 0;
    for cpu in 0..CpuSet::count() {
        if kept == budget {
            break;
        }
        if inherited.is_set(cpu).unwrap_or(false) {
            cpus.set(cpu).map_err(std::io::Error::from)?;
            kept += 1;
        }
    }
    if kept > 0 {
        sched_setaffinity(Pid::from_raw(0), &cpus).map_err(std::io::Error::from)?;
    }
    Ok(())
}
