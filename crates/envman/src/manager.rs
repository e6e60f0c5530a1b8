//! Environment lifecycle bookkeeping.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use platform::{EnvError, EnvResult, EnvironmentRecord, EnvironmentState, RuntimeEnvironment};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::provision::Provisioner;

/// Manager configuration.
#[derive(Debug, Clone)]
pub struct EnvManagerConfig {
    /// Directory all environments live under.
    pub base_dir: PathBuf,
    /// Dependency names rejected before the package manager runs.
    pub blocked_deps: Vec<String>,
}

impl Default for EnvManagerConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("codeyard-envs"),
            blocked_deps: Vec::new(),
        }
    }
}

/// Bookkeeping for one environment.
struct EnvEntry {
    path: PathBuf,
    state: EnvironmentState,
    installed: Vec<String>,
}

/// Per-project isolated environment manager.
///
/// Ids are deterministic (`env-<project_id>`), collisions are rejected, and
/// a destroyed id is invalid forever. Filesystem state under each
/// environment root is owned exclusively by this manager.
pub struct EnvironmentManager {
    config: EnvManagerConfig,
    provisioner: Arc<dyn Provisioner>,
    environments: Mutex<HashMap<String, EnvEntry>>,
}

impl EnvironmentManager {
    pub fn new(provisioner: Arc<dyn Provisioner>, config: EnvManagerConfig) -> Self {
        Self {
            config,
            provisioner,
            environments: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic environment id for a project.
    pub fn env_id(project_id: Uuid) -> String {
        format!("env-{project_id}")
    }

    /// Bookkeeping snapshot for a live environment.
    pub async fn record(&self, env_id: &str) -> EnvResult<EnvironmentRecord> {
        let environments = self.environments.lock().await;
        let entry = environments
            .get(env_id)
            .ok_or_else(|| EnvError::NotFound(env_id.to_owned()))?;
        Ok(EnvironmentRecord {
            env_id: env_id.to_owned(),
            root: entry.path.clone(),
            installed: entry.installed.clone(),
            state: entry.state,
        })
    }
}

#[async_trait]
impl RuntimeEnvironment for EnvironmentManager {
    async fn create_environment(&self, project_id: Uuid) -> EnvResult<String> {
        let env_id = Self::env_id(project_id);
        let path = self.config.base_dir.join(&env_id);

        tokio::fs::create_dir_all(&self.config.base_dir)
            .await
            .map_err(|e| EnvError::Provision(format!("create base dir: {e}")))?;

        // Reserve the id before provisioning so the map lock is not held
        // across the (slow) backend call.
        {
            let mut environments = self.environments.lock().await;
            if environments.contains_key(&env_id) || path.exists() {
                return Err(EnvError::Duplicate(env_id));
            }
            environments.insert(
                env_id.clone(),
                EnvEntry {
                    path: path.clone(),
                    state: EnvironmentState::Created,
                    installed: Vec::new(),
                },
            );
        }

        if let Err(e) = self.provisioner.create(&path).await {
            self.environments.lock().await.remove(&env_id);
            if let Err(rm) = tokio::fs::remove_dir_all(&path).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!(env_id = %env_id, error = %rm, "failed to remove partial environment");
            }
            return Err(e);
        }

        info!(env_id = %env_id, path = %path.display(), "environment created");
        Ok(env_id)
    }

    async fn install_dependencies(&self, env_id: &str, deps: &[String]) -> EnvResult<()> {
        // Blocklist check before anything touches the environment.
        for dep in deps {
            let name = dep_name(dep);
            if self
                .config
                .blocked_deps
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(name))
            {
                return Err(EnvError::Security(dep.clone()));
            }
        }

        let path = {
            let environments = self.environments.lock().await;
            let entry = environments
                .get(env_id)
                .ok_or_else(|| EnvError::NotFound(env_id.to_owned()))?;
            entry.path.clone()
        };

        // The install itself runs outside the map lock; installs into
        // distinct environments never serialize on each other.
        self.provisioner.install(&path, deps).await?;

        let mut environments = self.environments.lock().await;
        if let Some(entry) = environments.get_mut(env_id) {
            entry.state = EnvironmentState::Ready;
            entry.installed.extend(deps.iter().cloned());
        }
        info!(env_id = %env_id, count = deps.len(), "dependencies installed");
        Ok(())
    }

    async fn cleanup_environment(&self, env_id: &str) -> EnvResult<()> {
        let mut environments = self.environments.lock().await;
        let entry = environments
            .get(env_id)
            .ok_or_else(|| EnvError::NotFound(env_id.to_owned()))?;

        if let Err(e) = tokio::fs::remove_dir_all(&entry.path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(EnvError::Provision(format!("remove environment: {e}")));
        }

        environments.remove(env_id);
        info!(env_id = %env_id, "environment destroyed");
        Ok(())
    }
}

/// Package name portion of a `name[==version]` specifier.
fn dep_name(spec: &str) -> &str {
    spec.split(['=', '<', '>', '!', '~', '['])
        .next()
        .unwrap_or(spec)
        .trim()
}
