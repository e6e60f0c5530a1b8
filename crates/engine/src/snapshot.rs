//! Read-only materialization of a project's files into a scratch directory.

use std::path::{Component, Path};

use platform::{ExecError, ProjectFile};

/// Validate that a stored path stays inside the snapshot root: non-empty,
/// relative, no parent or root components.
fn validate_rel_path(path: &str) -> Result<&Path, ExecError> {
    let rel = Path::new(path);
    if path.is_empty() || rel.is_absolute() {
        return Err(ExecError::Execution(format!("invalid file path: {path:?}")));
    }
    for component in rel.components() {
        if !matches!(component, Component::Normal(_)) {
            return Err(ExecError::Execution(format!("invalid file path: {path:?}")));
        }
    }
    Ok(rel)
}

/// Write `files` under `root` with read-only permissions.
///
/// The caller owns `root` and reclaims it when materialization fails.
pub(crate) async fn materialize(root: &Path, files: &[ProjectFile]) -> Result<(), ExecError> {
    use std::os::unix::fs::PermissionsExt;

    for file in files {
        let rel = validate_rel_path(&file.path)?;
        let dest = root.join(rel);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ExecError::Execution(format!("snapshot mkdir: {e}")))?;
        }
        tokio::fs::write(&dest, file.content.as_bytes())
            .await
            .map_err(|e| ExecError::Execution(format!("snapshot write {}: {e}", file.path)))?;
        // Read-only to the sandboxed program.
        tokio::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o444))
            .await
            .map_err(|e| ExecError::Execution(format!("snapshot chmod {}: {e}", file.path)))?;
    }
    Ok(())
}
