use crate::error::DashboardResult;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::warn;

/// Read a JSON document, falling back to `T::default()` when the file is
/// missing or unreadable as `T`.
pub async fn read_or_default<T>(path: &Path) -> DashboardResult<T>
where
    T: DeserializeOwned + Default,
{
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("⚠️ {} is not valid JSON, starting empty: {}", path.display(), e);
            Ok(T::default())
        }
    }
}

/// Rewrite the whole document via a sibling temp file and rename.
pub async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> DashboardResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("memecoin-dashboard-{}", uuid::Uuid::new_v4().simple()))
        .join(name)
}
