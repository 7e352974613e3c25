//! Local filesystem checkpoint storage.
//!
//! Writes go to `{path}.tmp` first and are renamed over the checkpoint, so
//! a crash mid-write leaves either the old or the new file, never a torn one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CheckpointState;
use crate::storage::CheckpointStore;

/// JSON checkpoint file on local disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a store for the checkpoint at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary file the next state is staged in.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("state.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl CheckpointStore for LocalStorage {
    async fn load(&self) -> CheckpointState {
        let bytes = match self.read_bytes().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!("No checkpoint at {}, starting fresh", self.path.display());
                return CheckpointState::default();
            }
            Err(e) => {
                log::warn!(
                    "Checkpoint {} unreadable ({}), starting fresh",
                    self.path.display(),
                    e
                );
                return CheckpointState::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                log::warn!(
                    "Checkpoint {} is corrupt ({}), starting fresh",
                    self.path.display(),
                    e
                );
                CheckpointState::default()
            }
        }
    }

    async fn save(&self, state: &CheckpointState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        self.write_bytes(&bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state_with(accounts: &[(&str, u64)]) -> CheckpointState {
        let mut state = CheckpointState::default();
        for (account, id) in accounts {
            state.advance(account, *id);
        }
        state
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("state.json"));
        assert_eq!(store.load().await, CheckpointState::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("nested/state.json"));

        let state = state_with(&[("jack", 20), ("elon", 1_000)]);
        store.save(&state).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.last_id("jack"), Some(20));
        assert_eq!(loaded.last_id("elon"), Some(1_000));
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty_state() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, b"{\"users\": {\"jack\": ").unwrap();

        let store = LocalStorage::new(&path);
        assert_eq!(store.load().await, CheckpointState::default());
    }

    #[tokio::test]
    async fn test_crash_before_rename_keeps_previous_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("state.json"));
        store
            .save(&state_with(&[("jack", 20), ("elon", 30)]))
            .await
            .unwrap();

        // A crash after staging a partial write but before the rename.
        std::fs::write(store.tmp_path(), b"{\"users\": {\"ja").unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.last_id("jack"), Some(20));
        assert_eq!(loaded.last_id("elon"), Some(30));

        // The next save replaces the stale temp file.
        store
            .save(&state_with(&[("jack", 21), ("elon", 30)]))
            .await
            .unwrap();
        assert_eq!(store.load().await.last_id("jack"), Some(21));
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_reads_legacy_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"users": {"jack": {"last_id": "20"}}, "updated_at": "2025-06-01T12:00:00.5Z"}"#,
        )
        .unwrap();

        let store = LocalStorage::new(&path);
        assert_eq!(store.load().await.last_id("jack"), Some(20));
    }

    #[test]
    fn test_tmp_path_sits_next_to_checkpoint() {
        let store = LocalStorage::new("/var/lib/relay/state.json");
        assert_eq!(
            store.tmp_path(),
            PathBuf::from("/var/lib/relay/state.json.tmp")
        );
    }
}
