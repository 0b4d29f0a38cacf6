//! Local file transport.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pickem_core::{PickemState, StateStore, StoreError, codec};
use tracing::{debug, instrument};

/// State stored as a JSON file.
///
/// A missing file is an empty state. Saves write a sibling temp file and
/// rename it over the target, so readers never see a partial write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// A store for the file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        format!("file://{}", self.path.display())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<PickemState, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file does not exist yet");
                return Ok(PickemState::new());
            }
            Err(e) => {
                return Err(StoreError::NotReadable {
                    location: self.location(),
                    reason: e.to_string(),
                });
            }
        };

        debug!(bytes = bytes.len(), "Read state file");
        codec::decode(&bytes).map_err(|source| StoreError::Malformed {
            location: self.location(),
            source,
        })
    }

    #[instrument(skip(self, state), fields(path = %self.path.display()))]
    async fn save(&self, state: &PickemState) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::WriteFailed {
            location: self.location(),
            reason,
        };

        let bytes = codec::encode(state).map_err(|e| write_failed(e.to_string()))?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(write_failed(e.to_string()));
        }

        debug!(bytes = bytes.len(), "Wrote state file");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pickem_core::{ChannelId, SampleSize};

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"").unwrap();
        assert!(FileStore::new(path).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::new(path.clone());

        let mut state = PickemState::new();
        state
            .channel_mut(&ChannelId::new("C0"))
            .set_sample_size(SampleSize::new(2).unwrap());
        store.save(&state).await.unwrap();
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
        assert_eq!(std::fs::read(&path).unwrap(), codec::encode(&state).unwrap());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_garbage_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{oops").unwrap();
        let err = FileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileStore::new(dir.path().to_path_buf())
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotReadable { .. }));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        // A directory in the way makes the rename fail after the temp write.
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = FileStore::new(path.clone())
            .save(&PickemState::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));
        assert!(!dir.path().join("state.json.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nope").join("state.json"));
        let err = store.save(&PickemState::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));
    }
}
