//! Local scratch directory the state machine downloads media and side
//! artifacts into before uploading them, and removes at the end of a run.

use bytes::Bytes;
use connector_core::{ConnectorError, ConnectorResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
pub struct LocalFileSink {
    work_dir: PathBuf,
}

impl LocalFileSink {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.work_dir.join(filename)
    }

    pub async fn write(&self, filename: &str, bytes: &Bytes) -> ConnectorResult<PathBuf> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| {
                ConnectorError::persist_failure(filename, "failed to create work dir", e)
            })?;

        let path = self.path_for(filename);
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            ConnectorError::persist_failure(filename, "failed to create local file", e)
        })?;
        file.write_all(bytes).await.map_err(|e| {
            ConnectorError::persist_failure(filename, "failed to write local file", e)
        })?;
        Ok(path)
    }

    /// Deletes the named files if present; a missing file is not an error.
    pub async fn cleanup(&self, filenames: &[&str]) -> ConnectorResult<()> {
        for filename in filenames {
            let path = self.path_for(filename);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ConnectorError::CleanupFailure {
                        registry_id: filename.to_string(),
                        reason: "failed to remove local file".to_string(),
                        source: Some(Box::new(e)),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_cleanup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(dir.path());
        let path = sink.write("a.bin", &Bytes::from_static(b"hi")).await.unwrap();
        assert!(path.exists());
        sink.cleanup(&["a.bin"]).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cleanup_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(dir.path());
        sink.cleanup(&["never-written.bin"]).await.unwrap();
    }
}
