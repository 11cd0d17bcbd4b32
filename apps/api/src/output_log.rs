//! Append-only log of generated text. Write-only, no rotation, one entry per
//! response. A failed write is logged and never fails the action.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct OutputLog {
    path: Arc<PathBuf>,
    // Serializes appends from concurrent sessions.
    write_lock: Arc<Mutex<()>>,
}

impl OutputLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends `text` followed by a newline. Empty text is skipped.
    pub async fn append(&self, text: &str) {
        if text.trim().is_empty() {
            debug!("No output to save");
            return;
        }
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.write(text).await {
            warn!("Failed to append to {}: {e}", self.path.display());
        }
    }

    async fn write(&self, text: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())
            .await?;
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_each_response_as_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let log = OutputLog::new(&path);

        log.append("first response").await;
        log.append("").await;
        log.append("second response").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first response\nsecond response\n");
    }

    #[tokio::test]
    async fn test_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let log = OutputLog::new(dir.path().join("missing-dir").join("output.txt"));
        log.append("dropped").await;
    }
}
