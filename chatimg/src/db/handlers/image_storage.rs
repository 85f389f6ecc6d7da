use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// Trait for image storage backends
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Make sure the upload directory exists
    async fn prepare(&self) -> io::Result<()>;

    /// Write image bytes under the given filename, replacing any existing file. Returns the
    /// full path written.
    ///
    /// Readers never see a partial file, and when two writes target the same name the file ends
    /// up holding exactly one of them (the last to finish).
    async fn store(&self, filename: &str, content: &[u8]) -> io::Result<PathBuf>;

    /// Delete a stored image; missing files are not an error
    async fn remove(&self, filename: &str) -> io::Result<()>;

    /// Check if an image exists
    async fn exists(&self, filename: &str) -> io::Result<bool>;
}

// ============================================================================
// Local Filesystem Storage Implementation
// ============================================================================

/// Local filesystem storage backend - stores images flat in one directory
pub struct LocalImageStorage {
    base_path: PathBuf,
}

impl LocalImageStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn prepare(&self) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o777);

        // Recursive creation succeeds when another request created the directory first
        builder.create(&self.base_path).await
    }

    async fn store(&self, filename: &str, content: &[u8]) -> io::Result<PathBuf> {
        let full_path = self.base_path.join(filename);
        // Same directory as the destination so the rename stays on one filesystem
        let temp_path = self.base_path.join(format!(".upload-{}.tmp", Uuid::new_v4()));

        let written = match write_synced(&temp_path, content).await {
            Ok(()) => fs::rename(&temp_path, &full_path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temporary upload file");
            }
            return Err(e);
        }

        Ok(full_path)
    }

    async fn remove(&self, filename: &str) -> io::Result<()> {
        match fs::remove_file(self.base_path.join(filename)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, filename: &str) -> io::Result<bool> {
        fs::try_exists(self.base_path.join(filename)).await
    }
}

/// Write `content` to a new file at `path` and flush it to disk
async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}
