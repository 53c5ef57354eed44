use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// File-backed storage for the opaque authentication-session blob.
///
/// The blob is overwritten wholesale on save and read wholesale on load;
/// an absent file is not an error, it just means a fresh login.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(blob) => {
                debug!("Loaded session blob from {}", self.path.display());
                Ok(Some(blob))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn save(&self, blob: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        debug!("Saved session blob to {}", self.path.display());
        Ok(())
    }
}
