//! Local filesystem storage for generated documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{FileStorage, StoredFile};
use crate::error::CollaboratorError;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStorage;

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save_file(
        &self,
        bytes: &[u8],
        dir: &Path,
        name: &str,
    ) -> Result<PathBuf, CollaboratorError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(CollaboratorError::Failed(format!("Invalid file name '{name}'")));
        }
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn open_file(&self, path: &Path) -> Result<Option<StoredFile>, CollaboratorError> {
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok(Some(StoredFile {
            reader: Box::new(file),
            len,
        }))
    }

    async fn delete_file(&self, path: &Path) -> Result<(), CollaboratorError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
