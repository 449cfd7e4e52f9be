//! Artifact storage boundary
//!
//! External collaborator interface for durable file storage (contact
//! lists, attachments, generated reports). The local implementation
//! copies into a folder tree under the artifact directory; a CDN-backed
//! implementation would slot in behind the same trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Durable storage for uploaded and generated files
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a local file under `folder`, returning a public reference.
    /// `resource_type` is a storage hint ("raw", "auto", "report").
    async fn upload(&self, local_path: &Path, folder: &str, resource_type: &str)
        -> Result<String>;
}

/// Filesystem-backed store rooted at a base directory
pub struct LocalArtifactStore {
    base_dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(
        &self,
        local_path: &Path,
        folder: &str,
        resource_type: &str,
    ) -> Result<String> {
        let file_name = local_path
            .file_name()
            .ok_or_else(|| Error::BadRequest(format!("not a file: {}", local_path.display())))?;

        let target_dir = self.base_dir.join(folder);
        tokio::fs::create_dir_all(&target_dir).await?;

        let target = target_dir.join(file_name);
        tokio::fs::copy(local_path, &target).await?;
        debug!(
            "Stored {} artifact {} -> {}",
            resource_type,
            local_path.display(),
            target.display()
        );

        Ok(format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_copies_into_folder_and_returns_ref() {
        let base = tempfile::tempdir().unwrap();
        let src_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("contacts.csv");
        std::fs::write(&src, "phone\n9876543210\n").unwrap();

        let store = LocalArtifactStore::new(base.path().to_path_buf());
        let reference = store.upload(&src, "contact-lists", "raw").await.unwrap();

        assert!(reference.starts_with("file://"));
        let stored = base.path().join("contact-lists").join("contacts.csv");
        assert_eq!(
            std::fs::read_to_string(stored).unwrap(),
            "phone\n9876543210\n"
        );
    }

    #[tokio::test]
    async fn upload_of_directory_is_rejected() {
        let base = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(base.path().to_path_buf());
        let err = store.upload(Path::new("/"), "x", "raw").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
