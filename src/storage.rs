//! Attachment storage
//!
//! The hub only needs `store` and `retrieve`; where the bytes live is up to
//! the implementation. `FsStore` is used by the server binary, `MemoryStore`
//! by tests and embedders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attachment not found: {0}")]
    NotFound(String),

    #[error("Invalid storage reference: {0}")]
    InvalidReference(String),
}

/// Persists attachment bytes under a caller-chosen reference
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store bytes and return the reference to read them back with
    ///
    /// Either the whole object becomes visible or nothing does.
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError>;

    async fn retrieve(&self, reference: &str) -> Result<Vec<u8>, StorageError>;
}

/// A reference must be a single plain path component
fn check_reference(reference: &str) -> Result<(), StorageError> {
    if reference.is_empty()
        || reference.starts_with('.')
        || reference.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidReference(reference.to_string()));
    }
    Ok(())
}

/// Stores attachments as files in one directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open the store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AttachmentStore for FsStore {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
        check_reference(suggested_name)?;

        // Write under a hidden name, then rename into place
        let partial = self.root.join(format!(".{suggested_name}.part"));
        let target = self.root.join(suggested_name);

        if let Err(e) = tokio::fs::write(&partial, bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!("Stored {} bytes at {}", bytes.len(), target.display());
        Ok(suggested_name.to_string())
    }

    async fn retrieve(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        check_reference(reference)?;

        match tokio::fs::read(self.root.join(reference)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
        check_reference(suggested_name)?;
        self.objects
            .write()
            .await
            .insert(suggested_name.to_string(), bytes.to_vec());
        Ok(suggested_name.to_string())
    }

    async fn retrieve(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }
}
