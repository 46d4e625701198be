//! Attachment ingestion
//!
//! Validates an upload, hands its bytes to the store and describes the
//! result. Has no room or message side effects.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::AttachmentStore;

/// Largest accepted attachment (16 MiB)
pub const MAX_ATTACHMENT_BYTES: usize = 16 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "md", "csv", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentCategory {
    Image,
    Video,
    File,
}

/// Metadata for a stored attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub original_filename: String,
    pub storage_ref: String,
    pub category: AttachmentCategory,
    pub size_bytes: usize,
}

/// Lowercased extension, if the name has one
fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Category for an allowed extension, None if not allowed
pub fn classify(filename: &str) -> Option<AttachmentCategory> {
    let ext = extension(filename)?;
    let ext = ext.as_str();
    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(AttachmentCategory::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(AttachmentCategory::Video)
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        Some(AttachmentCategory::File)
    } else {
        None
    }
}

/// Reduce a client-supplied name to `[A-Za-z0-9._-]` with no leading dots
pub fn sanitize_filename(filename: &str) -> String {
    // Browsers on Windows may send a full path
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Clone)]
pub struct AttachmentIngester {
    store: Arc<dyn AttachmentStore>,
    max_bytes: usize,
}

impl AttachmentIngester {
    pub fn new(store: Arc<dyn AttachmentStore>) -> Self {
        Self {
            store,
            max_bytes: MAX_ATTACHMENT_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate, persist and describe one upload
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<Attachment, AppError> {
        let category = classify(filename)
            .ok_or_else(|| AppError::DisallowedAttachmentType(filename.to_string()))?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let suggested = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(filename));
        let storage_ref = self.store.store(bytes, &suggested).await.map_err(|e| {
            warn!("Failed to store attachment '{}': {}", filename, e);
            e
        })?;

        debug!(
            "Ingested '{}' as {} ({} bytes)",
            filename,
            storage_ref,
            bytes.len()
        );

        Ok(Attachment {
            original_filename: filename.to_string(),
            storage_ref,
            category,
            size_bytes: bytes.len(),
        })
    }
}

impl std::fmt::Debug for AttachmentIngester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentIngester")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}
