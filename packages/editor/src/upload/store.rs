//! Media store abstraction.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::commands::CommandError;

/// A locally selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Upload failed: {0}")]
    Store(String),

    #[error("Store returned a local-only reference: {0:?}")]
    LocalReference(String),

    #[error("Could not insert uploaded image: {0}")]
    Insert(#[from] CommandError),
}

/// Remote storage for uploaded media.
///
/// Implementations report progress as percentages on `progress` and resolve
/// to the final public URL. The sender is dropped when the upload finishes.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        file: &MediaFile,
        destination: &str,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<String, UploadError>;
}
