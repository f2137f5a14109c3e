//! In-memory media store for tests and offline use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

use super::store::{MediaFile, MediaStore, UploadError};

/// Media store that keeps uploads in memory.
///
/// Progress is reported in quarter steps. Stores can be made to fail, to
/// answer with a fixed URL, or to wait on a gate before completing.
#[derive(Clone)]
pub struct MemoryMediaStore {
    base_url: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failure: Option<String>,
    fixed_url: Option<String>,
    gate: Option<Arc<Notify>>,
}

impl MemoryMediaStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            failure: None,
            fixed_url: None,
            gate: None,
        }
    }

    /// Every upload fails with `message` after reporting some progress
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Every upload resolves to `url` instead of the stored location
    pub fn returning(mut self, url: impl Into<String>) -> Self {
        self.fixed_url = Some(url.into());
        self
    }

    /// Uploads wait for a notification on `gate` before completing
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Stored object keys
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(
        &self,
        file: &MediaFile,
        destination: &str,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<String, UploadError> {
        // A closed receiver only means nobody is watching
        let _ = progress.send(25);
        let _ = progress.send(50);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.failure {
            return Err(UploadError::Store(message.clone()));
        }

        let key = format!("{}/{}", destination.trim_matches('/'), file.name);
        self.objects.lock().await.insert(key.clone(), file.bytes.clone());

        let _ = progress.send(75);
        let _ = progress.send(100);

        Ok(self
            .fixed_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.base_url.trim_end_matches('/'), key)))
    }
}
