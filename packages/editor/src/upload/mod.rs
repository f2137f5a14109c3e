//! # Media Upload Pipeline
//!
//! Uploads a locally selected file to a [`MediaStore`] and inserts an image
//! referencing the final remote URL.
//!
//! ```text
//! pending ──► uploading(0..100) ──► complete(url)
//!                               └─► error(message)
//! ```
//!
//! The insertion context is captured as an anchor when the upload starts,
//! so typing may continue while bytes are in flight. The editor lock is only
//! held to capture the anchor and to insert the finished image.

mod memory;
mod store;

pub use memory::MemoryMediaStore;
pub use store::{MediaFile, MediaStore, UploadError};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use folio_markup::Image;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::commands::{is_local_reference, CommandError};
use crate::config::EditorConfig;
use crate::editor::{AnchorId, Editor};

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Complete,
    Error,
}

/// Lifecycle record of one upload; discarded once it reaches a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: TaskId,
    pub file_name: String,
    pub progress_percent: u8,
    pub status: UploadStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

impl UploadTask {
    fn pending(id: TaskId, file_name: &str) -> Self {
        Self {
            id,
            file_name: file_name.to_string(),
            progress_percent: 0,
            status: UploadStatus::Pending,
            result_url: None,
            error: None,
        }
    }
}

/// Notifications for UI consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UploadEvent {
    Started { id: TaskId, file_name: String },
    Progress { id: TaskId, percent: u8 },
    Completed { id: TaskId, url: String },
    Failed { id: TaskId, error: String },
}

/// Something an uploaded image can be inserted into
pub trait ImageTarget: Send {
    fn capture_anchor(&mut self) -> AnchorId;

    fn insert_image_at_anchor(&mut self, anchor: AnchorId, image: Image) -> Result<(), CommandError>;

    fn release_anchor(&mut self, anchor: AnchorId);
}

impl ImageTarget for Editor {
    fn capture_anchor(&mut self) -> AnchorId {
        Editor::capture_anchor(self)
    }

    fn insert_image_at_anchor(&mut self, anchor: AnchorId, image: Image) -> Result<(), CommandError> {
        Editor::insert_image_at_anchor(self, anchor, image)
    }

    fn release_anchor(&mut self, anchor: AnchorId) {
        Editor::release_anchor(self, anchor)
    }
}

pub struct UploadPipeline<S: MediaStore> {
    store: Arc<S>,
    destination: String,
    tasks: Arc<Mutex<HashMap<TaskId, UploadTask>>>,
    next_id: AtomicU64,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
}

impl<S: MediaStore> UploadPipeline<S> {
    pub fn new(store: S, destination: impl Into<String>) -> Self {
        Self {
            store: Arc::new(store),
            destination: destination.into(),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            events: None,
        }
    }

    /// Upload into the destination configured for the editor
    pub fn from_config(store: S, config: &EditorConfig) -> Self {
        Self::new(store, config.upload_destination.as_str())
    }

    /// Publish [`UploadEvent`]s on `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Uploads still in flight, ordered by id
    pub async fn active_tasks(&self) -> Vec<UploadTask> {
        let mut tasks: Vec<UploadTask> = self.tasks.lock().await.values().cloned().collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    /// Upload `file` and insert it into `target` where the cursor was when
    /// the upload started. Returns the remote URL.
    ///
    /// On failure the target is left untouched.
    pub async fn upload<T: ImageTarget>(
        &self,
        target: &Mutex<T>,
        file: MediaFile,
        alt: &str,
    ) -> Result<String, UploadError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks
            .lock()
            .await
            .insert(id, UploadTask::pending(id, &file.name));

        let anchor = target.lock().await.capture_anchor();

        self.update(id, |task| task.status = UploadStatus::Uploading).await;
        self.emit(UploadEvent::Started {
            id,
            file_name: file.name.clone(),
        });
        info!(task = id, file = %file.name, bytes = file.bytes.len(), "Upload started");

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let transfer = self.store.upload(&file, &self.destination, progress_tx);
        let drain = async {
            while let Some(percent) = progress_rx.recv().await {
                self.record_progress(id, percent).await;
            }
        };
        let (result, ()) = futures::join!(transfer, drain);

        let outcome = match result {
            Ok(url) if is_local_reference(&url) => Err(UploadError::LocalReference(url)),
            Ok(url) => {
                let image = Image::new(url.as_str(), alt);
                target
                    .lock()
                    .await
                    .insert_image_at_anchor(anchor, image)
                    .map(|()| url)
                    .map_err(UploadError::from)
            }
            Err(err) => Err(err),
        };
        target.lock().await.release_anchor(anchor);

        match &outcome {
            Ok(url) => {
                self.record_progress(id, 100).await;
                self.update(id, |task| {
                    task.status = UploadStatus::Complete;
                    task.result_url = Some(url.clone());
                })
                .await;
                self.emit(UploadEvent::Completed { id, url: url.clone() });
                info!(task = id, url = %url, "Upload complete");
            }
            Err(err) => {
                self.update(id, |task| {
                    task.status = UploadStatus::Error;
                    task.error = Some(err.to_string());
                })
                .await;
                self.emit(UploadEvent::Failed {
                    id,
                    error: err.to_string(),
                });
                warn!(task = id, error = %err, "Upload failed");
            }
        }

        // Terminal tasks are not kept
        self.tasks.lock().await.remove(&id);
        outcome
    }

    async fn record_progress(&self, id: TaskId, percent: u8) {
        let percent = percent.min(100);
        let mut advanced = false;
        self.update(id, |task| {
            // Progress never moves backwards
            if percent > task.progress_percent {
                task.progress_percent = percent;
                advanced = true;
            }
        })
        .await;
        if advanced {
            self.emit(UploadEvent::Progress { id, percent });
        }
    }

    async fn update(&self, id: TaskId, f: impl FnOnce(&mut UploadTask)) {
        if let Some(task) = self.tasks.lock().await.get_mut(&id) {
            f(task);
        }
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(events) = &self.events {
            // Receivers may go away; uploads continue regardless
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(markup: &str) -> Mutex<Editor> {
        Mutex::new(Editor::with_markup(
            markup,
            EditorConfig {
                pretty_markup: false,
                ..EditorConfig::default()
            },
        ))
    }

    fn png(name: &str) -> MediaFile {
        MediaFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    #[tokio::test]
    async fn test_upload_inserts_remote_image() {
        let editor = editor("<p>ab</p>");
        let pipeline = UploadPipeline::new(MemoryMediaStore::new("https://cdn.example.com"), "uploads");

        let url = pipeline.upload(&editor, png("a.png"), "An A").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/uploads/a.png");
        assert_eq!(
            editor.lock().await.get_markup(),
            r#"<p><img src="https://cdn.example.com/uploads/a.png" alt="An A" class="align-none">ab</p>"#
        );
        assert!(pipeline.active_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_configured_destination_is_used() {
        let editor = editor("<p>ab</p>");
        let config = EditorConfig {
            upload_destination: "media/posts".to_string(),
            ..EditorConfig::default()
        };
        let pipeline = UploadPipeline::from_config(MemoryMediaStore::new("https://cdn.example.com"), &config);

        let url = pipeline.upload(&editor, png("a.png"), "").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/media/posts/a.png");
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_document_untouched() {
        let editor = editor("<p>ab</p>");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = UploadPipeline::new(
            MemoryMediaStore::new("https://cdn.example.com").failing("network down"),
            "uploads",
        )
        .with_events(tx);

        let err = pipeline.upload(&editor, png("a.png"), "").await.unwrap_err();
        assert_eq!(err, UploadError::Store("network down".into()));
        assert_eq!(editor.lock().await.get_markup(), "<p>ab</p>");
        assert!(!editor.lock().await.can_undo());

        drop(pipeline);
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(UploadEvent::Failed { id: 1, .. })));
    }

    #[tokio::test]
    async fn test_local_reference_is_never_committed() {
        let editor = editor("<p>ab</p>");
        let pipeline = UploadPipeline::new(
            MemoryMediaStore::new("https://cdn.example.com").returning("blob:https://app/123"),
            "uploads",
        );

        let err = pipeline.upload(&editor, png("a.png"), "").await.unwrap_err();
        assert!(matches!(err, UploadError::LocalReference(_)));
        assert_eq!(editor.lock().await.get_markup(), "<p>ab</p>");
    }

    #[tokio::test]
    async fn test_typing_during_upload_keeps_anchor() {
        let editor = editor("<p>ab</p>");
        let gate = Arc::new(tokio::sync::Notify::new());
        let pipeline = UploadPipeline::new(
            MemoryMediaStore::new("https://cdn.example.com").gated(gate.clone()),
            "uploads",
        );

        let typing = async {
            // Runs while the store waits on the gate
            editor.lock().await.insert_text("xy").unwrap();
            gate.notify_one();
        };
        let (result, ()) = futures::join!(pipeline.upload(&editor, png("a.png"), ""), typing);
        result.unwrap();

        // The anchor sat at offset 0 before "xy" was typed there
        assert_eq!(
            editor.lock().await.get_markup(),
            r#"<p>xy<img src="https://cdn.example.com/uploads/a.png" alt="" class="align-none">ab</p>"#
        );
    }
}
