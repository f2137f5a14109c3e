//! # Folio Editor
//!
//! Structured rich content editing on top of the `folio-markup` contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: text ⇄ Document (parse / print)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + selection + commands     │
//! │  - Serializable commands, one entry point   │
//! │  - Bounded snapshot history                 │
//! │  - Change notification (markup value out)   │
//! └─────────────────────────────────────────────┘
//!          ↓                          ↓
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │ source mode          │  │ upload pipeline      │
//! │  raw buffer ⇄ tree   │  │  async store + anchor│
//! └──────────────────────┘  └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{Editor, EditorConfig};
//! use folio_markup::Mark;
//!
//! let mut editor = Editor::with_markup("<p>Hello</p>", EditorConfig::default());
//! editor.on_change(|markup| save(markup));
//! editor.toggle_mark(Mark::Bold)?;
//! editor.insert_table(2, 3)?;
//! let markup = editor.get_markup();
//! ```

mod commands;
mod config;
mod editor;
mod errors;
mod selection;
mod source_mode;
mod undo_stack;
pub mod upload;

pub use commands::{is_local_reference, Applied, BlockKind, Command, CommandError, EditorState};
pub use config::EditorConfig;
pub use editor::{AnchorId, Editor};
pub use errors::EditorError;
pub use selection::{NodePath, Position, Remap, Selection, Step};
pub use source_mode::{Mode, SourceModeController};
pub use undo_stack::{HistoryEntry, Snapshot, UndoStack};
pub use upload::{
    ImageTarget, MediaFile, MediaStore, MemoryMediaStore, UploadError, UploadEvent, UploadPipeline, UploadStatus,
    UploadTask,
};
