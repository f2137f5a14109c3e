//! # Source Mode
//!
//! Switches between the structured tree and a raw markup buffer.
//!
//! - Entering source mode snapshots `get_markup()` into the buffer
//! - Buffer edits notify listeners with the normalized markup, the same
//!   value a structured edit producing that tree would emit
//! - Leaving source mode parses the buffer permissively and replaces the
//!   tree as one undo step; an unchanged buffer replaces nothing

use folio_markup::{parse, parse_with_diagnostics, serialize_with, Block, Document, Image, Inline, ParseError, SerializeOptions};
use tracing::{debug, warn};

use crate::commands::{is_local_reference, Command, CommandError};
use crate::editor::{AnchorId, Editor};
use crate::errors::EditorError;
use crate::upload::ImageTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Structured,
    Source,
}

#[derive(Debug)]
struct SourceSession {
    /// Markup the session started from
    original: String,
    buffer: String,
}

#[derive(Debug)]
pub struct SourceModeController {
    editor: Editor,
    session: Option<SourceSession>,
}

impl SourceModeController {
    pub fn new(editor: Editor) -> Self {
        Self { editor, session: None }
    }

    pub fn mode(&self) -> Mode {
        if self.session.is_some() {
            Mode::Source
        } else {
            Mode::Structured
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Mutable editor access, refused while the buffer is authoritative
    pub fn editor_mut(&mut self) -> Result<&mut Editor, EditorError> {
        match self.session {
            Some(_) => Err(EditorError::SourceModeActive),
            None => Ok(&mut self.editor),
        }
    }

    pub fn into_editor(self) -> Editor {
        self.editor
    }

    /// Run a structured command
    pub fn execute(&mut self, command: Command) -> Result<bool, EditorError> {
        self.editor_mut()?.execute(command)
    }

    /// Current markup of whichever view is active, normalized
    pub fn get_markup(&self) -> String {
        match &self.session {
            Some(session) => self.normalize(&session.buffer),
            None => self.editor.get_markup(),
        }
    }

    fn normalize(&self, source: &str) -> String {
        self.editor.print(&parse(source))
    }

    /// Switch to source mode; returns the buffer contents
    pub fn enter_source(&mut self) -> &str {
        let session = self.session.get_or_insert_with(|| {
            let markup = self.editor.get_markup();
            SourceSession {
                original: markup.clone(),
                buffer: markup,
            }
        });
        debug!(len = session.buffer.len(), "Entered source mode");
        &session.buffer
    }

    pub fn source(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.buffer.as_str())
    }

    /// Replace the buffer contents and notify with the normalized markup
    pub fn set_source(&mut self, text: &str) -> Result<(), EditorError> {
        let session = self.session.as_mut().ok_or(EditorError::NotInSourceMode)?;
        if session.buffer == text {
            return Ok(());
        }
        session.buffer = text.to_string();

        let markup = self.normalize(text);
        self.editor.notify(&markup);
        Ok(())
    }

    /// Switch back to the structured tree. Returns the parse recoveries of
    /// the buffer, if it was parsed.
    pub fn exit_source(&mut self) -> Result<Vec<ParseError>, EditorError> {
        let session = self.session.take().ok_or(EditorError::NotInSourceMode)?;
        if session.buffer == session.original {
            debug!("Source unchanged, keeping tree");
            return Ok(Vec::new());
        }

        let parsed = parse_with_diagnostics(&session.buffer);
        if !parsed.is_lossless() {
            warn!(recoveries = parsed.errors.len(), "Source markup needed recovery");
        }
        self.editor.replace_document(parsed.document, "Edit source");
        Ok(parsed.errors)
    }

    /// Flip between the two modes
    pub fn toggle(&mut self) -> Result<Mode, EditorError> {
        match self.mode() {
            Mode::Structured => {
                self.enter_source();
            }
            Mode::Source => {
                self.exit_source()?;
            }
        }
        Ok(self.mode())
    }
}

/// One image in its own paragraph
fn image_markup(image: Image) -> String {
    let doc = Document::from_blocks(vec![Block::paragraph(vec![Inline::Image(image)])]);
    serialize_with(&doc, SerializeOptions { pretty: false })
}

impl ImageTarget for SourceModeController {
    fn capture_anchor(&mut self) -> AnchorId {
        self.editor.capture_anchor()
    }

    fn insert_image_at_anchor(&mut self, anchor: AnchorId, image: Image) -> Result<(), CommandError> {
        let Some(session) = &mut self.session else {
            return self.editor.insert_image_at_anchor(anchor, image);
        };
        if is_local_reference(&image.src) {
            return Err(CommandError::LocalReference(image.src));
        }

        // No anchors exist in raw text; the image goes at the end
        let snippet = image_markup(image);
        session.buffer = if session.buffer.trim().is_empty() {
            snippet
        } else {
            format!("{}\n{}", session.buffer.trim_end(), snippet)
        };

        let markup = self.get_markup();
        self.editor.notify(&markup);
        Ok(())
    }

    fn release_anchor(&mut self, anchor: AnchorId) {
        self.editor.release_anchor(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use std::sync::{Arc, Mutex};

    fn controller(markup: &str) -> SourceModeController {
        SourceModeController::new(Editor::with_markup(markup, EditorConfig::default()))
    }

    #[test]
    fn test_enter_snapshots_markup() {
        let mut controller = controller("<h1>Title</h1><p>Body</p>");
        assert_eq!(controller.enter_source(), "<h1>Title</h1>\n<p>Body</p>");
        assert_eq!(controller.mode(), Mode::Source);
    }

    #[test]
    fn test_source_edits_notify_normalized_markup() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut controller = controller("<p>a</p>");
        let sink = seen.clone();
        controller
            .editor_mut()
            .unwrap()
            .on_change(move |markup| sink.lock().unwrap().push(markup.to_string()));

        controller.enter_source();
        controller.set_source("<p><b>bold</b>").unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), ["<p><strong>bold</strong></p>"]);
    }

    #[test]
    fn test_unchanged_exit_keeps_history_empty() {
        let mut controller = controller("<p>a</p>");
        let version = controller.editor().version();
        controller.enter_source();
        controller.exit_source().unwrap();

        assert_eq!(controller.editor().version(), version);
        assert!(!controller.editor().can_undo());
    }

    #[test]
    fn test_source_session_is_one_undo_step() {
        let mut controller = controller("<p>a</p>");
        controller.enter_source();
        controller.set_source("<p>b</p>").unwrap();
        controller.set_source("<p>c</p>").unwrap();
        controller.exit_source().unwrap();

        assert_eq!(controller.get_markup(), "<p>c</p>");
        let editor = controller.editor_mut().unwrap();
        assert!(editor.undo());
        assert_eq!(editor.get_markup(), "<p>a</p>");
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_commands_refused_in_source_mode() {
        let mut controller = controller("<p>a</p>");
        controller.enter_source();
        let result = controller.execute(Command::InsertText { text: "x".into() });
        assert!(matches!(result, Err(EditorError::SourceModeActive)));
        assert_eq!(controller.source(), Some("<p>a</p>"));
    }

    #[test]
    fn test_set_source_outside_source_mode_fails() {
        let mut controller = controller("<p>a</p>");
        assert!(matches!(
            controller.set_source("<p>b</p>"),
            Err(EditorError::NotInSourceMode)
        ));
        assert!(matches!(controller.exit_source(), Err(EditorError::NotInSourceMode)));
    }

    #[test]
    fn test_upload_in_source_mode_appends_to_buffer() {
        let mut controller = controller("<p>a</p>");
        let anchor = controller.capture_anchor();
        controller.enter_source();

        controller
            .insert_image_at_anchor(anchor, Image::new("https://cdn.example.com/x.png", "X"))
            .unwrap();
        controller.release_anchor(anchor);

        assert_eq!(
            controller.source(),
            Some("<p>a</p>\n<p><img src=\"https://cdn.example.com/x.png\" alt=\"X\" class=\"align-none\"></p>")
        );
    }
}
