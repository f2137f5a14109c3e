//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Command error: {0}")]
    Command(#[from] crate::commands::CommandError),

    #[error("Parse error: {0}")]
    Parse(#[from] folio_markup::ParseError),

    #[error("Structured commands are unavailable while editing source")]
    SourceModeActive,

    #[error("Source buffer is only available in source mode")]
    NotInSourceMode,
}
