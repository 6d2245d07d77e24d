//! Error types for the note layer.

use quill_text::TextError;
use thiserror::Error;

/// Errors that can occur editing, merging, or decoding notes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    /// Attempted to merge states belonging to different notes.
    #[error("note id mismatch: {ours} vs {theirs}")]
    NoteMismatch { ours: String, theirs: String },

    /// A text operation failed; see [`TextError`] for which failures are
    /// recoverable (re-deliverable) versus fatal.
    #[error(transparent)]
    Text(#[from] TextError),

    /// A snapshot or operation failed to decode. Nothing was applied and
    /// local state is unchanged.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for NoteError {
    fn from(err: serde_json::Error) -> Self {
        NoteError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
