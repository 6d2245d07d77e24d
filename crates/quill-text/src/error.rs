//! Error types for the text CRDT.

use quill_core::UniqueId;
use thiserror::Error;

/// Errors that can occur applying text operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    /// An insert referenced an anchor that exists in no known node set.
    /// This is a causality violation - the operation arrived before its
    /// dependency - and is recoverable: the transport should buffer and
    /// re-deliver once the anchor's insert has landed.
    #[error("unknown origin {origin} for insert {id}")]
    UnknownOrigin { id: UniqueId, origin: UniqueId },

    /// Two different payloads claim the same id. Only a clock or site-id
    /// collision can produce this; the merge surfaces it rather than
    /// silently picking a side.
    #[error("divergent payloads for id {0}")]
    DuplicateId(UniqueId),
}

pub type Result<T> = std::result::Result<T, TextError>;
