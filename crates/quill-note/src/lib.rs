//! # quill-note
//!
//! The replicated note document: one [`quill_core::LWWMap`] for metadata
//! (title, tags, flags) and one [`quill_text::RgaText`] for the body,
//! composed per replica with a site id and Lamport clock.
//!
//! A local edit mints a [`quill_core::UniqueId`], mutates local state, and
//! records a [`NoteOp`]. Reconciliation is either op replay ([`CRDTNote::apply_op`])
//! or state merge ([`CRDTNote::merge`] / [`NoteSnapshot`]); both tolerate
//! duplicate and out-of-order delivery, and all paths converge.

pub mod error;
pub mod note;
pub mod op;
pub mod snapshot;

pub use error::NoteError;
pub use note::{CRDTNote, NoteId};
pub use op::NoteOp;
pub use snapshot::{MetaRecord, NoteSnapshot};
