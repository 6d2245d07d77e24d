//! # quill-text
//!
//! Replicated Growable Array (RGA) text CRDT: concurrent order-preserving
//! insertion and tombstone deletion with deterministic conflict resolution.
//!
//! Every character is a node identified by a [`quill_core::UniqueId`] and
//! anchored to the node it was inserted after. Siblings at the same anchor
//! order by descending id, which is the fixed tie-break every replica must
//! share for convergence.

pub mod error;
pub mod rga;

pub use error::TextError;
pub use rga::{RgaText, TextNode};
