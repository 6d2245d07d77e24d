//! # quill-core
//!
//! Core CRDT primitives for the quillsync replicated note store:
//! - [`Lattice`] — the join-semilattice trait all state-based CRDTs satisfy
//! - [`Clock`] — per-replica Lamport clock
//! - [`UniqueId`] / [`SiteId`] — globally unique, totally ordered event ids
//! - [`LWWRegister`] — last-writer-wins scalar
//! - [`LWWMap`] — map of independent LWW registers
//! - [`Value`] — closed set of serializable metadata payloads

pub mod clock;
pub mod id;
pub mod lattice;
pub mod lwwmap;
pub mod lwwreg;
pub mod value;

pub use clock::Clock;
pub use id::{ParseIdError, SiteId, UniqueId};
pub use lattice::Lattice;
pub use lwwmap::LWWMap;
pub use lwwreg::LWWRegister;
pub use value::Value;
