//! Synthesized timeline events.
//!
//! One closed enum instead of runtime type dispatch: every consumer matches
//! exhaustively, so adding a variant is a compile-time checked change.

pub mod types;

pub use types::{CommitRange, CommitRef, Event, EventKind};
