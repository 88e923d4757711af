//! Analysis engine for benchwatch.
//!
//! Turns a log directory full of per-commit result files into a structured
//! [`report::Report`], annotates it with the authoritative commit history,
//! runs the statistical comparator over adjacent commits and synthesizes the
//! typed event timeline the scheduler feeds on.

pub mod history;
pub mod report;
pub mod stats;
pub mod store;
pub mod synth;
