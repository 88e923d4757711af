//! Core types, traits, errors, config, events and units for the benchwatch
//! performance-tracking engine.
//!
//! This crate carries everything the analysis, storage and runner crates
//! share: the subsystem error enums, the TOML configuration layer, the
//! synthesized-event model, the external-runner status codes, the FPS/period
//! unit family and the cooperative cancellation token.

pub mod config;
pub mod errors;
pub mod events;
pub mod status;
pub mod telemetry;
pub mod traits;
pub mod units;
