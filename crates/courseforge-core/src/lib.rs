//! Core workflow engine for courseforge.
//!
//! Orchestrates the two-stage course generation process: textbook text goes
//! in, a course outline comes back, and a chosen module can then be expanded
//! into a detailed teaching plan. The crate owns the session state machine,
//! the single-in-flight request discipline, and the typed client for the
//! remote generation service. Rendering and user interaction live in the
//! `courseforge-cli` crate; this crate only exposes read-only snapshots and
//! the four workflow intents.

pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod workflow;
