//! ristbond - controller for a video-bonding appliance
//!
//! This library crate exposes the configuration store, the pipeline
//! controller, and the HTTP control plane for the binary and for
//! integration testing.

pub mod config;
pub mod pipeline;
pub mod server;

pub use pipeline::{PipelineController, PipelinePhase, PipelineStatus, StartReport};
