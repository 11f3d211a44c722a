//! # ristbond-av
//!
//! Pure translation from a [`ristbond_core::Config`] to the external process
//! invocations that make up the pipeline, plus discovery of those programs.
//!
//! This crate provides:
//!
//! - **Process specs** ([`ProcessSpec`]) -- program, argv, and launch metadata
//!   as a plain value; nothing here spawns anything.
//! - **Encoder synthesis** ([`synthesize_encoder_invocation`]) -- one encode
//!   fanned out through the tee muxer to loopback sinks and the relay copy.
//! - **Sender synthesis** ([`synthesize_sender_invocations`]) -- per-path or
//!   single-process bonding senders.
//! - **Relay synthesis** ([`synthesize_relay_invocation`]).
//! - **Tool discovery** ([`ToolRegistry`]).

pub mod encoder;
pub mod relay;
pub mod sender;
pub mod spec;
pub mod tools;

// ---- Re-exports for convenience ----

pub use encoder::{synthesize_encoder_invocation, tee_sinks, HeaderStrategy, TeeSink};
pub use relay::synthesize_relay_invocation;
pub use sender::{
    rist_output_url, sender_shape, synthesize_bond_invocation, synthesize_path_invocation,
    synthesize_sender_invocations,
};
pub use spec::{Identity, ProcessSpec};
pub use tools::{ToolInfo, ToolRegistry};
