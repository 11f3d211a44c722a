//! Pipeline orchestration.
//!
//! [`PipelineController`] owns the process table and turns configuration
//! into running processes, either wholesale ([`PipelineController::start_all`],
//! [`PipelineController::restart_all`]) or one bonded path at a time
//! ([`PipelineController::start_sender`], [`PipelineController::stop_sender`]).

pub mod controller;
pub mod state;
pub mod status;

pub use controller::{plan, PipelineController, RoleFailure, StartReport, ToggleAction};
pub use state::PipelinePhase;
pub use status::{PipelineStatus, RoleReport, SenderReport};
