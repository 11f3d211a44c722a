//! ristbond-core: shared errors, configuration model, and role types.
//!
//! This crate is the foundational dependency for the other ristbond crates,
//! providing the unified error type, the appliance configuration with its
//! validation rules, and the logical roles that processes are tracked under.

pub mod config;
pub mod error;
pub mod role;

// Re-export the most commonly used items at the crate root.
pub use config::{Config, SenderMode};
pub use error::{Error, Result, ValidationError};
pub use role::{Role, RoleStatus};
