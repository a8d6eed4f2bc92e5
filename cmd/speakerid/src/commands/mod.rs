//! CLI commands module.

mod config;
mod enroll;
mod identify;
mod util;

pub use config::ConfigCommand;
pub use enroll::EnrollCommand;
pub use identify::IdentifyCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
