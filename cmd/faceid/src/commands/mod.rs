//! CLI commands module.

mod config;
mod delete;
mod enroll;
mod list;
mod search;
mod util;
mod verify;

pub use config::ConfigCommand;
pub use delete::DeleteCommand;
pub use enroll::EnrollCommand;
pub use list::ListCommand;
pub use search::SearchCommand;
pub use verify::VerifyCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
