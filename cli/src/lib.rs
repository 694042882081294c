//! CLI utilities for faceid.
//!
//! Context configuration, output formatting and the on-disk directory
//! layout shared by faceid command-line tools.

pub mod config;
pub mod output;
pub mod paths;

pub use config::{Config, Context, StoreKind, load_config};
pub use output::{Output, OutputFormat};
pub use paths::Paths;
