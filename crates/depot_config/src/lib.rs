//! Parsing and validation of `depot.toml` configuration files.
//!
//! The configuration names the store directory, the default class-file roots
//! and the default log filter. Every section is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
