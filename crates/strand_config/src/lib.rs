//! `strand.toml` and the options derived from it.
//!
//! [`load_config`] reads and checks the file; [`resolve_options`] layers
//! command-line [`ConfigOverrides`] on top and yields the [`CompilerOptions`]
//! a compiler or analysis context is built from.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_options, CompilerOptions, ConfigOverrides};
pub use types::*;
