//! Why a `strand.toml` could not be used.

use std::path::PathBuf;

/// A configuration that could not be read, parsed or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Why.
        source: std::io::Error,
    },

    /// Not valid TOML, or a key has the wrong type.
    #[error("malformed configuration: {0}")]
    Syntax(#[from] toml::de::Error),

    /// A required key is absent or empty.
    #[error("`{0}` must be set")]
    Missing(&'static str),

    /// Keys are present but their values cannot work together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
