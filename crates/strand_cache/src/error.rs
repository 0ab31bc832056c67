//! Artifact write failures.

use std::path::PathBuf;

/// Why an artifact could not be persisted.
///
/// Reads have no error type: an unreadable or damaged artifact is treated
/// as absent.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The filesystem refused a directory, temporary file or rename.
    #[error("cannot write artifact {}: {source}", path.display())]
    Write {
        /// Path being written when the failure happened.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },

    /// A record could not be turned into bytes.
    #[error("cannot encode artifact: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

impl CacheError {
    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_names_the_path() {
        let err = CacheError::write("/out/app.st/app.st.deps")(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.to_string(), "cannot write artifact /out/app.st/app.st.deps: denied");
    }
}
