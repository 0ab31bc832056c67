//! Failures of the engine itself, as opposed to problems in user code.

/// Raised when an invariant the engine relies on does not hold: the core
/// library cannot be found, a cache entry a caller checked for has vanished,
/// or a snapshot does not belong to the context it is restored into.
///
/// Problems in the analysed sources never produce this; they become
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal analysis error: {0}")]
pub struct InternalError(String);

impl InternalError {
    /// An error described by `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The description, without the prefix `Display` adds.
    pub fn message(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed() {
        let err = InternalError::new("Could not resolve std:core");
        assert_eq!(err.message(), "Could not resolve std:core");
        assert_eq!(
            err.to_string(),
            "internal analysis error: Could not resolve std:core"
        );
    }
}
