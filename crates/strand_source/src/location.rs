//! Line and column positions for display.

use std::fmt;

/// Where a span starts, as `uri:line:column`. Lines and columns count from 1.
///
/// Produced by [`SourceDb::locate`](crate::SourceDb::locate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The source URI.
    pub uri: String,
    /// Line number.
    pub line: u32,
    /// Byte column within the line.
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.uri, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_a_compiler_position() {
        let at = Location {
            uri: "std:core".to_string(),
            line: 5,
            column: 3,
        };
        assert_eq!(at.to_string(), "std:core:5:3");
    }
}
