//! Line-start indexing for fast offset to line/column conversion.

use serde::{Deserialize, Serialize};

/// Precomputed line-start offsets of one version of a source's text.
///
/// Cached per source by the analysis context (the `LINE_INFO` slot) and used
/// when rendering diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<u32>,
}

impl LineInfo {
    /// Computes the line starts of `content`.
    pub fn from_text(content: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx as u32) + 1;
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the byte offset at which the 1-indexed `line` starts.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        let idx = usize::try_from(line).ok()?.checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_computation() {
        let info = LineInfo::from_text("abc\ndef\nghi");
        assert_eq!(info.line_starts, vec![0, 4, 8]);
        assert_eq!(info.line_count(), 3);
    }

    #[test]
    fn line_col_resolution() {
        let info = LineInfo::from_text("abc\ndef\nghi");
        assert_eq!(info.line_col(0), (1, 1));
        assert_eq!(info.line_col(4), (2, 1));
        assert_eq!(info.line_col(5), (2, 2));
        assert_eq!(info.line_col(8), (3, 1));
    }

    #[test]
    fn empty_text() {
        let info = LineInfo::from_text("");
        assert_eq!(info.line_col(0), (1, 1));
        assert_eq!(info.line_start(1), Some(0));
        assert_eq!(info.line_start(0), None);
        assert_eq!(info.line_start(2), None);
    }
}
