//! Byte ranges inside one source.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// The half-open byte range `start..end` of source `file`.
///
/// Syntax nodes, directives and diagnostics all carry one. Offsets are
/// bytes, not characters; [`SourceDb::locate`](crate::SourceDb::locate)
/// turns them into lines and columns.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// Which source.
    pub file: FileId,
    /// First byte.
    pub start: u32,
    /// One past the last byte.
    pub end: u32,
}

impl Span {
    /// Belongs to no source. Diagnostics with this span print no excerpt.
    pub const DUMMY: Span = Span::file_start(FileId::DUMMY);

    /// `start..end` in `file`.
    pub const fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// The empty range at offset zero, for problems that concern a whole
    /// source rather than a place in it.
    pub const fn file_start(file: FileId) -> Self {
        Self::new(file, 0, 0)
    }

    /// The smallest range covering both spans.
    ///
    /// Spans of different sources do not combine; `self` is returned as is.
    pub fn merge(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span::new(
            self.file,
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }

    /// Width in bytes.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this span belongs to no source.
    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }
}
