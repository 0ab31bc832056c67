//! Dense per-session numbering of source URIs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The number a [`SourceDb`](crate::SourceDb) gave a URI when it first saw it.
///
/// Numbers are handed out densely from zero and never reused, so they double
/// as indices into per-source tables. Spans carry a `FileId` rather than the
/// URI to stay `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Stands in for "no source"; never handed out by a `SourceDb`.
    pub const DUMMY: FileId = FileId(u32::MAX);

    /// Wraps a number obtained from [`as_raw`](Self::as_raw).
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The wrapped number.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The number as a table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DUMMY {
            f.write_str("FileId(dummy)")
        } else {
            write!(f, "FileId({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_match_raw_numbers() {
        let id = FileId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn debug_names_the_dummy() {
        assert_eq!(format!("{:?}", FileId::from_raw(3)), "FileId(3)");
        assert_eq!(format!("{:?}", FileId::DUMMY), "FileId(dummy)");
    }

    #[test]
    fn serializes_as_a_bare_number() {
        assert_eq!(serde_json::to_string(&FileId::from_raw(7)).unwrap(), "7");
    }
}
