//! Source identity.

use crate::file_id::FileId;
use crate::uri;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// How a source's text is located.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SourceKind {
    /// An ordinary file reached through the source provider.
    File,
    /// A bundled system library (`std:` scheme).
    System,
}

#[derive(Debug)]
struct SourceInner {
    uri: String,
    file: FileId,
    kind: SourceKind,
}

/// An immutable identity for one unit of text.
///
/// Sources compare, hash and order by URI only: two `Source` values created
/// for the same URI are the same source even if they were obtained
/// separately. Cloning is cheap. Existence, timestamps and contents are
/// queried through the [`SourceFactory`](crate::SourceFactory).
#[derive(Clone)]
pub struct Source(Arc<SourceInner>);

impl Source {
    pub(crate) fn new(uri: String, file: FileId, kind: SourceKind) -> Self {
        Self(Arc::new(SourceInner { uri, file, kind }))
    }

    /// The canonical URI of this source.
    pub fn uri(&self) -> &str {
        &self.0.uri
    }

    /// The file ID spans in this source are attributed to.
    pub fn file(&self) -> FileId {
        self.0.file
    }

    /// How this source's text is located.
    pub fn kind(&self) -> SourceKind {
        self.0.kind
    }

    /// Returns `true` for bundled system library sources.
    pub fn is_system(&self) -> bool {
        self.0.kind == SourceKind::System
    }

    /// Returns `true` for HTML companion sources.
    pub fn is_html(&self) -> bool {
        let uri = self.uri();
        uri.ends_with(".html") || uri.ends_with(".htm")
    }

    /// The last segment of the URI, used in summaries and dependency records.
    pub fn short_name(&self) -> &str {
        uri::last_segment(self.uri())
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.0.uri == other.0.uri
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.uri.hash(state);
    }
}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.uri.cmp(&other.0.uri)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({})", self.uri())
    }
}
