//! Registry of every source URI seen in a session, plus the text snapshots
//! used to render diagnostics.

use crate::file_id::FileId;
use crate::line_info::LineInfo;
use crate::location::Location;
use crate::span::Span;
use std::collections::HashMap;

/// The text of a source as it was last read.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    /// The full text.
    pub content: String,
    /// Line starts of `content`.
    pub line_info: LineInfo,
}

#[derive(Debug)]
struct FileRecord {
    uri: String,
    snapshot: Option<SourceSnapshot>,
}

/// Maps source URIs to stable [`FileId`]s and keeps the most recent text of
/// each source for resolving spans.
#[derive(Debug, Default)]
pub struct SourceDb {
    files: Vec<FileRecord>,
    by_uri: HashMap<String, FileId>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID registered for `uri`, registering it first if needed.
    pub fn get_or_create(&mut self, uri: &str) -> FileId {
        if let Some(&id) = self.by_uri.get(uri) {
            return id;
        }
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(FileRecord {
            uri: uri.to_string(),
            snapshot: None,
        });
        self.by_uri.insert(uri.to_string(), id);
        id
    }

    /// Returns the ID registered for `uri`, if any.
    pub fn lookup(&self, uri: &str) -> Option<FileId> {
        self.by_uri.get(uri).copied()
    }

    /// Returns the URI registered under `id`.
    pub fn uri(&self, id: FileId) -> Option<&str> {
        self.files.get(id.index()).map(|r| r.uri.as_str())
    }

    /// Stores the text most recently read for `id`.
    pub fn record_snapshot(&mut self, id: FileId, content: &str) {
        if let Some(record) = self.files.get_mut(id.index()) {
            record.snapshot = Some(SourceSnapshot {
                content: content.to_string(),
                line_info: LineInfo::from_text(content),
            });
        }
    }

    /// Returns the last recorded text of `id`.
    pub fn snapshot(&self, id: FileId) -> Option<&SourceSnapshot> {
        self.files.get(id.index())?.snapshot.as_ref()
    }

    /// The position where `span` starts.
    ///
    /// Returns `None` for dummy spans and sources whose text was never read.
    pub fn locate(&self, span: Span) -> Option<Location> {
        let record = self.files.get(span.file.index())?;
        let snapshot = record.snapshot.as_ref()?;
        let (line, column) = snapshot.line_info.line_col(span.start);
        Some(Location {
            uri: record.uri.clone(),
            line,
            column,
        })
    }

    /// The text of the 1-based `line` of `file`, without its line break.
    pub fn line_text(&self, file: FileId, line: u32) -> Option<&str> {
        let snapshot = self.snapshot(file)?;
        let start = snapshot.line_info.line_start(line)? as usize;
        let end = snapshot
            .line_info
            .line_start(line + 1)
            .map_or(snapshot.content.len(), |next| next as usize);
        let text = snapshot.content.get(start..end)?;
        Some(text.trim_end_matches(['\n', '\r']))
    }

    /// Returns the source text corresponding to a [`Span`].
    pub fn snippet(&self, span: Span) -> Option<&str> {
        let snapshot = self.snapshot(span.file)?;
        snapshot
            .content
            .get(span.start as usize..span.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_per_uri() {
        let mut db = SourceDb::new();
        let a = db.get_or_create("/p/a.st");
        let b = db.get_or_create("/p/b.st");
        assert_ne!(a, b);
        assert_eq!(db.get_or_create("/p/a.st"), a);
        assert_eq!(db.lookup("/p/b.st"), Some(b));
        assert_eq!(db.uri(a), Some("/p/a.st"));
    }

    #[test]
    fn locate_after_snapshot() {
        let mut db = SourceDb::new();
        let id = db.get_or_create("/p/a.st");
        let span = Span::new(id, 5, 7);
        assert!(db.locate(span).is_none());
        db.record_snapshot(id, "abc\ndef\r\nghi");
        let at = db.locate(span).unwrap();
        assert_eq!((at.line, at.column), (2, 2));
        assert_eq!(db.snippet(span), Some("ef"));
        assert_eq!(db.line_text(id, 2), Some("def"));
        assert_eq!(db.line_text(id, 3), Some("ghi"));
        assert_eq!(db.line_text(id, 4), None);
    }

    #[test]
    fn dummy_span_has_no_location() {
        let db = SourceDb::new();
        assert!(db.locate(Span::DUMMY).is_none());
    }
}
