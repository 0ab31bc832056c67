//! Creation and resolution of [`Source`]s.

use crate::provider::SourceProvider;
use crate::source::{Source, SourceKind};
use crate::source_db::SourceDb;
use crate::system::SystemLibraries;
use crate::uri::{self, NATIVE_EXT_SCHEME, PACKAGE_SCHEME, SYSTEM_SCHEME};
use parking_lot::{Mutex, MutexGuard};
use std::io;
use std::sync::Arc;

/// The outcome of resolving a directive URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UriResolution {
    /// The URI names a source (which may or may not exist).
    Source(Source),
    /// A native extension import, skipped without a report.
    NativeExtension,
    /// The URI cannot name any source (unknown scheme, no package root).
    Unresolved,
}

/// Creates [`Source`]s from URIs and answers existence, timestamp and
/// content queries for them.
///
/// Ordinary sources go to the [`SourceProvider`]; `std:` sources go to the
/// [`SystemLibraries`] table. Every text read is recorded in the
/// [`SourceDb`] so diagnostics can later be rendered against it.
pub struct SourceFactory {
    provider: Arc<dyn SourceProvider>,
    system: SystemLibraries,
    package_roots: Vec<String>,
    db: Mutex<SourceDb>,
}

impl SourceFactory {
    /// Creates a factory over `provider` and the given system libraries.
    pub fn new(provider: Arc<dyn SourceProvider>, system: SystemLibraries) -> Self {
        Self {
            provider,
            system,
            package_roots: Vec::new(),
            db: Mutex::new(SourceDb::new()),
        }
    }

    /// Sets the directories searched for `package:` URIs, in order.
    pub fn with_package_roots(mut self, roots: Vec<String>) -> Self {
        self.package_roots = roots;
        self
    }

    /// The bundled library table.
    pub fn system_libraries(&self) -> &SystemLibraries {
        &self.system
    }

    /// Returns the source for an absolute URI.
    pub fn for_uri(&self, uri: &str) -> Source {
        let canonical = uri::normalize(uri);
        let kind = if uri::scheme(&canonical) == Some(SYSTEM_SCHEME) {
            SourceKind::System
        } else {
            SourceKind::File
        };
        let file = self.db.lock().get_or_create(&canonical);
        Source::new(canonical, file, kind)
    }

    /// The implicitly imported core library.
    pub fn core_source(&self) -> Source {
        self.for_uri("std:core")
    }

    /// Resolves a directive URI written in `base`.
    pub fn resolve_uri(&self, base: Option<&Source>, text: &str) -> UriResolution {
        match uri::scheme(text) {
            Some(NATIVE_EXT_SCHEME) => UriResolution::NativeExtension,
            Some(SYSTEM_SCHEME) => {
                if self.system.library_for_uri(text).is_some() {
                    UriResolution::Source(self.for_uri(text))
                } else {
                    tracing::debug!(uri = text, "unknown system library");
                    UriResolution::Unresolved
                }
            }
            Some(PACKAGE_SCHEME) => self.resolve_package(uri::path_of(text)),
            Some(scheme) => {
                tracing::debug!(uri = text, scheme, "unsupported URI scheme");
                UriResolution::Unresolved
            }
            None => {
                let absolute = match base {
                    Some(base) => uri::join(base.uri(), text),
                    None => uri::normalize(text),
                };
                UriResolution::Source(self.for_uri(&absolute))
            }
        }
    }

    fn resolve_package(&self, path: &str) -> UriResolution {
        let candidates: Vec<String> = self
            .package_roots
            .iter()
            .map(|root| uri::normalize(&format!("{}/{path}", root.trim_end_matches('/'))))
            .collect();
        let found = candidates.iter().find(|c| self.provider.exists(c));
        if found.is_none() {
            tracing::trace!(path, roots = self.package_roots.len(), "package not found under any root");
        }
        match found.or_else(|| candidates.first()) {
            Some(uri) => UriResolution::Source(self.for_uri(uri)),
            None => {
                tracing::debug!(path, "package URI with no package roots");
                UriResolution::Unresolved
            }
        }
    }

    /// Returns `true` if `source` can be read.
    pub fn exists(&self, source: &Source) -> bool {
        match source.kind() {
            SourceKind::System => self.system.exists(source.uri()),
            SourceKind::File => self.provider.exists(source.uri()),
        }
    }

    /// Returns the modification stamp of `source`.
    pub fn last_modified(&self, source: &Source) -> Option<u64> {
        match source.kind() {
            SourceKind::System => self.system.last_modified(source.uri()),
            SourceKind::File => self.provider.last_modified(source.uri()),
        }
    }

    /// Reads the text of `source` and records it for diagnostics.
    pub fn contents(&self, source: &Source) -> io::Result<String> {
        let read = match source.kind() {
            SourceKind::System => self.system.contents(source.uri()),
            SourceKind::File => self.provider.contents(source.uri()),
        };
        let text = read.inspect_err(|err| {
            tracing::debug!(source = %source, %err, "source not readable");
        })?;
        tracing::trace!(source = %source, bytes = text.len(), "source read");
        self.db.lock().record_snapshot(source.file(), &text);
        Ok(text)
    }

    /// Locks the source database.
    pub fn source_db(&self) -> MutexGuard<'_, SourceDb> {
        self.db.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemorySourceProvider;

    fn factory() -> (Arc<MemorySourceProvider>, SourceFactory) {
        let provider = Arc::new(MemorySourceProvider::new());
        let factory = SourceFactory::new(provider.clone(), SystemLibraries::embedded())
            .with_package_roots(vec!["/pkgs".into(), "/more".into()]);
        (provider, factory)
    }

    #[test]
    fn same_uri_same_source() {
        let (_, f) = factory();
        let a = f.for_uri("/p/./a.st");
        let b = f.for_uri("/p/a.st");
        assert_eq!(a, b);
        assert_eq!(a.file(), b.file());
    }

    #[test]
    fn relative_and_system_resolution() {
        let (_, f) = factory();
        let app = f.for_uri("/p/web/app.st");
        assert_eq!(
            f.resolve_uri(Some(&app), "part.st"),
            UriResolution::Source(f.for_uri("/p/web/part.st"))
        );
        match f.resolve_uri(Some(&app), "std:io") {
            UriResolution::Source(s) => assert!(s.is_system()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.resolve_uri(Some(&app), "std:nope"), UriResolution::Unresolved);
        assert_eq!(
            f.resolve_uri(Some(&app), "native-ext:sample"),
            UriResolution::NativeExtension
        );
        assert_eq!(f.resolve_uri(Some(&app), "http://x/y.st"), UriResolution::Unresolved);
    }

    #[test]
    fn package_roots_searched_in_order() {
        let (p, f) = factory();
        p.set_content("/more/ui/button.st", "library button;");
        assert_eq!(
            f.resolve_uri(None, "package:ui/button.st"),
            UriResolution::Source(f.for_uri("/more/ui/button.st"))
        );
        assert_eq!(
            f.resolve_uri(None, "package:ui/missing.st"),
            UriResolution::Source(f.for_uri("/pkgs/ui/missing.st"))
        );
    }

    #[test]
    fn contents_records_snapshot() {
        let (p, f) = factory();
        p.set_content("/p/a.st", "library a;\nvar x;");
        let a = f.for_uri("/p/a.st");
        assert!(f.exists(&a));
        assert!(f.last_modified(&a).is_some());
        f.contents(&a).unwrap();
        let db = f.source_db();
        let at = db.locate(crate::Span::new(a.file(), 11, 14)).unwrap();
        assert_eq!((at.line, at.column), (2, 1));
    }

    #[test]
    fn unreadable_source_records_nothing() {
        let (_, f) = factory();
        let gone = f.for_uri("/p/gone.st");
        assert!(f.contents(&gone).is_err());
        assert!(f.source_db().snapshot(gone.file()).is_none());
    }

    #[test]
    fn package_uri_without_roots_is_unresolved() {
        let f = SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        );
        assert_eq!(f.resolve_uri(None, "package:ui/button.st"), UriResolution::Unresolved);
    }

    #[test]
    fn core_is_embedded() {
        let (_, f) = factory();
        let core = f.core_source();
        assert!(f.exists(&core));
        assert_eq!(f.last_modified(&core), Some(0));
        assert!(f.contents(&core).unwrap().contains("library core;"));
    }
}
