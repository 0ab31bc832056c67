//! The table of bundled system libraries.
//!
//! System libraries are addressed as `std:<name>` (the defining unit) or
//! `std:<name>/<path>` (one of its parts). When an SDK directory is
//! configured they are read from `<sdk>/<name>/<name>.st` and
//! `<sdk>/<name>/<path>`; otherwise the defining units fall back to the
//! texts embedded in this crate.

use crate::uri::{self, SYSTEM_SCHEME};
use std::io;
use std::path::PathBuf;

/// The environment a system library requires. Libraries with different
/// non-shared capabilities cannot be imported together.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Capability {
    /// Usable everywhere.
    Shared,
    /// Requires a console process.
    Console,
    /// Requires a browser document.
    Browser,
}

/// One bundled library.
#[derive(Clone, Debug)]
pub struct SystemLibrary {
    /// Short name, as in `std:<name>`.
    pub name: &'static str,
    /// Environment the library requires.
    pub capability: Capability,
    /// Experimental libraries draw a warning on every import.
    pub experimental: bool,
    text: &'static str,
}

impl SystemLibrary {
    /// The `std:` URI of this library's defining unit.
    pub fn uri(&self) -> String {
        format!("{SYSTEM_SCHEME}:{}", self.name)
    }
}

const CORE_TEXT: &str = r#"library core;

class Object {
  String toString() => "";
}
class Null {}
class bool {}
class num {
  num abs() => this;
}
class int extends num {}
class double extends num {}
class String {
  int get length => 0;
}
class List {
  int get length => 0;
  void add(Object value) {}
}
class Function {}
class Type {}

void print(Object value) {}
"#;

const IO_TEXT: &str = r#"library io;

class Stdout {
  void write(Object value) {}
}

Stdout get stdout => null;
"#;

const HTML_TEXT: &str = r#"library html;

class Element {
  String get text => "";
}
class Document {
  Element query(String selector) => null;
}

Document get document => null;
"#;

const MIRRORS_TEXT: &str = r#"library mirrors;

class Mirror {}

Mirror reflect(Object value) => null;
"#;

/// The set of libraries reachable through the `std:` scheme.
#[derive(Clone, Debug)]
pub struct SystemLibraries {
    sdk: Option<PathBuf>,
    libraries: Vec<SystemLibrary>,
}

impl SystemLibraries {
    /// The bundled libraries, served from embedded text.
    pub fn embedded() -> Self {
        Self {
            sdk: None,
            libraries: vec![
                SystemLibrary {
                    name: "core",
                    capability: Capability::Shared,
                    experimental: false,
                    text: CORE_TEXT,
                },
                SystemLibrary {
                    name: "io",
                    capability: Capability::Console,
                    experimental: false,
                    text: IO_TEXT,
                },
                SystemLibrary {
                    name: "html",
                    capability: Capability::Browser,
                    experimental: false,
                    text: HTML_TEXT,
                },
                SystemLibrary {
                    name: "mirrors",
                    capability: Capability::Shared,
                    experimental: true,
                    text: MIRRORS_TEXT,
                },
            ],
        }
    }

    /// The bundled libraries, read from an SDK directory.
    pub fn with_sdk(sdk: impl Into<PathBuf>) -> Self {
        Self {
            sdk: Some(sdk.into()),
            ..Self::embedded()
        }
    }

    /// Looks up a library by short name.
    pub fn lookup(&self, name: &str) -> Option<&SystemLibrary> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// Returns the library a `std:` URI belongs to.
    pub fn library_for_uri(&self, uri: &str) -> Option<&SystemLibrary> {
        let (name, _) = split(uri)?;
        self.lookup(name)
    }

    /// Returns `true` if `uri` names a readable system source.
    pub fn exists(&self, uri: &str) -> bool {
        match self.location(uri) {
            Some(Location::Embedded(_)) => true,
            Some(Location::Disk(path)) => path.is_file(),
            None => false,
        }
    }

    /// Reads the text of a system source.
    pub fn contents(&self, uri: &str) -> io::Result<String> {
        match self.location(uri) {
            Some(Location::Embedded(text)) => Ok(text.to_string()),
            Some(Location::Disk(path)) => std::fs::read_to_string(path),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown system library {uri}"),
            )),
        }
    }

    /// System sources never change during a session.
    pub fn last_modified(&self, uri: &str) -> Option<u64> {
        self.exists(uri).then_some(0)
    }

    fn location(&self, uri: &str) -> Option<Location> {
        let (name, part) = split(uri)?;
        let library = self.lookup(name)?;
        match (&self.sdk, part) {
            (Some(sdk), None) => Some(Location::Disk(sdk.join(name).join(format!("{name}.st")))),
            (Some(sdk), Some(part)) => Some(Location::Disk(sdk.join(name).join(part))),
            (None, None) => Some(Location::Embedded(library.text)),
            (None, Some(_)) => None,
        }
    }
}

enum Location {
    Embedded(&'static str),
    Disk(PathBuf),
}

fn split(uri: &str) -> Option<(&str, Option<&str>)> {
    if uri::scheme(uri) != Some(SYSTEM_SCHEME) {
        return None;
    }
    let path = uri::path_of(uri);
    match path.split_once('/') {
        Some((name, part)) => Some((name, Some(part))),
        None => Some((path, None)),
    }
}
