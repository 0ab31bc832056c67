//! Interned names.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A name from source text, stored once in an [`Interner`].
///
/// Two `Ident`s from the same interner are equal exactly when their text is.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(u32);

impl Ident {
    /// Rebuilds an identifier from [`as_raw`](Self::as_raw). Only meaningful
    /// against the interner that produced the number.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Position of the name in its interner.
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `into_usize` and `try_from_usize` are inverse for every value that
// fits in a `u32`, and `try_from_usize` refuses the rest.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Self)
    }
}

/// The name table shared by every parse and resolution of one analysis
/// context. Lock-free for readers; interning from several threads at once is
/// safe.
pub struct Interner {
    names: ThreadedRodeo<Ident>,
}

impl Interner {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            names: ThreadedRodeo::new(),
        }
    }

    /// The identifier of `name`, adding it if it is new.
    pub fn get_or_intern(&self, name: &str) -> Ident {
        self.names.get_or_intern(name)
    }

    /// The identifier of `name` if some source already used it.
    pub fn get(&self, name: &str) -> Option<Ident> {
        self.names.get(name)
    }

    /// The text of `ident`.
    ///
    /// # Panics
    ///
    /// If `ident` came from another interner and is out of range for this one.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.names.resolve(&ident)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no name was interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner").field("names", &self.len()).finish()
    }
}
