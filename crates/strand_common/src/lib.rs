//! Small types every Strand crate shares: interned names, artifact
//! checksums and the engine's internal error.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::InternalError;
