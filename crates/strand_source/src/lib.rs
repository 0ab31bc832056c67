//! Source identity, source loading, and span tracking.
//!
//! [`Source`] is the identity of one unit of text, compared by URI. All text
//! and timestamp access flows through a [`SourceFactory`], which dispatches
//! ordinary URIs to a [`SourceProvider`] and `std:` URIs to the bundled
//! [`SystemLibraries`]. [`FileId`] and [`Span`] locate syntax within a source,
//! and [`SourceDb`] turns spans into printable [`Location`]s.

#![warn(missing_docs)]

pub mod factory;
pub mod file_id;
pub mod line_info;
pub mod location;
pub mod provider;

pub mod source;
pub mod source_db;
pub mod span;
pub mod system;
pub mod uri;

pub use factory::{SourceFactory, UriResolution};
pub use file_id::FileId;
pub use line_info::LineInfo;
pub use provider::{FileSourceProvider, MemorySourceProvider, SourceProvider};
pub use location::Location;
pub use source::{Source, SourceKind};
pub use source_db::{SourceDb, SourceSnapshot};
pub use span::Span;
pub use system::{Capability, SystemLibraries, SystemLibrary};
