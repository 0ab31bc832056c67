//! Incremental analysis for editors and long-running tools.
//!
//! An [`AnalysisContext`] keeps one [`SourceEntry`] per known source. Each
//! cached artifact (kind, line starts, parsed tree, library element,
//! resolved trees, errors) sits in a [`CacheCell`] whose [`CacheState`]
//! says whether it is current. Lookups compute missing artifacts on demand;
//! [`AnalysisContext::apply_changes`] invalidates whatever an edit could
//! have affected, transitively through part and import edges.
//!
//! Trees are the expensive part. The [`RecentlyUsed`] ledger keeps them for
//! the [`MAX_CACHE_SIZE`] most recently accessed sources and flushes the
//! rest; a flushed tree is recomputed the next time someone asks for it.
//!
//! Background analysis pulls work one step at a time through
//! [`AnalysisContext::perform_analysis_task`].

#![warn(missing_docs)]

pub mod context;
mod engine;
pub mod entry;
pub mod errors;
mod host;
pub mod html;
pub mod ledger;
pub mod state;

pub use context::{AnalysisContext, ChangeNotice, ChangeSet, ContextSnapshot, ErrorInfo, TaskOutcome};
pub use entry::{EntryKind, HtmlEntry, PublicNamespace, ResolvedHtml, SourceEntry, UnitEntry};
pub use errors::ContextError;
pub use ledger::{RecentlyUsed, MAX_CACHE_SIZE};
pub use state::{CacheCell, CacheState};
