//! The Strand compile pipeline.
//!
//! [`Compiler::compile`] loads the library graph of an application, parses
//! each unit fully or diet depending on what changed since the last compile,
//! resolves every library, checks library directives and persists the
//! dependency records and timestamps that make the next compile cheaper.
//! Progress and problems go to a [`CompilerListener`].

#![warn(missing_docs)]

mod driver;
pub mod errors;
pub mod graph;
mod listener;
mod persist;
mod result;
mod scheduler;
mod session;
mod validate;

pub use driver::{Compiler, SelectiveCache};
pub use graph::{LibraryGraph, LibraryId};
pub use listener::{CompiledUnit, CompilerListener, ListenerEvent, RecordingListener};
pub use result::{CompileError, CompileResult, CompileStatus, CRASH_EXIT_CODE};
pub use validate::validate_library_directives;
