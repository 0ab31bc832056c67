//! Problems found in sources, and how they are reported.
//!
//! A [`Diagnostic`] has a [`Severity`], a category-prefixed [`DiagnosticCode`]
//! and a primary span, optionally with [`Related`] places and trailing
//! notes. [`DiagnosticSink`] collects them across threads during a compile;
//! [`TerminalRenderer`] prints them against a [`SourceDb`](strand_source::SourceDb).

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Related};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::{DiagnosticSink, Tally};
