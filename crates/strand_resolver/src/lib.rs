//! Library resolution for Strand.
//!
//! Given parsed units grouped into libraries, the resolver builds an element
//! model for each library, binds imports and exports, resolves every name
//! and type annotation, narrows types under `is` checks, evaluates constants
//! and records which units each unit depends on.
//!
//! Libraries that import each other form a cycle and are resolved together;
//! cycles are processed dependencies first. The caller owns loading and
//! parsing and supplies both through [`ResolverHost`].

#![warn(missing_docs)]

mod builder;
pub mod const_eval;
pub mod cycle;
pub mod element;
pub mod errors;
mod hierarchy;
pub mod index;
pub mod model;
mod resolve;
pub mod resolver;
pub mod scope;
pub mod symbols;
pub mod types;
pub mod unit;
mod verify;

pub use const_eval::ConstValue;
pub use cycle::DependencyGraph;
pub use element::{ClassElement, ClassRef, ElementRef, LibraryElement, LocalId, TopLevelKind};
pub use model::{
    CancellationToken, ExportModel, ImportModel, LibraryModel, ResolverHost, UnitModel,
};
pub use resolver::{LibraryResolver, ResolutionStage, ResolveError, ResolveOutput, ResolvedLibrary};
pub use symbols::{collect_symbols, UnitSymbols};
pub use types::{Type, TypeProvider};
pub use unit::{LocalInfo, ResolvedUnit, UnitDependency};
