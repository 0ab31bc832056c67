//! Per-unit resolution results.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use strand_common::Ident;
use strand_diagnostics::Diagnostic;
use strand_source::{Source, Span};
use strand_syntax::ast::{CompilationUnit, NodeId};

use crate::element::{ElementRef, LocalId};
use crate::model::UnitModel;
use crate::types::Type;

/// A local variable or parameter.
#[derive(Clone, Debug)]
pub struct LocalInfo {
    /// The declared name.
    pub name: Ident,
    /// The declared type.
    pub ty: Type,
    /// `final` or `const`.
    pub is_final: bool,
    /// `const`.
    pub is_const: bool,
    /// A function parameter.
    pub is_param: bool,
    /// Location of the name.
    pub span: Span,
    /// The initializer expression.
    pub initializer: Option<NodeId>,
}

/// A unit whose declarations another unit's analysis read.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitDependency {
    /// The library owning the unit.
    pub library: Source,
    /// The unit's source.
    pub unit: Source,
    /// Name of the unit within its library.
    pub unit_name: String,
}

/// The resolved form of one unit, within one library.
#[derive(Clone, Debug)]
pub struct ResolvedUnit {
    /// The owning library.
    pub library: Source,
    /// The unit's source.
    pub source: Source,
    /// Name of the unit within its library.
    pub name: String,
    /// The tree the side tables refer to.
    pub unit: Arc<CompilationUnit>,
    /// What each name expression refers to.
    pub references: HashMap<NodeId, ElementRef>,
    /// Static type of each expression.
    pub types: HashMap<NodeId, Type>,
    /// Locals and parameters, indexed by [`LocalId`].
    pub locals: Vec<LocalInfo>,
    /// Problems found while resolving this unit.
    pub diagnostics: Vec<Diagnostic>,
    /// Units whose declarations this unit referred to.
    pub dependencies: BTreeSet<UnitDependency>,
    /// An unqualified identifier or type could not be resolved.
    pub has_unresolved: bool,
}

impl ResolvedUnit {
    /// Creates an empty result for `model` in `library`.
    pub fn new(library: &Source, model: &UnitModel) -> Self {
        Self {
            library: library.clone(),
            source: model.source.clone(),
            name: model.name.clone(),
            unit: Arc::clone(&model.unit),
            references: HashMap::new(),
            types: HashMap::new(),
            locals: Vec::new(),
            diagnostics: Vec::new(),
            dependencies: BTreeSet::new(),
            has_unresolved: false,
        }
    }

    /// Returns `true` if the unit was diet parsed.
    pub fn is_diet(&self) -> bool {
        self.unit.diet
    }

    /// The local an ID refers to.
    pub fn local(&self, id: LocalId) -> Option<&LocalInfo> {
        self.locals.get(id.as_raw() as usize)
    }

    /// Adds a local and returns its ID.
    pub fn add_local(&mut self, info: LocalInfo) -> LocalId {
        let id = LocalId::from_raw(self.locals.len() as u32);
        self.locals.push(info);
        id
    }

    /// Records that this unit read a declaration of `unit` in `library`.
    pub fn add_dependency(&mut self, library: &Source, unit: &Source, unit_name: &str) {
        if *unit == self.source {
            return;
        }
        self.dependencies.insert(UnitDependency {
            library: library.clone(),
            unit: unit.clone(),
            unit_name: unit_name.to_string(),
        });
    }

    /// The element an expression refers to.
    pub fn reference(&self, node: NodeId) -> Option<&ElementRef> {
        self.references.get(&node)
    }

    /// The static type of an expression; dynamic if unknown.
    pub fn type_of(&self, node: NodeId) -> Type {
        self.types.get(&node).cloned().unwrap_or(Type::Dynamic)
    }
}
