//! Element model produced by library resolution.
//!
//! A [`LibraryElement`] is the resolved namespace of one library: its own
//! declarations, the import/export directives bound to target libraries, the
//! prefixes those imports introduce, and the public namespace it exports.
//! Elements refer to each other by value ([`ElementRef`], [`ClassRef`]) so
//! that libraries resolved in different rounds never hold pointers into each
//! other.

use std::collections::{HashMap, HashSet};

use strand_common::Ident;
use strand_source::{Source, Span};

use crate::const_eval::ConstValue;
use crate::types::Type;

/// Identifies a class by its library and name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassRef {
    /// The declaring library.
    pub library: Source,
    /// The class name.
    pub name: Ident,
}

/// Index of a local variable or parameter within its unit's local table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    /// Creates a local ID from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// What a resolved name refers to.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ElementRef {
    /// A top-level declaration of some library.
    TopLevel {
        /// The declaring library.
        library: Source,
        /// The declared name.
        name: Ident,
    },
    /// A field, method or accessor of a class.
    Member {
        /// The declaring class.
        class: ClassRef,
        /// The member name.
        name: Ident,
    },
    /// An import prefix of a library.
    Prefix {
        /// The importing library.
        library: Source,
        /// The prefix name.
        name: Ident,
    },
    /// A local variable or parameter of the current unit.
    Local(LocalId),
}

/// The kind of a top-level declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TopLevelKind {
    /// A class.
    Class,
    /// An ordinary function.
    Function,
    /// A getter.
    Getter,
    /// A setter.
    Setter,
    /// A variable.
    Variable,
}

/// A top-level declaration.
#[derive(Clone, Debug)]
pub struct TopLevelElement {
    /// The declared name.
    pub name: Ident,
    /// The declaring library.
    pub library: Source,
    /// The declaring unit.
    pub unit: Source,
    /// Name of the declaring unit within its library.
    pub unit_name: String,
    /// What was declared.
    pub kind: TopLevelKind,
    /// Location of the name.
    pub span: Span,
    /// `final` or `const`.
    pub is_final: bool,
    /// `const`.
    pub is_const: bool,
    /// Declared type for variables and getters, return type for functions.
    pub ty: Type,
    /// A setter with the same name was declared next to this getter.
    pub has_setter: bool,
}

impl TopLevelElement {
    /// The static type of a reference to this element.
    pub fn reference_type(&self) -> Type {
        match self.kind {
            TopLevelKind::Function => Type::Function(Box::new(self.ty.clone())),
            TopLevelKind::Class => Type::Dynamic,
            _ => self.ty.clone(),
        }
    }
}

/// The kind of a class member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MemberKind {
    /// A field.
    Field,
    /// A method.
    Method,
    /// A getter.
    Getter,
    /// A setter.
    Setter,
}

/// A class member.
#[derive(Clone, Debug)]
pub struct MemberElement {
    /// The member name.
    pub name: Ident,
    /// What was declared.
    pub kind: MemberKind,
    /// `static`.
    pub is_static: bool,
    /// `final` or `const` field.
    pub is_final: bool,
    /// `const` field.
    pub is_const: bool,
    /// Field or getter type, or method return type.
    pub ty: Type,
    /// Location of the name.
    pub span: Span,
}

impl MemberElement {
    /// The static type of a reference to this member.
    pub fn reference_type(&self) -> Type {
        match self.kind {
            MemberKind::Method => Type::Function(Box::new(self.ty.clone())),
            _ => self.ty.clone(),
        }
    }
}

/// A class with its members and resolved supertypes.
#[derive(Clone, Debug)]
pub struct ClassElement {
    /// The class name.
    pub name: Ident,
    /// The declaring library.
    pub library: Source,
    /// The declaring unit.
    pub unit: Source,
    /// Name of the declaring unit within its library.
    pub unit_name: String,
    /// Location of the name.
    pub span: Span,
    /// The superclass; `None` for the root class or an unresolved supertype.
    pub supertype: Option<ClassRef>,
    /// Implemented interfaces.
    pub interfaces: Vec<ClassRef>,
    /// Members by name. A getter/setter pair shares one entry.
    pub members: HashMap<Ident, MemberElement>,
    /// Values of constant fields.
    pub constants: HashMap<Ident, ConstValue>,
}

impl ClassElement {
    /// A reference to this class.
    pub fn class_ref(&self) -> ClassRef {
        ClassRef {
            library: self.library.clone(),
            name: self.name,
        }
    }
}

/// A `show` or `hide` filter bound to its name set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameFilter {
    /// Only these names pass.
    Show(HashSet<Ident>),
    /// These names are blocked.
    Hide(HashSet<Ident>),
}

impl NameFilter {
    /// Returns `true` if `name` passes this filter.
    pub fn allows(&self, name: Ident) -> bool {
        match self {
            NameFilter::Show(names) => names.contains(&name),
            NameFilter::Hide(names) => !names.contains(&name),
        }
    }
}

/// Returns `true` if `name` passes every filter in order.
pub fn filters_allow(filters: &[NameFilter], name: Ident) -> bool {
    filters.iter().all(|f| f.allows(name))
}

/// An import directive bound to its target library.
#[derive(Clone, Debug)]
pub struct ImportElement {
    /// The imported library.
    pub target: Source,
    /// The import prefix.
    pub prefix: Option<Ident>,
    /// Name filters.
    pub filters: Vec<NameFilter>,
    /// Location of the directive; dummy for the implicit core import.
    pub span: Span,
    /// `true` for the implicit core import.
    pub synthetic: bool,
}

/// An export directive bound to its target library.
#[derive(Clone, Debug)]
pub struct ExportElement {
    /// The exported library.
    pub target: Source,
    /// Name filters.
    pub filters: Vec<NameFilter>,
    /// Location of the directive.
    pub span: Span,
}

/// An import prefix, shared by every import that uses the same name.
#[derive(Clone, Debug)]
pub struct PrefixElement {
    /// The prefix name.
    pub name: Ident,
    /// Indices into [`LibraryElement::imports`].
    pub imports: Vec<usize>,
}

/// The resolved namespace of one library.
#[derive(Clone, Debug)]
pub struct LibraryElement {
    /// The defining source.
    pub source: Source,
    /// The declared library name.
    pub name: Option<String>,
    /// Own top-level declarations, including private ones.
    pub members: HashMap<Ident, TopLevelElement>,
    /// Own classes.
    pub classes: HashMap<Ident, ClassElement>,
    /// Bound imports, the implicit core import last.
    pub imports: Vec<ImportElement>,
    /// Bound exports.
    pub exports: Vec<ExportElement>,
    /// Import prefixes by name.
    pub prefixes: HashMap<Ident, PrefixElement>,
    /// Public names visible to importers: own public members plus exports.
    pub namespace: HashMap<Ident, ElementRef>,
    /// Values of top-level constants.
    pub constants: HashMap<Ident, ConstValue>,
    /// The `main` function, if this library is launchable.
    pub entry_point: Option<Ident>,
    /// `true` if a directive imports the core library explicitly.
    pub explicitly_imports_core: bool,
}

impl LibraryElement {
    /// Creates an element with no declarations.
    pub fn new(source: Source, name: Option<String>) -> Self {
        Self {
            source,
            name,
            members: HashMap::new(),
            classes: HashMap::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            prefixes: HashMap::new(),
            namespace: HashMap::new(),
            constants: HashMap::new(),
            entry_point: None,
            explicitly_imports_core: false,
        }
    }

    /// Returns `true` if the library declares a `main` entry point.
    pub fn is_launchable(&self) -> bool {
        self.entry_point.is_some()
    }

    /// Libraries this library imports or exports, without duplicates.
    pub fn referenced_libraries(&self) -> Vec<Source> {
        let mut seen = HashSet::new();
        self.imports
            .iter()
            .map(|i| &i.target)
            .chain(self.exports.iter().map(|e| &e.target))
            .filter(|s| seen.insert((*s).clone()))
            .cloned()
            .collect()
    }
}

/// Returns `true` for names private to their library.
pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}
