//! Read-only queries over a set of library elements.
//!
//! [`ElementIndex`] answers the questions every resolution pass asks: what a
//! name means in a library's scope, which member a class (or one of its
//! supertypes) declares, and whether one type is assignable to another.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use strand_common::{Ident, Interner};
use strand_source::Source;

use crate::element::{
    filters_allow, ClassElement, ClassRef, ElementRef, ImportElement, LibraryElement,
    MemberElement, TopLevelElement,
};
use crate::types::{Type, TypeProvider};

/// The outcome of a scope lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Exactly one element.
    Found(ElementRef),
    /// Several imports provide different elements; the declaring libraries.
    Ambiguous(Vec<Source>),
    /// Nothing by that name.
    NotFound,
}

/// Lookup tables over resolved and in-progress libraries.
pub struct ElementIndex<'a> {
    libraries: &'a HashMap<Source, Arc<LibraryElement>>,
    /// The interner shared with the parser.
    pub interner: &'a Interner,
    /// The core type provider.
    pub types: &'a TypeProvider,
}

impl<'a> ElementIndex<'a> {
    /// Creates an index over `libraries`.
    pub fn new(
        libraries: &'a HashMap<Source, Arc<LibraryElement>>,
        interner: &'a Interner,
        types: &'a TypeProvider,
    ) -> Self {
        Self {
            libraries,
            interner,
            types,
        }
    }

    /// The element of a library.
    pub fn library(&self, source: &Source) -> Option<&'a LibraryElement> {
        self.libraries.get(source).map(|l| l.as_ref())
    }

    /// The element of a class.
    pub fn class(&self, class: &ClassRef) -> Option<&'a ClassElement> {
        self.library(&class.library)?.classes.get(&class.name)
    }

    /// The top-level element an [`ElementRef::TopLevel`] names.
    pub fn top_level(&self, element: &ElementRef) -> Option<&'a TopLevelElement> {
        match element {
            ElementRef::TopLevel { library, name } => self.library(library)?.members.get(name),
            _ => None,
        }
    }

    /// The class an element names, if it is one.
    pub fn as_class(&self, element: &ElementRef) -> Option<&'a ClassElement> {
        match element {
            ElementRef::TopLevel { library, name } => self.library(library)?.classes.get(name),
            _ => None,
        }
    }

    /// Resolves an unqualified name in the top-level scope of `library`.
    ///
    /// Own declarations shadow prefixes, which shadow imported names. A name
    /// provided by several imports is only an error when it is looked up.
    pub fn lookup(&self, library: &LibraryElement, name: Ident) -> Lookup {
        if library.members.contains_key(&name) {
            return Lookup::Found(ElementRef::TopLevel {
                library: library.source.clone(),
                name,
            });
        }
        if library.prefixes.contains_key(&name) {
            return Lookup::Found(ElementRef::Prefix {
                library: library.source.clone(),
                name,
            });
        }
        self.lookup_in_imports(library.imports.iter().filter(|i| i.prefix.is_none()), name)
    }

    /// Resolves `prefix.name` in `library`.
    pub fn lookup_prefixed(&self, library: &LibraryElement, prefix: Ident, name: Ident) -> Lookup {
        self.lookup_in_imports(
            library.imports.iter().filter(|i| i.prefix == Some(prefix)),
            name,
        )
    }

    /// Returns the library declaring a private `name` that an import with
    /// `prefix` would have exposed were it public.
    pub fn private_provider(
        &self,
        library: &LibraryElement,
        prefix: Option<Ident>,
        name: Ident,
    ) -> Option<&'a LibraryElement> {
        library
            .imports
            .iter()
            .filter(|i| i.prefix == prefix)
            .filter_map(|i| self.library(&i.target))
            .find(|target| target.members.contains_key(&name))
    }

    fn lookup_in_imports<'i>(
        &self,
        imports: impl Iterator<Item = &'i ImportElement>,
        name: Ident,
    ) -> Lookup {
        let mut found: Vec<ElementRef> = Vec::new();
        for import in imports {
            let Some(target) = self.library(&import.target) else {
                continue;
            };
            if !filters_allow(&import.filters, name) {
                continue;
            }
            if let Some(element) = target.namespace.get(&name) {
                if !found.contains(element) {
                    found.push(element.clone());
                }
            }
        }
        match found.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(found.remove(0)),
            _ => Lookup::Ambiguous(
                found
                    .iter()
                    .filter_map(|e| match e {
                        ElementRef::TopLevel { library, .. } => Some(library.clone()),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }

    /// Finds a member declared by `class` or inherited from its supertypes.
    ///
    /// Superclasses are searched before interfaces, breadth first. Cyclic
    /// hierarchies terminate.
    pub fn lookup_member(
        &self,
        class: &ClassRef,
        name: Ident,
    ) -> Option<(ClassRef, &'a MemberElement)> {
        let mut queue = VecDeque::from([class.clone()]);
        let mut visited = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(element) = self.class(&current) else {
                continue;
            };
            if let Some(member) = element.members.get(&name) {
                return Some((current, member));
            }
            queue.extend(element.supertype.iter().cloned());
            queue.extend(element.interfaces.iter().cloned());
        }
        None
    }

    /// Returns `true` if `sub` is `sup` or inherits from it.
    pub fn is_subclass(&self, sub: &ClassRef, sup: &ClassRef) -> bool {
        if Some(sup) == self.types.object_class() {
            return true;
        }
        let mut stack = vec![sub.clone()];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == *sup {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(element) = self.class(&current) {
                stack.extend(element.supertype.iter().cloned());
                stack.extend(element.interfaces.iter().cloned());
            }
        }
        false
    }

    /// Returns `true` if a value of type `from` may be stored where `to` is
    /// expected.
    ///
    /// Interface types are assignable when either is a subtype of the other;
    /// `null` is assignable to every interface type.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Dynamic, _) | (_, Type::Dynamic) => true,
            (Type::Void, Type::Void) => true,
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Interface(c), _) if Some(c) == self.types.null_class() => true,
            (Type::Function(_), Type::Function(_)) => true,
            (Type::Function(_), Type::Interface(c)) | (Type::Interface(c), Type::Function(_)) => {
                Some(c) == self.types.function_class() || Some(c) == self.types.object_class()
            }
            (Type::Interface(a), Type::Interface(b)) => {
                self.is_subclass(a, b) || self.is_subclass(b, a)
            }
        }
    }

    /// Renders a type for diagnostics.
    pub fn display(&self, ty: &Type) -> String {
        ty.display(self.interner)
    }
}
