//! Type names, supertypes and declared types.
//!
//! Runs once every library of the cycle has bound its directives. Supertype
//! clauses are reported here; declared types of fields, variables and
//! functions are resolved silently and reported again by the reference
//! walker, which visits every annotation exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strand_common::{Ident, Interner};
use strand_source::{Source, Span};
use strand_syntax::ast::{Declaration, FunctionDecl, Member, ReturnType, TypeRef};

use crate::element::{is_private, ClassRef, LibraryElement};
use crate::errors;
use crate::index::{ElementIndex, Lookup};
use crate::types::{Type, TypeProvider};
use crate::unit::ResolvedUnit;

/// Resolves a type annotation in the scope of `library`.
///
/// With `unit` present, problems are reported to it and the declaring unit
/// of the named class is recorded as a dependency.
pub(crate) fn resolve_type_ref(
    index: &ElementIndex<'_>,
    library: &LibraryElement,
    ty: &TypeRef,
    mut unit: Option<&mut ResolvedUnit>,
) -> Type {
    let interner = index.interner;
    let name = interner.resolve(ty.name.ident);
    let lookup = match ty.prefix {
        Some(prefix) if library.prefixes.contains_key(&prefix.ident) => {
            index.lookup_prefixed(library, prefix.ident, ty.name.ident)
        }
        Some(_) => Lookup::NotFound,
        None if name == "dynamic" => return Type::Dynamic,
        None => index.lookup(library, ty.name.ident),
    };
    let display = match ty.prefix {
        Some(prefix) => format!("{}.{name}", interner.resolve(prefix.ident)),
        None => name.to_string(),
    };
    match lookup {
        Lookup::Found(element) => match index.as_class(&element) {
            Some(class) => {
                if let Some(unit) = unit {
                    unit.add_dependency(&class.library, &class.unit, &class.unit_name);
                }
                Type::Interface(class.class_ref())
            }
            None => {
                if let Some(unit) = unit {
                    unit.diagnostics.push(errors::error_not_a_class(&display, ty.span));
                }
                Type::Dynamic
            }
        },
        Lookup::Ambiguous(libraries) => {
            if let Some(unit) = unit {
                let uris: Vec<String> = libraries.iter().map(|l| l.uri().to_string()).collect();
                unit.diagnostics
                    .push(errors::error_ambiguous_import(&display, &uris, ty.name.span));
            }
            Type::Dynamic
        }
        Lookup::NotFound => {
            if let Some(unit) = unit.as_deref_mut() {
                let private_owner = is_private(name)
                    .then(|| index.private_provider(library, ty.prefix.map(|p| p.ident), ty.name.ident))
                    .flatten();
                match private_owner {
                    Some(owner) => unit.diagnostics.push(errors::error_private_access(
                        &display,
                        owner.source.uri(),
                        ty.span,
                    )),
                    None => {
                        unit.diagnostics
                            .push(errors::warning_cannot_resolve(&display, ty.span));
                        if ty.prefix.is_none() {
                            unit.has_unresolved = true;
                        }
                    }
                }
            }
            Type::Dynamic
        }
    }
}

/// The declared result type of a function.
pub(crate) fn return_type(
    index: &ElementIndex<'_>,
    library: &LibraryElement,
    func: &FunctionDecl,
    unit: Option<&mut ResolvedUnit>,
) -> Type {
    match &func.return_type {
        Some(ReturnType::Void(_)) => Type::Void,
        Some(ReturnType::Type(ty)) => resolve_type_ref(index, library, ty, unit),
        None => Type::Dynamic,
    }
}

struct Supertypes {
    class: ClassRef,
    supertype: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
}

enum TypeUpdate {
    TopLevel(Source, Ident, Type),
    Member(ClassRef, Ident, Type),
}

/// Resolves supertypes and declared types of every class and top-level
/// declaration in the cycle.
///
/// `units` holds the resolved units of each cycle library, in the order of
/// `cycle`.
pub(crate) fn build_hierarchy(
    libraries: &mut HashMap<Source, Arc<LibraryElement>>,
    cycle: &[Source],
    units: &mut [Vec<ResolvedUnit>],
    types: &TypeProvider,
    interner: &Interner,
) {
    let supertypes = resolve_supertypes(libraries, cycle, units, types, interner);
    for update in supertypes {
        if let Some(element) = libraries.get_mut(&update.class.library) {
            if let Some(class) = Arc::make_mut(element).classes.get_mut(&update.class.name) {
                class.supertype = update.supertype;
                class.interfaces = update.interfaces;
            }
        }
    }

    let cyclic = find_cyclic_classes(libraries, cycle, types, interner);
    for class in cyclic {
        let Some(element) = libraries.get_mut(&class.library) else {
            continue;
        };
        let Some(decl) = Arc::make_mut(element).classes.get_mut(&class.name) else {
            continue;
        };
        if let Some(unit) = units
            .iter_mut()
            .flatten()
            .find(|u| u.source == decl.unit && u.library == class.library)
        {
            unit.diagnostics.push(errors::error_cyclic_hierarchy(
                interner.resolve(class.name),
                decl.span,
            ));
        }
        decl.supertype = types.object_class().filter(|o| **o != class).cloned();
        decl.interfaces.clear();
    }

    let updates = declared_types(libraries, cycle, units, types, interner);
    for update in updates {
        match update {
            TypeUpdate::TopLevel(library, name, ty) => {
                if let Some(element) = libraries.get_mut(&library) {
                    if let Some(top) = Arc::make_mut(element).members.get_mut(&name) {
                        top.ty = ty;
                    }
                }
            }
            TypeUpdate::Member(class, name, ty) => {
                if let Some(element) = libraries.get_mut(&class.library) {
                    if let Some(member) = Arc::make_mut(element)
                        .classes
                        .get_mut(&class.name)
                        .and_then(|c| c.members.get_mut(&name))
                    {
                        member.ty = ty;
                    }
                }
            }
        }
    }
}

fn resolve_supertypes(
    libraries: &HashMap<Source, Arc<LibraryElement>>,
    cycle: &[Source],
    units: &mut [Vec<ResolvedUnit>],
    types: &TypeProvider,
    interner: &Interner,
) -> Vec<Supertypes> {
    let index = ElementIndex::new(libraries, interner, types);
    let mut result = Vec::new();
    for (source, lib_units) in cycle.iter().zip(units.iter_mut()) {
        let Some(library) = index.library(source) else {
            continue;
        };
        for unit in lib_units.iter_mut() {
            let tree = Arc::clone(&unit.unit);
            for decl in &tree.declarations {
                let Declaration::Class(class) = decl else {
                    continue;
                };
                let is_declaring = library
                    .classes
                    .get(&class.name.ident)
                    .is_some_and(|c| c.span == class.name.span);
                let this = ClassRef {
                    library: source.clone(),
                    name: class.name.ident,
                };
                let supertype = match &class.extends {
                    Some(ty) => resolve_type_ref(&index, library, ty, Some(&mut *unit))
                        .class()
                        .cloned(),
                    None => None,
                }
                .or_else(|| types.object_class().cloned())
                .filter(|s| *s != this);
                let interfaces = class
                    .implements
                    .iter()
                    .filter_map(|ty| {
                        resolve_type_ref(&index, library, ty, Some(&mut *unit))
                            .class()
                            .cloned()
                    })
                    .collect();
                if is_declaring {
                    result.push(Supertypes {
                        class: this,
                        supertype,
                        interfaces,
                    });
                }
            }
        }
    }
    result
}

/// Classes of the cycle that reach themselves through their supertypes.
fn find_cyclic_classes(
    libraries: &HashMap<Source, Arc<LibraryElement>>,
    cycle: &[Source],
    types: &TypeProvider,
    interner: &Interner,
) -> Vec<ClassRef> {
    let index = ElementIndex::new(libraries, interner, types);
    let mut cyclic = Vec::new();
    for source in cycle {
        let Some(library) = index.library(source) else {
            continue;
        };
        let mut classes: Vec<_> = library.classes.values().collect();
        classes.sort_by_key(|c| c.span.start);
        for class in classes {
            let start = class.class_ref();
            let mut stack: Vec<ClassRef> = class
                .supertype
                .iter()
                .chain(&class.interfaces)
                .cloned()
                .collect();
            let mut visited = HashSet::new();
            while let Some(current) = stack.pop() {
                if current == start {
                    cyclic.push(start.clone());
                    break;
                }
                if !visited.insert(current.clone()) {
                    continue;
                }
                if let Some(element) = index.class(&current) {
                    stack.extend(element.supertype.iter().cloned());
                    stack.extend(element.interfaces.iter().cloned());
                }
            }
        }
    }
    cyclic
}

fn declared_types(
    libraries: &HashMap<Source, Arc<LibraryElement>>,
    cycle: &[Source],
    units: &[Vec<ResolvedUnit>],
    types: &TypeProvider,
    interner: &Interner,
) -> Vec<TypeUpdate> {
    let index = ElementIndex::new(libraries, interner, types);
    let mut updates = Vec::new();
    for (source, lib_units) in cycle.iter().zip(units) {
        let Some(library) = index.library(source) else {
            continue;
        };
        let declares = |name: Ident, span: Span| {
            library
                .members
                .get(&name)
                .is_some_and(|m| m.span == span)
        };
        for unit in lib_units {
            for decl in &unit.unit.declarations {
                match decl {
                    Declaration::Function(func) if declares(func.name.ident, func.name.span) => {
                        updates.push(TypeUpdate::TopLevel(
                            source.clone(),
                            func.name.ident,
                            return_type(&index, library, func, None),
                        ));
                    }
                    Declaration::Variables(vars) => {
                        let ty = vars
                            .ty
                            .as_ref()
                            .map_or(Type::Dynamic, |t| resolve_type_ref(&index, library, t, None));
                        for var in &vars.variables {
                            if declares(var.name.ident, var.name.span) {
                                updates.push(TypeUpdate::TopLevel(
                                    source.clone(),
                                    var.name.ident,
                                    ty.clone(),
                                ));
                            }
                        }
                    }
                    Declaration::Class(class) => {
                        let Some(element) = library
                            .classes
                            .get(&class.name.ident)
                            .filter(|c| c.span == class.name.span)
                        else {
                            continue;
                        };
                        let owner = element.class_ref();
                        for member in &class.members {
                            match member {
                                Member::Field(vars) => {
                                    let ty = vars.ty.as_ref().map_or(Type::Dynamic, |t| {
                                        resolve_type_ref(&index, library, t, None)
                                    });
                                    for var in &vars.variables {
                                        if element.members.get(&var.name.ident).is_some_and(|m| m.span == var.name.span) {
                                            updates.push(TypeUpdate::Member(owner.clone(), var.name.ident, ty.clone()));
                                        }
                                    }
                                }
                                Member::Method(func) => {
                                    if element.members.get(&func.name.ident).is_some_and(|m| m.span == func.name.span) {
                                        updates.push(TypeUpdate::Member(
                                            owner.clone(),
                                            func.name.ident,
                                            return_type(&index, library, func, None),
                                        ));
                                    }
                                }
                            }
                        }
                    }
                    Declaration::Function(_) => {}
                }
            }
        }
    }
    updates
}
