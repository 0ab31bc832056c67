//! Builds library elements from declarations alone.
//!
//! No other library is consulted here: imports are bound later, once every
//! library of the cycle has an element.

use std::collections::HashMap;

use strand_common::{Ident, Interner};
use strand_source::{Source, Span};
use strand_syntax::ast::{
    ClassDecl, Declaration, FunctionDecl, FunctionKind, Member, VarKeyword, VariableDecl,
};

use crate::element::{
    ClassElement, LibraryElement, MemberElement, MemberKind, TopLevelElement, TopLevelKind,
};
use crate::errors;
use crate::model::LibraryModel;
use crate::types::Type;
use crate::unit::ResolvedUnit;

/// Where a top-level name was declared.
struct Declared {
    unit: usize,
    span: Span,
}

/// Builds the element of `model`, reporting duplicate declarations and
/// entry point problems into `units` (parallel to `model.units`).
pub(crate) fn build_library_element(
    model: &LibraryModel,
    interner: &Interner,
    units: &mut [ResolvedUnit],
) -> LibraryElement {
    let mut element = LibraryElement::new(model.source.clone(), model.name.clone());
    // Setters are tracked apart so a getter/setter pair is not a duplicate.
    let mut declared: HashMap<(Ident, bool), Vec<Declared>> = HashMap::new();

    for (index, unit_model) in model.units.iter().enumerate() {
        let unit = &unit_model.unit;
        for decl in &unit.declarations {
            match decl {
                Declaration::Class(class) => {
                    let top = top_level(
                        &model.source,
                        &unit_model.source,
                        &unit_model.name,
                        class.name.ident,
                        class.name.span,
                        TopLevelKind::Class,
                    );
                    declared
                        .entry((class.name.ident, false))
                        .or_default()
                        .push(Declared { unit: index, span: class.name.span });
                    if !element.members.contains_key(&class.name.ident) {
                        element.members.insert(class.name.ident, top);
                        element.classes.insert(
                            class.name.ident,
                            class_element(&model.source, &unit_model.source, &unit_model.name, class),
                        );
                    }
                }
                Declaration::Function(func) => {
                    let is_setter = func.kind == FunctionKind::Setter;
                    declared
                        .entry((func.name.ident, is_setter))
                        .or_default()
                        .push(Declared { unit: index, span: func.name.span });
                    let kind = match func.kind {
                        FunctionKind::Normal => TopLevelKind::Function,
                        FunctionKind::Getter => TopLevelKind::Getter,
                        FunctionKind::Setter => TopLevelKind::Setter,
                    };
                    let top = top_level(
                        &model.source,
                        &unit_model.source,
                        &unit_model.name,
                        func.name.ident,
                        func.name.span,
                        kind,
                    );
                    add_accessor(&mut element.members, top);
                }
                Declaration::Variables(vars) => {
                    for var in &vars.variables {
                        declared
                            .entry((var.name.ident, false))
                            .or_default()
                            .push(Declared { unit: index, span: var.name.span });
                        let mut top = top_level(
                            &model.source,
                            &unit_model.source,
                            &unit_model.name,
                            var.name.ident,
                            var.name.span,
                            TopLevelKind::Variable,
                        );
                        top.is_final = vars.is_final();
                        top.is_const = vars.keyword == VarKeyword::Const;
                        element.members.entry(var.name.ident).or_insert(top);
                    }
                }
            }
        }
    }

    report_duplicates(&declared, interner, units);
    check_entry_point(model, interner, &mut element, units);
    element
}

fn top_level(
    library: &Source,
    unit: &Source,
    unit_name: &str,
    name: Ident,
    span: Span,
    kind: TopLevelKind,
) -> TopLevelElement {
    TopLevelElement {
        name,
        library: library.clone(),
        unit: unit.clone(),
        unit_name: unit_name.to_string(),
        kind,
        span,
        is_final: false,
        is_const: false,
        ty: Type::Dynamic,
        has_setter: false,
    }
}

/// Inserts a function or accessor, pairing a getter with its setter.
fn add_accessor(members: &mut HashMap<Ident, TopLevelElement>, top: TopLevelElement) {
    match members.get_mut(&top.name) {
        None => {
            let has_setter = top.kind == TopLevelKind::Setter;
            members.insert(top.name, TopLevelElement { has_setter, ..top });
        }
        Some(existing) => match (existing.kind, top.kind) {
            (TopLevelKind::Getter, TopLevelKind::Setter) => existing.has_setter = true,
            (TopLevelKind::Setter, TopLevelKind::Getter) => {
                *existing = TopLevelElement {
                    has_setter: true,
                    ..top
                }
            }
            _ => {}
        },
    }
}

fn class_element(library: &Source, unit: &Source, unit_name: &str, class: &ClassDecl) -> ClassElement {
    let mut members: HashMap<Ident, MemberElement> = HashMap::new();
    for member in &class.members {
        match member {
            Member::Field(vars) => {
                for var in &vars.variables {
                    members
                        .entry(var.name.ident)
                        .or_insert_with(|| field(vars, var.name.ident, var.name.span));
                }
            }
            Member::Method(func) => {
                let member = method(func);
                match members.get(&func.name.ident).map(|m| m.kind) {
                    None => {
                        members.insert(func.name.ident, member);
                    }
                    Some(MemberKind::Setter) if member.kind == MemberKind::Getter => {
                        members.insert(func.name.ident, member);
                    }
                    Some(_) => {}
                }
            }
        }
    }
    ClassElement {
        name: class.name.ident,
        library: library.clone(),
        unit: unit.clone(),
        unit_name: unit_name.to_string(),
        span: class.name.span,
        supertype: None,
        interfaces: Vec::new(),
        members,
        constants: HashMap::new(),
    }
}

fn field(vars: &VariableDecl, name: Ident, span: Span) -> MemberElement {
    MemberElement {
        name,
        kind: MemberKind::Field,
        is_static: vars.is_static,
        is_final: vars.is_final(),
        is_const: vars.keyword == VarKeyword::Const,
        ty: Type::Dynamic,
        span,
    }
}

fn method(func: &FunctionDecl) -> MemberElement {
    MemberElement {
        name: func.name.ident,
        kind: match func.kind {
            FunctionKind::Normal => MemberKind::Method,
            FunctionKind::Getter => MemberKind::Getter,
            FunctionKind::Setter => MemberKind::Setter,
        },
        is_static: func.is_static,
        is_final: false,
        is_const: false,
        ty: Type::Dynamic,
        span: func.name.span,
    }
}

/// Reports every declaration of a name declared more than once, each in
/// its own unit.
fn report_duplicates(
    declared: &HashMap<(Ident, bool), Vec<Declared>>,
    interner: &Interner,
    units: &mut [ResolvedUnit],
) {
    let mut duplicates: Vec<_> = declared.iter().filter(|(_, d)| d.len() > 1).collect();
    duplicates.sort_by_key(|((name, _), _)| interner.resolve(*name));
    for ((name, _), sites) in duplicates {
        let text = interner.resolve(*name);
        for (i, site) in sites.iter().enumerate() {
            let other = if i == 0 { &sites[1] } else { &sites[0] };
            units[site.unit]
                .diagnostics
                .push(errors::error_duplicate_declaration(text, site.span, other.span));
        }
    }
}

/// Validates `main` and records it as the entry point.
fn check_entry_point(
    model: &LibraryModel,
    interner: &Interner,
    element: &mut LibraryElement,
    units: &mut [ResolvedUnit],
) {
    let Some(main) = interner.get("main") else {
        return;
    };
    let Some(top) = element.members.get(&main) else {
        return;
    };
    let Some(unit) = model.units.iter().position(|u| u.source == top.unit) else {
        return;
    };
    let problem = match top.kind {
        TopLevelKind::Getter => Some(errors::error_main_is_getter(top.span)),
        TopLevelKind::Setter => Some(errors::error_main_is_setter(top.span)),
        TopLevelKind::Class | TopLevelKind::Variable => Some(errors::error_main_not_function(top.span)),
        TopLevelKind::Function => {
            let has_params = model.units[unit].unit.declarations.iter().any(|d| {
                matches!(d, Declaration::Function(f) if f.name.span == top.span && !f.params.is_empty())
            });
            has_params.then(|| errors::error_main_has_parameters(top.span))
        }
    };
    match problem {
        Some(diag) => units[unit].diagnostics.push(diag),
        None => element.entry_point = Some(main),
    }
}
