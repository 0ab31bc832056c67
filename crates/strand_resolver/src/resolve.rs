//! Reference resolution and static typing.
//!
//! The walker binds every name expression to an element, records the static
//! type of every expression, and narrows the types of effectively final
//! variables inside branches guarded by `is` checks.
//!
//! Traversal rules: top-level functions and variables of a unit are visited
//! before its classes; labels and combinators are never visited.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strand_common::Ident;
use strand_source::{Source, Span};
use strand_syntax::ast::{
    BinaryOp, Block, ClassDecl, Declaration, Expr, ExprKind, FunctionBody, FunctionDecl, Member,
    Name, NodeId, ReturnType, Stmt, TypeRef, UnaryOp, VarKeyword, VariableDecl,
};

use crate::element::{
    is_private, ClassElement, ClassRef, ElementRef, LibraryElement, LocalId, MemberKind,
    TopLevelKind,
};
use crate::errors;
use crate::hierarchy::resolve_type_ref;
use crate::index::{ElementIndex, Lookup};
use crate::types::Type;
use crate::unit::{LocalInfo, ResolvedUnit};

/// Resolves every reference in `unit`, a unit of `library`.
pub(crate) fn resolve_unit(index: &ElementIndex<'_>, library: &LibraryElement, unit: &mut ResolvedUnit) {
    let tree = Arc::clone(&unit.unit);
    let mut walker = Walker {
        index,
        library,
        unit,
        scopes: Vec::new(),
        overrides: Vec::new(),
        class: None,
        assigned: HashSet::new(),
    };
    for decl in &tree.declarations {
        match decl {
            Declaration::Function(func) => walker.function(func),
            Declaration::Variables(vars) => walker.declared_variables(vars),
            Declaration::Class(_) => {}
        }
    }
    for decl in &tree.declarations {
        if let Declaration::Class(class) = decl {
            walker.class(class);
        }
    }
}

type Overrides = HashMap<ElementRef, Type>;

struct Walker<'w> {
    index: &'w ElementIndex<'w>,
    library: &'w LibraryElement,
    unit: &'w mut ResolvedUnit,
    scopes: Vec<HashMap<Ident, LocalId>>,
    overrides: Vec<Overrides>,
    class: Option<&'w ClassElement>,
    /// Names assigned anywhere in the current function.
    assigned: HashSet<Ident>,
}

impl<'w> Walker<'w> {
    // ========================================================================
    // Declarations
    // ========================================================================

    fn class(&mut self, class: &ClassDecl) {
        let library = self.library;
        self.class = library.classes.get(&class.name.ident);
        for member in &class.members {
            match member {
                Member::Field(vars) => self.declared_variables(vars),
                Member::Method(func) => self.function(func),
            }
        }
        self.class = None;
    }

    /// Top-level variables and fields.
    fn declared_variables(&mut self, vars: &VariableDecl) {
        let declared = vars.ty.as_ref().map(|t| self.type_ref(t));
        self.assigned.clear();
        for var in &vars.variables {
            if let Some(init) = &var.initializer {
                let ty = self.expr(init);
                if let Some(declared) = &declared {
                    self.check_assignable(&ty, declared, init.span);
                }
            }
        }
    }

    fn function(&mut self, func: &FunctionDecl) {
        if let Some(ReturnType::Type(ty)) = &func.return_type {
            self.type_ref(ty);
        }
        self.assigned = assigned_names(&func.body);
        self.scopes.push(HashMap::new());
        self.overrides.push(Overrides::new());
        for param in &func.params {
            let ty = param.ty.as_ref().map_or(Type::Dynamic, |t| self.type_ref(t));
            self.declare(param.name, ty, param.is_final, false, true, None);
        }
        match &func.body {
            FunctionBody::Block(block) => {
                for stmt in &block.statements {
                    self.stmt(stmt);
                }
            }
            FunctionBody::Expression(expr) => {
                self.expr(expr);
            }
            FunctionBody::Skipped(_) | FunctionBody::Empty => {}
        }
        self.overrides.pop();
        self.scopes.pop();
    }

    fn type_ref(&mut self, ty: &TypeRef) -> Type {
        resolve_type_ref(self.index, self.library, ty, Some(&mut *self.unit))
    }

    fn declare(
        &mut self,
        name: Name,
        ty: Type,
        is_final: bool,
        is_const: bool,
        is_param: bool,
        initializer: Option<&Expr>,
    ) -> LocalId {
        let id = self.unit.add_local(LocalInfo {
            name: name.ident,
            ty,
            is_final,
            is_const,
            is_param,
            span: name.span,
            initializer: initializer.map(|e| e.id),
        });
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.ident, id);
        }
        id
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        self.overrides.push(Overrides::new());
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.overrides.pop();
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.block(block),
            Stmt::VarDecl(vars) => self.local_variables(vars),
            Stmt::Expr { expr, .. } | Stmt::Throw { value: expr, .. } => {
                self.expr(expr);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.condition(condition);
                let when_true = self.condition_overrides(condition, true);
                let when_false = self.condition_overrides(condition, false);
                self.branch(then_branch, when_true.clone());
                if let Some(else_branch) = else_branch {
                    self.branch(else_branch, when_false.clone());
                }
                let then_exits = terminates(then_branch);
                let else_exits = else_branch.as_deref().is_some_and(terminates);
                if then_exits && !else_exits {
                    self.propagate(when_false);
                } else if else_exits && !then_exits {
                    self.propagate(when_true);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.condition(condition);
                let when_true = self.condition_overrides(condition, true);
                let when_false = self.condition_overrides(condition, false);
                self.branch(body, when_true);
                if !contains_break(body) {
                    self.propagate(when_false);
                }
            }
            Stmt::Labeled { body, .. } => self.stmt(body),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty(_) => {}
        }
    }

    fn local_variables(&mut self, vars: &VariableDecl) {
        let declared = vars.ty.as_ref().map(|t| self.type_ref(t));
        for var in &vars.variables {
            let init_ty = var.initializer.as_ref().map(|init| {
                let ty = self.expr(init);
                if let Some(declared) = &declared {
                    self.check_assignable(&ty, declared, init.span);
                }
                ty
            });
            let ty = match (&declared, init_ty) {
                (Some(declared), _) => declared.clone(),
                (None, Some(init_ty)) if vars.is_final() => init_ty,
                _ => Type::Dynamic,
            };
            self.declare(
                var.name,
                ty,
                vars.is_final(),
                vars.keyword == VarKeyword::Const,
                false,
                var.initializer.as_ref(),
            );
        }
    }

    /// Visits a branch in its own scope with `narrowed` in effect.
    fn branch(&mut self, stmt: &Stmt, narrowed: Overrides) {
        self.scopes.push(HashMap::new());
        self.overrides.push(narrowed);
        self.stmt(stmt);
        self.overrides.pop();
        self.scopes.pop();
    }

    /// Makes `narrowed` hold for the rest of the enclosing scope.
    fn propagate(&mut self, narrowed: Overrides) {
        if let Some(frame) = self.overrides.last_mut() {
            frame.extend(narrowed);
        }
    }

    fn condition(&mut self, condition: &Expr) {
        let ty = self.expr(condition);
        let bool_type = self.index.types.bool_type();
        if !self.index.is_assignable(&ty, &bool_type) {
            let found = self.index.display(&ty);
            self.unit
                .diagnostics
                .push(errors::warning_condition_not_bool(&found, condition.span));
        }
    }

    // ========================================================================
    // Flow-sensitive narrowing
    // ========================================================================

    /// The narrowed types implied by `condition` evaluating to `when`.
    fn condition_overrides(&self, condition: &Expr, when: bool) -> Overrides {
        match &condition.kind {
            ExprKind::Is { expr, ty, negated } if *negated != when => {
                let Some(element) = self.unit.reference(expr.id).cloned() else {
                    return Overrides::new();
                };
                if !self.is_effectively_final(&element) {
                    return Overrides::new();
                }
                let tested = resolve_type_ref(self.index, self.library, ty, None);
                let current = self.unit.type_of(expr.id);
                let narrows = match (&tested, &current) {
                    (Type::Interface(_), Type::Dynamic) => true,
                    (Type::Interface(a), Type::Interface(b)) => self.index.is_subclass(a, b),
                    _ => false,
                };
                if narrows {
                    Overrides::from([(element, tested)])
                } else {
                    Overrides::new()
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.condition_overrides(operand, !when),
            ExprKind::Binary { op, lhs, rhs }
                if (*op == BinaryOp::And && when) || (*op == BinaryOp::Or && !when) =>
            {
                let mut narrowed = self.condition_overrides(lhs, when);
                narrowed.extend(self.condition_overrides(rhs, when));
                narrowed
            }
            _ => Overrides::new(),
        }
    }

    /// Only elements that cannot change between the test and the use may
    /// be narrowed.
    fn is_effectively_final(&self, element: &ElementRef) -> bool {
        match element {
            ElementRef::Local(id) => self
                .unit
                .local(*id)
                .is_some_and(|l| l.is_final || !self.assigned.contains(&l.name)),
            ElementRef::TopLevel { .. } => self
                .index
                .top_level(element)
                .is_some_and(|t| t.kind == TopLevelKind::Variable && t.is_final),
            ElementRef::Member { class, name } => self
                .index
                .class(class)
                .and_then(|c| c.members.get(name))
                .is_some_and(|m| m.kind == MemberKind::Field && m.is_final),
            ElementRef::Prefix { .. } => false,
        }
    }

    fn overridden(&self, element: &ElementRef) -> Option<&Type> {
        self.overrides.iter().rev().find_map(|frame| frame.get(element))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &Expr) -> Type {
        let ty = self.expr_kind(expr);
        self.unit.types.insert(expr.id, ty.clone());
        ty
    }

    fn expr_kind(&mut self, expr: &Expr) -> Type {
        let types = self.index.types;
        match &expr.kind {
            ExprKind::Ident(ident) => self.identifier(expr.id, *ident, expr.span),
            ExprKind::IntLiteral(_) => types.int_type(),
            ExprKind::DoubleLiteral(_) => types.double_type(),
            ExprKind::StringLiteral(_) => types.string_type(),
            ExprKind::BoolLiteral(_) => types.bool_type(),
            ExprKind::Null => types.null_type(),
            ExprKind::This => self
                .class
                .map_or(Type::Dynamic, |c| Type::Interface(c.class_ref())),
            ExprKind::Super => self
                .class
                .and_then(|c| c.supertype.clone())
                .map_or(Type::Dynamic, Type::Interface),
            ExprKind::Property { target, name } => self.property(expr.id, target, *name),
            ExprKind::Call { callee, args } => {
                let callee_ty = self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
                match callee_ty {
                    Type::Function(ret) => *ret,
                    _ => Type::Dynamic,
                }
            }
            ExprKind::New { ty, args } => {
                let ty = self.type_ref(ty);
                for arg in args {
                    self.expr(arg);
                }
                ty
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.expr(operand);
                match op {
                    UnaryOp::Not => types.bool_type(),
                    UnaryOp::Neg => ty,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_logical() {
                    self.expr(lhs);
                    let narrowed = self.condition_overrides(lhs, *op == BinaryOp::And);
                    self.overrides.push(narrowed);
                    self.expr(rhs);
                    self.overrides.pop();
                    return types.bool_type();
                }
                let lhs_ty = self.expr(lhs);
                let rhs_ty = self.expr(rhs);
                if op.is_comparison() {
                    types.bool_type()
                } else {
                    types.arithmetic_result(&lhs_ty, &rhs_ty)
                }
            }
            ExprKind::Is { expr, ty, .. } => {
                self.expr(expr);
                self.type_ref(ty);
                types.bool_type()
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.condition(condition);
                let when_true = self.condition_overrides(condition, true);
                let when_false = self.condition_overrides(condition, false);
                self.overrides.push(when_true);
                let a = self.expr(then_expr);
                self.overrides.pop();
                self.overrides.push(when_false);
                let b = self.expr(else_expr);
                self.overrides.pop();
                if a == b {
                    a
                } else {
                    Type::Dynamic
                }
            }
            ExprKind::Assign { target, value } => {
                let target_ty = self.expr(target);
                let value_ty = self.expr(value);
                self.check_assignable(&value_ty, &target_ty, value.span);
                value_ty
            }
        }
    }

    /// Binds `node` to `element` and returns its (possibly narrowed) type.
    fn bind(&mut self, node: NodeId, element: ElementRef, declared: Type) -> Type {
        let ty = self.overridden(&element).cloned().unwrap_or(declared);
        self.unit.references.insert(node, element);
        ty
    }

    fn lookup_local(&self, name: Ident) -> Option<LocalId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    fn identifier(&mut self, node: NodeId, name: Ident, span: Span) -> Type {
        if let Some(local) = self.lookup_local(name) {
            let declared = self.unit.local(local).map_or(Type::Dynamic, |l| l.ty.clone());
            return self.bind(node, ElementRef::Local(local), declared);
        }
        if let Some(class) = self.class {
            if let Some((owner, member)) = self.index.lookup_member(&class.class_ref(), name) {
                let ty = member.reference_type();
                self.depend_on_class(&owner);
                return self.bind(node, ElementRef::Member { class: owner, name }, ty);
            }
        }
        let index = self.index;
        let text = index.interner.resolve(name);
        match index.lookup(self.library, name) {
            Lookup::Found(element) => {
                let ty = self.element_type(&element);
                self.depend_on(&element);
                self.bind(node, element, ty)
            }
            Lookup::Ambiguous(libraries) => {
                self.report_ambiguous(text, &libraries, span);
                Type::Dynamic
            }
            Lookup::NotFound => {
                match is_private(text)
                    .then(|| index.private_provider(self.library, None, name))
                    .flatten()
                {
                    Some(owner) => self.unit.diagnostics.push(errors::error_private_access(
                        text,
                        owner.source.uri(),
                        span,
                    )),
                    None => {
                        self.unit
                            .diagnostics
                            .push(errors::warning_cannot_resolve(text, span));
                        self.unit.has_unresolved = true;
                    }
                }
                Type::Dynamic
            }
        }
    }

    fn property(&mut self, node: NodeId, target: &Expr, name: Name) -> Type {
        let target_ty = self.expr(target);
        let target_ref = self.unit.reference(target.id).cloned();
        if let Some(ElementRef::Prefix { name: prefix, .. }) = target_ref {
            return self.prefixed(node, prefix, name);
        }
        let index = self.index;
        if let Some(class) = target_ref.as_ref().and_then(|e| index.as_class(e)) {
            return self.member_access(node, &class.class_ref(), name);
        }
        match target_ty {
            Type::Interface(class) => self.member_access(node, &class, name),
            _ => Type::Dynamic,
        }
    }

    fn prefixed(&mut self, node: NodeId, prefix: Ident, name: Name) -> Type {
        let index = self.index;
        let interner = index.interner;
        let display = format!(
            "{}.{}",
            interner.resolve(prefix),
            interner.resolve(name.ident)
        );
        match index.lookup_prefixed(self.library, prefix, name.ident) {
            Lookup::Found(element) => {
                let ty = self.element_type(&element);
                self.depend_on(&element);
                self.bind(node, element, ty)
            }
            Lookup::Ambiguous(libraries) => {
                self.report_ambiguous(&display, &libraries, name.span);
                Type::Dynamic
            }
            Lookup::NotFound => {
                let text = interner.resolve(name.ident);
                match is_private(text)
                    .then(|| index.private_provider(self.library, Some(prefix), name.ident))
                    .flatten()
                {
                    Some(owner) => self.unit.diagnostics.push(errors::error_private_access(
                        text,
                        owner.source.uri(),
                        name.span,
                    )),
                    None => self
                        .unit
                        .diagnostics
                        .push(errors::warning_cannot_resolve(&display, name.span)),
                }
                Type::Dynamic
            }
        }
    }

    fn member_access(&mut self, node: NodeId, class: &ClassRef, name: Name) -> Type {
        let index = self.index;
        let interner = index.interner;
        match index.lookup_member(class, name.ident) {
            Some((owner, member)) => {
                let text = interner.resolve(name.ident);
                if is_private(text) && owner.library != self.library.source {
                    self.unit.diagnostics.push(errors::error_private_access(
                        text,
                        owner.library.uri(),
                        name.span,
                    ));
                }
                let ty = member.reference_type();
                self.depend_on_class(&owner);
                self.bind(
                    node,
                    ElementRef::Member {
                        class: owner,
                        name: name.ident,
                    },
                    ty,
                )
            }
            None => {
                self.unit.diagnostics.push(errors::warning_no_such_member(
                    interner.resolve(name.ident),
                    interner.resolve(class.name),
                    name.span,
                ));
                Type::Dynamic
            }
        }
    }

    fn report_ambiguous(&mut self, name: &str, libraries: &[Source], span: Span) {
        let uris: Vec<String> = libraries.iter().map(|l| l.uri().to_string()).collect();
        self.unit
            .diagnostics
            .push(errors::error_ambiguous_import(name, &uris, span));
    }

    fn element_type(&self, element: &ElementRef) -> Type {
        match element {
            ElementRef::TopLevel { .. } => self
                .index
                .top_level(element)
                .map_or(Type::Dynamic, |t| t.reference_type()),
            ElementRef::Member { class, name } => self
                .index
                .class(class)
                .and_then(|c| c.members.get(name))
                .map_or(Type::Dynamic, |m| m.reference_type()),
            ElementRef::Local(id) => self.unit.local(*id).map_or(Type::Dynamic, |l| l.ty.clone()),
            ElementRef::Prefix { .. } => Type::Dynamic,
        }
    }

    fn depend_on(&mut self, element: &ElementRef) {
        if let Some(top) = self.index.top_level(element) {
            self.unit.add_dependency(&top.library, &top.unit, &top.unit_name);
        }
    }

    fn depend_on_class(&mut self, class: &ClassRef) {
        if let Some(element) = self.index.class(class) {
            self.unit
                .add_dependency(&element.library, &element.unit, &element.unit_name);
        }
    }

    fn check_assignable(&mut self, from: &Type, to: &Type, span: Span) {
        if !self.index.is_assignable(from, to) {
            let (from, to) = (self.index.display(from), self.index.display(to));
            self.unit
                .diagnostics
                .push(errors::warning_not_assignable(&from, &to, span));
        }
    }
}

/// Returns `true` if control never completes normally past `stmt`.
pub(crate) fn terminates(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } | Stmt::Throw { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {
            true
        }
        Stmt::Block(block) => block.statements.iter().any(terminates),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => terminates(then_branch) && else_branch.as_deref().is_some_and(terminates),
        Stmt::Labeled { body, .. } => terminates(body),
        _ => false,
    }
}

/// Returns `true` if a `break` in `stmt` can leave the enclosing loop.
fn contains_break(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Break { .. } => true,
        Stmt::Block(block) => block.statements.iter().any(contains_break),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => contains_break(then_branch) || else_branch.as_deref().is_some_and(contains_break),
        Stmt::Labeled { body, .. } => contains_break(body),
        _ => false,
    }
}

/// Names assigned by simple assignments anywhere in `body`.
fn assigned_names(body: &FunctionBody) -> HashSet<Ident> {
    let mut names = HashSet::new();
    match body {
        FunctionBody::Block(block) => {
            for stmt in &block.statements {
                assigned_in_stmt(stmt, &mut names);
            }
        }
        FunctionBody::Expression(expr) => assigned_in_expr(expr, &mut names),
        FunctionBody::Skipped(_) | FunctionBody::Empty => {}
    }
    names
}

fn assigned_in_stmt(stmt: &Stmt, names: &mut HashSet<Ident>) {
    match stmt {
        Stmt::Block(block) => {
            for stmt in &block.statements {
                assigned_in_stmt(stmt, names);
            }
        }
        Stmt::VarDecl(vars) => {
            for init in vars.variables.iter().filter_map(|v| v.initializer.as_ref()) {
                assigned_in_expr(init, names);
            }
        }
        Stmt::Expr { expr, .. } | Stmt::Throw { value: expr, .. } => assigned_in_expr(expr, names),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                assigned_in_expr(value, names);
            }
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            assigned_in_expr(condition, names);
            assigned_in_stmt(then_branch, names);
            if let Some(else_branch) = else_branch {
                assigned_in_stmt(else_branch, names);
            }
        }
        Stmt::While {
            condition, body, ..
        } => {
            assigned_in_expr(condition, names);
            assigned_in_stmt(body, names);
        }
        Stmt::Labeled { body, .. } => assigned_in_stmt(body, names),
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty(_) => {}
    }
}

fn assigned_in_expr(expr: &Expr, names: &mut HashSet<Ident>) {
    match &expr.kind {
        ExprKind::Assign { target, value } => {
            if let ExprKind::Ident(name) = target.kind {
                names.insert(name);
            }
            assigned_in_expr(target, names);
            assigned_in_expr(value, names);
        }
        ExprKind::Property { target, .. } => assigned_in_expr(target, names),
        ExprKind::Call { callee, args } => {
            assigned_in_expr(callee, names);
            for arg in args {
                assigned_in_expr(arg, names);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                assigned_in_expr(arg, names);
            }
        }
        ExprKind::Unary { operand, .. } => assigned_in_expr(operand, names),
        ExprKind::Binary { lhs, rhs, .. } => {
            assigned_in_expr(lhs, names);
            assigned_in_expr(rhs, names);
        }
        ExprKind::Is { expr, .. } => assigned_in_expr(expr, names),
        ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            assigned_in_expr(condition, names);
            assigned_in_expr(then_expr, names);
            assigned_in_expr(else_expr, names);
        }
        _ => {}
    }
}
