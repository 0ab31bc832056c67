//! Checks that need resolved references: assignments to elements that
//! cannot be assigned, and values returned from `void` functions.

use strand_syntax::ast::{
    Declaration, Expr, ExprKind, FunctionBody, FunctionDecl, Member, ReturnType, Stmt,
};

use crate::element::{ElementRef, MemberKind, TopLevelKind};
use crate::errors;
use crate::index::ElementIndex;
use crate::unit::ResolvedUnit;

/// Runs the additional verification over a fully parsed unit.
pub(crate) fn verify_unit(index: &ElementIndex<'_>, unit: &mut ResolvedUnit) {
    if unit.is_diet() {
        return;
    }
    let tree = std::sync::Arc::clone(&unit.unit);
    let mut verifier = Verifier { index, unit };
    for decl in &tree.declarations {
        match decl {
            Declaration::Function(func) => verifier.function(func),
            Declaration::Variables(vars) => {
                for init in vars.variables.iter().filter_map(|v| v.initializer.as_ref()) {
                    verifier.expr(init);
                }
            }
            Declaration::Class(class) => {
                for member in &class.members {
                    match member {
                        Member::Method(func) => verifier.function(func),
                        Member::Field(vars) => {
                            for init in vars.variables.iter().filter_map(|v| v.initializer.as_ref()) {
                                verifier.expr(init);
                            }
                        }
                    }
                }
            }
        }
    }
}

struct Verifier<'v> {
    index: &'v ElementIndex<'v>,
    unit: &'v mut ResolvedUnit,
}

impl Verifier<'_> {
    fn function(&mut self, func: &FunctionDecl) {
        let is_void = matches!(func.return_type, Some(ReturnType::Void(_)));
        match &func.body {
            FunctionBody::Block(block) => {
                for stmt in &block.statements {
                    self.stmt(stmt, is_void);
                }
            }
            FunctionBody::Expression(expr) => self.expr(expr),
            FunctionBody::Skipped(_) | FunctionBody::Empty => {}
        }
    }

    fn stmt(&mut self, stmt: &Stmt, is_void: bool) {
        match stmt {
            Stmt::Block(block) => {
                for stmt in &block.statements {
                    self.stmt(stmt, is_void);
                }
            }
            Stmt::VarDecl(vars) => {
                for init in vars.variables.iter().filter_map(|v| v.initializer.as_ref()) {
                    self.expr(init);
                }
            }
            Stmt::Expr { expr, .. } | Stmt::Throw { value: expr, .. } => self.expr(expr),
            Stmt::Return { value, span } => {
                if let Some(value) = value {
                    if is_void {
                        self.unit.diagnostics.push(errors::warning_void_return(*span));
                    }
                    self.expr(value);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(condition);
                self.stmt(then_branch, is_void);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch, is_void);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.expr(condition);
                self.stmt(body, is_void);
            }
            Stmt::Labeled { body, .. } => self.stmt(body, is_void),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty(_) => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Assign { target, value } => {
                self.assignment(target);
                self.expr(target);
                self.expr(value);
            }
            ExprKind::Property { target, .. } => self.expr(target),
            ExprKind::Call { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Is { expr, .. } => self.expr(expr),
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            _ => {}
        }
    }

    fn assignment(&mut self, target: &Expr) {
        let name = match &target.kind {
            ExprKind::Ident(name) => *name,
            ExprKind::Property { name, .. } => name.ident,
            _ => return,
        };
        let Some(element) = self.unit.reference(target.id) else {
            return;
        };
        let assignable = match element {
            ElementRef::Local(id) => self.unit.local(*id).map_or(true, |l| !l.is_final),
            ElementRef::TopLevel { .. } => self.index.top_level(element).map_or(true, |t| match t.kind {
                TopLevelKind::Variable => !t.is_final,
                TopLevelKind::Getter | TopLevelKind::Setter => t.has_setter || t.kind == TopLevelKind::Setter,
                TopLevelKind::Function | TopLevelKind::Class => false,
            }),
            ElementRef::Member { class, name } => self
                .index
                .class(class)
                .and_then(|c| c.members.get(name))
                .map_or(true, |m| match m.kind {
                    MemberKind::Field => !m.is_final,
                    MemberKind::Method => false,
                    MemberKind::Getter | MemberKind::Setter => true,
                }),
            ElementRef::Prefix { .. } => false,
        };
        if !assignable {
            let text = self.index.interner.resolve(name);
            self.unit
                .diagnostics
                .push(errors::error_assign_final(text, target.span));
        }
    }
}
