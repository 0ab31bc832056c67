//! Name sets recorded for incremental recompilation.
//!
//! After a unit is analysed in full, the compile driver stores three name
//! sets for it: the top-level names it declares, every unqualified name its
//! analysis was sensitive to, and its holes (unqualified references not bound
//! to a local or parameter). A later compile re-analyses the unit when any of
//! these meets the set of top-level names whose existence changed.
//!
//! Names after `.` never enter the sets: a qualified access does not depend
//! on which top-level names exist.

use std::collections::{BTreeSet, HashSet};

use strand_common::{Ident, Interner};
use strand_syntax::ast::{
    Block, ClassDecl, CompilationUnit, Declaration, Expr, ExprKind, FunctionBody, FunctionDecl,
    Member, ReturnType, Stmt, TypeRef, VariableDecl,
};

/// The name sets of one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitSymbols {
    /// Top-level names declared by the unit.
    pub top: BTreeSet<String>,
    /// Every unqualified name declared or referenced.
    pub all: BTreeSet<String>,
    /// Unqualified references not bound to a local or parameter.
    pub holes: BTreeSet<String>,
}

/// Collects the name sets of `unit` by walking its tree.
pub fn collect_symbols(unit: &CompilationUnit, interner: &Interner) -> UnitSymbols {
    let mut collector = SymbolCollector {
        interner,
        symbols: UnitSymbols::default(),
        scopes: Vec::new(),
    };
    for name in unit.top_level_names() {
        let text = interner.resolve(name.ident).to_string();
        collector.symbols.all.insert(text.clone());
        collector.symbols.top.insert(text);
    }
    for decl in &unit.declarations {
        match decl {
            Declaration::Class(class) => collector.class(class),
            Declaration::Function(func) => collector.function(func),
            Declaration::Variables(vars) => collector.variables(vars, false),
        }
    }
    collector.symbols
}

struct SymbolCollector<'a> {
    interner: &'a Interner,
    symbols: UnitSymbols,
    scopes: Vec<HashSet<Ident>>,
}

impl SymbolCollector<'_> {
    fn name(&mut self, ident: Ident) {
        self.symbols
            .all
            .insert(self.interner.resolve(ident).to_string());
    }

    fn reference(&mut self, ident: Ident) {
        self.name(ident);
        if !self.scopes.iter().any(|s| s.contains(&ident)) {
            self.symbols
                .holes
                .insert(self.interner.resolve(ident).to_string());
        }
    }

    fn declare_local(&mut self, ident: Ident) {
        self.name(ident);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(ident);
        }
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        match ty.prefix {
            Some(prefix) => self.reference(prefix.ident),
            None => self.reference(ty.name.ident),
        }
    }

    fn class(&mut self, class: &ClassDecl) {
        for ty in class.extends.iter().chain(&class.implements) {
            self.type_ref(ty);
        }
        for member in &class.members {
            for name in member.names() {
                self.name(name.ident);
            }
        }
        for member in &class.members {
            match member {
                Member::Field(vars) => self.variables(vars, false),
                Member::Method(func) => self.function(func),
            }
        }
    }

    fn function(&mut self, func: &FunctionDecl) {
        if let Some(ReturnType::Type(ty)) = &func.return_type {
            self.type_ref(ty);
        }
        self.scopes.push(HashSet::new());
        for param in &func.params {
            if let Some(ty) = &param.ty {
                self.type_ref(ty);
            }
            self.declare_local(param.name.ident);
        }
        match &func.body {
            FunctionBody::Block(block) => self.block(block),
            FunctionBody::Expression(expr) => self.expr(expr),
            FunctionBody::Skipped(_) | FunctionBody::Empty => {}
        }
        self.scopes.pop();
    }

    fn variables(&mut self, vars: &VariableDecl, local: bool) {
        if let Some(ty) = &vars.ty {
            self.type_ref(ty);
        }
        for var in &vars.variables {
            if let Some(init) = &var.initializer {
                self.expr(init);
            }
            if local {
                self.declare_local(var.name.ident);
            } else {
                self.name(var.name.ident);
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(HashSet::new());
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.block(block),
            Stmt::VarDecl(vars) => self.variables(vars, true),
            Stmt::Expr { expr, .. } | Stmt::Throw { value: expr, .. } => self.expr(expr),
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
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.expr(condition);
                self.stmt(body);
            }
            Stmt::Labeled { body, .. } => self.stmt(body),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty(_) => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(ident) => self.reference(*ident),
            ExprKind::Property { target, .. } => self.expr(target),
            ExprKind::Call { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::New { ty, args } => {
                self.type_ref(ty);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Is { expr, ty, .. } => {
                self.expr(expr);
                self.type_ref(ty);
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            ExprKind::Assign { target, value } => {
                self.expr(target);
                self.expr(value);
            }
            ExprKind::IntLiteral(_)
            | ExprKind::DoubleLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::Super => {}
        }
    }
}
