//! Compile-time constant evaluation.
//!
//! Every `const` variable of a cycle (top-level, field or local) is
//! evaluated once. Constants of libraries resolved in earlier rounds are
//! read from their elements.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use strand_common::Ident;
use strand_diagnostics::Diagnostic;
use strand_source::Source;
use strand_syntax::ast::{
    BinaryOp, CompilationUnit, Declaration, Expr, ExprKind, FunctionBody, Member, Stmt, UnaryOp,
    VarKeyword, VariableDecl,
};

use crate::element::{ClassRef, ElementRef, LocalId};
use crate::errors;
use crate::index::ElementIndex;
use crate::unit::ResolvedUnit;

/// The value of a constant expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    /// An integer.
    Int(i64),
    /// A double.
    Double(f64),
    /// A boolean.
    Bool(bool),
    /// A string.
    String(String),
    /// `null`.
    Null,
}

impl ConstValue {
    fn as_double(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Double(v) => write!(f, "{v:?}"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::String(v) => write!(f, "\"{v}\""),
            ConstValue::Null => f.write_str("null"),
        }
    }
}

/// Constants found in one cycle.
#[derive(Debug, Default)]
pub(crate) struct CycleConstants {
    /// Top-level constants by library.
    pub top_level: HashMap<Source, HashMap<Ident, ConstValue>>,
    /// Constant fields by class.
    pub fields: HashMap<ClassRef, HashMap<Ident, ConstValue>>,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Key {
    Element(ElementRef),
    Local(Source, LocalId),
}

struct Initializer<'t> {
    name: Ident,
    /// Position of the declaring unit: (library, unit).
    unit: (usize, usize),
    expr: &'t Expr,
}

enum Failure {
    /// The initializer itself is not a constant expression.
    NotConstant,
    /// A constant it depends on failed and was reported there.
    Propagated,
}

/// Evaluates every constant declared in the cycle, reporting initializers
/// that are not constant expressions.
///
/// `units` holds the resolved units of each cycle library, in the order of
/// `cycle`, after references have been resolved.
pub(crate) fn evaluate_constants(
    index: &ElementIndex<'_>,
    cycle: &[Source],
    units: &mut [Vec<ResolvedUnit>],
) -> CycleConstants {
    let trees: Vec<Vec<Arc<CompilationUnit>>> = units
        .iter()
        .map(|lib| lib.iter().map(|u| Arc::clone(&u.unit)).collect())
        .collect();
    let (constants, diagnostics) = {
        let mut evaluator = Evaluator {
            index,
            cycle,
            units: &*units,
            initializers: HashMap::new(),
            memo: HashMap::new(),
            in_progress: HashSet::new(),
            diagnostics: Vec::new(),
        };
        for (lib, lib_trees) in trees.iter().enumerate() {
            for (unit, tree) in lib_trees.iter().enumerate() {
                evaluator.collect(lib, unit, tree);
            }
        }
        let mut keys: Vec<Key> = evaluator.initializers.keys().cloned().collect();
        keys.sort_by_key(|k| {
            let init = &evaluator.initializers[k];
            (init.unit, init.expr.span.start)
        });
        let mut constants = CycleConstants::default();
        for key in keys {
            let Some(value) = evaluator.constant(&key) else {
                continue;
            };
            match key {
                Key::Element(ElementRef::TopLevel { library, name }) => {
                    constants.top_level.entry(library).or_default().insert(name, value);
                }
                Key::Element(ElementRef::Member { class, name }) => {
                    constants.fields.entry(class).or_default().insert(name, value);
                }
                _ => {}
            }
        }
        (constants, evaluator.diagnostics)
    };
    for ((lib, unit), diagnostic) in diagnostics {
        units[lib][unit].diagnostics.push(diagnostic);
    }
    constants
}

struct Evaluator<'e, 't> {
    index: &'e ElementIndex<'e>,
    cycle: &'e [Source],
    units: &'e [Vec<ResolvedUnit>],
    initializers: HashMap<Key, Initializer<'t>>,
    memo: HashMap<Key, Option<ConstValue>>,
    in_progress: HashSet<Key>,
    diagnostics: Vec<((usize, usize), Diagnostic)>,
}

impl<'e, 't> Evaluator<'e, 't> {
    fn collect(&mut self, lib: usize, unit: usize, tree: &'t CompilationUnit) {
        let (index, cycle) = (self.index, self.cycle);
        let library = &cycle[lib];
        let Some(element) = index.library(library) else {
            return;
        };
        for decl in &tree.declarations {
            match decl {
                Declaration::Variables(vars) if vars.keyword == VarKeyword::Const => {
                    for var in &vars.variables {
                        let declares = element
                            .members
                            .get(&var.name.ident)
                            .is_some_and(|m| m.span == var.name.span);
                        if let (true, Some(init)) = (declares, &var.initializer) {
                            let key = Key::Element(ElementRef::TopLevel {
                                library: library.clone(),
                                name: var.name.ident,
                            });
                            self.add(key, var.name.ident, (lib, unit), init);
                        }
                    }
                }
                Declaration::Class(class) => {
                    let Some(class_element) = element
                        .classes
                        .get(&class.name.ident)
                        .filter(|c| c.span == class.name.span)
                    else {
                        continue;
                    };
                    for member in &class.members {
                        match member {
                            Member::Field(vars) if vars.keyword == VarKeyword::Const => {
                                for var in &vars.variables {
                                    if let Some(init) = &var.initializer {
                                        let key = Key::Element(ElementRef::Member {
                                            class: class_element.class_ref(),
                                            name: var.name.ident,
                                        });
                                        self.add(key, var.name.ident, (lib, unit), init);
                                    }
                                }
                            }
                            Member::Method(func) => self.collect_body(lib, unit, &func.body),
                            Member::Field(_) => {}
                        }
                    }
                }
                Declaration::Function(func) => self.collect_body(lib, unit, &func.body),
                Declaration::Variables(_) => {}
            }
        }
    }

    fn collect_body(&mut self, lib: usize, unit: usize, body: &'t FunctionBody) {
        if let FunctionBody::Block(block) = body {
            for stmt in &block.statements {
                self.collect_stmt(lib, unit, stmt);
            }
        }
    }

    fn collect_stmt(&mut self, lib: usize, unit: usize, stmt: &'t Stmt) {
        match stmt {
            Stmt::VarDecl(vars) if vars.keyword == VarKeyword::Const => {
                self.collect_locals(lib, unit, vars);
            }
            Stmt::Block(block) => {
                for stmt in &block.statements {
                    self.collect_stmt(lib, unit, stmt);
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.collect_stmt(lib, unit, then_branch);
                if let Some(else_branch) = else_branch {
                    self.collect_stmt(lib, unit, else_branch);
                }
            }
            Stmt::While { body, .. } | Stmt::Labeled { body, .. } => {
                self.collect_stmt(lib, unit, body);
            }
            _ => {}
        }
    }

    fn collect_locals(&mut self, lib: usize, unit: usize, vars: &'t VariableDecl) {
        let units = self.units;
        let resolved = &units[lib][unit];
        for var in &vars.variables {
            let Some(init) = &var.initializer else {
                continue;
            };
            let local = resolved
                .locals
                .iter()
                .position(|l| l.is_const && l.initializer == Some(init.id));
            if let Some(local) = local {
                let key = Key::Local(resolved.source.clone(), LocalId::from_raw(local as u32));
                self.add(key, var.name.ident, (lib, unit), init);
            }
        }
    }

    fn add(&mut self, key: Key, name: Ident, unit: (usize, usize), expr: &'t Expr) {
        self.initializers.entry(key).or_insert(Initializer { name, unit, expr });
    }

    /// The value of a constant declared in this cycle; `None` if it failed.
    fn constant(&mut self, key: &Key) -> Option<ConstValue> {
        if let Some(value) = self.memo.get(key) {
            return value.clone();
        }
        let (name, unit, expr) = {
            let init = self.initializers.get(key)?;
            (init.name, init.unit, init.expr)
        };
        self.in_progress.insert(key.clone());
        let result = self.eval(unit, expr);
        self.in_progress.remove(key);
        let value = match result {
            Ok(value) => Some(value),
            Err(Failure::NotConstant) => {
                let text = self.index.interner.resolve(name);
                self.diagnostics
                    .push((unit, errors::error_not_constant(text, expr.span)));
                None
            }
            Err(Failure::Propagated) => None,
        };
        self.memo.insert(key.clone(), value.clone());
        value
    }

    fn eval(&mut self, unit: (usize, usize), expr: &Expr) -> Result<ConstValue, Failure> {
        match &expr.kind {
            ExprKind::IntLiteral(v) => Ok(ConstValue::Int(*v)),
            ExprKind::DoubleLiteral(v) => Ok(ConstValue::Double(*v)),
            ExprKind::StringLiteral(v) => Ok(ConstValue::String(v.clone())),
            ExprKind::BoolLiteral(v) => Ok(ConstValue::Bool(*v)),
            ExprKind::Null => Ok(ConstValue::Null),
            ExprKind::Ident(_) | ExprKind::Property { .. } => self.reference(unit, expr),
            ExprKind::Unary { op, operand } => {
                match (op, self.eval(unit, operand)?) {
                    (UnaryOp::Not, ConstValue::Bool(v)) => Ok(ConstValue::Bool(!v)),
                    (UnaryOp::Neg, ConstValue::Int(v)) => {
                        v.checked_neg().map(ConstValue::Int).ok_or(Failure::NotConstant)
                    }
                    (UnaryOp::Neg, ConstValue::Double(v)) => Ok(ConstValue::Double(-v)),
                    _ => Err(Failure::NotConstant),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(unit, lhs)?;
                if let (BinaryOp::And, ConstValue::Bool(false)) | (BinaryOp::Or, ConstValue::Bool(true)) =
                    (op, &lhs)
                {
                    return Ok(lhs);
                }
                let rhs = self.eval(unit, rhs)?;
                binary(*op, lhs, rhs).ok_or(Failure::NotConstant)
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => match self.eval(unit, condition)? {
                ConstValue::Bool(true) => self.eval(unit, then_expr),
                ConstValue::Bool(false) => self.eval(unit, else_expr),
                _ => Err(Failure::NotConstant),
            },
            _ => Err(Failure::NotConstant),
        }
    }

    fn reference(&mut self, unit: (usize, usize), expr: &Expr) -> Result<ConstValue, Failure> {
        let units = self.units;
        let resolved = &units[unit.0][unit.1];
        let Some(element) = resolved.reference(expr.id).cloned() else {
            return Err(Failure::NotConstant);
        };
        let key = match &element {
            ElementRef::Local(id) => {
                let is_const = resolved.local(*id).is_some_and(|l| l.is_const);
                if !is_const {
                    return Err(Failure::NotConstant);
                }
                Key::Local(resolved.source.clone(), *id)
            }
            _ => Key::Element(element.clone()),
        };
        if self.in_progress.contains(&key) {
            return Err(Failure::NotConstant);
        }
        if self.initializers.contains_key(&key) {
            return self.constant(&key).ok_or(Failure::Propagated);
        }
        let index = self.index;
        let value = match &element {
            ElementRef::TopLevel { library, name } => {
                index.library(library).and_then(|l| l.constants.get(name))
            }
            ElementRef::Member { class, name } => {
                index.class(class).and_then(|c| c.constants.get(name))
            }
            _ => None,
        };
        value.cloned().ok_or(Failure::NotConstant)
    }
}

fn binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> Option<ConstValue> {
    use ConstValue::{Bool, Double, Int};
    let value = match (op, &lhs, &rhs) {
        (BinaryOp::Eq, _, _) => Bool(lhs == rhs),
        (BinaryOp::NotEq, _, _) => Bool(lhs != rhs),
        (BinaryOp::And | BinaryOp::Or, Bool(_), Bool(b)) => Bool(*b),
        (BinaryOp::Add, ConstValue::String(a), ConstValue::String(b)) => {
            ConstValue::String(format!("{a}{b}"))
        }
        (_, Int(a), Int(b)) => match op {
            BinaryOp::Add => Int(a.checked_add(*b)?),
            BinaryOp::Sub => Int(a.checked_sub(*b)?),
            BinaryOp::Mul => Int(a.checked_mul(*b)?),
            BinaryOp::Div => Double(*a as f64 / *b as f64),
            BinaryOp::Rem => Int(a.checked_rem(*b)?),
            BinaryOp::Lt => Bool(a < b),
            BinaryOp::Le => Bool(a <= b),
            BinaryOp::Gt => Bool(a > b),
            BinaryOp::Ge => Bool(a >= b),
            _ => return None,
        },
        _ => {
            let (a, b) = (lhs.as_double()?, rhs.as_double()?);
            match op {
                BinaryOp::Add => Double(a + b),
                BinaryOp::Sub => Double(a - b),
                BinaryOp::Mul => Double(a * b),
                BinaryOp::Div => Double(a / b),
                BinaryOp::Rem => Double(a % b),
                BinaryOp::Lt => Bool(a < b),
                BinaryOp::Le => Bool(a <= b),
                BinaryOp::Gt => Bool(a > b),
                BinaryOp::Ge => Bool(a >= b),
                _ => return None,
            }
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> ConstValue {
        ConstValue::Int(v)
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(binary(BinaryOp::Add, int(2), int(3)), Some(int(5)));
        assert_eq!(binary(BinaryOp::Rem, int(7), int(4)), Some(int(3)));
        assert_eq!(binary(BinaryOp::Div, int(7), int(2)), Some(ConstValue::Double(3.5)));
        assert_eq!(binary(BinaryOp::Rem, int(1), int(0)), None);
        assert_eq!(binary(BinaryOp::Add, int(i64::MAX), int(1)), None);
    }

    #[test]
    fn mixed_and_string_operands() {
        assert_eq!(
            binary(BinaryOp::Mul, int(2), ConstValue::Double(1.5)),
            Some(ConstValue::Double(3.0))
        );
        assert_eq!(
            binary(
                BinaryOp::Add,
                ConstValue::String("a".into()),
                ConstValue::String("b".into())
            ),
            Some(ConstValue::String("ab".into()))
        );
        assert_eq!(binary(BinaryOp::Add, ConstValue::String("a".into()), int(1)), None);
        assert_eq!(binary(BinaryOp::Eq, ConstValue::Null, int(1)), Some(ConstValue::Bool(false)));
    }

    #[test]
    fn display() {
        assert_eq!(int(3).to_string(), "3");
        assert_eq!(ConstValue::Double(2.0).to_string(), "2.0");
        assert_eq!(ConstValue::String("x".into()).to_string(), "\"x\"");
    }
}
