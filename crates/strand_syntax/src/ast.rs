//! Syntax tree of one compilation unit.
//!
//! The tree is a set of tagged variants. Every expression carries a
//! [`NodeId`] that is unique within its unit, so later passes can record
//! bindings and static types in side tables instead of mutating the tree.

use serde::{Deserialize, Serialize};
use strand_common::Ident;
use strand_source::{FileId, Span};

/// Identifies an expression within its compilation unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A name together with where it was written.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Name {
    /// The interned text.
    pub ident: Ident,
    /// Location of the name.
    pub span: Span,
}

/// One parsed source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// The source this unit was parsed from.
    pub file: FileId,
    /// Directives in source order.
    pub directives: Vec<Directive>,
    /// Top-level declarations in source order.
    pub declarations: Vec<Declaration>,
    /// `true` if function bodies were skipped.
    pub diet: bool,
    /// Span of the whole file.
    pub span: Span,
}

impl CompilationUnit {
    /// The `library` directive, if any.
    pub fn library_directive(&self) -> Option<&LibraryDirective> {
        self.directives.iter().find_map(|d| match d {
            Directive::Library(l) => Some(l),
            _ => None,
        })
    }

    /// The `part of` directive, if any.
    pub fn part_of_directive(&self) -> Option<&PartOfDirective> {
        self.directives.iter().find_map(|d| match d {
            Directive::PartOf(p) => Some(p),
            _ => None,
        })
    }

    /// Returns `true` if this unit declares itself a part of another library.
    pub fn is_part(&self) -> bool {
        self.part_of_directive().is_some()
    }

    /// Every top-level name this unit declares, with its declaration site.
    pub fn top_level_names(&self) -> Vec<Name> {
        self.declarations
            .iter()
            .flat_map(|d| d.names())
            .collect()
    }
}

/// A directive at the top of a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// `library a.b;`
    Library(LibraryDirective),
    /// `part of a.b;`
    PartOf(PartOfDirective),
    /// `import 'uri' as p show x hide y;`
    Import(ImportDirective),
    /// `export 'uri' show x;`
    Export(ExportDirective),
    /// `part 'uri';`
    Part(PartDirective),
}

impl Directive {
    /// The span of the whole directive.
    pub fn span(&self) -> Span {
        match self {
            Directive::Library(d) => d.span,
            Directive::PartOf(d) => d.span,
            Directive::Import(d) => d.span,
            Directive::Export(d) => d.span,
            Directive::Part(d) => d.span,
        }
    }
}

/// A dotted library name such as `app.ui`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryName {
    /// The dotted text, used for textual comparisons.
    pub text: String,
    /// Location of the name.
    pub span: Span,
}

/// `library a.b;`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDirective {
    /// The declared library name.
    pub name: LibraryName,
    /// Span of the directive.
    pub span: Span,
}

/// `part of a.b;`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOfDirective {
    /// The name of the owning library.
    pub name: LibraryName,
    /// Span of the directive.
    pub span: Span,
}

/// A quoted URI in a directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriLiteral {
    /// The unquoted text.
    pub value: String,
    /// Location of the literal.
    pub span: Span,
}

/// `import 'uri' [as p] [show ...] [hide ...];`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDirective {
    /// The imported library.
    pub uri: UriLiteral,
    /// The import prefix, if any.
    pub prefix: Option<Name>,
    /// Name filters, in source order.
    pub combinators: Vec<Combinator>,
    /// Span of the directive.
    pub span: Span,
}

/// `export 'uri' [show ...] [hide ...];`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDirective {
    /// The exported library.
    pub uri: UriLiteral,
    /// Name filters, in source order.
    pub combinators: Vec<Combinator>,
    /// Span of the directive.
    pub span: Span,
}

/// `part 'uri';`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDirective {
    /// The included unit.
    pub uri: UriLiteral,
    /// Span of the directive.
    pub span: Span,
}

/// A `show` or `hide` name filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    /// Only the listed names pass.
    Show(Vec<Name>),
    /// The listed names are blocked.
    Hide(Vec<Name>),
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    /// A class.
    Class(ClassDecl),
    /// A function, getter or setter.
    Function(FunctionDecl),
    /// One or more variables sharing a keyword and type.
    Variables(VariableDecl),
}

impl Declaration {
    /// The names this declaration introduces.
    pub fn names(&self) -> Vec<Name> {
        match self {
            Declaration::Class(c) => vec![c.name],
            Declaration::Function(f) => vec![f.name],
            Declaration::Variables(v) => v.variables.iter().map(|d| d.name).collect(),
        }
    }

    /// Span of the whole declaration.
    pub fn span(&self) -> Span {
        match self {
            Declaration::Class(c) => c.span,
            Declaration::Function(f) => f.span,
            Declaration::Variables(v) => v.span,
        }
    }
}

/// A type annotation: `T` or `prefix.T`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TypeRef {
    /// Import prefix qualifying the name.
    pub prefix: Option<Name>,
    /// The type name.
    pub name: Name,
    /// Span of the annotation.
    pub span: Span,
}

/// The declared result of a function.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ReturnType {
    /// `void`
    Void(Span),
    /// A named type.
    Type(TypeRef),
}

/// `class C extends S implements I, J { ... }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// The class name.
    pub name: Name,
    /// The superclass.
    pub extends: Option<TypeRef>,
    /// Implemented interfaces.
    pub implements: Vec<TypeRef>,
    /// Fields and methods.
    pub members: Vec<Member>,
    /// Span of the declaration.
    pub span: Span,
}

/// A class member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Member {
    /// A field list.
    Field(VariableDecl),
    /// A method, getter or setter.
    Method(FunctionDecl),
}

impl Member {
    /// The names this member introduces.
    pub fn names(&self) -> Vec<Name> {
        match self {
            Member::Field(v) => v.variables.iter().map(|d| d.name).collect(),
            Member::Method(f) => vec![f.name],
        }
    }
}

/// Distinguishes ordinary functions from accessors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FunctionKind {
    /// `f(...)`
    Normal,
    /// `get g`
    Getter,
    /// `set s(v)`
    Setter,
}

/// A function, method, getter or setter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// The function name.
    pub name: Name,
    /// Accessor kind.
    pub kind: FunctionKind,
    /// `static` (members only).
    pub is_static: bool,
    /// Declared result type.
    pub return_type: Option<ReturnType>,
    /// Parameters. Getters have none.
    pub params: Vec<Param>,
    /// `true` if the declaration had a parameter list.
    pub has_param_list: bool,
    /// The body.
    pub body: FunctionBody,
    /// Span of the declaration.
    pub span: Span,
}

/// A function parameter.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Param {
    /// The parameter name.
    pub name: Name,
    /// Declared type.
    pub ty: Option<TypeRef>,
    /// `final` parameter.
    pub is_final: bool,
    /// Span of the parameter.
    pub span: Span,
}

/// A function body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    /// `{ ... }`
    Block(Block),
    /// `=> expr;`
    Expression(Expr),
    /// A body skipped by a diet parse.
    Skipped(Span),
    /// `;`
    Empty,
}

/// The keyword introducing a variable list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum VarKeyword {
    /// `var x;`
    Var,
    /// `final x = e;`
    Final,
    /// `const x = e;`
    Const,
    /// `T x;`
    Typed,
}

/// A variable list at top level, in a class, or in a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    /// The introducing keyword.
    pub keyword: VarKeyword,
    /// Declared type.
    pub ty: Option<TypeRef>,
    /// `static` (members only).
    pub is_static: bool,
    /// The declared variables.
    pub variables: Vec<VariableDeclarator>,
    /// Span of the declaration.
    pub span: Span,
}

impl VariableDecl {
    /// `final` and `const` variables cannot be assigned after initialization.
    pub fn is_final(&self) -> bool {
        matches!(self.keyword, VarKeyword::Final | VarKeyword::Const)
    }
}

/// One variable of a variable list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    /// The variable name.
    pub name: Name,
    /// Initializer.
    pub initializer: Option<Expr>,
    /// Span of the declarator.
    pub span: Span,
}

/// `{ statements }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Statements in order.
    pub statements: Vec<Stmt>,
    /// Span including braces.
    pub span: Span,
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// A nested block.
    Block(Block),
    /// A local variable list.
    VarDecl(VariableDecl),
    /// An expression statement.
    Expr {
        /// The expression.
        expr: Expr,
        /// Span including `;`.
        span: Span,
    },
    /// `return [e];`
    Return {
        /// The returned value.
        value: Option<Expr>,
        /// Span of the statement.
        span: Span,
    },
    /// `if (c) s [else s]`
    If {
        /// The condition.
        condition: Expr,
        /// Taken when the condition holds.
        then_branch: Box<Stmt>,
        /// Taken otherwise.
        else_branch: Option<Box<Stmt>>,
        /// Span of the statement.
        span: Span,
    },
    /// `while (c) s`
    While {
        /// The loop condition.
        condition: Expr,
        /// The loop body.
        body: Box<Stmt>,
        /// Span of the statement.
        span: Span,
    },
    /// `throw e;`
    Throw {
        /// The thrown value.
        value: Expr,
        /// Span of the statement.
        span: Span,
    },
    /// `break [label];`
    Break {
        /// Target label.
        label: Option<Name>,
        /// Span of the statement.
        span: Span,
    },
    /// `continue [label];`
    Continue {
        /// Target label.
        label: Option<Name>,
        /// Span of the statement.
        span: Span,
    },
    /// `label: s`
    Labeled {
        /// The label.
        label: Name,
        /// The labelled statement.
        body: Box<Stmt>,
        /// Span of the statement.
        span: Span,
    },
    /// `;`
    Empty(Span),
}

impl Stmt {
    /// Span of the statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(b) => b.span,
            Stmt::VarDecl(v) => v.span,
            Stmt::Expr { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Break { span, .. }
            | Stmt::Continue { span, .. }
            | Stmt::Labeled { span, .. } => *span,
            Stmt::Empty(span) => *span,
        }
    }
}

/// An expression with its identity and location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Identity within the unit.
    pub id: NodeId,
    /// What the expression is.
    pub kind: ExprKind,
    /// Location of the expression.
    pub span: Span,
}

/// Expression variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// An unqualified name.
    Ident(Ident),
    /// `42`
    IntLiteral(i64),
    /// `1.5`
    DoubleLiteral(f64),
    /// `'text'`
    StringLiteral(String),
    /// `true` / `false`
    BoolLiteral(bool),
    /// `null`
    Null,
    /// `this`
    This,
    /// `super`
    Super,
    /// `target.name`
    Property {
        /// The receiver.
        target: Box<Expr>,
        /// The accessed name.
        name: Name,
    },
    /// `callee(args)`
    Call {
        /// The called expression.
        callee: Box<Expr>,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// `new T(args)`
    New {
        /// The instantiated type.
        ty: TypeRef,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// A prefix operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `e is T` / `e is! T`
    Is {
        /// The tested expression.
        expr: Box<Expr>,
        /// The tested type.
        ty: TypeRef,
        /// `true` for `is!`.
        negated: bool,
    },
    /// `c ? a : b`
    Conditional {
        /// The condition.
        condition: Box<Expr>,
        /// Value when the condition holds.
        then_expr: Box<Expr>,
        /// Value otherwise.
        else_expr: Box<Expr>,
    },
    /// `target = value`
    Assign {
        /// The assigned location.
        target: Box<Expr>,
        /// The assigned value.
        value: Box<Expr>,
    },
}

/// Prefix operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// Binary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Returns `true` for comparison and equality operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Returns `true` for `&&` and `||`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}
