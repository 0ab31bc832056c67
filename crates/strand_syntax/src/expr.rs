//! Pratt expression parser.
//!
//! | BP (L,R) | Operators |
//! |----------|-----------|
//! | (1,2)    | `||` |
//! | (3,4)    | `&&` |
//! | (5,6)    | `==` `!=` |
//! | (7,8)    | `<` `<=` `>` `>=` `is` `is!` |
//! | (9,10)   | `+` `-` |
//! | (11,12)  | `*` `/` `%` |
//! | prefix 13 | `!` `-` |
//!
//! Assignment and `? :` sit below every binary operator and are right-associative.

use crate::ast::*;
use crate::lexer::unescape_string;
use crate::parser::Parser;
use crate::token::TokenKind;

const IS_BP: u8 = 7;
const PREFIX_BP: u8 = 13;

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::BangEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

/// Binding power for binary operators. Returns (left_bp, right_bp).
fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Or => (1, 2),
        BinaryOp::And => (3, 4),
        BinaryOp::Eq | BinaryOp::NotEq => (5, 6),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (7, 8),
        BinaryOp::Add | BinaryOp::Sub => (9, 10),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => (11, 12),
    }
}

impl Parser<'_> {
    /// Parses an expression, including assignment.
    pub fn parse_expr(&mut self) -> Expr {
        let lhs = self.parse_conditional();
        if self.at(TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr();
            let span = lhs.span.merge(value.span);
            return self.node(
                ExprKind::Assign {
                    target: Box::new(lhs),
                    value: Box::new(value),
                },
                span,
            );
        }
        lhs
    }

    fn parse_conditional(&mut self) -> Expr {
        let condition = self.parse_expr_bp(0);
        if !self.eat(TokenKind::Question) {
            return condition;
        }
        let then_expr = self.parse_expr();
        self.expect(TokenKind::Colon);
        let else_expr = self.parse_expr();
        let span = condition.span.merge(else_expr.span);
        self.node(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        )
    }

    /// Parses a binary expression with minimum binding power.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_prefix_expr();
        loop {
            if self.at(TokenKind::Is) {
                if IS_BP < min_bp {
                    break;
                }
                self.advance();
                let negated = self.eat(TokenKind::Bang);
                let ty = self.parse_type_ref();
                let span = lhs.span.merge(ty.span);
                lhs = self.node(
                    ExprKind::Is {
                        expr: Box::new(lhs),
                        ty,
                        negated,
                    },
                    span,
                );
                continue;
            }
            let Some(op) = binary_op(self.current()) else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = self.node(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn parse_prefix_expr(&mut self) -> Expr {
        let start = self.current_span();
        let op = match self.current() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix_expr(),
        };
        self.advance();
        let operand = self.parse_expr_bp(PREFIX_BP);
        let span = start.merge(operand.span);
        self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn parse_postfix_expr(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match self.current() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_ident();
                    let span = expr.span.merge(name.span);
                    expr = self.node(
                        ExprKind::Property {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                TokenKind::LeftParen => {
                    let args = self.parse_args();
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        self.expect(TokenKind::LeftParen);
        if self.eat(TokenKind::RightParen) {
            return args;
        }
        loop {
            args.push(self.parse_expr());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen);
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let span = self.current_span();
        let kind = match self.current() {
            TokenKind::Identifier => {
                let ident = self.interner.get_or_intern(self.current_text());
                self.advance();
                ExprKind::Ident(ident)
            }
            TokenKind::IntLiteral => {
                let value = match self.current_text().parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.expected("integer that fits in 64 bits");
                        0
                    }
                };
                self.advance();
                ExprKind::IntLiteral(value)
            }
            TokenKind::DoubleLiteral => {
                let value = self.current_text().parse::<f64>().unwrap_or(0.0);
                self.advance();
                ExprKind::DoubleLiteral(value)
            }
            TokenKind::StringLiteral => {
                let value = unescape_string(self.current_text());
                self.advance();
                ExprKind::StringLiteral(value)
            }
            TokenKind::True | TokenKind::False => {
                let value = self.at(TokenKind::True);
                self.advance();
                ExprKind::BoolLiteral(value)
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Null
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Super => {
                self.advance();
                ExprKind::Super
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RightParen);
                return inner;
            }
            TokenKind::New => {
                self.advance();
                let ty = self.parse_type_ref();
                let args = if self.at(TokenKind::LeftParen) {
                    self.parse_args()
                } else {
                    self.expected("'('");
                    Vec::new()
                };
                let span = self.span_from(span);
                return self.node(ExprKind::New { ty, args }, span);
            }
            _ => {
                self.expected("expression");
                ExprKind::Null
            }
        };
        self.node(kind, span)
    }

    fn node(&mut self, kind: ExprKind, span: strand_source::Span) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
            span,
        }
    }
}
