//! Declaration parsing: classes, functions, accessors and variable lists.

use crate::ast::*;
use crate::parser::{ParseMode, Parser};
use crate::token::TokenKind;
use strand_source::Span;

impl Parser<'_> {
    /// Parses one top-level declaration. Returns `None` after reporting an error.
    pub(crate) fn parse_declaration(&mut self) -> Option<Declaration> {
        let start = self.current_span();
        match self.current() {
            TokenKind::Class => Some(Declaration::Class(self.parse_class())),
            TokenKind::Var | TokenKind::Final | TokenKind::Const => {
                Some(Declaration::Variables(self.parse_keyword_variables(false)))
            }
            TokenKind::Void => {
                self.advance();
                let ret = ReturnType::Void(self.prev_span());
                Some(Declaration::Function(
                    self.parse_function_rest(start, false, Some(ret)),
                ))
            }
            TokenKind::Identifier => Some(self.parse_named_declaration(start, false).into_decl()),
            _ => {
                self.expected("declaration");
                self.recover_to_semicolon();
                None
            }
        }
    }

    /// Parses a declaration that starts with an identifier: a function
    /// without a return type, or a type followed by a function, accessor or
    /// variable list.
    fn parse_named_declaration(&mut self, start: Span, is_static: bool) -> Named {
        if self.at_accessor() || self.peek_kind(1) == TokenKind::LeftParen {
            return Named::Function(self.parse_function_rest(start, is_static, None));
        }
        let ty = self.parse_type_ref();
        if self.at_accessor() || self.peek_kind(1) == TokenKind::LeftParen {
            return Named::Function(self.parse_function_rest(
                start,
                is_static,
                Some(ReturnType::Type(ty)),
            ));
        }
        Named::Variables(self.parse_variable_list(start, VarKeyword::Typed, Some(ty), is_static))
    }

    fn at_accessor(&self) -> bool {
        (self.at_contextual("get") || self.at_contextual("set"))
            && self.peek_kind(1) == TokenKind::Identifier
    }

    /// Parses `var|final|const [T] x [= e], ...;`.
    pub(crate) fn parse_keyword_variables(&mut self, is_static: bool) -> VariableDecl {
        let start = self.current_span();
        let keyword = match self.current() {
            TokenKind::Final => VarKeyword::Final,
            TokenKind::Const => VarKeyword::Const,
            _ => VarKeyword::Var,
        };
        self.advance();
        let ty = if self.at_typed_name() {
            Some(self.parse_type_ref())
        } else {
            None
        };
        self.parse_variable_list(start, keyword, ty, is_static)
    }

    /// Returns `true` if the tokens ahead read `T name` or `p.T name`.
    pub(crate) fn at_typed_name(&self) -> bool {
        if self.current() != TokenKind::Identifier {
            return false;
        }
        match self.peek_kind(1) {
            TokenKind::Identifier => true,
            TokenKind::Dot => {
                self.peek_kind(2) == TokenKind::Identifier
                    && self.peek_kind(3) == TokenKind::Identifier
            }
            _ => false,
        }
    }

    pub(crate) fn parse_variable_list(
        &mut self,
        start: Span,
        keyword: VarKeyword,
        ty: Option<TypeRef>,
        is_static: bool,
    ) -> VariableDecl {
        let mut variables = Vec::new();
        loop {
            let name = self.expect_ident();
            let initializer = if self.eat(TokenKind::Assign) {
                Some(self.parse_expr())
            } else {
                None
            };
            variables.push(VariableDeclarator {
                name,
                initializer,
                span: self.span_from(name.span),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::Semicolon) {
            self.recover_to_semicolon();
        }
        VariableDecl {
            keyword,
            ty,
            is_static,
            variables,
            span: self.span_from(start),
        }
    }

    /// Parses `T` or `p.T`.
    pub(crate) fn parse_type_ref(&mut self) -> TypeRef {
        let start = self.current_span();
        let first = self.expect_ident();
        if self.at(TokenKind::Dot) && self.peek_kind(1) == TokenKind::Identifier {
            self.advance();
            let name = self.expect_ident();
            return TypeRef {
                prefix: Some(first),
                name,
                span: self.span_from(start),
            };
        }
        TypeRef {
            prefix: None,
            name: first,
            span: self.span_from(start),
        }
    }

    /// Parses the remainder of a function after its return type.
    fn parse_function_rest(
        &mut self,
        start: Span,
        is_static: bool,
        return_type: Option<ReturnType>,
    ) -> FunctionDecl {
        let kind = if self.at_accessor() {
            let kind = if self.at_contextual("get") {
                FunctionKind::Getter
            } else {
                FunctionKind::Setter
            };
            self.advance();
            kind
        } else {
            FunctionKind::Normal
        };
        let name = self.expect_ident();
        let (params, has_param_list) = if kind == FunctionKind::Getter && !self.at(TokenKind::LeftParen) {
            (Vec::new(), false)
        } else {
            (self.parse_params(), true)
        };
        let body = self.parse_function_body();
        FunctionDecl {
            name,
            kind,
            is_static,
            return_type,
            params,
            has_param_list,
            body,
            span: self.span_from(start),
        }
    }

    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if !self.expect(TokenKind::LeftParen) {
            return params;
        }
        if self.eat(TokenKind::RightParen) {
            return params;
        }
        loop {
            let start = self.current_span();
            let is_final = self.eat(TokenKind::Final);
            let ty = if self.at_typed_name() {
                Some(self.parse_type_ref())
            } else {
                None
            };
            let name = self.expect_ident();
            params.push(Param {
                name,
                ty,
                is_final,
                span: self.span_from(start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RightParen) {
            while !self.at_eof()
                && !self.at(TokenKind::RightParen)
                && !self.at(TokenKind::LeftBrace)
                && !self.at(TokenKind::Arrow)
            {
                self.advance();
            }
            self.eat(TokenKind::RightParen);
        }
        params
    }

    fn parse_function_body(&mut self) -> FunctionBody {
        match self.current() {
            TokenKind::Arrow => {
                self.advance();
                if self.mode == ParseMode::Diet {
                    return FunctionBody::Skipped(self.skip_expression_body());
                }
                let expr = self.parse_expr();
                if !self.expect(TokenKind::Semicolon) {
                    self.recover_to_semicolon();
                }
                FunctionBody::Expression(expr)
            }
            TokenKind::LeftBrace => {
                if self.mode == ParseMode::Diet {
                    return FunctionBody::Skipped(self.skip_braces());
                }
                FunctionBody::Block(self.parse_block())
            }
            TokenKind::Semicolon => {
                self.advance();
                FunctionBody::Empty
            }
            _ => {
                self.expected("function body");
                self.recover_to_semicolon();
                FunctionBody::Empty
            }
        }
    }

    fn parse_class(&mut self) -> ClassDecl {
        let start = self.current_span();
        self.advance();
        let name = self.expect_ident();
        let extends = if self.eat(TokenKind::Extends) {
            Some(self.parse_type_ref())
        } else {
            None
        };
        let mut implements = Vec::new();
        if self.eat(TokenKind::Implements) {
            implements.push(self.parse_type_ref());
            while self.eat(TokenKind::Comma) {
                implements.push(self.parse_type_ref());
            }
        }
        let mut members = Vec::new();
        if self.expect(TokenKind::LeftBrace) {
            while !self.at_eof() && !self.at(TokenKind::RightBrace) {
                let before = self.pos;
                if let Some(member) = self.parse_member() {
                    members.push(member);
                }
                if self.pos == before {
                    self.advance();
                }
            }
            self.expect(TokenKind::RightBrace);
        }
        ClassDecl {
            name,
            extends,
            implements,
            members,
            span: self.span_from(start),
        }
    }

    fn parse_member(&mut self) -> Option<Member> {
        let start = self.current_span();
        let is_static = self.eat(TokenKind::Static);
        match self.current() {
            TokenKind::Var | TokenKind::Final | TokenKind::Const => {
                let mut field = self.parse_keyword_variables(is_static);
                field.span = self.span_from(start);
                Some(Member::Field(field))
            }
            TokenKind::Void => {
                self.advance();
                let ret = ReturnType::Void(self.prev_span());
                Some(Member::Method(self.parse_function_rest(
                    start,
                    is_static,
                    Some(ret),
                )))
            }
            TokenKind::Identifier => Some(match self.parse_named_declaration(start, is_static) {
                Named::Function(f) => Member::Method(f),
                Named::Variables(v) => Member::Field(v),
            }),
            _ => {
                self.expected("class member");
                self.recover_to_semicolon();
                None
            }
        }
    }
}

enum Named {
    Function(FunctionDecl),
    Variables(VariableDecl),
}

impl Named {
    fn into_decl(self) -> Declaration {
        match self {
            Named::Function(f) => Declaration::Function(f),
            Named::Variables(v) => Declaration::Variables(v),
        }
    }
}
