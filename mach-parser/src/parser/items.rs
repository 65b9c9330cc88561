//! Top-level item parsing: `use`, `val`/`var`, `def`, `fun`, `str`/`uni`,
//! `ext`. Everything here is terminated by `;` or a `{ ... }` block, so the
//! only place progress can stall is the catch-all arm in `parse_top_level_item`,
//! which always consumes exactly one token.

use mach_ast::{Node, NodeId, NodeKind, Param, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_top_level_item(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::Use => self.parse_use_decl(),
            TokenKind::Val => self.parse_top_level_var_decl(false),
            TokenKind::Var => self.parse_top_level_var_decl(true),
            TokenKind::Def => self.parse_type_alias(),
            TokenKind::Fun => self.parse_fun_decl(),
            TokenKind::Str => self.parse_record_decl(false),
            TokenKind::Uni => self.parse_record_decl(true),
            TokenKind::Ext => self.parse_extern_decl(),
            _ => {
                let token = self.advance();
                self.error_node(token, format!("expected a top-level item, found {:?}", token.kind))
            }
        }
    }

    fn parse_top_level_var_decl(&mut self, is_mutable: bool) -> NodeId {
        let decl = self.parse_var_decl_body(is_mutable);
        self.expect(TokenKind::Semicolon, "';'");
        decl
    }

    /// `use A.B.C;` or the aliased form `use name: A.B.C;` — distinguished
    /// by whether the segment right after `use` is followed by `:`.
    fn parse_use_decl(&mut self) -> NodeId {
        let token = self.advance();

        let alias = if self.check(TokenKind::Identifier)
            && self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::Colon)
        {
            let name = self.ident_name("an alias name");
            self.advance();
            Some(name)
        } else {
            None
        };

        let mut path = vec![self.ident_name("a module path segment")];
        while self.match_token(TokenKind::Dot) {
            path.push(self.ident_name("a module path segment"));
        }
        self.expect(TokenKind::Semicolon, "';'");

        self.ast.alloc(Node::new(NodeKind::UseDecl { path, alias }, token))
    }

    /// `def Name: Target;` — a type alias declaration.
    fn parse_type_alias(&mut self) -> NodeId {
        let token = self.advance();
        let name = self.ident_name("a type alias name");
        self.expect(TokenKind::Colon, "':'");
        let target = self.parse_type();
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::TypeAlias { name, target }, token))
    }

    /// `fun name<T,U>(params): ret { body }`. Used both for ordinary
    /// function declarations and, inside `ext` blocks, for signature-only
    /// declarations where the body is a bare `;` instead of a block.
    pub(crate) fn parse_fun_decl(&mut self) -> NodeId {
        let token = self.advance();
        let name = self.ident_name("a function name");
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LParen, "'('");
        let (params, is_variadic) = self.parse_param_list();
        self.expect(TokenKind::RParen, "')'");
        let return_type = if self.match_token(TokenKind::Colon) { Some(self.parse_type()) } else { None };
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            self.expect(TokenKind::Semicolon, "';' or a function body");
            None
        };
        self.ast.alloc(Node::new(
            NodeKind::FunDecl {
                name,
                type_params,
                params,
                return_type,
                body,
                is_variadic,
            },
            token,
        ))
    }

    fn parse_type_params(&mut self) -> Vec<String> {
        let mut type_params = Vec::new();
        if self.match_token(TokenKind::Lt) {
            while !self.check(TokenKind::Gt) && !self.is_at_end() {
                type_params.push(self.ident_name("a type parameter name"));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, "'>'");
        }
        type_params
    }

    /// `name: type` pairs, with a trailing `...` marking the function
    /// variadic (no name attached to the ellipsis itself).
    fn parse_param_list(&mut self) -> (Vec<Param>, bool) {
        let mut params = Vec::new();
        let mut is_variadic = false;
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            if self.looking_at_ellipsis() {
                self.consume_ellipsis();
                is_variadic = true;
                break;
            }
            let name = self.ident_name("a parameter name");
            self.expect(TokenKind::Colon, "':'");
            let type_expr = self.parse_type();
            params.push(Param { name, type_expr });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        (params, is_variadic)
    }

    /// `str Name<T> { field: type; ... }` / `uni Name<T> { ... }`.
    fn parse_record_decl(&mut self, is_union: bool) -> NodeId {
        let token = self.advance();
        let name = self.ident_name("a record name");
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LBrace, "'{'");
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let field_name = self.ident_name("a field name");
            self.expect(TokenKind::Colon, "':'");
            let field_type = self.parse_type();
            self.expect(TokenKind::Semicolon, "';'");
            fields.push((field_name, field_type));
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.ast.alloc(Node::new(
            NodeKind::RecordDecl {
                is_union,
                name,
                type_params,
                fields,
            },
            token,
        ))
    }

    /// `ext "C" { fun foo(...): T; ... }` — every item inside the block must
    /// be a `fun` signature; anything else becomes an `Error` node without
    /// aborting the rest of the block.
    fn parse_extern_decl(&mut self) -> NodeId {
        let token = self.advance();
        let abi_token = self.expect(TokenKind::StringLiteral, "an ABI string literal");
        let raw = abi_token.text(self.source);
        let abi = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("").to_string();
        self.expect(TokenKind::LBrace, "'{'");

        let mut functions = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.check(TokenKind::Fun) {
                functions.push(self.parse_fun_decl());
            } else {
                let bad = self.advance();
                let message = format!("expected 'fun' inside an ext block, found {:?}", bad.kind);
                functions.push(self.error_node(bad, message));
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.ast.alloc(Node::new(NodeKind::ExternDecl { abi, functions }, token))
    }
}
