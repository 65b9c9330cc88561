//! The function-body statement set: blocks, `if`/`or`, `for`, `brk`/`cnt`,
//! `ret`, inline `asm`, local `val`/`var`, and bare expression statements.
//! `or` with no condition is the else branch; `or` appearing without a
//! leading `if` never reaches this file — `parse_if_stmt` is the only
//! caller that consumes `Or` tokens.

use mach_ast::{Node, NodeId, NodeKind, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::Val => self.parse_local_var_decl(false),
            TokenKind::Var => self.parse_local_var_decl(true),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Brk => self.parse_break_stmt(),
            TokenKind::Cnt => self.parse_continue_stmt(),
            TokenKind::Ret => self.parse_return_stmt(),
            TokenKind::Asm => self.parse_asm_stmt(),
            TokenKind::LBrace => self.parse_block(),
            _ => self.parse_expr_stmt(),
        }
    }

    /// `{ stmt* }`. Bounded by `RBrace`/`Eof`, so a missing closer still
    /// terminates instead of looping.
    pub(crate) fn parse_block(&mut self) -> NodeId {
        let token = self.expect(TokenKind::LBrace, "'{'");
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        let block = self.ast.alloc(Node::new(NodeKind::Block { statements: statements.clone() }, token));
        for stmt in statements {
            self.ast.set_parent(stmt, block);
        }
        block
    }

    /// `if (cond) { } or (cond2) { } or { }` — parenthesized conditions, an
    /// `or` with no parenthesized condition is the terminal else branch.
    fn parse_if_stmt(&mut self) -> NodeId {
        let token = self.advance();
        self.expect(TokenKind::LParen, "'('");
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "')'");
        let then_block = self.parse_block();

        let mut or_branches = Vec::new();
        while self.check(TokenKind::Or) {
            self.advance();
            if self.match_token(TokenKind::LParen) {
                let branch_condition = self.parse_expr();
                self.expect(TokenKind::RParen, "')'");
                let branch_block = self.parse_block();
                or_branches.push((Some(branch_condition), branch_block));
            } else {
                let branch_block = self.parse_block();
                or_branches.push((None, branch_block));
                break;
            }
        }

        self.ast.alloc(Node::new(
            NodeKind::If {
                condition,
                then_block,
                or_branches,
            },
            token,
        ))
    }

    /// `for { body }` loops forever; `for (init?; cond?; post?) { body }`
    /// is the three-clause form, every clause independently optional.
    fn parse_for_stmt(&mut self) -> NodeId {
        let token = self.advance();
        let (init, condition, post) = if self.match_token(TokenKind::LParen) {
            let init = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_for_clause()) };
            self.expect(TokenKind::Semicolon, "';'");
            let condition = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()) };
            self.expect(TokenKind::Semicolon, "';'");
            let post = if self.check(TokenKind::RParen) { None } else { Some(self.parse_for_clause()) };
            self.expect(TokenKind::RParen, "')'");
            (init, condition, post)
        } else {
            (None, None, None)
        };
        let body = self.parse_block();
        self.ast.alloc(Node::new(NodeKind::For { init, condition, post, body }, token))
    }

    /// A `for` clause is a local declaration or an expression, without the
    /// `;` the surrounding three-clause header already owns.
    fn parse_for_clause(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::Val => self.parse_var_decl_body(false),
            TokenKind::Var => self.parse_var_decl_body(true),
            _ => {
                let token = self.peek();
                let expr = self.parse_expr();
                self.ast.alloc(Node::new(NodeKind::ExprStmt { expr }, token))
            }
        }
    }

    fn parse_break_stmt(&mut self) -> NodeId {
        let token = self.advance();
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::Break, token))
    }

    fn parse_continue_stmt(&mut self) -> NodeId {
        let token = self.advance();
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::Continue, token))
    }

    fn parse_return_stmt(&mut self) -> NodeId {
        let token = self.advance();
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()) };
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::Return { value }, token))
    }

    /// `asm "text";` — the body is the decoded contents of the string
    /// literal, passed through to the backend uninterpreted.
    fn parse_asm_stmt(&mut self) -> NodeId {
        let token = self.advance();
        let text_token = self.expect(TokenKind::StringLiteral, "a string literal");
        let raw = text_token.text(self.source);
        let body = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("").to_string();
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::Asm { body }, token))
    }

    fn parse_expr_stmt(&mut self) -> NodeId {
        let token = self.peek();
        let expr = self.parse_expr();
        self.expect(TokenKind::Semicolon, "';'");
        self.ast.alloc(Node::new(NodeKind::ExprStmt { expr }, token))
    }

    fn parse_local_var_decl(&mut self, is_mutable: bool) -> NodeId {
        let decl = self.parse_var_decl_body(is_mutable);
        self.expect(TokenKind::Semicolon, "';'");
        decl
    }

    /// `val`/`var` name `(: type)?` `= value`, without consuming the
    /// trailing `;` — shared by the local-statement form (which expects it
    /// immediately after) and the `for`-clause form (which leaves it to the
    /// loop header).
    pub(crate) fn parse_var_decl_body(&mut self, is_mutable: bool) -> NodeId {
        let token = self.advance();
        let name = self.ident_name("a variable name");
        let type_expr = if self.match_token(TokenKind::Colon) { Some(self.parse_type()) } else { None };
        self.expect(TokenKind::Eq, "'='");
        let value = self.parse_expr();
        self.ast.alloc(Node::new(
            NodeKind::VarDecl {
                is_mutable,
                name,
                type_expr,
                value,
            },
            token,
        ))
    }
}
