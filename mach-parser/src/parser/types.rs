//! Type expressions: `?T` pointer, `[N]T` / `[]T` array, `fun(T,...): R`
//! function type, and plain/generic names. None of these are ambiguous with
//! an expression at the point they're parsed, so — unlike the generic
//! call-site syntax in `primaries.rs` — no backtracking is needed here.

use mach_ast::{Node, NodeId, NodeKind, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_type(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::Question => self.parse_pointer_type(),
            TokenKind::LBracket => self.parse_array_type(),
            TokenKind::Fun => self.parse_function_type(),
            TokenKind::Identifier => self.parse_type_name(),
            _ => {
                let token = self.advance();
                self.error_node(token, format!("expected a type, found {:?}", token.kind))
            }
        }
    }

    /// `?` alone is the untyped pointer; `?T` points at `T`.
    fn parse_pointer_type(&mut self) -> NodeId {
        let token = self.advance();
        let base = if self.starts_type() { Some(self.parse_type()) } else { None };
        self.ast.alloc(Node::new(NodeKind::TypePointer { base }, token))
    }

    /// `[]T` is the unbounded form; `[N]T` carries a fixed element count.
    fn parse_array_type(&mut self) -> NodeId {
        let token = self.advance();
        let size = if self.check(TokenKind::RBracket) {
            None
        } else {
            let size_token = self.expect(TokenKind::IntLiteral, "an array size");
            mach_lexer::parse_int_literal(size_token.text(self.source))
        };
        self.expect(TokenKind::RBracket, "']'");
        let element = self.parse_type();
        self.ast.alloc(Node::new(NodeKind::TypeArray { element, size }, token))
    }

    /// `fun(T1, T2, ...): R` — the trailing `...` marks the type variadic;
    /// `: R` is omitted for a function type returning nothing.
    fn parse_function_type(&mut self) -> NodeId {
        let token = self.advance();
        self.expect(TokenKind::LParen, "'('");
        let mut params = Vec::new();
        let mut variadic = false;
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            if self.looking_at_ellipsis() {
                self.consume_ellipsis();
                variadic = true;
                break;
            }
            params.push(self.parse_type());
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'");
        let ret = if self.match_token(TokenKind::Colon) { Some(self.parse_type()) } else { None };
        self.ast.alloc(Node::new(NodeKind::TypeFunction { params, ret, variadic }, token))
    }

    /// Plain name, optionally followed by `<T1, T2>` generic arguments.
    fn parse_type_name(&mut self) -> NodeId {
        let token = self.peek();
        let name = self.ident_name("a type name");
        let mut type_args = Vec::new();
        if self.match_token(TokenKind::Lt) {
            while !self.check(TokenKind::Gt) && !self.is_at_end() {
                type_args.push(self.parse_type());
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, "'>'");
        }
        self.ast.alloc(Node::new(NodeKind::TypeName { name, type_args }, token))
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Question | TokenKind::LBracket | TokenKind::Fun | TokenKind::Identifier
        )
    }

    /// The lexer has no dedicated ellipsis token, so a variadic marker is
    /// three consecutive `.` tokens with no whitespace-sensitive meaning
    /// lost: `...` is never otherwise valid inside a parameter list.
    pub(crate) fn looking_at_ellipsis(&self) -> bool {
        self.peek_kind() == TokenKind::Dot
            && self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::Dot)
            && self.tokens.get(self.pos + 2).map(|t| t.kind) == Some(TokenKind::Dot)
    }

    pub(crate) fn consume_ellipsis(&mut self) {
        self.advance();
        self.advance();
        self.advance();
    }
}
