//! Postfix chain (`()`, `[]`, `.`, `as`, and the speculative `<T>` generic
//! call) plus primary expressions: literals, identifiers, parenthesized
//! sub-expressions, and `new(Type){ field: value, ... }` composite
//! literals.

use mach_ast::{Node, NodeId, NodeKind, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    /// `(...)`, `[...]`, `.field`, `as T`, and a generic call `<T>(...)` all
    /// chain at the same, tightest level, left to right.
    pub(crate) fn parse_postfix(&mut self) -> NodeId {
        let mut expr = self.parse_primary();
        loop {
            match self.peek_kind() {
                TokenKind::LParen => expr = self.parse_call(expr, Vec::new()),
                TokenKind::LBracket => expr = self.parse_index(expr),
                TokenKind::Dot => expr = self.parse_member(expr),
                TokenKind::Lt => {
                    if let Some(type_args) = self.try_parse_generic_call_type_args() {
                        expr = self.parse_call(expr, type_args);
                    } else {
                        break;
                    }
                }
                TokenKind::Identifier if self.peek_text() == "as" => expr = self.parse_cast(expr),
                _ => break,
            }
        }
        expr
    }

    fn parse_call(&mut self, callee: NodeId, type_args: Vec<NodeId>) -> NodeId {
        let token = self.expect(TokenKind::LParen, "'('");
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_expr());
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'");
        self.ast.alloc(Node::new(NodeKind::Call { callee, type_args, args }, token))
    }

    fn parse_index(&mut self, object: NodeId) -> NodeId {
        let token = self.advance();
        let index = self.parse_expr();
        self.expect(TokenKind::RBracket, "']'");
        self.ast.alloc(Node::new(NodeKind::Index { object, index }, token))
    }

    fn parse_member(&mut self, object: NodeId) -> NodeId {
        let token = self.advance();
        let field = self.ident_name("a field name");
        self.ast.alloc(Node::new(NodeKind::Member { object, field }, token))
    }

    /// `as` is not a reserved keyword (it is absent from the keyword table),
    /// so it is recognised here as an `Identifier` token whose text is
    /// exactly `"as"`, only at postfix precedence.
    fn parse_cast(&mut self, expr: NodeId) -> NodeId {
        let token = self.advance();
        let target_type = self.parse_type();
        self.ast.alloc(Node::new(NodeKind::Cast { expr, target_type }, token))
    }

    /// `id<i32>(3)` versus `a < b > (c)`: speculatively parse a `<...>`
    /// type-argument list and commit only if it is immediately followed by
    /// `(`; otherwise the position is restored and the caller falls through
    /// to treating `<` as the relational operator.
    fn try_parse_generic_call_type_args(&mut self) -> Option<Vec<NodeId>> {
        let checkpoint = self.pos;
        let diagnostics_checkpoint = self.diagnostics.len();
        self.advance(); // '<'
        let mut type_args = Vec::new();
        loop {
            if self.check(TokenKind::Gt) || self.is_at_end() {
                break;
            }
            type_args.push(self.parse_type());
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        let matched = self.match_token(TokenKind::Gt) && self.check(TokenKind::LParen);
        if matched {
            Some(type_args)
        } else {
            self.pos = checkpoint;
            self.diagnostics.truncate(diagnostics_checkpoint);
            None
        }
    }

    pub(crate) fn parse_primary(&mut self) -> NodeId {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = mach_lexer::parse_int_literal(token.text(self.source)).unwrap_or(0);
                self.ast.alloc(Node::new(NodeKind::IntLiteral { value }, token))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = token.text(self.source).replace('_', "").parse().unwrap_or(0.0);
                self.ast.alloc(Node::new(NodeKind::FloatLiteral { value }, token))
            }
            TokenKind::CharLiteral => {
                self.advance();
                let raw = token.text(self.source);
                let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
                let value = unescape(inner).first().copied().unwrap_or(0);
                self.ast.alloc(Node::new(NodeKind::CharLiteral { value }, token))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let raw = token.text(self.source);
                let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
                let value = String::from_utf8_lossy(&unescape(inner)).into_owned();
                self.ast.alloc(Node::new(NodeKind::StringLiteral { value }, token))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = token.text(self.source).to_string();
                self.ast.alloc(Node::new(NodeKind::Ident { name }, token))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RParen, "')'");
                inner
            }
            TokenKind::New => self.parse_new_expr(),
            _ => {
                self.advance();
                self.error_node(token, format!("expected an expression, found {:?}", token.kind))
            }
        }
    }

    /// `new(Type){ field: value, ... }` — a composite literal.
    fn parse_new_expr(&mut self) -> NodeId {
        let token = self.advance();
        self.expect(TokenKind::LParen, "'('");
        let type_expr = self.parse_type();
        self.expect(TokenKind::RParen, "')'");
        self.expect(TokenKind::LBrace, "'{'");
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let name = self.ident_name("a field name");
            self.expect(TokenKind::Colon, "':'");
            let value = self.parse_expr();
            fields.push((name, value));
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.ast.alloc(Node::new(NodeKind::New { type_expr, fields }, token))
    }
}

/// Decode the deliberately narrow escape set this language admits: only
/// `\\` and `\"`/`\'`. Any other character following a backslash is not a
/// recognised escape, so the backslash is kept literally rather than
/// silently dropped — the lexer's `\\.` grammar accepts the pair as
/// well-formed, but decoding it into something other than two characters
/// would invent an escape that was never defined.
fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('\\') => out.push(b'\\'),
            Some('\'') => out.push(b'\''),
            Some('"') => out.push(b'"'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_decodes_only_the_narrow_escape_set() {
        assert_eq!(unescape(r#"\"quoted\""#), b"\"quoted\"");
        assert_eq!(unescape(r"back\\slash"), b"back\\slash");
    }

    #[test]
    fn unrecognised_escapes_keep_their_backslash() {
        assert_eq!(unescape(r"a\nb\tc"), br"a\nb\tc");
    }
}
