//! Core parser state and the handful of helpers every precedence level and
//! item parser shares: token lookahead, `expect`, and diagnostic emission.
//! The grammar itself is split across sibling files by concern, mirroring
//! the lexer's "one file, one job" layout: `items` for top-level
//! declarations, `types` for type expressions, `statements` for the
//! function-body statement set, `operators`/`primaries` for the expression
//! precedence chain.

mod items;
mod operators;
mod primaries;
mod statements;
mod types;

use mach_ast::{Ast, Node, NodeId, NodeKind, Token, TokenKind};
use mach_diagnostics::{error_codes, Diagnostic, Span, Stage};

/// Holds the whole token stream up front rather than re-lexing on demand —
/// a `.mach` file is small enough that re-tokenizing piecemeal buys nothing.
pub struct Parser<'a> {
    source: &'a str,
    file: String,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, file: &str) -> Self {
        Self {
            source,
            file: file.to_string(),
            tokens: mach_lexer::lex_all(source),
            pos: 0,
            ast: Ast::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Top-level entry point: `use`/`val`/`var`/`def`/`fun`/`str`/`uni`/`ext`
    /// items until `Eof`. Anything else at this level is consumed one token
    /// at a time as an `Error` node, so a run of garbage can never loop.
    pub fn parse_program(&mut self) -> Ast {
        let mut items = Vec::new();
        while !self.is_at_end() {
            let before = self.pos;
            items.push(self.parse_top_level_item());
            if self.pos == before {
                self.advance();
            }
        }
        let root = self
            .ast
            .alloc(Node::new(NodeKind::Program { items: items.clone() }, Token::eof(self.source.len() as u32)));
        for item in items {
            self.ast.set_parent(item, root);
        }
        self.ast.root = Some(root);
        std::mem::take(&mut self.ast)
    }

    fn peek(&self) -> Token {
        self.tokens.get(self.pos).copied().unwrap_or_else(|| Token::eof(self.source.len() as u32))
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// The text an identifier-shaped token spans, used to recognise the
    /// contextual `as` keyword without reserving it in the lexer.
    fn peek_text(&self) -> &'a str {
        self.peek().text(self.source)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_of(&self, token: Token) -> Span {
        Span::from_offset(self.file.clone(), self.source, token.offset as usize, token.length as usize)
    }

    /// Non-aborting "expect": on a match, consumes and returns the token. On
    /// a mismatch it records a diagnostic and returns the unexpected token
    /// without consuming it, so the caller's surrounding list/block loop —
    /// which always has its own `Eof`/closer-based terminator — still makes
    /// progress instead of the parser getting stuck retrying the same spot.
    fn expect(&mut self, kind: TokenKind, what: &str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            let token = self.peek();
            self.error_at(token, format!("expected {what}, found {:?}", token.kind));
            token
        }
    }

    fn error_at(&mut self, token: Token, message: impl Into<String>) {
        let span = self.span_of(token);
        self.diagnostics
            .push(Diagnostic::error(Stage::Parser, error_codes::UNEXPECTED_TOKEN, message, span));
    }

    /// Allocate an `Error` node for the given token, recording a diagnostic
    /// for it, without consuming anything. Used by the top-level/statement
    /// dispatch's catch-all arm — the arm's own caller is responsible for
    /// consuming the bad token so overall progress is still guaranteed.
    fn error_node(&mut self, token: Token, message: impl Into<String>) -> NodeId {
        let message = message.into();
        self.error_at(token, message.clone());
        self.ast.alloc(Node::new(NodeKind::Error { message }, token))
    }

    fn ident_name(&mut self, what: &str) -> String {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            token.text(self.source).to_string()
        } else {
            let token = self.peek();
            self.error_at(token, format!("expected {what}, found {:?}", token.kind));
            String::new()
        }
    }
}
