//! A restartable, single-pass scanner over a byte slice. Lex failures never
//! abort the stream: an unterminated literal is folded into a single
//! `Error`-kind token so the parser can keep going, matching the pipeline's
//! "diagnostics, not exceptions" design.

use logos::Logos;
use mach_ast::{Token, TokenKind};

/// The raw lexeme classes `logos` distinguishes. Several collapse onto the
/// same [`TokenKind`] (the three integer-literal prefixes all become
/// `IntLiteral`) since a `Token` carries no decoded value — only offset and
/// length — so there is nothing further to distinguish once lexing is done.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum Lexeme {
    #[token("use")]
    Use,
    #[token("def")]
    Def,
    #[token("val")]
    Val,
    #[token("var")]
    Var,
    #[token("fun")]
    Fun,
    #[token("str")]
    Str,
    #[token("uni")]
    Uni,
    #[token("if")]
    If,
    #[token("or")]
    Or,
    #[token("for")]
    For,
    #[token("brk")]
    Brk,
    #[token("cnt")]
    Cnt,
    #[token("ret")]
    Ret,
    #[token("ext")]
    Ext,
    #[token("asm")]
    Asm,
    #[token("new")]
    New,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"0[bB][01][01_]*")]
    BinInt,
    #[regex(r"0[oO][0-7][0-7_]*")]
    OctInt,
    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*")]
    HexInt,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    Float,
    #[regex(r"[0-9][0-9_]*")]
    DecInt,

    #[regex(r#"'([^'\\]|\\.)'"#)]
    Char,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("::")]
    ColonColon,
    #[token("->")]
    Arrow,

    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
}

fn map_lexeme(lexeme: Lexeme) -> TokenKind {
    match lexeme {
        Lexeme::Use => TokenKind::Use,
        Lexeme::Def => TokenKind::Def,
        Lexeme::Val => TokenKind::Val,
        Lexeme::Var => TokenKind::Var,
        Lexeme::Fun => TokenKind::Fun,
        Lexeme::Str => TokenKind::Str,
        Lexeme::Uni => TokenKind::Uni,
        Lexeme::If => TokenKind::If,
        Lexeme::Or => TokenKind::Or,
        Lexeme::For => TokenKind::For,
        Lexeme::Brk => TokenKind::Brk,
        Lexeme::Cnt => TokenKind::Cnt,
        Lexeme::Ret => TokenKind::Ret,
        Lexeme::Ext => TokenKind::Ext,
        Lexeme::Asm => TokenKind::Asm,
        Lexeme::New => TokenKind::New,
        Lexeme::Identifier => TokenKind::Identifier,
        Lexeme::BinInt | Lexeme::OctInt | Lexeme::HexInt | Lexeme::DecInt => TokenKind::IntLiteral,
        Lexeme::Float => TokenKind::FloatLiteral,
        Lexeme::Char => TokenKind::CharLiteral,
        Lexeme::String => TokenKind::StringLiteral,
        Lexeme::EqEq => TokenKind::EqEq,
        Lexeme::NotEq => TokenKind::NotEq,
        Lexeme::LtEq => TokenKind::LtEq,
        Lexeme::GtEq => TokenKind::GtEq,
        Lexeme::Shl => TokenKind::Shl,
        Lexeme::Shr => TokenKind::Shr,
        Lexeme::AmpAmp => TokenKind::AmpAmp,
        Lexeme::PipePipe => TokenKind::PipePipe,
        Lexeme::ColonColon => TokenKind::ColonColon,
        Lexeme::Arrow => TokenKind::Arrow,
        Lexeme::Eq => TokenKind::Eq,
        Lexeme::Lt => TokenKind::Lt,
        Lexeme::Gt => TokenKind::Gt,
        Lexeme::Bang => TokenKind::Bang,
        Lexeme::Tilde => TokenKind::Tilde,
        Lexeme::Question => TokenKind::Question,
        Lexeme::At => TokenKind::At,
        Lexeme::Plus => TokenKind::Plus,
        Lexeme::Minus => TokenKind::Minus,
        Lexeme::Star => TokenKind::Star,
        Lexeme::Slash => TokenKind::Slash,
        Lexeme::Percent => TokenKind::Percent,
        Lexeme::Amp => TokenKind::Amp,
        Lexeme::Pipe => TokenKind::Pipe,
        Lexeme::Caret => TokenKind::Caret,
        Lexeme::LParen => TokenKind::LParen,
        Lexeme::RParen => TokenKind::RParen,
        Lexeme::LBrace => TokenKind::LBrace,
        Lexeme::RBrace => TokenKind::RBrace,
        Lexeme::LBracket => TokenKind::LBracket,
        Lexeme::RBracket => TokenKind::RBracket,
        Lexeme::Semicolon => TokenKind::Semicolon,
        Lexeme::Comma => TokenKind::Comma,
        Lexeme::Colon => TokenKind::Colon,
        Lexeme::Dot => TokenKind::Dot,
    }
}

/// Wraps the generated `logos` automaton, translating its lexeme classes
/// into [`mach_ast::Token`] and folding unterminated literals into a single
/// `Error` token instead of bubbling a lex failure out of the iterator.
pub struct Lexer<'source> {
    source: &'source str,
    inner: logos::Lexer<'source, Lexeme>,
    done: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            inner: Lexeme::lexer(source),
            done: false,
        }
    }

    /// `'` or `"` failed to find a matching closer on the same logical
    /// literal attempt. Scan forward to the next occurrence of `quote` or a
    /// newline, whichever comes first, and report that whole span as a
    /// single error token. Returns the number of extra bytes (beyond the
    /// single byte already consumed by the failed match) to skip.
    fn recover_unterminated(&self, start: usize, quote: char) -> usize {
        let rest = &self.source[start + 1..];
        match rest.find(|c: char| c == quote || c == '\n') {
            Some(idx) if rest.as_bytes().get(idx) == Some(&(quote as u8)) => idx + 1,
            Some(idx) => idx,
            None => rest.len(),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            None => {
                self.done = true;
                let offset = self.source.len() as u32;
                Some(Token::eof(offset))
            }
            Some(Ok(lexeme)) => {
                let span = self.inner.span();
                Some(Token::new(map_lexeme(lexeme), span.start as u32, (span.end - span.start) as u32))
            }
            Some(Err(())) => {
                let span = self.inner.span();
                let start = span.start;
                let first_byte = self.source.as_bytes().get(start).copied();
                let extra = match first_byte {
                    Some(b'\'') => self.recover_unterminated(start, '\''),
                    Some(b'"') => self.recover_unterminated(start, '"'),
                    _ => 0,
                };
                if extra > 0 {
                    self.inner.bump(extra);
                }
                let length = (span.end - span.start) + extra;
                Some(Token::new(TokenKind::Error, start as u32, length as u32))
            }
        }
    }
}

/// Lex the entire source to completion, including the trailing `Eof` token.
pub fn lex_all(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Decode an integer literal's text into its value, accepting the same
/// `0b`/`0o`/`0x`/decimal forms (with `_` digit separators) the lexer
/// tokenizes as `IntLiteral`. Shared with `mach-preprocessor`, whose `#@if`
/// expressions reuse this exact number grammar rather than a second one.
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(rest) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        i64::from_str_radix(rest, 2).ok()
    } else if let Some(rest) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        i64::from_str_radix(rest, 8).ok()
    } else if let Some(rest) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        i64::from_str_radix(rest, 16).ok()
    } else {
        cleaned.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_recognised_over_identifiers() {
        assert_eq!(
            kinds("use def val var fun str uni if or for brk cnt ret ext asm new"),
            vec![
                TokenKind::Use,
                TokenKind::Def,
                TokenKind::Val,
                TokenKind::Var,
                TokenKind::Fun,
                TokenKind::Str,
                TokenKind::Uni,
                TokenKind::If,
                TokenKind::Or,
                TokenKind::For,
                TokenKind::Brk,
                TokenKind::Cnt,
                TokenKind::Ret,
                TokenKind::Ext,
                TokenKind::Asm,
                TokenKind::New,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_literal_prefixes_all_collapse_to_int_literal() {
        assert_eq!(
            kinds("10 0b1010 0o17 0xFF 1_000"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_literal_requires_digits_on_both_sides_of_the_dot() {
        let tokens = lex_all("3.14");
        assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[0].length, 4);
    }

    #[test]
    fn compound_punctuators_beat_their_single_character_prefixes() {
        assert_eq!(
            kinds("== != <= >= << >> && || :: ->"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::ColonColon,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn single_character_operators_survive_independently() {
        assert_eq!(
            kinds("= < > ! ~ ? @ + - * / % & | ^"),
            vec![
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Bang,
                TokenKind::Tilde,
                TokenKind::Question,
                TokenKind::At,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Caret,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_becomes_a_single_error_token() {
        let tokens = lex_all("\"hello");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[0].length, 6);
    }

    #[test]
    fn unterminated_string_stops_at_newline_not_eof() {
        let tokens = lex_all("\"hello\nret 0;");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].length, 6);
        assert_eq!(tokens[1].kind, TokenKind::Ret);
    }

    #[test]
    fn well_formed_string_and_char_literals_lex_normally() {
        assert_eq!(
            kinds(r#""a string" 'x'"#),
            vec![TokenKind::StringLiteral, TokenKind::CharLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(kinds("ret // trailing comment\n0;"), vec![TokenKind::Ret, TokenKind::IntLiteral, TokenKind::Semicolon, TokenKind::Eof]);
    }

    #[test]
    fn token_text_slices_the_original_source() {
        let source = "fun main";
        let tokens = lex_all(source);
        assert_eq!(tokens[1].text(source), "main");
    }

    #[test]
    fn parse_int_literal_accepts_every_prefix_form() {
        assert_eq!(parse_int_literal("0b1010_1010"), Some(0b10101010));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("0xFF"), Some(255));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("not_a_number"), None);
    }
}
