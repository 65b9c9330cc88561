use serde::{Deserialize, Serialize};

/// Every distinguishable lexical class, including the keyword table
/// (`use def val var fun str uni if or for brk cnt ret` plus the
/// compiler-internal `ext asm new`) and the compound punctuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,

    Use,
    Def,
    Val,
    Var,
    Fun,
    Str,
    Uni,
    If,
    Or,
    For,
    Brk,
    Cnt,
    Ret,
    Ext,
    Asm,
    New,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    ColonColon,
    Arrow,
    Dot,
    Question,
    At,

    Bang,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,

    Eq,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,

    Eof,
    Error,
}

impl TokenKind {
    /// True for the 16 reserved words; identifiers that collide with these
    /// are tokenized as the keyword, never as `Identifier`.
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        Some(match s {
            "use" => TokenKind::Use,
            "def" => TokenKind::Def,
            "val" => TokenKind::Val,
            "var" => TokenKind::Var,
            "fun" => TokenKind::Fun,
            "str" => TokenKind::Str,
            "uni" => TokenKind::Uni,
            "if" => TokenKind::If,
            "or" => TokenKind::Or,
            "for" => TokenKind::For,
            "brk" => TokenKind::Brk,
            "cnt" => TokenKind::Cnt,
            "ret" => TokenKind::Ret,
            "ext" => TokenKind::Ext,
            "asm" => TokenKind::Asm,
            "new" => TokenKind::New,
            _ => return None,
        })
    }
}

/// A lexical token: a kind tag plus an absolute byte offset and length into
/// the source buffer. Line and column are deliberately not carried here —
/// they are derived on demand by `mach_diagnostics::Span::from_offset`,
/// since diagnostics are rare relative to the number of tokens produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: u32,
    pub length: u32,
}

impl Token {
    pub fn new(kind: TokenKind, offset: u32, length: u32) -> Self {
        Self { kind, offset, length }
    }

    pub fn end(&self) -> u32 {
        self.offset + self.length
    }

    /// Slice the original source text this token spans.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        let start = self.offset as usize;
        let end = self.end() as usize;
        source.get(start..end).unwrap_or_default()
    }

    pub fn eof(offset: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            offset,
            length: 0,
        }
    }
}
