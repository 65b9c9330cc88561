//! Line-oriented conditional-inclusion preprocessor: `#@if <expr>`,
//! `#@or <expr>` (else-if), `#@or` (bare else), and `#@end`. Runs before
//! lexing and operates purely on text — it knows nothing about tokens.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreprocessorError {
    #[error("line {line}: {message}")]
    Failure { line: u32, message: String },
}

impl PreprocessorError {
    fn at(line: u32, message: impl Into<String>) -> Self {
        PreprocessorError::Failure {
            line,
            message: message.into(),
        }
    }
}

/// One level of `#@if`/`#@or` nesting. `parent_active` records whether the
/// enclosing frame is emitting at all; `branch_taken` remembers whether some
/// branch in this chain has already matched, so a later bare `#@or` (or an
/// `#@or` with a true condition) after a taken branch stays suppressed.
/// `current_active` is the net result: `parent_active && this branch's own
/// condition && !branch_taken-before-this-branch`.
struct Frame {
    parent_active: bool,
    branch_taken: bool,
    current_active: bool,
}

impl Frame {
    fn root() -> Self {
        Frame {
            parent_active: true,
            branch_taken: true,
            current_active: true,
        }
    }
}

/// Evaluate `#@if`/`#@or` conditions against a fixed constant environment.
/// Identifiers not present in the table evaluate to `0` (falsy) rather than
/// erroring, matching the "preprocessor conditions never fail to evaluate"
/// invariant: an unknown feature flag is simply off.
pub struct Preprocessor<'a> {
    constants: &'a HashMap<String, i64>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(constants: &'a HashMap<String, i64>) -> Self {
        Self { constants }
    }

    /// Run the preprocessor over `source`, returning the text with inactive
    /// regions removed and all `#@`-directive lines stripped. Active
    /// non-directive lines are passed through unchanged, including blank
    /// lines, so line numbers downstream still line up with the input for
    /// diagnostics.
    pub fn run(&self, source: &str) -> Result<String, PreprocessorError> {
        let mut frames: Vec<Frame> = vec![Frame::root()];
        let mut out = String::with_capacity(source.len());

        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            let line = raw_line.trim_end_matches('\r');

            if let Some(directive) = parse_directive(line) {
                match directive {
                    Directive::If(expr) => {
                        let parent_active = frames.last().map(|f| f.current_active).unwrap_or(false);
                        let value = if parent_active {
                            eval_expr(expr, self.constants, line_no)? != 0
                        } else {
                            false
                        };
                        frames.push(Frame {
                            parent_active,
                            branch_taken: value,
                            current_active: parent_active && value,
                        });
                    }
                    Directive::Or(expr) => {
                        if frames.len() < 2 {
                            return Err(PreprocessorError::at(
                                line_no,
                                "#@or without a matching #@if",
                            ));
                        }
                        let (branch_taken, parent_active) = match frames.last() {
                            Some(f) => (f.branch_taken, f.parent_active),
                            None => {
                                return Err(PreprocessorError::at(
                                    line_no,
                                    "#@or without a matching #@if",
                                ))
                            }
                        };
                        if branch_taken {
                            if let Some(top) = frames.last_mut() {
                                top.current_active = false;
                            }
                        } else {
                            let value = match expr {
                                Some(expr) if parent_active => {
                                    eval_expr(expr, self.constants, line_no)? != 0
                                }
                                Some(_) => false,
                                None => parent_active,
                            };
                            if let Some(top) = frames.last_mut() {
                                top.branch_taken = value;
                                top.current_active = parent_active && value;
                            }
                        }
                    }
                    Directive::End => {
                        if frames.len() < 2 {
                            return Err(PreprocessorError::at(
                                line_no,
                                "#@end without a matching #@if",
                            ));
                        }
                        frames.pop();
                    }
                    Directive::PassThrough => {
                        if frames.last().map(|f| f.current_active).unwrap_or(false) {
                            out.push_str(line);
                            out.push('\n');
                        }
                    }
                }
                continue;
            }

            if frames.last().map(|f| f.current_active).unwrap_or(false) {
                out.push_str(line);
                out.push('\n');
            }
        }

        if frames.len() > 1 {
            return Err(PreprocessorError::at(
                (source.lines().count() + 1) as u32,
                "unterminated #@if block",
            ));
        }

        Ok(out)
    }
}

enum Directive<'a> {
    If(&'a str),
    Or(Option<&'a str>),
    End,
    /// A line that starts with `#@` but isn't one of the three directives —
    /// passed through verbatim rather than rejected, so future directive
    /// names don't break old sources that merely resemble one.
    PassThrough,
}

/// Directive lines require the exact `#@` prefix followed by a word boundary
/// (so `#@ifdef` is not mistaken for `#@if`). Leading whitespace before `#@`
/// is permitted; nothing may precede it on the line.
fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("#@")?;

    if let Some(after) = strip_keyword(rest, "if") {
        return Some(Directive::If(after.trim()));
    }
    if let Some(after) = strip_keyword(rest, "or") {
        let cond = after.trim();
        return Some(Directive::Or(if cond.is_empty() { None } else { Some(cond) }));
    }
    if let Some(after) = strip_keyword(rest, "end") {
        if after.trim().is_empty() {
            return Some(Directive::End);
        }
    }
    Some(Directive::PassThrough)
}

/// Strip `keyword` from the front of `rest` only if what follows is empty or
/// whitespace — i.e. `keyword` is a whole word, not a prefix of a longer one.
fn strip_keyword<'a>(rest: &'a str, keyword: &str) -> Option<&'a str> {
    let after = rest.strip_prefix(keyword)?;
    if after.is_empty() || after.starts_with(char::is_whitespace) {
        Some(after)
    } else {
        None
    }
}

// --- boolean expression grammar: or -> and -> equality -> unary -> primary ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Number(i64),
    Ident(&'a str),
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    LParen,
    RParen,
}

fn tokenize_expr(src: &str, line: u32) -> Result<Vec<Tok<'_>>, PreprocessorError> {
    let mut toks = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::NotEq);
                    i += 2;
                } else {
                    toks.push(Tok::Bang);
                    i += 1;
                }
            }
            '&' if bytes.get(i + 1) == Some(&b'&') => {
                toks.push(Tok::AndAnd);
                i += 2;
            }
            '|' if bytes.get(i + 1) == Some(&b'|') => {
                toks.push(Tok::OrOr);
                i += 2;
            }
            '=' if bytes.get(i + 1) == Some(&b'=') => {
                toks.push(Tok::EqEq);
                i += 2;
            }
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let text = &src[start..i];
                let value = mach_lexer::parse_int_literal(text)
                    .ok_or_else(|| PreprocessorError::at(line, format!("invalid numeric literal `{text}`")))?;
                toks.push(Tok::Number(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                toks.push(Tok::Ident(&src[start..i]));
            }
            other => {
                return Err(PreprocessorError::at(
                    line,
                    format!("unexpected character `{other}` in preprocessor expression"),
                ));
            }
        }
    }
    Ok(toks)
}

struct ExprParser<'a> {
    toks: Vec<Tok<'a>>,
    pos: usize,
    constants: &'a HashMap<String, i64>,
    line: u32,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<Tok<'a>> {
        self.toks.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Tok<'a>> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn or_expr(&mut self) -> Result<i64, PreprocessorError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(Tok::OrOr) {
            self.bump();
            let right = self.and_expr()?;
            left = ((left != 0) || (right != 0)) as i64;
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<i64, PreprocessorError> {
        let mut left = self.equality_expr()?;
        while self.peek() == Some(Tok::AndAnd) {
            self.bump();
            let right = self.equality_expr()?;
            left = ((left != 0) && (right != 0)) as i64;
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<i64, PreprocessorError> {
        let mut left = self.unary_expr()?;
        loop {
            match self.peek() {
                Some(Tok::EqEq) => {
                    self.bump();
                    let right = self.unary_expr()?;
                    left = (left == right) as i64;
                }
                Some(Tok::NotEq) => {
                    self.bump();
                    let right = self.unary_expr()?;
                    left = (left != right) as i64;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<i64, PreprocessorError> {
        if self.peek() == Some(Tok::Bang) {
            self.bump();
            let value = self.unary_expr()?;
            return Ok((value == 0) as i64);
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<i64, PreprocessorError> {
        match self.bump() {
            Some(Tok::Number(n)) => Ok(n),
            Some(Tok::Ident(name)) => Ok(*self.constants.get(name).unwrap_or(&0)),
            Some(Tok::LParen) => {
                let value = self.or_expr()?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(value),
                    _ => Err(PreprocessorError::at(self.line, "expected `)`")),
                }
            }
            Some(_) => Err(PreprocessorError::at(self.line, "unexpected token in expression")),
            None => Err(PreprocessorError::at(self.line, "unexpected end of expression")),
        }
    }
}

fn eval_expr(
    src: &str,
    constants: &HashMap<String, i64>,
    line: u32,
) -> Result<i64, PreprocessorError> {
    let toks = tokenize_expr(src, line)?;
    let mut parser = ExprParser {
        toks,
        pos: 0,
        constants,
        line,
    };
    let value = parser.or_expr()?;
    if parser.pos != parser.toks.len() {
        return Err(PreprocessorError::at(line, "trailing tokens in expression"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, constants: &[(&str, i64)]) -> Result<String, PreprocessorError> {
        let map: HashMap<String, i64> = constants.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Preprocessor::new(&map).run(source)
    }

    #[test]
    fn passes_through_source_with_no_directives() {
        let out = run("fun main(): i32 {\n  ret 0;\n}\n", &[]).unwrap();
        assert_eq!(out, "fun main(): i32 {\n  ret 0;\n}\n");
    }

    #[test]
    fn takes_true_if_branch_and_drops_the_rest() {
        let src = "#@if 1\nkeep\n#@or\ndrop\n#@end\n";
        assert_eq!(run(src, &[]).unwrap(), "keep\n");
    }

    #[test]
    fn falls_through_to_bare_or_when_if_is_false() {
        let src = "#@if 0\ndrop\n#@or\nkeep\n#@end\n";
        assert_eq!(run(src, &[]).unwrap(), "keep\n");
    }

    #[test]
    fn undefined_identifiers_evaluate_falsy() {
        let src = "#@if UNDEFINED_FLAG\ndrop\n#@or\nkeep\n#@end\n";
        assert_eq!(run(src, &[]).unwrap(), "keep\n");
    }

    #[test]
    fn constants_drive_conditional_selection() {
        let src = "#@if TARGET_ARCH == 64\nsixty_four\n#@or TARGET_ARCH == 32\nthirty_two\n#@end\n";
        assert_eq!(
            run(src, &[("TARGET_ARCH", 64)]).unwrap(),
            "sixty_four\n"
        );
        assert_eq!(
            run(src, &[("TARGET_ARCH", 32)]).unwrap(),
            "thirty_two\n"
        );
    }

    #[test]
    fn once_a_branch_is_taken_later_or_conditions_are_skipped() {
        let src = "#@if 1\na\n#@or 1\nb\n#@end\n";
        assert_eq!(run(src, &[]).unwrap(), "a\n");
    }

    #[test]
    fn nested_if_blocks_track_independent_frames() {
        let src = "#@if 1\nouter\n#@if 0\ninner_drop\n#@or\ninner_keep\n#@end\n#@end\n";
        assert_eq!(run(src, &[]).unwrap(), "outer\ninner_keep\n");
    }

    #[test]
    fn inactive_outer_frame_suppresses_inner_regardless_of_condition() {
        let src = "#@if 0\n#@if 1\nnever\n#@end\n#@end\nkeep\n";
        assert_eq!(run(src, &[]).unwrap(), "keep\n");
    }

    #[test]
    fn unterminated_if_block_is_an_error() {
        let err = run("#@if 1\nkeep\n", &[]).unwrap_err();
        assert!(matches!(err, PreprocessorError::Failure { .. }));
    }

    #[test]
    fn stray_end_without_if_is_an_error() {
        let err = run("#@end\n", &[]).unwrap_err();
        assert!(matches!(err, PreprocessorError::Failure { .. }));
    }

    #[test]
    fn stray_or_without_if_is_an_error() {
        let err = run("#@or\n", &[]).unwrap_err();
        assert!(matches!(err, PreprocessorError::Failure { .. }));
    }

    #[test]
    fn binary_octal_and_hex_literals_parse_with_underscores() {
        assert_eq!(tokenize_expr("0b1010_1010", 1).unwrap(), vec![Tok::Number(0b10101010)]);
        assert_eq!(tokenize_expr("0o17", 1).unwrap(), vec![Tok::Number(15)]);
        assert_eq!(tokenize_expr("0xFF", 1).unwrap(), vec![Tok::Number(255)]);
        assert_eq!(tokenize_expr("1_000", 1).unwrap(), vec![Tok::Number(1000)]);
    }

    #[test]
    fn bang_negates_and_double_bang_restores() {
        let map = HashMap::new();
        assert_eq!(eval_expr("!0", &map, 1).unwrap(), 1);
        assert_eq!(eval_expr("!!5", &map, 1).unwrap(), 1);
        assert_eq!(eval_expr("!1", &map, 1).unwrap(), 0);
    }

    #[test]
    fn parenthesized_subexpressions_evaluate_before_combination() {
        let map = HashMap::new();
        assert_eq!(eval_expr("(1 == 1) && (0 == 0)", &map, 1).unwrap(), 1);
        assert_eq!(eval_expr("(1 == 2) || (3 == 3)", &map, 1).unwrap(), 1);
    }
}
