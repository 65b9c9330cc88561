//! Diagnostic sink for the `mach` compiler pipeline.
//!
//! Every stage (preprocessor, lexer, parser, module manager, scope builder,
//! type checker, monomorphizer) records `Diagnostic`s here instead of
//! aborting; a stage only halts its caller when the sink accumulates an
//! error-level record for that stage's output. Nothing is printed during
//! analysis — rendering happens on demand, at the end of the pipeline,
//! grouped by stage.

use colored::Colorize;
use std::fmt;

/// A source location resolved lazily from a byte offset: line and column
/// stay off the `Token` itself and are derived only when a diagnostic is
/// rendered, since diagnostics are rare relative to tokens produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(file: impl Into<String>, line: usize, column: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length,
        }
    }

    /// Derive line/column from a byte offset by scanning back for newlines.
    pub fn from_offset(file: impl Into<String>, source: &str, offset: usize, length: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let column = before.rfind('\n').map_or(offset + 1, |pos| offset - pos);
        Self {
            file: file.into(),
            line,
            column,
            length: length.max(1),
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Severity of a diagnostic: error, warning, or note. Suggestions fold into
/// `Diagnostic::help` rather than getting a fourth severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".red().bold()),
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
            Severity::Note => write!(f, "{}", "note".cyan().bold()),
        }
    }
}

/// The pipeline stage that produced a diagnostic, so a report can group
/// everything by stage in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Preprocessor,
    Lexer,
    Parser,
    ModuleManager,
    ScopeBuilder,
    TypeChecker,
    Monomorphizer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocessor => "preprocessor",
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::ModuleManager => "module manager",
            Stage::ScopeBuilder => "scope builder",
            Stage::TypeChecker => "type checker",
            Stage::Monomorphizer => "monomorphizer",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub replacement: String,
    pub span: Span,
}

/// A single diagnostic record: severity, stage, a stable error code, the
/// message, its source span, and optional notes/help/a fuzzy-match suggestion.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub code: &'static str,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        stage: Stage,
        code: &'static str,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            stage,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
            suggestion: None,
        }
    }

    pub fn error(stage: Stage, code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, stage, code, message, span)
    }

    pub fn warning(stage: Stage, code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, stage, code, message, span)
    }

    pub fn note(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Note, stage, "", message, span)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_suggestion(
        mut self,
        message: impl Into<String>,
        replacement: impl Into<String>,
        span: Span,
    ) -> Self {
        self.suggestion = Some(Suggestion {
            message: message.into(),
            replacement: replacement.into(),
            span,
        });
        self
    }

    /// Render as `error[E0425]: msg` / `--> file:line:col` / source snippet
    /// with a caret under the offending span.
    pub fn format(&self, source: &str) -> String {
        let mut out = String::new();

        if self.code.is_empty() {
            out.push_str(&format!("{}: {}\n", self.severity, self.message.bold()));
        } else {
            out.push_str(&format!("{}[{}]: {}\n", self.severity, self.code, self.message.bold()));
        }

        out.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.span));

        if let Some(snippet) = self.source_snippet(source) {
            out.push_str(&snippet);
        }

        for note in &self.notes {
            out.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan()));
        }

        if let Some(help) = &self.help {
            out.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!(" {} {}\n", "help:".green().bold(), suggestion.message));
        }

        out
    }

    fn source_snippet(&self, source: &str) -> Option<String> {
        let lines: Vec<&str> = source.lines().collect();
        if self.span.line == 0 || self.span.line > lines.len() {
            return None;
        }
        let line = lines[self.span.line - 1];
        let width = self.span.line.to_string().len().max(2);

        let mut snippet = String::new();
        snippet.push_str(&format!(" {}\n", " ".repeat(width + 1).cyan()));
        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", self.span.line, width = width).cyan().bold(),
            "|".cyan().bold(),
            line
        ));
        let col = self.span.column.saturating_sub(1);
        let padding = " ".repeat(width + 3 + col);
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {}{}\n",
            " ".repeat(width + 1).cyan(),
            padding,
            underline.red().bold()
        ));
        Some(snippet)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            write!(f, "{}: {} ({})", self.severity, self.message, self.span)
        } else {
            write!(f, "{}[{}]: {} ({})", self.severity, self.code, self.message, self.span)
        }
    }
}

/// Collects diagnostics in insertion order across every stage. A stage has
/// failed once the sink holds at least one error-level record for it —
/// warnings and notes never fail a stage.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_errors_in(&self, stage: Stage) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.stage == stage && d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print every diagnostic to stderr, grouped by stage in pipeline order.
    pub fn print_all(&self, source: &str) {
        let mut stages: Vec<Stage> = self.diagnostics.iter().map(|d| d.stage).collect();
        stages.sort();
        stages.dedup();
        for stage in stages {
            for diag in self.diagnostics.iter().filter(|d| d.stage == stage) {
                eprintln!("{}", diag.format(source));
            }
        }
    }

    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "\n{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }
        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

/// Stable error codes, one per diagnosable condition, grouped by stage.
pub mod error_codes {
    pub const PREPROCESSOR_FAILURE: &str = "E0001";
    pub const UNTERMINATED_LITERAL: &str = "E0002";
    pub const UNEXPECTED_TOKEN: &str = "E0010";
    pub const UNEXPECTED_EOF: &str = "E0011";

    pub const MODULE_NOT_FOUND: &str = "E0100";
    pub const CIRCULAR_DEPENDENCY: &str = "E0101";

    pub const REDECLARATION: &str = "E0200";
    pub const UNKNOWN_IDENTIFIER: &str = "E0201";
    pub const UNKNOWN_TYPE: &str = "E0202";
    pub const UNKNOWN_FIELD: &str = "E0203";

    pub const NOT_ASSIGNABLE: &str = "E0300";
    pub const ARITY_MISMATCH: &str = "E0301";
    pub const INVALID_OPERAND: &str = "E0302";
    pub const NOT_LVALUE: &str = "E0303";
    pub const INVALID_CAST: &str = "E0304";

    pub const SPECIALIZATION_FAILURE: &str = "E0400";
}

/// Fuzzy "did you mean?" suggestions, scored with Jaro-Winkler similarity.
pub mod fuzzy {
    use strsim::jaro_winkler;

    pub fn find_similar_names(target: &str, candidates: &[String], threshold: f64, limit: usize) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|c| (c.clone(), jaro_winkler(target, c)))
            .filter(|(_, score)| *score > threshold)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().take(limit).map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_points_at_the_offending_column() {
        let source = "val x: i32 = \"hello\";\n";
        let span = Span::from_offset("t.mach", source, 13, 7);
        assert_eq!(span.line, 1);
        assert_eq!(span.column, 14);

        let diag = Diagnostic::error(Stage::TypeChecker, error_codes::NOT_ASSIGNABLE, "incompatible types", span);
        let rendered = diag.format(source);
        assert!(rendered.contains("t.mach:1:14"));
        assert!(rendered.contains("^^^^^^^"));
    }

    #[test]
    fn engine_tracks_error_and_warning_counts_independently() {
        let mut engine = DiagnosticEngine::new();
        engine.emit(Diagnostic::error(
            Stage::TypeChecker,
            error_codes::NOT_ASSIGNABLE,
            "bad",
            Span::unknown(),
        ));
        engine.emit(Diagnostic::warning(Stage::ScopeBuilder, "", "unused", Span::unknown()));
        assert!(engine.has_errors());
        assert!(engine.has_errors_in(Stage::TypeChecker));
        assert!(!engine.has_errors_in(Stage::ScopeBuilder));
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);
    }

    #[test]
    fn fuzzy_suggestions_are_ordered_by_similarity() {
        let candidates = vec!["counter".to_string(), "count".to_string(), "zzz".to_string()];
        let suggestions = fuzzy::find_similar_names("coutner", &candidates, 0.6, 2);
        assert!(!suggestions.is_empty());
        assert_ne!(suggestions[0], "zzz");
    }
}
