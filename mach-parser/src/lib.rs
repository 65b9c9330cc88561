//! Recursive-descent parser for `L`: one function per precedence level for
//! expressions, a direct transcription of the statement grammar for
//! everything else. A syntax error never aborts the file — it is recorded
//! as a `NodeKind::Error` node in place and the parser resynchronises at the
//! next statement boundary, so one bad line costs one diagnostic, not the
//! whole file.

mod parser;

use mach_ast::Ast;
use mach_diagnostics::Diagnostic;

pub use parser::Parser;

/// Parse a whole file into an [`Ast`]. Always returns a tree — even a file
/// that is nothing but garbage produces a `Program` whose items are all
/// `Error` nodes — paired with every diagnostic raised along the way.
/// `file` is the path recorded on diagnostics' spans; callers without a real
/// path may pass a placeholder such as `"<input>"`.
pub fn parse(source: &str, file: &str) -> (Ast, Vec<Diagnostic>) {
    let mut parser = Parser::new(source, file);
    let ast = parser.parse_program();
    (ast, parser.into_diagnostics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mach_ast::NodeKind;

    #[test]
    fn minimal_program_parses_without_diagnostics() {
        let (ast, diagnostics) = parse("fun main(): i32 {\n  ret 0;\n}\n", "t.mach");
        assert!(diagnostics.is_empty());
        assert_eq!(ast.error_count(), 0);
        let root = ast.get(ast.root.unwrap());
        match &root.kind {
            NodeKind::Program { items } => assert_eq!(items.len(), 1),
            _ => panic!("expected Program root"),
        }
    }

    #[test]
    fn garbage_input_produces_error_nodes_not_a_panic() {
        let (ast, diagnostics) = parse("+ + +", "t.mach");
        assert!(!diagnostics.is_empty());
        assert_eq!(ast.error_count(), 3);
    }
}
