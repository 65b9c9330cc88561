//! Scope & symbol resolution, the type checker, and the monomorphizer.
//! Every module passes through [`SemaContext`], which owns the arenas every
//! stage after parsing shares: scopes, symbols, and the per-compilation
//! type interner.

pub mod builtins;
pub mod context;
pub mod mono;
pub mod scope_builder;
pub mod typeck;

pub use builtins::Builtins;
pub use context::{AnalysisContext, GenericBindingCtx};
pub use mono::Monomorphizer;

use mach_ast::{Scope, ScopeArena, ScopeId, SymbolArena, TargetLayout, TypeInterner};

/// Everything semantic analysis accumulates across the whole build: one
/// global scope, one symbol arena, and one type interner shared by every
/// module, so identical structural types collapse across module
/// boundaries and `use`-imported symbols are the same `SymbolId` the
/// defining module registered.
pub struct SemaContext {
    pub scopes: ScopeArena,
    pub symbols: SymbolArena,
    pub types: TypeInterner,
    pub global_scope: ScopeId,
    pub builtins: Builtins,
}

impl SemaContext {
    pub fn new(layout: TargetLayout, sys_arch: i64, sys_plat: i64) -> Self {
        let mut scopes = ScopeArena::new();
        let mut symbols = SymbolArena::new();
        let mut types = TypeInterner::new(layout);
        let global_scope = scopes.alloc(Scope::new(None, "global", false));
        let builtins = builtins::install(&mut scopes, &mut symbols, &mut types, global_scope, sys_arch, sys_plat);
        Self {
            scopes,
            symbols,
            types,
            global_scope,
            builtins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mach_diagnostics::DiagnosticEngine;
    use std::collections::HashMap;

    #[test]
    fn minimal_program_type_checks_without_diagnostics() {
        let (ast, parse_diags) = mach_parser::parse("fun main(): i32 {\n  ret 0;\n}\n", "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 2, 1);
        let mut mono = Monomorphizer::new();
        let mut diagnostics = DiagnosticEngine::new();
        let mut ast = ast;

        let source = "fun main(): i32 {\n  ret 0;\n}\n";
        let module_scope = scope_builder::build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());
        typeck::check_module(&mut sema, &mut mono, &mut ast, module_scope, "t", "t.mach", source, &mut diagnostics);
        mono.drain(&mut sema, &mut ast, &mut diagnostics, "t.mach", source);

        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
    }

    #[test]
    fn forward_reference_within_a_module_resolves() {
        let source = "fun a(): i32 { ret b(); }\nfun b(): i32 { ret 42; }\n";
        let (mut ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 2, 1);
        let mut mono = Monomorphizer::new();
        let mut diagnostics = DiagnosticEngine::new();

        let module_scope = scope_builder::build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());
        typeck::check_module(&mut sema, &mut mono, &mut ast, module_scope, "t", "t.mach", source, &mut diagnostics);

        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
    }
}
