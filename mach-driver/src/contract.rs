//! The backend contract: everything a code generator needs once semantic
//! analysis is done, and nothing it doesn't. No emission logic lives past
//! this boundary — that stays a backend collaborator's problem.

use mach_ast::{ScopeId, SymbolId, TypeRef};
use mach_module::ModuleManager;
use mach_sema::{Monomorphizer, SemaContext};

/// The resolved state of a finished, diagnostic-free (or at least
/// continued-past-errors) compilation: the module graph with every AST's
/// nodes carrying their `resolved_type`/`symbol`, the shared symbol/scope
/// arena, and the specialization cache, handed to a backend by reference so
/// it can walk the tree without the driver copying anything.
pub struct LoweringContract<'a> {
    pub modules: &'a ModuleManager,
    pub sema: &'a SemaContext,
    pub mono: &'a Monomorphizer,
}

impl<'a> LoweringContract<'a> {
    pub fn new(modules: &'a ModuleManager, sema: &'a SemaContext, mono: &'a Monomorphizer) -> Self {
        Self { modules, sema, mono }
    }

    /// The global scope every module scope's parent chain reaches, i.e. the
    /// root of the combined global-plus-all-module-scopes symbol table a
    /// backend walks.
    pub fn global_scope(&self) -> ScopeId {
        self.sema.global_scope
    }

    /// Every concrete specialization produced during the build, for a
    /// backend that needs to emit each instantiated generic body once.
    pub fn specializations(&self) -> impl Iterator<Item = (SymbolId, &[TypeRef], SymbolId)> + '_ {
        self.mono.specializations()
    }

    /// The linker/object-file name for a specialized symbol, via the same
    /// scheme the monomorphizer used when it materialized it — `None` for a
    /// non-generic symbol, which keeps its plain declared name.
    pub fn mangled_name(&self, symbol: SymbolId) -> Option<&str> {
        let sym = self.sema.symbols.get(symbol);
        sym.payload.func.as_ref().and_then(|f| f.mangled_name.as_deref())
    }
}
