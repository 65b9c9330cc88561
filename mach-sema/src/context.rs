//! An immutable analysis context in place of an ambient current-scope
//! pointer: every type-checking call receives one by value and produces a
//! new one (by scope entry/exit, or by pushing a generic binding) rather
//! than mutating a shared field.

use std::rc::Rc;

use mach_ast::{ScopeId, SymbolId, TypeRef};

/// A type-parameter-name to concrete-type binding, pushed when entering a
/// specialised generic body. A plain `Vec` clone is cheap enough here —
/// binding depth never exceeds the nesting of generic declarations, which
/// in practice is one or two.
#[derive(Debug, Clone, Default)]
pub struct GenericBindingCtx {
    bindings: Vec<(String, TypeRef)>,
}

impl GenericBindingCtx {
    pub fn push(&self, name: impl Into<String>, concrete: TypeRef) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.push((name.into(), concrete));
        Self { bindings }
    }

    /// A type name that matches a parameter in the current binding context
    /// resolves to that binding rather than a scope symbol.
    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.bindings.iter().rev().find(|(n, _)| n == name).map(|(_, t)| t.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Current scope, generic bindings, module identity, and the function whose
/// body is being checked (for `ret` type checking) — the whole of what the
/// type checker needs to know "where it is", threaded by value.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub scope: ScopeId,
    pub module_scope: ScopeId,
    pub global_scope: ScopeId,
    pub bindings: GenericBindingCtx,
    pub module_name: Rc<str>,
    pub file_path: Rc<str>,
    pub current_function: Option<SymbolId>,
    /// `true` while checking the body of a `for` loop, so `brk`/`cnt` can be
    /// validated without threading an extra parameter through every call.
    pub in_loop: bool,
}

impl AnalysisContext {
    pub fn new(global_scope: ScopeId, module_scope: ScopeId, module_name: impl Into<Rc<str>>, file_path: impl Into<Rc<str>>) -> Self {
        Self {
            scope: module_scope,
            module_scope,
            global_scope,
            bindings: GenericBindingCtx::default(),
            module_name: module_name.into(),
            file_path: file_path.into(),
            current_function: None,
            in_loop: false,
        }
    }

    pub fn with_scope(&self, scope: ScopeId) -> Self {
        Self { scope, ..self.clone() }
    }

    pub fn with_bindings(&self, bindings: GenericBindingCtx) -> Self {
        Self { bindings, ..self.clone() }
    }

    pub fn with_function(&self, function: SymbolId) -> Self {
        Self {
            current_function: Some(function),
            ..self.clone()
        }
    }

    pub fn entering_loop(&self) -> Self {
        Self { in_loop: true, ..self.clone() }
    }
}
