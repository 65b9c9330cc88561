use std::collections::HashMap;

use crate::arena::{Arena, Id};
use crate::symbol::SymbolId;

pub type ScopeId = Id<Scope>;

/// A lexical region: global, module, function, block, or a struct/union's
/// field scope. Lookup walks the parent chain to global; "current-scope-
/// only" lookups exist separately for redeclaration checks.
#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub name: String,
    pub is_module: bool,
    symbols: HashMap<String, SymbolId>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, name: impl Into<String>, is_module: bool) -> Self {
        Self {
            parent,
            name: name.into(),
            is_module,
            symbols: HashMap::new(),
        }
    }

    /// `true` if `name` was already bound in exactly this scope — the
    /// redeclaration check never looks past the current scope, since
    /// shadowing across nested scopes is explicitly allowed.
    pub fn declares(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn declare(&mut self, name: impl Into<String>, symbol: SymbolId) {
        self.symbols.insert(name.into(), symbol);
    }

    pub fn get_local(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn local_symbols(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// An arena of scopes plus the lookup that walks the parent chain; the
/// arena itself owns no single root — callers hold the `ScopeId` of
/// whichever scope (global, module, function, block) they're working in.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Arena<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, scope: Scope) -> ScopeId {
        self.scopes.alloc(scope)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        self.scopes.get(id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(id)
    }

    /// Walk from `scope` up through parents; the first matching name wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(sym) = s.get_local(name) {
                return Some(sym);
            }
            current = s.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Id;

    fn fake_symbol(n: u32) -> SymbolId {
        Id::new(n)
    }

    #[test]
    fn lookup_walks_parent_chain_and_first_match_wins() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(Scope::new(None, "global", false));
        let module = arena.alloc(Scope::new(Some(global), "m", true));
        let func = arena.alloc(Scope::new(Some(module), "f", false));

        arena.get_mut(global).declare("x", fake_symbol(1));
        arena.get_mut(func).declare("x", fake_symbol(2));

        assert_eq!(arena.lookup(func, "x"), Some(fake_symbol(2)));
        assert_eq!(arena.lookup(module, "x"), Some(fake_symbol(1)));
    }

    #[test]
    fn current_scope_only_check_ignores_shadowed_outer_names() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(Scope::new(None, "global", false));
        let block = arena.alloc(Scope::new(Some(global), "b", false));
        arena.get_mut(global).declare("x", fake_symbol(1));

        assert!(!arena.get(block).declares("x"));
        assert!(arena.get(global).declares("x"));
    }
}
