//! Scope & symbol resolution: builds one module scope per module. Phase 1
//! registers every top-level name (so declaration order within a module
//! doesn't matter); phase 2 resolves each non-generic declaration's
//! signature type on demand, memoized once resolved and cycle-guarded so a
//! chain like `def A: B; def B: A;` is diagnosed instead of looping.

use std::collections::{HashMap, HashSet};

use mach_ast::{Ast, FuncPayload, Node, NodeId, NodeKind, Scope, ScopeId, Symbol, SymbolId, SymbolKind, TypeRef};
use mach_diagnostics::{error_codes, fuzzy, Diagnostic, DiagnosticEngine, Span, Stage};

use crate::{GenericBindingCtx, SemaContext};

/// Every top-level declaration is public: a name is public iff declared at
/// the top level of a module, full stop — a leading underscore does not
/// carve out an exception, it only marks intent. A top-level `_foo` is
/// still reachable via `use module;`. See DESIGN.md, Open Question 1.
fn is_top_level_public(_name: &str) -> bool {
    true
}

fn node_span(node: &Node, file: &str, source: &str) -> Span {
    Span::from_offset(file, source, node.token.offset as usize, node.token.length as usize)
}

fn redeclared(diagnostics: &mut DiagnosticEngine, file: &str, source: &str, node: &Node, name: &str) {
    diagnostics.emit(Diagnostic::error(
        Stage::ScopeBuilder,
        error_codes::REDECLARATION,
        format!("'{name}' is already declared in this scope"),
        node_span(node, file, source),
    ));
}

/// Build the module scope for one module's AST. `imports` maps a dotted
/// module path (as written in a `use` declaration) to that module's
/// already-built scope — the driver resolves modules in dependency
/// (leaves-first) order, so every import target is complete by the time
/// its dependents are processed.
pub fn build_module_scope(
    sema: &mut SemaContext,
    ast: &Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    module_name: &str,
    imports: &HashMap<String, ScopeId>,
) -> ScopeId {
    log::debug!("building scope for module '{module_name}' ({} import(s))", imports.len());
    let module_scope = sema.scopes.alloc(Scope::new(Some(sema.global_scope), module_name, true));

    let Some(root) = ast.root else {
        return module_scope;
    };
    let items = match &ast.get(root).kind {
        NodeKind::Program { items } => items.clone(),
        _ => Vec::new(),
    };

    let mut pending = Vec::new();
    for item in &items {
        register_top_level_item(sema, ast, diagnostics, file, source, module_scope, *item, imports, &mut pending);
    }

    let mut resolving = HashSet::new();
    let bindings = GenericBindingCtx::default();
    for sid in pending {
        ensure_symbol_resolved(sema, ast, diagnostics, file, source, sid, &mut resolving, &bindings);
    }

    module_scope
}

/// Phase 1: allocate a symbol (with `ty = None`) for every top-level name
/// and declare it in `module_scope`. Appends the ids of every non-generic
/// symbol whose type still needs resolving to `pending`, in source order.
fn register_top_level_item(
    sema: &mut SemaContext,
    ast: &Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    module_scope: ScopeId,
    item: NodeId,
    imports: &HashMap<String, ScopeId>,
    pending: &mut Vec<SymbolId>,
) {
    let node = ast.get(item).clone();
    match &node.kind {
        NodeKind::UseDecl { path, alias } => {
            declare_use(sema, diagnostics, file, source, module_scope, &node, path, alias, imports);
        }

        NodeKind::VarDecl { is_mutable, name, .. } => {
            if sema.scopes.get(module_scope).declares(name) {
                redeclared(diagnostics, file, source, &node, name);
                return;
            }
            let kind = if *is_mutable { SymbolKind::Var } else { SymbolKind::Val };
            let mut symbol = Symbol::new(kind, name.clone(), item, module_scope);
            symbol.is_public = is_top_level_public(name);
            let sid = sema.symbols.alloc(symbol);
            sema.scopes.get_mut(module_scope).declare(name.clone(), sid);
            pending.push(sid);
        }

        NodeKind::TypeAlias { name, .. } => {
            if sema.scopes.get(module_scope).declares(name) {
                redeclared(diagnostics, file, source, &node, name);
                return;
            }
            let mut symbol = Symbol::new(SymbolKind::Type, name.clone(), item, module_scope);
            symbol.is_public = is_top_level_public(name);
            let sid = sema.symbols.alloc(symbol);
            sema.scopes.get_mut(module_scope).declare(name.clone(), sid);
            pending.push(sid);
        }

        NodeKind::FunDecl { name, type_params, .. } => {
            if sema.scopes.get(module_scope).declares(name) {
                redeclared(diagnostics, file, source, &node, name);
                return;
            }
            register_function(sema, module_scope, item, name, type_params, false, None, pending);
        }

        NodeKind::RecordDecl { name, type_params, .. } => {
            if sema.scopes.get(module_scope).declares(name) {
                redeclared(diagnostics, file, source, &node, name);
                return;
            }
            let is_generic = !type_params.is_empty();
            let mut symbol = Symbol::new(SymbolKind::Type, name.clone(), item, module_scope);
            symbol.is_public = is_top_level_public(name);
            symbol.is_generic = is_generic;
            if is_generic {
                symbol.payload.func = Some(FuncPayload {
                    type_params: type_params.clone(),
                    ..Default::default()
                });
            }
            let sid = sema.symbols.alloc(symbol);
            sema.scopes.get_mut(module_scope).declare(name.clone(), sid);
            if !is_generic {
                pending.push(sid);
            }
        }

        NodeKind::ExternDecl { abi, functions } => {
            for f in functions {
                let fnode = ast.get(*f).clone();
                let NodeKind::FunDecl { name, type_params, .. } = &fnode.kind else {
                    continue;
                };
                if sema.scopes.get(module_scope).declares(name) {
                    redeclared(diagnostics, file, source, &fnode, name);
                    continue;
                }
                register_function(sema, module_scope, *f, name, type_params, true, Some(abi.clone()), pending);
            }
        }

        _ => {}
    }
}

fn register_function(
    sema: &mut SemaContext,
    module_scope: ScopeId,
    decl: NodeId,
    name: &str,
    type_params: &[String],
    is_external: bool,
    calling_convention: Option<String>,
    pending: &mut Vec<SymbolId>,
) {
    let is_generic = !type_params.is_empty();
    let mut symbol = Symbol::new(SymbolKind::Func, name, decl, module_scope);
    symbol.is_public = is_top_level_public(name);
    symbol.is_generic = is_generic;
    symbol.is_external = is_external;
    symbol.payload.func = Some(FuncPayload {
        is_external,
        c_name: is_external.then(|| name.to_string()),
        calling_convention,
        type_params: type_params.to_vec(),
        ..Default::default()
    });
    let sid = sema.symbols.alloc(symbol);
    sema.scopes.get_mut(module_scope).declare(name.to_string(), sid);
    if !is_generic {
        pending.push(sid);
    }
}

fn declare_use(
    sema: &mut SemaContext,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    module_scope: ScopeId,
    node: &Node,
    path: &[String],
    alias: &Option<String>,
    imports: &HashMap<String, ScopeId>,
) {
    let dotted = path.join(".");
    match alias {
        Some(alias_name) => {
            if sema.scopes.get(module_scope).declares(alias_name) {
                redeclared(diagnostics, file, source, node, alias_name);
                return;
            }
            // A module alias has no node of its own to point at; nothing
            // ever dereferences a `Module` symbol's `decl` as a real node.
            let mut symbol = Symbol::new(SymbolKind::Module, alias_name.clone(), mach_ast::NodeId::new(0), module_scope);
            symbol.is_public = is_top_level_public(alias_name);
            symbol.payload.module_scope = imports.get(&dotted).copied();
            let sid = sema.symbols.alloc(symbol);
            sema.scopes.get_mut(module_scope).declare(alias_name.clone(), sid);
        }
        None => {
            let Some(&target_scope) = imports.get(&dotted) else {
                return;
            };
            let public_symbols: Vec<(String, SymbolId)> = sema
                .scopes
                .get(target_scope)
                .local_symbols()
                .filter(|(_, sid)| sema.symbols.get(*sid).is_public)
                .map(|(n, sid)| (n.to_string(), sid))
                .collect();
            for (name, sid) in public_symbols {
                if sema.scopes.get(module_scope).declares(&name) {
                    redeclared(diagnostics, file, source, node, &name);
                    continue;
                }
                sema.scopes.get_mut(module_scope).declare(name, sid);
            }
        }
    }
}

pub(crate) fn scope_chain_names(sema: &SemaContext, scope: ScopeId) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = Some(scope);
    while let Some(id) = current {
        let s = sema.scopes.get(id);
        names.extend(s.local_symbols().map(|(n, _)| n.to_string()));
        current = s.parent;
    }
    names
}

/// Phase 2, demand-driven: if `sid`'s type is already resolved, return it;
/// otherwise resolve it from its declaration node, guarding against cycles
/// via `resolving`. Called both from the `pending` drain loop and
/// recursively whenever a `TypeName` reference hits an unresolved
/// top-level symbol.
pub(crate) fn ensure_symbol_resolved(sema: &mut SemaContext, ast: &Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, sid: SymbolId, resolving: &mut HashSet<SymbolId>, bindings: &GenericBindingCtx) -> TypeRef {
    if let Some(ty) = sema.symbols.get(sid).ty.clone() {
        return ty;
    }
    if !resolving.insert(sid) {
        let symbol = sema.symbols.get(sid);
        let node = ast.get(symbol.decl).clone();
        diagnostics.emit(Diagnostic::error(
            Stage::ScopeBuilder,
            error_codes::CIRCULAR_DEPENDENCY,
            format!("'{}' depends on itself", symbol.name),
            node_span(&node, file, source),
        ));
        return sema.builtins.void.clone();
    }

    // Read off just what `resolve_decl_type` needs so the borrow of
    // `sema.symbols` doesn't outlive it across the recursive resolution
    // calls that follow.
    let symbol = sema.symbols.get(sid);
    let decl = DeclSite {
        decl: symbol.decl,
        home_scope: symbol.home_scope,
    };
    let ty = resolve_decl_type(sema, ast, diagnostics, file, source, &decl, resolving, bindings);
    sema.symbols.get_mut(sid).ty = Some(ty.clone());
    resolving.remove(&sid);
    ty
}

struct DeclSite {
    decl: NodeId,
    home_scope: ScopeId,
}

fn resolve_decl_type(sema: &mut SemaContext, ast: &Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, symbol: &DeclSite, resolving: &mut HashSet<SymbolId>, bindings: &GenericBindingCtx) -> TypeRef {
    let node = ast.get(symbol.decl).clone();
    match &node.kind {
        NodeKind::VarDecl { type_expr: Some(te), .. } => resolve_type_expr(sema, ast, diagnostics, file, source, symbol.home_scope, *te, resolving, bindings),
        NodeKind::VarDecl { type_expr: None, .. } => sema.builtins.void.clone(),

        NodeKind::TypeAlias { name, target } => {
            let target_ty = resolve_type_expr(sema, ast, diagnostics, file, source, symbol.home_scope, *target, resolving, bindings);
            sema.types.alias(name.clone(), target_ty)
        }

        NodeKind::RecordDecl { is_union, name, fields, .. } => {
            let field_types: Vec<(String, TypeRef)> = fields
                .iter()
                .map(|(fname, fte)| (fname.clone(), resolve_type_expr(sema, ast, diagnostics, file, source, symbol.home_scope, *fte, resolving, bindings)))
                .collect();
            if *is_union {
                sema.types.union(name.clone(), field_types)
            } else {
                sema.types.structure(name.clone(), field_types)
            }
        }

        NodeKind::FunDecl { params, return_type, is_variadic, .. } => {
            let param_types: Vec<TypeRef> = params
                .iter()
                .map(|p| resolve_type_expr(sema, ast, diagnostics, file, source, symbol.home_scope, p.type_expr, resolving, bindings))
                .collect();
            let ret_ty = match return_type {
                Some(rt) => resolve_type_expr(sema, ast, diagnostics, file, source, symbol.home_scope, *rt, resolving, bindings),
                None => sema.builtins.void.clone(),
            };
            sema.types.function(param_types, ret_ty, *is_variadic)
        }

        _ => sema.builtins.void.clone(),
    }
}

/// Resolve a `TypeName`/`TypePointer`/`TypeArray`/`TypeFunction`/
/// `TypeStruct`/`TypeUnion` AST node into a concrete `TypeRef`. Only
/// non-generic declarations reach this at scope-building time; generic
/// declarations leave their signature unresolved until the monomorphizer
/// specializes them under a `GenericBindingCtx`.
pub fn resolve_type_expr(sema: &mut SemaContext, ast: &Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, scope: ScopeId, node_id: NodeId, resolving: &mut HashSet<SymbolId>, bindings: &GenericBindingCtx) -> TypeRef {
    let node = ast.get(node_id).clone();
    match &node.kind {
        NodeKind::TypeName { name, type_args } => {
            let Some(sid) = sema.scopes.lookup(scope, name) else {
                let candidates = scope_chain_names(sema, scope);
                let suggestions = fuzzy::find_similar_names(name, &candidates, 0.7, 1);
                let mut diag = Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_TYPE, format!("unknown type '{name}'"), node_span(&node, file, source));
                if let Some(suggestion) = suggestions.first() {
                    diag = diag.with_help(format!("did you mean '{suggestion}'?"));
                }
                diagnostics.emit(diag);
                return sema.builtins.void.clone();
            };
            let (kind, is_generic) = {
                let symbol = sema.symbols.get(sid);
                (symbol.kind, symbol.is_generic)
            };
            if kind != SymbolKind::Type {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::UNKNOWN_TYPE,
                    format!("'{name}' is not a type"),
                    node_span(&node, file, source),
                ));
                return sema.builtins.void.clone();
            }
            if is_generic {
                if type_args.is_empty() {
                    diagnostics.emit(Diagnostic::error(
                        Stage::TypeChecker,
                        error_codes::UNKNOWN_TYPE,
                        format!("'{name}' is generic and requires type arguments"),
                        node_span(&node, file, source),
                    ));
                }
                // A generic type named directly (not through a call/`new`
                // instantiation context) is resolved by `typeck`, which has
                // a `Monomorphizer` to drive the specialization; scope
                // building alone cannot produce a concrete type here.
                return sema.builtins.void.clone();
            }
            ensure_symbol_resolved(sema, ast, diagnostics, file, source, sid, resolving, bindings)
        }
        NodeKind::TypePointer { base } => {
            let base_ty = base.map(|b| resolve_type_expr(sema, ast, diagnostics, file, source, scope, b, resolving, bindings));
            sema.types.pointer(base_ty)
        }
        NodeKind::TypeArray { element, size } => {
            let element_ty = resolve_type_expr(sema, ast, diagnostics, file, source, scope, *element, resolving, bindings);
            sema.types.array(element_ty, size.map(|n| n.max(0) as u64))
        }
        NodeKind::TypeFunction { params, ret, variadic } => {
            let param_types: Vec<TypeRef> = params.iter().map(|p| resolve_type_expr(sema, ast, diagnostics, file, source, scope, *p, resolving, bindings)).collect();
            let ret_ty = match ret {
                Some(r) => resolve_type_expr(sema, ast, diagnostics, file, source, scope, *r, resolving, bindings),
                None => sema.builtins.void.clone(),
            };
            sema.types.function(param_types, ret_ty, *variadic)
        }
        NodeKind::TypeStruct { fields } => {
            let field_types: Vec<(String, TypeRef)> = fields
                .iter()
                .map(|(n, t)| (n.clone(), resolve_type_expr(sema, ast, diagnostics, file, source, scope, *t, resolving, bindings)))
                .collect();
            sema.types.structure("<anonymous>".to_string(), field_types)
        }
        NodeKind::TypeUnion { fields } => {
            let field_types: Vec<(String, TypeRef)> = fields
                .iter()
                .map(|(n, t)| (n.clone(), resolve_type_expr(sema, ast, diagnostics, file, source, scope, *t, resolving, bindings)))
                .collect();
            sema.types.union("<anonymous>".to_string(), field_types)
        }
        _ => {
            diagnostics.emit(Diagnostic::error(
                Stage::TypeChecker,
                error_codes::UNKNOWN_TYPE,
                "expected a type expression",
                node_span(&node, file, source),
            ));
            sema.builtins.void.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mach_ast::TargetLayout;

    #[test]
    fn redeclaration_in_the_same_module_scope_is_an_error() {
        let source = "val x: i32 = 1;\nval x: i32 = 2;\n";
        let (ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 0, 0);
        let mut diagnostics = DiagnosticEngine::new();
        build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());

        assert!(diagnostics.has_errors());
    }

    #[test]
    fn struct_field_types_resolve_against_the_global_scope() {
        let source = "str S { a: u8; b: i32; }\n";
        let (ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 0, 0);
        let mut diagnostics = DiagnosticEngine::new();
        let module_scope = build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());

        assert!(!diagnostics.has_errors());
        let sid = sema.scopes.get(module_scope).get_local("S").unwrap();
        let ty = sema.symbols.get(sid).ty.clone().unwrap();
        assert_eq!(ty.size, 8);
    }

    #[test]
    fn forward_reference_between_top_level_declarations_resolves() {
        let source = "fun make(): Point { ret new(Point){ x: 1, y: 2 }; }\nstr Point { x: i32; y: i32; }\n";
        let (ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 0, 0);
        let mut diagnostics = DiagnosticEngine::new();
        build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());

        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
    }

    #[test]
    fn circular_alias_chain_is_diagnosed_not_looped() {
        let source = "def A: B;\ndef B: A;\n";
        let (ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 0, 0);
        let mut diagnostics = DiagnosticEngine::new();
        build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &HashMap::new());

        assert!(diagnostics.has_errors());
    }
}
