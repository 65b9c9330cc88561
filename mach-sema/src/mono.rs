//! Monomorphizer: turns a generic declaration plus a concrete
//! type-argument tuple into a specialized symbol. Specialization signatures
//! (parameter/return/field types) are resolved eagerly, since the call site
//! or type expression that triggered the request needs a concrete `TypeRef`
//! immediately; the specialized function's *body* is queued and checked on
//! [`Monomorphizer::drain`], which is what keeps mutually-specializing
//! generics from recursing through the call stack — a work list instead of
//! call-stack recursion.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use mach_ast::{Ast, FuncPayload, NodeKind, Scope, SymbolId, SymbolKind, TypeData, TypeKind, TypeRef};
use mach_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, Span, Stage};

use crate::context::GenericBindingCtx;
use crate::SemaContext;

/// Identifies one specialization: a generic symbol plus the concrete types
/// bound to its type parameters, in order. Equality and hashing are by
/// `TypeRef` identity (the interner guarantees structurally equal types
/// share an allocation), which is what makes two call sites with the same
/// type arguments collapse onto one specialization.
#[derive(Debug, Clone)]
struct SpecializationKey {
    generic: SymbolId,
    type_args: Vec<TypeRef>,
}

impl PartialEq for SpecializationKey {
    fn eq(&self, other: &Self) -> bool {
        self.generic == other.generic && self.type_args.len() == other.type_args.len() && self.type_args.iter().zip(&other.type_args).all(|(a, b)| Rc::ptr_eq(a, b))
    }
}
impl Eq for SpecializationKey {}
impl std::hash::Hash for SpecializationKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.generic.hash(state);
        for t in &self.type_args {
            (Rc::as_ptr(t) as usize).hash(state);
        }
    }
}

/// A deferred body check: the specialization's signature and placeholder
/// symbol already exist by the time this is queued; what remains is walking
/// the generic's body under the binding.
struct InstantiationRequest {
    generic: SymbolId,
    specialized: SymbolId,
    bindings: GenericBindingCtx,
    module_name: String,
    site: Span,
}

/// A total function of `(module, base name, kind, type-argument tuple)`;
/// the result is the backend-visible symbol name.
fn mangle_name(module_name: &str, base_name: &str, kind: &str, type_args: &[TypeRef]) -> String {
    let mut out = format!("_M{}_{kind}_{base_name}", module_name.replace(['.', '/'], "_"));
    for t in type_args {
        out.push('_');
        out.push_str(&mangle_type(t));
    }
    out
}

fn mangle_type(ty: &TypeRef) -> String {
    match &ty.kind {
        TypeKind::Void => "v".to_string(),
        TypeKind::Int { width, signed } => format!("{}{width}", if *signed { "i" } else { "u" }),
        TypeKind::Float { width } => format!("f{width}"),
        TypeKind::Pointer { base: None } => "p".to_string(),
        TypeKind::Pointer { base: Some(b) } => format!("p{}", mangle_type(b)),
        TypeKind::Array { element, size } => format!("a{}_{}", size.map(|n| n.to_string()).unwrap_or_else(|| "u".to_string()), mangle_type(element)),
        TypeKind::Function { params, ret, .. } => {
            let joined: Vec<String> = params.iter().map(mangle_type).collect();
            format!("fn{}_{}", joined.join(""), mangle_type(ret))
        }
        TypeKind::Struct { name, .. } => format!("s{name}"),
        TypeKind::Union { name, .. } => format!("un{name}"),
        TypeKind::Alias { target, .. } => mangle_type(target),
        TypeKind::Meta { of } => format!("meta{}", mangle_type(of)),
    }
}

/// Owns the specialization cache and the work-list of function bodies still
/// to be checked. One `Monomorphizer` lives per compilation (threaded
/// through every module's `check_module` call), so `id<i32>` requested from
/// two different modules shares a single specialization.
#[derive(Default)]
pub struct Monomorphizer {
    cache: HashMap<SpecializationKey, SymbolId>,
    resolving: HashSet<SpecializationKey>,
    failed: HashSet<SpecializationKey>,
    queue: VecDeque<InstantiationRequest>,
}

impl Monomorphizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of distinct specializations materialized so far: equal type
    /// arguments at distinct call sites collapse to one entry.
    pub fn specialization_count(&self) -> usize {
        self.cache.len()
    }

    /// Every concrete instantiation made during this compilation, as
    /// `(generic symbol, type arguments, specialized symbol)` — the handle
    /// the backend contract walks to find every specialized body it needs
    /// to emit.
    pub fn specializations(&self) -> impl Iterator<Item = (SymbolId, &[TypeRef], SymbolId)> + '_ {
        self.cache.iter().map(|(k, &sid)| (k.generic, k.type_args.as_slice(), sid))
    }

    /// Instantiate a generic `str`/`uni` (`Box<i32>`) into a concrete
    /// struct/union type. Field types are resolved immediately under a
    /// fresh binding so the result is a fully laid-out `TypeRef`.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate_type(&mut self, sema: &mut SemaContext, ast: &Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, generic: SymbolId, type_args: Vec<TypeRef>, module_name: &str, site: Span) -> TypeRef {
        let key = SpecializationKey { generic, type_args: type_args.clone() };
        if let Some(&existing) = self.cache.get(&key) {
            return sema.symbols.get(existing).ty.clone().unwrap_or_else(|| sema.builtins.void.clone());
        }
        if self.failed.contains(&key) {
            return sema.builtins.void.clone();
        }
        if !self.resolving.insert(key.clone()) {
            diagnostics.emit(Diagnostic::error(Stage::Monomorphizer, error_codes::SPECIALIZATION_FAILURE, "recursive generic instantiation", site.clone()));
            self.failed.insert(key);
            return sema.builtins.void.clone();
        }

        let decl = sema.symbols.get(generic).decl;
        let home_scope = sema.symbols.get(generic).home_scope;
        let is_public = sema.symbols.get(generic).is_public;
        let node = ast.get(decl).clone();
        let NodeKind::RecordDecl { is_union, name, type_params, fields } = &node.kind else {
            diagnostics.emit(Diagnostic::error(Stage::Monomorphizer, error_codes::SPECIALIZATION_FAILURE, "type argument list applied to a non-generic declaration", site));
            self.resolving.remove(&key);
            self.failed.insert(key);
            return sema.builtins.void.clone();
        };

        if type_params.len() != type_args.len() {
            diagnostics.emit(Diagnostic::error(
                Stage::Monomorphizer,
                error_codes::ARITY_MISMATCH,
                format!("'{name}' takes {} type argument(s), found {}", type_params.len(), type_args.len()),
                site,
            ));
            self.resolving.remove(&key);
            self.failed.insert(key);
            return sema.builtins.void.clone();
        }

        let mut bindings = GenericBindingCtx::default();
        for (pname, ty) in type_params.iter().zip(type_args.iter()) {
            bindings = bindings.push(pname.clone(), ty.clone());
        }

        let kind_label = if *is_union { "union" } else { "struct" };
        let mangled = mangle_name(module_name, name, kind_label, &type_args);

        let field_types: Vec<(String, TypeRef)> = fields
            .iter()
            .map(|(fname, fte)| (fname.clone(), crate::typeck::resolve_type_expr(sema, self, ast, diagnostics, file, source, home_scope, *fte, &bindings, module_name)))
            .collect();

        let ty = if *is_union { sema.types.union(mangled.clone(), field_types) } else { sema.types.structure(mangled.clone(), field_types) };

        let mut symbol = mach_ast::Symbol::new(SymbolKind::Type, mangled.clone(), decl, home_scope);
        symbol.ty = Some(ty.clone());
        symbol.is_public = is_public;
        symbol.payload.func = Some(FuncPayload {
            mangled_name: Some(mangled),
            ..Default::default()
        });
        let sid = sema.symbols.alloc(symbol);

        if let Some(fp) = sema.symbols.get_mut(generic).payload.func.as_mut() {
            fp.specializations.push(sid);
        }

        self.cache.insert(key.clone(), sid);
        self.resolving.remove(&key);
        ty
    }

    /// Instantiate a generic `fun` at a call site (`id<i32>(3)`). The
    /// signature is resolved eagerly (so the caller has a concrete function
    /// type to check its argument list against); the body is queued for
    /// [`Monomorphizer::drain`].
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate_function(&mut self, sema: &mut SemaContext, ast: &Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, generic: SymbolId, type_args: Vec<TypeRef>, module_name: &str, site: Span) -> (SymbolId, TypeRef) {
        let key = SpecializationKey { generic, type_args: type_args.clone() };
        if let Some(&existing) = self.cache.get(&key) {
            let ty = sema.symbols.get(existing).ty.clone().unwrap_or_else(|| sema.builtins.void.clone());
            return (existing, ty);
        }

        let decl = sema.symbols.get(generic).decl;
        let home_scope = sema.symbols.get(generic).home_scope;
        let is_public = sema.symbols.get(generic).is_public;
        let node = ast.get(decl).clone();
        let NodeKind::FunDecl { name, type_params, params, return_type, is_variadic, .. } = &node.kind else {
            diagnostics.emit(Diagnostic::error(Stage::Monomorphizer, error_codes::SPECIALIZATION_FAILURE, "type argument list applied to a non-generic function", site));
            let void = sema.builtins.void.clone();
            return (generic, void);
        };

        if type_params.len() != type_args.len() {
            diagnostics.emit(Diagnostic::error(
                Stage::Monomorphizer,
                error_codes::ARITY_MISMATCH,
                format!("'{name}' takes {} type argument(s), found {}", type_params.len(), type_args.len()),
                site.clone(),
            ));
            let void = sema.builtins.void.clone();
            return (generic, void);
        }

        let mut bindings = GenericBindingCtx::default();
        for (pname, ty) in type_params.iter().zip(type_args.iter()) {
            bindings = bindings.push(pname.clone(), ty.clone());
        }

        let mangled = mangle_name(module_name, name, "fun", &type_args);
        log::debug!("specializing {mangled}");
        let param_types: Vec<TypeRef> = params
            .iter()
            .map(|p| crate::typeck::resolve_type_expr(sema, self, ast, diagnostics, file, source, home_scope, p.type_expr, &bindings, module_name))
            .collect();
        let ret_ty = match return_type {
            Some(rt) => crate::typeck::resolve_type_expr(sema, self, ast, diagnostics, file, source, home_scope, *rt, &bindings, module_name),
            None => sema.builtins.void.clone(),
        };
        let fn_ty = sema.types.function(param_types, ret_ty, *is_variadic);

        let mut symbol = mach_ast::Symbol::new(SymbolKind::Func, mangled.clone(), decl, home_scope);
        symbol.ty = Some(fn_ty.clone());
        symbol.is_public = is_public;
        symbol.payload.func = Some(FuncPayload {
            mangled_name: Some(mangled),
            ..Default::default()
        });
        let sid = sema.symbols.alloc(symbol);

        if let Some(fp) = sema.symbols.get_mut(generic).payload.func.as_mut() {
            fp.specializations.push(sid);
        }

        self.cache.insert(key, sid);
        self.queue.push_back(InstantiationRequest {
            generic,
            specialized: sid,
            bindings,
            module_name: module_name.to_string(),
            site,
        });

        (sid, fn_ty)
    }

    /// Drain the work-list to a fixed point: checking one specialization's
    /// body may enqueue further instantiations (a generic calling another
    /// generic), so the loop keeps popping until none remain, processing
    /// requests in the order they were enqueued.
    pub fn drain(&mut self, sema: &mut SemaContext, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str) {
        log::debug!("draining specialization queue for {file} ({} pending)", self.queue.len());
        while let Some(request) = self.queue.pop_front() {
            let decl = sema.symbols.get(request.generic).decl;
            let node = ast.get(decl).clone();
            let NodeKind::FunDecl { params, body: Some(body), .. } = &node.kind else {
                continue;
            };
            let home_scope = sema.symbols.get(request.generic).home_scope;
            let fn_scope = sema.scopes.alloc(Scope::new(Some(home_scope), "<specialization>", false));

            let param_types = match &sema.symbols.get(request.specialized).ty.clone().map(|t| t.kind_clone_function_params()) {
                Some(Some(p)) => p,
                _ => Vec::new(),
            };

            for (i, p) in params.iter().enumerate() {
                let pty = param_types.get(i).cloned().unwrap_or_else(|| sema.builtins.void.clone());
                let mut psym = mach_ast::Symbol::new(SymbolKind::Param, p.name.clone(), decl, fn_scope);
                psym.ty = Some(pty);
                psym.payload.param_index = Some(i);
                let pid = sema.symbols.alloc(psym);
                sema.scopes.get_mut(fn_scope).declare(p.name.clone(), pid);
            }

            let ctx = crate::context::AnalysisContext::new(sema.global_scope, home_scope, request.module_name.as_str(), file)
                .with_scope(fn_scope)
                .with_bindings(request.bindings.clone())
                .with_function(request.specialized);

            crate::typeck::check_stmt(sema, self, ast, diagnostics, file, source, &ctx, *body);
        }
    }
}

/// Small accessor kept off `TypeData` itself (the AST crate has no reason to
/// know about function parameter extraction); implemented here as a free
/// function rather than an inherent method to avoid widening `mach-ast`'s
/// public surface for a monomorphizer-only convenience.
trait FunctionParams {
    fn kind_clone_function_params(&self) -> Option<Vec<TypeRef>>;
}

impl FunctionParams for TypeData {
    fn kind_clone_function_params(&self) -> Option<Vec<TypeRef>> {
        match &self.kind {
            TypeKind::Function { params, .. } => Some(params.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SemaContext;
    use mach_ast::TargetLayout;
    use mach_diagnostics::DiagnosticEngine;
    use std::collections::HashMap as Map;

    #[test]
    fn repeated_call_site_with_equal_type_args_reuses_the_specialization() {
        let source = "fun id<T>(x: T): T { ret x; }\nval a: i32 = id<i32>(3);\nval b: i32 = id<i32>(7);\n";
        let (mut ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 2, 1);
        let mut mono = Monomorphizer::new();
        let mut diagnostics = DiagnosticEngine::new();

        let module_scope = crate::scope_builder::build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &Map::new());
        crate::typeck::check_module(&mut sema, &mut mono, &mut ast, module_scope, "t", "t.mach", source, &mut diagnostics);
        mono.drain(&mut sema, &mut ast, &mut diagnostics, "t.mach", source);

        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        assert_eq!(mono.cache.len(), 1);
    }

    #[test]
    fn distinct_type_args_produce_distinct_specializations() {
        let source = "fun id<T>(x: T): T { ret x; }\nval a: i32 = id<i32>(3);\nval b: i64 = id<i64>(4);\n";
        let (mut ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty());

        let mut sema = SemaContext::new(TargetLayout::host_64(), 2, 1);
        let mut mono = Monomorphizer::new();
        let mut diagnostics = DiagnosticEngine::new();

        let module_scope = crate::scope_builder::build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &Map::new());
        crate::typeck::check_module(&mut sema, &mut mono, &mut ast, module_scope, "t", "t.mach", source, &mut diagnostics);
        mono.drain(&mut sema, &mut ast, &mut diagnostics, "t.mach", source);

        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        assert_eq!(mono.cache.len(), 2);
    }
}
