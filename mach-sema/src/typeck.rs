//! Type checker: a single top-down traversal per module that computes and
//! attaches a resolved type (and, where it names one, a symbol) to every
//! declaration and expression. Diagnostics are recorded, not thrown — a
//! failing expression's type becomes `void` (the sink's `unresolved` marker)
//! and its siblings are still checked.

use std::collections::HashSet;

use mach_ast::{ty::unwrap_alias, Ast, InfixOp, Node, NodeId, NodeKind, PrefixOp, Scope, ScopeId, SymbolId, SymbolKind, TypeKind, TypeRef};
use mach_diagnostics::{error_codes, fuzzy, Diagnostic, DiagnosticEngine, Span, Stage};

use crate::context::{AnalysisContext, GenericBindingCtx};
use crate::mono::Monomorphizer;
use crate::scope_builder;
use crate::SemaContext;

fn node_span(node: &Node, file: &str, source: &str) -> Span {
    Span::from_offset(file, source, node.token.offset as usize, node.token.length as usize)
}

fn field_names(ty: &TypeRef) -> Vec<String> {
    ty.fields().map(|fs| fs.iter().map(|f| f.name.clone()).collect()).unwrap_or_default()
}

/// Resolve a type expression in the monomorphizer's presence: identical to
/// [`scope_builder::resolve_type_expr`] except that a generic `TypeName`
/// (`Box<A>`) is handed to the monomorphizer instead of being left `void`,
/// and a type-parameter name bound in `bindings` short-circuits scope lookup
/// entirely.
#[allow(clippy::too_many_arguments)]
pub fn resolve_type_expr(
    sema: &mut SemaContext,
    mono: &mut Monomorphizer,
    ast: &Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    scope: ScopeId,
    node_id: NodeId,
    bindings: &GenericBindingCtx,
    module_name: &str,
) -> TypeRef {
    let node = ast.get(node_id).clone();
    match &node.kind {
        NodeKind::TypeName { name, type_args } => {
            if let Some(bound) = bindings.lookup(name) {
                return bound;
            }
            let Some(sid) = sema.scopes.lookup(scope, name) else {
                let candidates = scope_builder::scope_chain_names(sema, scope);
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
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_TYPE, format!("'{name}' is not a type"), node_span(&node, file, source)));
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
                    return sema.builtins.void.clone();
                }
                let args: Vec<TypeRef> = type_args
                    .iter()
                    .map(|a| resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *a, bindings, module_name))
                    .collect();
                let site = node_span(&node, file, source);
                return mono.instantiate_type(sema, ast, diagnostics, file, source, sid, args, module_name, site);
            }
            scope_builder::ensure_symbol_resolved(sema, ast, diagnostics, file, source, sid, &mut HashSet::new(), bindings)
        }
        NodeKind::TypePointer { base } => {
            let base_ty = base.map(|b| resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, b, bindings, module_name));
            sema.types.pointer(base_ty)
        }
        NodeKind::TypeArray { element, size } => {
            let element_ty = resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *element, bindings, module_name);
            sema.types.array(element_ty, size.map(|n| n.max(0) as u64))
        }
        NodeKind::TypeFunction { params, ret, variadic } => {
            let param_types: Vec<TypeRef> = params.iter().map(|p| resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *p, bindings, module_name)).collect();
            let ret_ty = match ret {
                Some(r) => resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *r, bindings, module_name),
                None => sema.builtins.void.clone(),
            };
            sema.types.function(param_types, ret_ty, *variadic)
        }
        NodeKind::TypeStruct { fields } => {
            let field_types: Vec<(String, TypeRef)> = fields
                .iter()
                .map(|(n, t)| (n.clone(), resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *t, bindings, module_name)))
                .collect();
            sema.types.structure("<anonymous>".to_string(), field_types)
        }
        NodeKind::TypeUnion { fields } => {
            let field_types: Vec<(String, TypeRef)> = fields
                .iter()
                .map(|(n, t)| (n.clone(), resolve_type_expr(sema, mono, ast, diagnostics, file, source, scope, *t, bindings, module_name)))
                .collect();
            sema.types.union("<anonymous>".to_string(), field_types)
        }
        _ => {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_TYPE, "expected a type expression", node_span(&node, file, source)));
            sema.builtins.void.clone()
        }
    }
}

/// Whether `from` is assignable to `to` without being identical to it:
/// widening integer/float conversions and untyped-pointer coercions in
/// either direction.
pub fn assignable(sema: &SemaContext, from: &TypeRef, to: &TypeRef) -> bool {
    let from_u = unwrap_alias(from);
    let to_u = unwrap_alias(to);
    if from_u == to_u {
        return true;
    }
    match (&from_u.kind, &to_u.kind) {
        (TypeKind::Int { width: fw, signed: fs }, TypeKind::Int { width: tw, signed: ts }) => tw >= fw && fs == ts,
        (TypeKind::Float { width: fw }, TypeKind::Float { width: tw }) => tw >= fw,
        (TypeKind::Pointer { base: None }, TypeKind::Pointer { .. }) => true,
        (TypeKind::Pointer { .. }, TypeKind::Pointer { base: None }) => true,
        _ => {
            let _ = sema;
            false
        }
    }
}

/// The common type of two operands to a binary operator, or `None` when no
/// common type exists (an `INVALID_OPERAND` at the call site).
fn common_type(sema: &mut SemaContext, a: &TypeRef, b: &TypeRef) -> Option<TypeRef> {
    let ua = unwrap_alias(a);
    let ub = unwrap_alias(b);
    if ua == ub {
        return Some(ua);
    }
    match (&ua.kind, &ub.kind) {
        (TypeKind::Int { width: aw, signed: asg }, TypeKind::Int { width: bw, signed: bsg }) => {
            let width = *aw.max(bw);
            let signed = if aw == bw { *asg && *bsg } else if aw > bw { *asg } else { *bsg };
            Some(sema.types.int(width, signed))
        }
        (TypeKind::Float { width: aw }, TypeKind::Float { width: bw }) => Some(sema.types.float(*aw.max(bw))),
        (TypeKind::Int { .. }, TypeKind::Float { width }) | (TypeKind::Float { width }, TypeKind::Int { .. }) => Some(sema.types.float(*width)),
        (TypeKind::Pointer { base: None }, TypeKind::Pointer { .. }) => Some(ub),
        (TypeKind::Pointer { .. }, TypeKind::Pointer { base: None }) => Some(ua),
        (TypeKind::Pointer { base: ab }, TypeKind::Pointer { base: bb }) => match (ab, bb) {
            (Some(x), Some(y)) if unwrap_alias(x) == unwrap_alias(y) => Some(ua),
            _ => None,
        },
        _ => None,
    }
}

fn fits(value: i64, width: u8, signed: bool) -> bool {
    if signed {
        let bits = width.min(64);
        if bits == 64 {
            return true;
        }
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        value >= min && value <= max
    } else {
        if value < 0 {
            return false;
        }
        let bits = width.min(63);
        let max = (1i64 << bits) - 1;
        value <= max
    }
}

/// Check the whole module's top-level declarations in source order (their
/// signatures were already resolved by [`scope_builder::build_module_scope`];
/// this pass checks bodies and infers the type of declarations that omitted
/// an explicit one).
#[allow(clippy::too_many_arguments)]
pub fn check_module(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, module_scope: ScopeId, module_name: &str, file: &str, source: &str, diagnostics: &mut DiagnosticEngine) {
    let Some(root) = ast.root else { return };
    let items = match &ast.get(root).kind {
        NodeKind::Program { items } => items.clone(),
        _ => return,
    };

    let ctx = AnalysisContext::new(sema.global_scope, module_scope, module_name, file);

    for item in items {
        check_top_level_item(sema, mono, ast, diagnostics, file, source, &ctx, item);
    }
}

#[allow(clippy::too_many_arguments)]
fn check_top_level_item(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, item: NodeId) {
    let node = ast.get(item).clone();
    match &node.kind {
        NodeKind::VarDecl { name, type_expr, value, .. } => {
            let Some(sid) = sema.scopes.get(ctx.module_scope).get_local(name) else { return };
            let declared = sema.symbols.get(sid).ty.clone();
            let expected = if type_expr.is_some() { declared.clone() } else { None };
            let value_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *value, expected.as_ref());
            match (type_expr, declared) {
                (Some(_), Some(declared_ty)) => {
                    if !assignable(sema, &value_ty, &declared_ty) {
                        diagnostics.emit(Diagnostic::error(
                            Stage::TypeChecker,
                            error_codes::NOT_ASSIGNABLE,
                            format!("'{name}' has type {} but initializer has type {}", describe(&declared_ty), describe(&value_ty)),
                            node_span(ast.get(*value), file, source),
                        ));
                    }
                }
                _ => {
                    sema.symbols.get_mut(sid).ty = Some(value_ty.clone());
                }
            }
            try_fold_const(sema, ast, sid, *value);
        }

        NodeKind::FunDecl { name, type_params, params, body: Some(body), .. } => {
            if !type_params.is_empty() {
                return;
            }
            let Some(sid) = sema.scopes.get(ctx.module_scope).get_local(name) else { return };
            check_function_body(sema, mono, ast, diagnostics, file, source, ctx, sid, params, *body);
        }

        NodeKind::ExternDecl { functions, .. } => {
            for f in functions {
                let fnode = ast.get(*f).clone();
                if let NodeKind::FunDecl { name, params, body: Some(body), .. } = &fnode.kind {
                    let Some(sid) = sema.scopes.get(ctx.module_scope).get_local(name) else { continue };
                    check_function_body(sema, mono, ast, diagnostics, file, source, ctx, sid, params, *body);
                }
            }
        }

        _ => {}
    }
}

/// Fold a `val`'s initializer into `payload.const_value` when it is a plain
/// integer literal or a builtin reflection call — the only forms folded at
/// analysis time rather than left for a backend constant-folding pass.
fn try_fold_const(sema: &mut SemaContext, ast: &Ast, sid: SymbolId, value: NodeId) {
    if sema.symbols.get(sid).kind != SymbolKind::Val {
        return;
    }
    let node = ast.get(value);
    if let NodeKind::IntLiteral { value } = &node.kind {
        sema.symbols.get_mut(sid).payload.const_value = Some(*value);
    } else if let Some(folded) = node.const_fold {
        sema.symbols.get_mut(sid).payload.const_value = Some(folded);
    }
}

#[allow(clippy::too_many_arguments)]
fn check_function_body(
    sema: &mut SemaContext,
    mono: &mut Monomorphizer,
    ast: &mut Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    ctx: &AnalysisContext,
    function: SymbolId,
    params: &[mach_ast::Param],
    body: NodeId,
) {
    let fn_ty = sema.symbols.get(function).ty.clone().unwrap_or_else(|| sema.builtins.void.clone());
    let param_types = match &fn_ty.kind {
        TypeKind::Function { params, .. } => params.clone(),
        _ => Vec::new(),
    };
    let fn_scope = sema.scopes.alloc(Scope::new(Some(ctx.module_scope), "<function>", false));
    let decl = sema.symbols.get(function).decl;
    for (i, p) in params.iter().enumerate() {
        let pty = param_types.get(i).cloned().unwrap_or_else(|| sema.builtins.void.clone());
        let mut psym = mach_ast::Symbol::new(SymbolKind::Param, p.name.clone(), decl, fn_scope);
        psym.ty = Some(pty);
        psym.payload.param_index = Some(i);
        let pid = sema.symbols.alloc(psym);
        sema.scopes.get_mut(fn_scope).declare(p.name.clone(), pid);
    }
    let body_ctx = ctx.with_scope(fn_scope).with_function(function);
    check_stmt(sema, mono, ast, diagnostics, file, source, &body_ctx, body);
}

/// Statements never produce a value; each is checked for its own
/// well-formedness and recurses into sub-expressions/sub-statements.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check_stmt(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node_id: NodeId) {
    let node = ast.get(node_id).clone();
    match &node.kind {
        NodeKind::Block { statements } => {
            let block_scope = sema.scopes.alloc(Scope::new(Some(ctx.scope), "<block>", false));
            let block_ctx = ctx.with_scope(block_scope);
            for stmt in statements {
                check_stmt(sema, mono, ast, diagnostics, file, source, &block_ctx, *stmt);
            }
        }

        NodeKind::VarDecl { name, type_expr, value, .. } => {
            let expected = type_expr.map(|te| resolve_type_expr(sema, mono, ast, diagnostics, file, source, ctx.scope, te, &ctx.bindings, &ctx.module_name));
            let value_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *value, expected.as_ref());
            let declared = expected.unwrap_or_else(|| value_ty.clone());
            if type_expr.is_some() && !assignable(sema, &value_ty, &declared) {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::NOT_ASSIGNABLE,
                    format!("'{name}' has type {} but initializer has type {}", describe(&declared), describe(&value_ty)),
                    node_span(ast.get(*value), file, source),
                ));
            }
            let kind = match &node.kind {
                NodeKind::VarDecl { is_mutable: true, .. } => SymbolKind::Var,
                _ => SymbolKind::Val,
            };
            if sema.scopes.get(ctx.scope).declares(name) {
                diagnostics.emit(Diagnostic::error(Stage::ScopeBuilder, error_codes::REDECLARATION, format!("'{name}' is already declared in this scope"), node_span(&node, file, source)));
                return;
            }
            let mut symbol = mach_ast::Symbol::new(kind, name.clone(), node_id, ctx.scope);
            symbol.ty = Some(declared);
            let sid = sema.symbols.alloc(symbol);
            sema.scopes.get_mut(ctx.scope).declare(name.clone(), sid);
            ast.get_mut(node_id).symbol = Some(sid);
            try_fold_const(sema, ast, sid, *value);
        }

        NodeKind::If { condition, then_block, or_branches } => {
            let cond_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *condition, None);
            check_condition(diagnostics, file, source, &node, &cond_ty);
            check_stmt(sema, mono, ast, diagnostics, file, source, ctx, *then_block);
            for (cond, block) in or_branches {
                if let Some(c) = cond {
                    let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *c, None);
                    check_condition(diagnostics, file, source, &node, &ty);
                }
                check_stmt(sema, mono, ast, diagnostics, file, source, ctx, *block);
            }
        }

        NodeKind::For { init, condition, post, body } => {
            let loop_scope = sema.scopes.alloc(Scope::new(Some(ctx.scope), "<for>", false));
            let loop_ctx = ctx.with_scope(loop_scope).entering_loop();
            if let Some(i) = init {
                check_stmt(sema, mono, ast, diagnostics, file, source, &loop_ctx, *i);
            }
            if let Some(c) = condition {
                let ty = check_expr(sema, mono, ast, diagnostics, file, source, &loop_ctx, *c, None);
                check_condition(diagnostics, file, source, &node, &ty);
            }
            if let Some(p) = post {
                check_stmt(sema, mono, ast, diagnostics, file, source, &loop_ctx, *p);
            }
            check_stmt(sema, mono, ast, diagnostics, file, source, &loop_ctx, *body);
        }

        NodeKind::Break | NodeKind::Continue => {
            if !ctx.in_loop {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::INVALID_OPERAND,
                    "'brk'/'cnt' outside of a 'for' loop",
                    node_span(&node, file, source),
                ));
            }
        }

        NodeKind::Return { value } => {
            let ret_ty = ctx
                .current_function
                .and_then(|f| sema.symbols.get(f).ty.clone())
                .and_then(|t| match &t.kind {
                    TypeKind::Function { ret, .. } => Some(ret.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| sema.builtins.void.clone());
            match value {
                Some(v) => {
                    let value_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *v, Some(&ret_ty));
                    if !assignable(sema, &value_ty, &ret_ty) {
                        diagnostics.emit(Diagnostic::error(
                            Stage::TypeChecker,
                            error_codes::NOT_ASSIGNABLE,
                            format!("'ret' value has type {} but function returns {}", describe(&value_ty), describe(&ret_ty)),
                            node_span(&node, file, source),
                        ));
                    }
                }
                None => {
                    if !matches!(ret_ty.kind, TypeKind::Void) {
                        diagnostics.emit(Diagnostic::error(
                            Stage::TypeChecker,
                            error_codes::NOT_ASSIGNABLE,
                            format!("'ret' with no value in a function returning {}", describe(&ret_ty)),
                            node_span(&node, file, source),
                        ));
                    }
                }
            }
        }

        NodeKind::Asm { .. } => {}

        NodeKind::ExprStmt { expr } => {
            check_expr(sema, mono, ast, diagnostics, file, source, ctx, *expr, None);
        }

        _ => {}
    }
}

fn check_condition(diagnostics: &mut DiagnosticEngine, file: &str, source: &str, node: &Node, ty: &TypeRef) {
    if !ty.is_numeric() && !ty.is_pointer() {
        diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "condition must be numeric or a pointer", node_span(node, file, source)));
    }
}

fn describe(ty: &TypeRef) -> String {
    match &ty.kind {
        TypeKind::Void => "void".to_string(),
        TypeKind::Int { width, signed } => format!("{}{}", if *signed { "i" } else { "u" }, width),
        TypeKind::Float { width } => format!("f{width}"),
        TypeKind::Pointer { base: None } => "ptr".to_string(),
        TypeKind::Pointer { base: Some(b) } => format!("?{}", describe(b)),
        TypeKind::Array { element, size } => match size {
            Some(n) => format!("{}[{n}]", describe(element)),
            None => format!("{}[]", describe(element)),
        },
        TypeKind::Function { .. } => "fun".to_string(),
        TypeKind::Struct { name, .. } => name.clone(),
        TypeKind::Union { name, .. } => name.clone(),
        TypeKind::Alias { name, .. } => name.clone(),
        TypeKind::Meta { of } => format!("type({})", describe(of)),
    }
}

/// Check one expression node, attach its resolved type (and symbol, where
/// one applies) to the node, and return that type. `expected` carries the
/// surrounding context's demanded type, consulted only by integer/float
/// literals (refinement) and builtin call dispatch.
#[allow(clippy::too_many_arguments)]
fn check_expr(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node_id: NodeId, expected: Option<&TypeRef>) -> TypeRef {
    let node = ast.get(node_id).clone();
    let (ty, symbol) = check_expr_kind(sema, mono, ast, diagnostics, file, source, ctx, node_id, &node, expected);
    let slot = ast.get_mut(node_id);
    slot.resolved_type = Some(ty.clone());
    if symbol.is_some() {
        slot.symbol = symbol;
    }
    ty
}

#[allow(clippy::too_many_arguments)]
fn check_expr_kind(
    sema: &mut SemaContext,
    mono: &mut Monomorphizer,
    ast: &mut Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    ctx: &AnalysisContext,
    node_id: NodeId,
    node: &Node,
    expected: Option<&TypeRef>,
) -> (TypeRef, Option<SymbolId>) {
    match &node.kind {
        NodeKind::IntLiteral { value } => {
            if let Some(exp) = expected {
                let unwrapped = unwrap_alias(exp);
                if let TypeKind::Int { width, signed } = unwrapped.kind {
                    if fits(*value, width, signed) {
                        return (exp.clone(), None);
                    }
                }
            }
            (sema.builtins.i32.clone(), None)
        }
        NodeKind::FloatLiteral { .. } => {
            if let Some(exp) = expected {
                if matches!(unwrap_alias(exp).kind, TypeKind::Float { .. }) {
                    return (exp.clone(), None);
                }
            }
            (sema.builtins.f64.clone(), None)
        }
        NodeKind::CharLiteral { .. } => (sema.builtins.u8.clone(), None),
        NodeKind::StringLiteral { .. } => (sema.types.pointer(Some(sema.builtins.u8.clone())), None),

        NodeKind::Ident { name } => {
            let Some(sid) = sema.scopes.lookup(ctx.scope, name) else {
                let candidates = scope_builder::scope_chain_names(sema, ctx.scope);
                let suggestions = fuzzy::find_similar_names(name, &candidates, 0.7, 1);
                let mut diag = Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_IDENTIFIER, format!("unknown identifier '{name}'"), node_span(node, file, source));
                if let Some(suggestion) = suggestions.first() {
                    diag = diag.with_help(format!("did you mean '{suggestion}'?"));
                }
                diagnostics.emit(diag);
                return (sema.builtins.void.clone(), None);
            };
            let symbol = sema.symbols.get(sid);
            if !symbol.is_value() && symbol.kind != SymbolKind::Module {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_IDENTIFIER, format!("'{name}' is not a value"), node_span(node, file, source)));
                return (sema.builtins.void.clone(), Some(sid));
            }
            (symbol.ty.clone().unwrap_or_else(|| sema.builtins.void.clone()), Some(sid))
        }

        NodeKind::Member { object, field } => {
            if let Some((ty, sid)) = check_module_member(sema, ast, diagnostics, file, source, ctx, node, *object, field) {
                return (ty, sid);
            }
            let obj_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *object, None);
            let unwrapped = unwrap_alias(&obj_ty);
            if !unwrapped.is_struct_or_union() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "member access on a non-struct, non-union type", node_span(node, file, source)));
                return (sema.builtins.void.clone(), None);
            }
            match unwrapped.fields().and_then(|fs| fs.iter().find(|f| &f.name == field)) {
                Some(f) => (f.ty.clone(), None),
                None => {
                    let candidates = field_names(&unwrapped);
                    let suggestions = fuzzy::find_similar_names(field, &candidates, 0.7, 1);
                    let mut diag = Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_FIELD, format!("no field '{field}' on {}", describe(&unwrapped)), node_span(node, file, source));
                    if let Some(suggestion) = suggestions.first() {
                        diag = diag.with_help(format!("did you mean '{suggestion}'?"));
                    }
                    diagnostics.emit(diag);
                    (sema.builtins.void.clone(), None)
                }
            }
        }

        NodeKind::Index { object, index } => {
            let obj_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *object, None);
            let idx_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *index, None);
            if !unwrap_alias(&idx_ty).is_integer() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "index must be an integer", node_span(node, file, source)));
            }
            let unwrapped = unwrap_alias(&obj_ty);
            match &unwrapped.kind {
                TypeKind::Array { element, .. } => (element.clone(), None),
                TypeKind::Pointer { base: Some(b) } => (b.clone(), None),
                TypeKind::Pointer { base: None } => {
                    diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "cannot index the untyped 'ptr' type", node_span(node, file, source)));
                    (sema.builtins.void.clone(), None)
                }
                _ => {
                    diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "indexing requires an array or pointer", node_span(node, file, source)));
                    (sema.builtins.void.clone(), None)
                }
            }
        }

        NodeKind::Call { callee, type_args, args } => check_call(sema, mono, ast, diagnostics, file, source, ctx, node_id, node, *callee, type_args, args),

        NodeKind::Cast { expr, target_type } => {
            let expr_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *expr, None);
            let target_ty = resolve_type_expr(sema, mono, ast, diagnostics, file, source, ctx.scope, *target_type, &ctx.bindings, &ctx.module_name);
            let from = unwrap_alias(&expr_ty);
            let to = unwrap_alias(&target_ty);
            let ok = (from.is_numeric() || from.is_pointer()) && (to.is_numeric() || to.is_pointer());
            if !ok {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::INVALID_CAST,
                    format!("cannot cast {} to {}", describe(&from), describe(&to)),
                    node_span(node, file, source),
                ));
                return (sema.builtins.void.clone(), None);
            }
            (target_ty, None)
        }

        NodeKind::New { type_expr, fields } => {
            let target_ty = resolve_type_expr(sema, mono, ast, diagnostics, file, source, ctx.scope, *type_expr, &ctx.bindings, &ctx.module_name);
            let unwrapped = unwrap_alias(&target_ty);
            if !unwrapped.is_struct_or_union() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "composite literal target must be a struct or union", node_span(node, file, source)));
                for (_, v) in fields {
                    check_expr(sema, mono, ast, diagnostics, file, source, ctx, *v, None);
                }
                return (sema.builtins.void.clone(), None);
            }
            if matches!(unwrapped.kind, TypeKind::Union { .. }) && fields.len() > 1 {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::ARITY_MISMATCH, "union composite literal may set at most one field", node_span(node, file, source)));
            }
            let struct_fields = unwrapped.fields().map(|fs| fs.to_vec()).unwrap_or_default();
            for (fname, value) in fields {
                let declared = struct_fields.iter().find(|f| &f.name == fname).map(|f| f.ty.clone());
                let value_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *value, declared.as_ref());
                match declared {
                    Some(declared_ty) => {
                        if !assignable(sema, &value_ty, &declared_ty) {
                            diagnostics.emit(Diagnostic::error(
                                Stage::TypeChecker,
                                error_codes::NOT_ASSIGNABLE,
                                format!("field '{fname}' has type {} but value has type {}", describe(&declared_ty), describe(&value_ty)),
                                node_span(node, file, source),
                            ));
                        }
                    }
                    None => {
                        let candidates = field_names(&unwrapped);
                        let suggestions = fuzzy::find_similar_names(fname, &candidates, 0.7, 1);
                        let mut diag = Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_FIELD, format!("no field '{fname}' on {}", describe(&unwrapped)), node_span(node, file, source));
                        if let Some(suggestion) = suggestions.first() {
                            diag = diag.with_help(format!("did you mean '{suggestion}'?"));
                        }
                        diagnostics.emit(diag);
                    }
                }
            }
            (target_ty, None)
        }

        NodeKind::Prefix { op, expr } => check_prefix(sema, mono, ast, diagnostics, file, source, ctx, node, *op, *expr),

        NodeKind::Infix { op: InfixOp::Assign, left, right } => {
            let left_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *left, None);
            if !ast.get(*left).is_lvalue_candidate() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::NOT_LVALUE, "left side of '=' is not assignable", node_span(node, file, source)));
            }
            let right_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *right, Some(&left_ty));
            if !assignable(sema, &right_ty, &left_ty) {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::NOT_ASSIGNABLE,
                    format!("cannot assign {} to {}", describe(&right_ty), describe(&left_ty)),
                    node_span(node, file, source),
                ));
            }
            (left_ty, None)
        }

        NodeKind::Infix { op, left, right } => check_infix(sema, mono, ast, diagnostics, file, source, ctx, node, *op, *left, *right),

        _ => {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "expected an expression", node_span(node, file, source)));
            (sema.builtins.void.clone(), None)
        }
    }
}

/// `a.b` where `a` is a module alias: looked up directly in the module's
/// scope rather than treated as a struct/union field access. Returns `None`
/// when `object` doesn't name a module, so the caller falls through to the
/// ordinary struct/union path.
#[allow(clippy::too_many_arguments)]
fn check_module_member(sema: &mut SemaContext, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node: &Node, object: NodeId, field: &str) -> Option<(TypeRef, Option<SymbolId>)> {
    let NodeKind::Ident { name } = ast.get(object).kind.clone() else { return None };
    let sid = sema.scopes.lookup(ctx.scope, &name)?;
    if sema.symbols.get(sid).kind != SymbolKind::Module {
        return None;
    }
    ast.get_mut(object).symbol = Some(sid);
    let module_scope = sema.symbols.get(sid).payload.module_scope;
    let Some(target_scope) = module_scope else {
        diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_IDENTIFIER, format!("module '{name}' has no resolved scope"), node_span(node, file, source)));
        return Some((sema.builtins.void.clone(), None));
    };
    match sema.scopes.get(target_scope).get_local(field) {
        Some(fsid) if sema.symbols.get(fsid).is_public => Some((sema.symbols.get(fsid).ty.clone().unwrap_or_else(|| sema.builtins.void.clone()), Some(fsid))),
        _ => {
            let candidates: Vec<String> = sema.scopes.get(target_scope).local_symbols().map(|(n, _)| n.to_string()).collect();
            let suggestions = fuzzy::find_similar_names(field, &candidates, 0.7, 1);
            let mut diag = Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_IDENTIFIER, format!("module '{name}' has no public member '{field}'"), node_span(node, file, source));
            if let Some(suggestion) = suggestions.first() {
                diag = diag.with_help(format!("did you mean '{suggestion}'?"));
            }
            diagnostics.emit(diag);
            Some((sema.builtins.void.clone(), None))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_prefix(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node: &Node, op: PrefixOp, expr: NodeId) -> (TypeRef, Option<SymbolId>) {
    match op {
        PrefixOp::AddrOf => {
            let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, expr, None);
            if !ast.get(expr).is_lvalue_candidate() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::NOT_LVALUE, "'?' requires an lvalue", node_span(node, file, source)));
            }
            (sema.types.pointer(Some(ty)), None)
        }
        PrefixOp::Deref => {
            let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, expr, None);
            match &unwrap_alias(&ty).kind {
                TypeKind::Pointer { base: Some(b) } => (b.clone(), None),
                TypeKind::Pointer { base: None } => {
                    diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "cannot dereference the untyped 'ptr' type", node_span(node, file, source)));
                    (sema.builtins.void.clone(), None)
                }
                _ => {
                    diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "'@' requires a pointer", node_span(node, file, source)));
                    (sema.builtins.void.clone(), None)
                }
            }
        }
        PrefixOp::Not => {
            let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, expr, None);
            let unwrapped = unwrap_alias(&ty);
            if !unwrapped.is_integer() && !unwrapped.is_pointer() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "'!' requires an integer or pointer operand", node_span(node, file, source)));
            }
            (sema.builtins.u8.clone(), None)
        }
        PrefixOp::BitNot => {
            let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, expr, None);
            if !unwrap_alias(&ty).is_integer() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "'~' requires an integer operand", node_span(node, file, source)));
            }
            (ty, None)
        }
        PrefixOp::Pos | PrefixOp::Neg => {
            let ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, expr, None);
            if !unwrap_alias(&ty).is_numeric() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "unary +/- requires a numeric operand", node_span(node, file, source)));
            }
            (ty, None)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_infix(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node: &Node, op: InfixOp, left: NodeId, right: NodeId) -> (TypeRef, Option<SymbolId>) {
    let left_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, left, None);
    let right_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, right, Some(&left_ty));

    match op {
        InfixOp::And | InfixOp::Or => (sema.builtins.u8.clone(), None),
        InfixOp::Eq | InfixOp::NotEq | InfixOp::Lt | InfixOp::Gt | InfixOp::LtEq | InfixOp::GtEq => {
            if common_type(sema, &left_ty, &right_ty).is_none() {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::INVALID_OPERAND,
                    format!("cannot compare {} and {}", describe(&left_ty), describe(&right_ty)),
                    node_span(node, file, source),
                ));
            }
            (sema.builtins.u8.clone(), None)
        }
        InfixOp::Shl | InfixOp::Shr | InfixOp::BitAnd | InfixOp::BitOr | InfixOp::BitXor => {
            if !unwrap_alias(&left_ty).is_integer() || !unwrap_alias(&right_ty).is_integer() {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "bitwise/shift operators require integer operands", node_span(node, file, source)));
                return (sema.builtins.void.clone(), None);
            }
            match common_type(sema, &left_ty, &right_ty) {
                Some(t) => (t, None),
                None => (left_ty, None),
            }
        }
        InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div | InfixOp::Mod => match common_type(sema, &left_ty, &right_ty) {
            Some(t) => (t, None),
            None => {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::INVALID_OPERAND,
                    format!("no common type for {} and {}", describe(&left_ty), describe(&right_ty)),
                    node_span(node, file, source),
                ));
                (sema.builtins.void.clone(), None)
            }
        },
        InfixOp::Assign => unreachable!("handled by the caller"),
    }
}

#[allow(clippy::too_many_arguments)]
fn check_call(
    sema: &mut SemaContext,
    mono: &mut Monomorphizer,
    ast: &mut Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    ctx: &AnalysisContext,
    node_id: NodeId,
    node: &Node,
    callee: NodeId,
    type_args: &[NodeId],
    args: &[NodeId],
) -> (TypeRef, Option<SymbolId>) {
    if let Some(result) = check_builtin_call(sema, mono, ast, diagnostics, file, source, ctx, node_id, node, callee, args) {
        return result;
    }

    // A generic function named directly at the call site (`id<i32>(3)`)
    // triggers monomorphization before the argument list is checked, so the
    // parameter types are concrete by the time arguments are matched.
    let callee_node = ast.get(callee).clone();
    if let NodeKind::Ident { name } = &callee_node.kind {
        if let Some(sid) = sema.scopes.lookup(ctx.scope, name) {
            let is_generic = sema.symbols.get(sid).is_generic;
            if is_generic {
                if type_args.is_empty() {
                    diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::ARITY_MISMATCH, format!("'{name}' is generic and requires explicit type arguments"), node_span(node, file, source)));
                    return (sema.builtins.void.clone(), None);
                }
                let concrete: Vec<TypeRef> = type_args
                    .iter()
                    .map(|t| resolve_type_expr(sema, mono, ast, diagnostics, file, source, ctx.scope, *t, &ctx.bindings, &ctx.module_name))
                    .collect();
                let site = node_span(node, file, source);
                let (specialized, fn_ty) = mono.instantiate_function(sema, ast, diagnostics, file, source, sid, concrete, &ctx.module_name, site);
                ast.get_mut(callee).symbol = Some(specialized);
                ast.get_mut(callee).resolved_type = Some(fn_ty.clone());
                return check_call_args(sema, mono, ast, diagnostics, file, source, ctx, node, &fn_ty, args, Some(specialized));
            }
        }
    }

    let callee_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, callee, None);
    let callee_symbol = ast.get(callee).symbol;
    check_call_args(sema, mono, ast, diagnostics, file, source, ctx, node, &callee_ty, args, callee_symbol)
}

#[allow(clippy::too_many_arguments)]
fn check_call_args(
    sema: &mut SemaContext,
    mono: &mut Monomorphizer,
    ast: &mut Ast,
    diagnostics: &mut DiagnosticEngine,
    file: &str,
    source: &str,
    ctx: &AnalysisContext,
    node: &Node,
    callee_ty: &TypeRef,
    args: &[NodeId],
    callee_symbol: Option<SymbolId>,
) -> (TypeRef, Option<SymbolId>) {
    let (param_types, ret, variadic) = match &unwrap_alias(callee_ty).kind {
        TypeKind::Function { params, ret, variadic } => (params.clone(), ret.clone(), *variadic),
        _ => {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "call target is not a function", node_span(node, file, source)));
            for a in args {
                check_expr(sema, mono, ast, diagnostics, file, source, ctx, *a, None);
            }
            return (sema.builtins.void.clone(), None);
        }
    };

    if args.len() != param_types.len() && !(variadic && args.len() >= param_types.len()) {
        diagnostics.emit(Diagnostic::error(
            Stage::TypeChecker,
            error_codes::ARITY_MISMATCH,
            format!("expected {} argument(s), found {}", param_types.len(), args.len()),
            node_span(node, file, source),
        ));
    }

    for (i, a) in args.iter().enumerate() {
        let expected = param_types.get(i).cloned();
        let arg_ty = check_expr(sema, mono, ast, diagnostics, file, source, ctx, *a, expected.as_ref());
        if let Some(expected_ty) = expected {
            if !assignable(sema, &arg_ty, &expected_ty) {
                diagnostics.emit(Diagnostic::error(
                    Stage::TypeChecker,
                    error_codes::NOT_ASSIGNABLE,
                    format!("argument {} has type {} but parameter expects {}", i + 1, describe(&arg_ty), describe(&expected_ty)),
                    node_span(node, file, source),
                ));
            }
        }
    }

    (ret, callee_symbol)
}

/// `size_of(T)` / `align_of(T)` / `offset_of(S.f)` take a type expression in
/// argument position, not a value — the parser has no way to know that at
/// parse time, so the argument is parsed as an ordinary expression and this
/// function reinterprets it once the callee's identity is known. Returns
/// `None` when `callee` doesn't name one of the three builtins, so the
/// caller falls through to ordinary call checking.
#[allow(clippy::too_many_arguments)]
fn check_builtin_call(sema: &mut SemaContext, mono: &mut Monomorphizer, ast: &mut Ast, diagnostics: &mut DiagnosticEngine, file: &str, source: &str, ctx: &AnalysisContext, node_id: NodeId, node: &Node, callee: NodeId, args: &[NodeId]) -> Option<(TypeRef, Option<SymbolId>)> {
    let NodeKind::Ident { name } = &ast.get(callee).kind else { return None };
    let sid = sema.scopes.lookup(ctx.scope, name)?;

    if sid == sema.builtins.size_of_sym || sid == sema.builtins.align_of_sym {
        let [arg] = args else {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::ARITY_MISMATCH, format!("'{name}' takes exactly one type argument"), node_span(node, file, source)));
            return Some((sema.builtins.i64.clone(), None));
        };
        let ty = resolve_type_expr(sema, mono, ast, diagnostics, file, source, ctx.scope, *arg, &ctx.bindings, &ctx.module_name);
        let value = if sid == sema.builtins.size_of_sym { ty.size } else { ty.alignment };
        ast.get_mut(*arg).resolved_type = Some(sema.types.meta(ty));
        ast.get_mut(callee).symbol = Some(sid);
        ast.get_mut(node_id).const_fold = Some(value as i64);
        return Some((sema.builtins.i64.clone(), Some(sid)));
    }

    if sid == sema.builtins.offset_of_sym {
        let [arg] = args else {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::ARITY_MISMATCH, "'offset_of' takes exactly one 'Struct.field' argument", node_span(node, file, source)));
            return Some((sema.builtins.i64.clone(), None));
        };
        let NodeKind::Member { object, field } = &ast.get(*arg).kind else {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "'offset_of' expects 'Struct.field'", node_span(node, file, source)));
            return Some((sema.builtins.i64.clone(), None));
        };
        let field = field.clone();
        let NodeKind::Ident { name: type_name } = &ast.get(*object).kind else {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::INVALID_OPERAND, "'offset_of' expects 'Struct.field'", node_span(node, file, source)));
            return Some((sema.builtins.i64.clone(), None));
        };
        let type_name = type_name.clone();
        let Some(type_sid) = sema.scopes.lookup(ctx.scope, &type_name) else {
            diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_TYPE, format!("unknown type '{type_name}'"), node_span(node, file, source)));
            return Some((sema.builtins.i64.clone(), None));
        };
        let ty = sema.symbols.get(type_sid).ty.clone().unwrap_or_else(|| sema.builtins.void.clone());
        let unwrapped = unwrap_alias(&ty);
        match unwrapped.fields().and_then(|fs| fs.iter().find(|f| f.name == field)) {
            Some(f) => {
                ast.get_mut(node_id).const_fold = Some(f.offset as i64);
            }
            None => {
                diagnostics.emit(Diagnostic::error(Stage::TypeChecker, error_codes::UNKNOWN_FIELD, format!("no field '{field}' on {type_name}"), node_span(node, file, source)));
            }
        }
        ast.get_mut(callee).symbol = Some(sid);
        return Some((sema.builtins.i64.clone(), Some(sid)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mach_ast::TargetLayout;

    fn check(source: &str) -> (mach_ast::Ast, SemaContext, DiagnosticEngine) {
        let (mut ast, parse_diags) = mach_parser::parse(source, "t.mach");
        assert!(parse_diags.is_empty(), "{parse_diags:?}");

        let mut sema = SemaContext::new(TargetLayout::host_64(), 8, 8);
        let mut diagnostics = DiagnosticEngine::new();
        let module_scope = scope_builder::build_module_scope(&mut sema, &ast, &mut diagnostics, "t.mach", source, "t", &std::collections::HashMap::new());
        let mut mono = Monomorphizer::new();
        check_module(&mut sema, &mut mono, &mut ast, module_scope, "t", "t.mach", source, &mut diagnostics);
        mono.drain(&mut sema, &mut ast, &mut diagnostics, "t.mach", source);
        (ast, sema, diagnostics)
    }

    /// Finds the `SymbolId` a top-level `val`/`var` declaration bound, by
    /// walking the program's items rather than going through scope lookup
    /// (the declaration lives in the module scope, not the global one).
    fn module_symbol(ast: &mach_ast::Ast, name: &str) -> SymbolId {
        let root = ast.root.expect("parsed program has a root");
        let NodeKind::Program { items } = &ast.get(root).kind else { unreachable!() };
        items
            .iter()
            .find_map(|i| match &ast.get(*i).kind {
                NodeKind::VarDecl { name: n, .. } if n == name => ast.get(*i).symbol,
                _ => None,
            })
            .unwrap_or_else(|| panic!("no top-level declaration named '{name}'"))
    }

    #[test]
    fn size_of_folds_to_the_type_s_computed_size() {
        let source = "val n: i64 = size_of(i32);\n";
        let (ast, sema, diagnostics) = check(source);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        let sid = module_symbol(&ast, "n");
        assert_eq!(sema.symbols.get(sid).payload.const_value, Some(4));
    }

    #[test]
    fn size_of_on_a_struct_equals_its_layout_computed_size() {
        let source = "str S { a: i32; b: i32; }\nval n: i64 = size_of(S);\n";
        let (ast, sema, diagnostics) = check(source);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        let sid = module_symbol(&ast, "n");
        assert_eq!(sema.symbols.get(sid).payload.const_value, Some(8));
    }

    #[test]
    fn offset_of_equals_the_field_s_layout_offset() {
        let source = "str S { a: i32; b: i32; }\nval n: i64 = offset_of(S.b);\n";
        let (ast, sema, diagnostics) = check(source);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        let sid = module_symbol(&ast, "n");
        assert_eq!(sema.symbols.get(sid).payload.const_value, Some(4));
    }

    #[test]
    fn align_of_folds_to_the_type_s_computed_alignment() {
        let source = "val n: i64 = align_of(i32);\n";
        let (ast, sema, diagnostics) = check(source);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        let sid = module_symbol(&ast, "n");
        assert_eq!(sema.symbols.get(sid).payload.const_value, Some(4));
    }

    #[test]
    fn offset_of_on_an_unknown_field_is_diagnosed() {
        let source = "str S { a: i32; }\nval n: i64 = offset_of(S.z);\n";
        let (_, _, diagnostics) = check(source);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn assigning_a_narrower_literal_to_a_wider_declared_type_is_allowed() {
        let source = "val a: i64 = 1;\n";
        let (_, _, diagnostics) = check(source);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
    }

    #[test]
    fn assigning_an_incompatible_type_is_diagnosed() {
        let source = "str S { a: i32; }\nfun f(): void { var a: S = new(S){ a: 1 }; var b: i32 = a; }\n";
        let (_, _, diagnostics) = check(source);
        assert!(diagnostics.has_errors());
    }
}
