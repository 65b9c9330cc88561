//! Populates the global scope: primitive types, the untyped pointer, the
//! three reflection builtins (`size_of`/`align_of`/`offset_of`), and the two
//! target-identity constants (`__SYS_ARCH__`/`__SYS_PLAT__`). Everything
//! here lives in the one scope every module scope's parent chain reaches.

use mach_ast::{ScopeArena, ScopeId, Symbol, SymbolArena, SymbolId, SymbolKind, TargetLayout, TypeInterner, TypeRef};

/// The symbol ids of the handful of global names the type checker treats
/// specially, kept alongside their types so callers never have to look
/// them up by string again.
pub struct Builtins {
    pub void: TypeRef,
    pub ptr_untyped: TypeRef,
    pub u8: TypeRef,
    pub u16: TypeRef,
    pub u32: TypeRef,
    pub u64: TypeRef,
    pub i8: TypeRef,
    pub i16: TypeRef,
    pub i32: TypeRef,
    pub i64: TypeRef,
    pub f32: TypeRef,
    pub f64: TypeRef,

    pub size_of_sym: SymbolId,
    pub align_of_sym: SymbolId,
    pub offset_of_sym: SymbolId,
    pub sys_arch_sym: SymbolId,
    pub sys_plat_sym: SymbolId,
}

/// A dummy declaration node id for builtins, which have no source location.
/// `mach_ast::arena::Id::new(u32::MAX)` is used as a sentinel; nothing ever
/// dereferences a builtin symbol's `decl` as a real AST node.
fn builtin_decl() -> mach_ast::NodeId {
    mach_ast::NodeId::new(u32::MAX)
}

fn declare_value(scopes: &mut ScopeArena, symbols: &mut SymbolArena, scope: ScopeId, name: &str, kind: SymbolKind, ty: TypeRef) -> SymbolId {
    let mut symbol = Symbol::new(kind, name, builtin_decl(), scope);
    symbol.ty = Some(ty);
    symbol.is_public = true;
    let id = symbols.alloc(symbol);
    scopes.get_mut(scope).declare(name, id);
    id
}

/// Install every global name into `scope` (the global scope, whose parent
/// is `None`) and return the handles the type checker needs by identity.
pub fn install(scopes: &mut ScopeArena, symbols: &mut SymbolArena, types: &mut TypeInterner, scope: ScopeId, sys_arch: i64, sys_plat: i64) -> Builtins {
    let void = types.void();
    let ptr_untyped = types.pointer(None);
    let u8 = types.int(8, false);
    let u16 = types.int(16, false);
    let u32 = types.int(32, false);
    let u64 = types.int(64, false);
    let i8 = types.int(8, true);
    let i16 = types.int(16, true);
    let i32 = types.int(32, true);
    let i64 = types.int(64, true);
    let f32 = types.float(32);
    let f64 = types.float(64);

    declare_value(scopes, symbols, scope, "void", SymbolKind::Type, void.clone());
    declare_value(scopes, symbols, scope, "ptr", SymbolKind::Type, ptr_untyped.clone());
    declare_value(scopes, symbols, scope, "u8", SymbolKind::Type, u8.clone());
    declare_value(scopes, symbols, scope, "u16", SymbolKind::Type, u16.clone());
    declare_value(scopes, symbols, scope, "u32", SymbolKind::Type, u32.clone());
    declare_value(scopes, symbols, scope, "u64", SymbolKind::Type, u64.clone());
    declare_value(scopes, symbols, scope, "i8", SymbolKind::Type, i8.clone());
    declare_value(scopes, symbols, scope, "i16", SymbolKind::Type, i16.clone());
    declare_value(scopes, symbols, scope, "i32", SymbolKind::Type, i32.clone());
    declare_value(scopes, symbols, scope, "i64", SymbolKind::Type, i64.clone());
    declare_value(scopes, symbols, scope, "f32", SymbolKind::Type, f32.clone());
    declare_value(scopes, symbols, scope, "f64", SymbolKind::Type, f64.clone());

    // The three reflection builtins are registered as functions so ordinary
    // name lookup and shadowing rules apply to them like any other symbol,
    // but the type checker recognises them by `SymbolId` identity rather
    // than by name, since their argument is a type expression, not a value.
    let size_of_sym = declare_value(scopes, symbols, scope, "size_of", SymbolKind::Func, i64.clone());
    let align_of_sym = declare_value(scopes, symbols, scope, "align_of", SymbolKind::Func, i64.clone());
    let offset_of_sym = declare_value(scopes, symbols, scope, "offset_of", SymbolKind::Func, i64.clone());

    let mut arch_symbol = Symbol::new(SymbolKind::Val, "__SYS_ARCH__", builtin_decl(), scope);
    arch_symbol.ty = Some(i64.clone());
    arch_symbol.is_public = true;
    arch_symbol.payload.const_value = Some(sys_arch);
    let sys_arch_sym = symbols.alloc(arch_symbol);
    scopes.get_mut(scope).declare("__SYS_ARCH__", sys_arch_sym);

    let mut plat_symbol = Symbol::new(SymbolKind::Val, "__SYS_PLAT__", builtin_decl(), scope);
    plat_symbol.ty = Some(i64.clone());
    plat_symbol.is_public = true;
    plat_symbol.payload.const_value = Some(sys_plat);
    let sys_plat_sym = symbols.alloc(plat_symbol);
    scopes.get_mut(scope).declare("__SYS_PLAT__", sys_plat_sym);

    Builtins {
        void,
        ptr_untyped,
        u8,
        u16,
        u32,
        u64,
        i8,
        i16,
        i32,
        i64,
        f32,
        f64,
        size_of_sym,
        align_of_sym,
        offset_of_sym,
        sys_arch_sym,
        sys_plat_sym,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mach_ast::{Scope, SymbolArena};

    #[test]
    fn global_scope_holds_every_primitive_by_name() {
        let mut scopes = ScopeArena::new();
        let mut symbols = SymbolArena::new();
        let mut types = TypeInterner::new(TargetLayout::host_64());
        let global = scopes.alloc(Scope::new(None, "global", false));
        install(&mut scopes, &mut symbols, &mut types, global, 1, 1);

        for name in ["void", "ptr", "u8", "i64", "f64", "size_of", "__SYS_ARCH__"] {
            assert!(scopes.get(global).declares(name), "missing builtin {name}");
        }
    }
}
