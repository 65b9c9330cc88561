use crate::arena::{Arena, Id};
use crate::node::NodeId;
use crate::scope::ScopeId;
use crate::ty::TypeRef;

pub type SymbolId = Id<Symbol>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Val,
    Func,
    Type,
    Field,
    Param,
    Module,
}

/// Kind-specific data that doesn't belong on every symbol.
#[derive(Debug, Clone, Default)]
pub struct FuncPayload {
    pub is_external: bool,
    pub c_name: Option<String>,
    pub calling_convention: Option<String>,
    pub type_params: Vec<String>,
    pub specializations: Vec<SymbolId>,
    /// Set on a specialization symbol produced by the monomorphizer; the
    /// generic symbol it was instantiated from leaves this `None`.
    pub mangled_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolPayload {
    pub func: Option<FuncPayload>,
    /// `field`: byte offset within the owning struct/union.
    pub field_offset: Option<u64>,
    /// `param`: positional index within the declaring function's parameter list.
    pub param_index: Option<usize>,
    /// `module`: absolute path and the scope the module's own declarations live in.
    pub module_path: Option<std::path::PathBuf>,
    pub module_scope: Option<ScopeId>,
    /// `val`: folded integer constant, when the initializer is a compile-time expression.
    pub const_value: Option<i64>,
}

/// A named binding: kind, resolved type, declaration site, owning scope,
/// and the four independent flags the type checker and module importer
/// consult (public/imported/external/generic).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub ty: Option<TypeRef>,
    pub decl: NodeId,
    pub home_scope: ScopeId,
    pub is_public: bool,
    pub is_imported: bool,
    pub is_external: bool,
    pub is_generic: bool,
    pub payload: SymbolPayload,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, decl: NodeId, home_scope: ScopeId) -> Self {
        Self {
            kind,
            name: name.into(),
            ty: None,
            decl,
            home_scope,
            is_public: false,
            is_imported: false,
            is_external: false,
            is_generic: false,
            payload: SymbolPayload::default(),
        }
    }

    /// A value reference may stand in expression position: `var`/`val`/
    /// `func`/`param`, but not a bare `type` or `module` name.
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Var | SymbolKind::Val | SymbolKind::Func | SymbolKind::Param
        )
    }
}

pub type SymbolArena = Arena<Symbol>;
