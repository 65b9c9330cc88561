//! The shared data model of the compiler pipeline: tokens, the AST arena,
//! interned types, symbols, and lexical scopes. Every later stage
//! (preprocessor output aside) reads or writes through these types rather
//! than defining its own.

pub mod arena;
pub mod node;
pub mod scope;
pub mod symbol;
pub mod token;
pub mod ty;

pub use arena::{Arena, Id};
pub use node::{Ast, InfixOp, Node, NodeId, NodeKind, Param, PrefixOp};
pub use scope::{Scope, ScopeArena, ScopeId};
pub use symbol::{FuncPayload, Symbol, SymbolArena, SymbolId, SymbolKind, SymbolPayload};
pub use token::{Token, TokenKind};
pub use ty::{StructField, TargetLayout, TypeData, TypeInterner, TypeKind, TypeRef};
