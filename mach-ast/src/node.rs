use serde::{Deserialize, Serialize};

use crate::arena::{Arena, Id};
use crate::token::Token;
use crate::ty::TypeRef;

pub type NodeId = Id<Node>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixOp {
    Pos,
    Neg,
    Not,
    BitNot,
    AddrOf,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Assign,
}

/// Every node kind named by the data model: program root, identifier,
/// literals, postfix forms (member/call/index/cast/composite-literal),
/// prefix/infix expressions, type expressions, and statements. A node that
/// failed to parse is represented in place as `Error` rather than omitted,
/// so the tree still covers the whole token stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Program {
        items: Vec<NodeId>,
    },

    Error {
        message: String,
    },

    Ident {
        name: String,
    },
    IntLiteral {
        value: i64,
    },
    FloatLiteral {
        value: f64,
    },
    CharLiteral {
        value: u8,
    },
    StringLiteral {
        value: String,
    },

    Member {
        object: NodeId,
        field: String,
    },
    Call {
        callee: NodeId,
        type_args: Vec<NodeId>,
        args: Vec<NodeId>,
    },
    Index {
        object: NodeId,
        index: NodeId,
    },
    Cast {
        expr: NodeId,
        target_type: NodeId,
    },
    /// Composite literal: `new(Type){ field: value, ... }`.
    New {
        type_expr: NodeId,
        fields: Vec<(String, NodeId)>,
    },

    Prefix {
        op: PrefixOp,
        expr: NodeId,
    },
    Infix {
        op: InfixOp,
        left: NodeId,
        right: NodeId,
    },

    TypeName {
        name: String,
        type_args: Vec<NodeId>,
    },
    TypePointer {
        base: Option<NodeId>,
    },
    /// `size = None` is the unbounded form.
    TypeArray {
        element: NodeId,
        size: Option<i64>,
    },
    TypeFunction {
        params: Vec<NodeId>,
        ret: Option<NodeId>,
        variadic: bool,
    },
    TypeStruct {
        fields: Vec<(String, NodeId)>,
    },
    TypeUnion {
        fields: Vec<(String, NodeId)>,
    },

    /// `val name: T = value;` (immutable) / `var name: T = value;` (mutable)
    /// share a shape, distinguished by `is_mutable`.
    VarDecl {
        is_mutable: bool,
        name: String,
        type_expr: Option<NodeId>,
        value: NodeId,
    },
    /// `def Name: Target;` — a type alias declaration.
    TypeAlias {
        name: String,
        target: NodeId,
    },
    /// `fun name<T,U>(params): ret { body }`.
    FunDecl {
        name: String,
        type_params: Vec<String>,
        params: Vec<Param>,
        return_type: Option<NodeId>,
        body: Option<NodeId>,
        is_variadic: bool,
    },
    /// `str Name<T> { fields }` / `uni Name<T> { fields }`.
    RecordDecl {
        is_union: bool,
        name: String,
        type_params: Vec<String>,
        fields: Vec<(String, NodeId)>,
    },
    /// `ext "C" { fun foo(...): T; }` external declaration block.
    ExternDecl {
        abi: String,
        functions: Vec<NodeId>,
    },
    /// `use A.B.C;` or `use alias: A.B.C;`.
    UseDecl {
        path: Vec<String>,
        alias: Option<String>,
    },

    Block {
        statements: Vec<NodeId>,
    },
    If {
        condition: NodeId,
        then_block: NodeId,
        /// `or <expr> { ... }` branches in source order.
        or_branches: Vec<(Option<NodeId>, NodeId)>,
    },
    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        post: Option<NodeId>,
        body: NodeId,
    },
    Break,
    Continue,
    Return {
        value: Option<NodeId>,
    },
    Asm {
        body: String,
    },
    ExprStmt {
        expr: NodeId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_expr: NodeId,
}

/// A single AST node: its payload, the token it originates from (for
/// diagnostics), a non-owning parent back-link, and — filled in by later
/// passes — its resolved type and symbol binding. `resolved_type` is
/// skipped on serialization: it holds an interned `Rc` handle that is only
/// meaningful within the compilation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Token,
    pub parent: Option<NodeId>,
    #[serde(skip)]
    pub resolved_type: Option<TypeRef>,
    pub symbol: Option<crate::symbol::SymbolId>,
    /// Set by the type checker on expressions it folds at analysis time
    /// (integer literals, `size_of`/`align_of`/`offset_of`). Not a general
    /// constant-propagation slot: only what the type checker itself folds.
    pub const_fold: Option<i64>,
}

impl Node {
    pub fn new(kind: NodeKind, token: Token) -> Self {
        Self {
            kind,
            token,
            parent: None,
            resolved_type: None,
            symbol: None,
            const_fold: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error { .. })
    }

    pub fn is_lvalue_candidate(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Ident { .. } | NodeKind::Member { .. } | NodeKind::Index { .. } | NodeKind::Prefix {
                op: PrefixOp::Deref,
                ..
            }
        )
    }
}

/// The full per-file AST: a flat arena of nodes plus the root. Parent links
/// are set as children are attached so a node can always walk upward
/// without the parser needing to thread context explicitly.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ast {
    pub nodes: Arena<Node>,
    pub root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    /// Record `parent` as the owner of `child`, for upward walks (e.g. the
    /// monomorphizer locating the enclosing function of a call site).
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes.get_mut(child).parent = Some(parent);
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id)
    }

    /// Count of every error node produced during parsing; zero is the
    /// "parser round trip" property's precondition for error-free inputs.
    pub fn error_count(&self) -> usize {
        self.nodes.iter().filter(|(_, n)| n.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, 0, 1)
    }

    #[test]
    fn parent_links_are_set_explicitly_not_inferred() {
        let mut ast = Ast::new();
        let ident = ast.alloc(Node::new(
            NodeKind::Ident { name: "x".to_string() },
            tok(TokenKind::Identifier),
        ));
        let stmt = ast.alloc(Node::new(NodeKind::ExprStmt { expr: ident }, tok(TokenKind::Identifier)));
        ast.set_parent(ident, stmt);
        assert_eq!(ast.get(ident).parent, Some(stmt));
    }

    #[test]
    fn error_nodes_are_counted_for_the_round_trip_property() {
        let mut ast = Ast::new();
        ast.alloc(Node::new(
            NodeKind::Error {
                message: "unexpected token".to_string(),
            },
            tok(TokenKind::Error),
        ));
        ast.alloc(Node::new(NodeKind::Break, tok(TokenKind::Brk)));
        assert_eq!(ast.error_count(), 1);
    }

    #[test]
    fn deref_expression_is_an_lvalue_candidate() {
        let deref = Node::new(
            NodeKind::Prefix {
                op: PrefixOp::Deref,
                expr: Id::new(0),
            },
            tok(TokenKind::At),
        );
        assert!(deref.is_lvalue_candidate());

        let literal = Node::new(NodeKind::IntLiteral { value: 1 }, tok(TokenKind::IntLiteral));
        assert!(!literal.is_lvalue_candidate());
    }
}
