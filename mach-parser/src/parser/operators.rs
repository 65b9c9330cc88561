//! The expression precedence chain, one function per level, from the
//! loosest (assignment) down to the tightest (postfix, in `primaries.rs`).
//! Binary levels are a left-associative loop; assignment is the one
//! right-associative level, built by recursing back into itself on the
//! right-hand side instead of looping.

use mach_ast::{InfixOp, Node, NodeId, NodeKind, PrefixOp, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> NodeId {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> NodeId {
        let left = self.parse_or();
        if self.check(TokenKind::Eq) {
            let token = self.advance();
            let right = self.parse_assignment();
            return self.ast.alloc(Node::new(
                NodeKind::Infix {
                    op: InfixOp::Assign,
                    left,
                    right,
                },
                token,
            ));
        }
        left
    }

    fn parse_or(&mut self) -> NodeId {
        let mut left = self.parse_and();
        while self.check(TokenKind::PipePipe) {
            let token = self.advance();
            let right = self.parse_and();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op: InfixOp::Or, left, right }, token));
        }
        left
    }

    fn parse_and(&mut self) -> NodeId {
        let mut left = self.parse_equality();
        while self.check(TokenKind::AmpAmp) {
            let token = self.advance();
            let right = self.parse_equality();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op: InfixOp::And, left, right }, token));
        }
        left
    }

    fn parse_equality(&mut self) -> NodeId {
        let mut left = self.parse_relational();
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => InfixOp::Eq,
                TokenKind::NotEq => InfixOp::NotEq,
                _ => break,
            };
            let token = self.advance();
            let right = self.parse_relational();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op, left, right }, token));
        }
        left
    }

    fn parse_relational(&mut self) -> NodeId {
        let mut left = self.parse_shift();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => InfixOp::Lt,
                TokenKind::Gt => InfixOp::Gt,
                TokenKind::LtEq => InfixOp::LtEq,
                TokenKind::GtEq => InfixOp::GtEq,
                _ => break,
            };
            let token = self.advance();
            let right = self.parse_shift();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op, left, right }, token));
        }
        left
    }

    fn parse_shift(&mut self) -> NodeId {
        let mut left = self.parse_additive();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => InfixOp::Shl,
                TokenKind::Shr => InfixOp::Shr,
                _ => break,
            };
            let token = self.advance();
            let right = self.parse_additive();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op, left, right }, token));
        }
        left
    }

    fn parse_additive(&mut self) -> NodeId {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => InfixOp::Add,
                TokenKind::Minus => InfixOp::Sub,
                _ => break,
            };
            let token = self.advance();
            let right = self.parse_multiplicative();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op, left, right }, token));
        }
        left
    }

    fn parse_multiplicative(&mut self) -> NodeId {
        let mut left = self.parse_bitand();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => InfixOp::Mul,
                TokenKind::Slash => InfixOp::Div,
                TokenKind::Percent => InfixOp::Mod,
                _ => break,
            };
            let token = self.advance();
            let right = self.parse_bitand();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op, left, right }, token));
        }
        left
    }

    fn parse_bitand(&mut self) -> NodeId {
        let mut left = self.parse_bitor();
        while self.check(TokenKind::Amp) {
            let token = self.advance();
            let right = self.parse_bitor();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op: InfixOp::BitAnd, left, right }, token));
        }
        left
    }

    fn parse_bitor(&mut self) -> NodeId {
        let mut left = self.parse_bitxor();
        while self.check(TokenKind::Pipe) {
            let token = self.advance();
            let right = self.parse_bitxor();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op: InfixOp::BitOr, left, right }, token));
        }
        left
    }

    fn parse_bitxor(&mut self) -> NodeId {
        let mut left = self.parse_unary();
        while self.check(TokenKind::Caret) {
            let token = self.advance();
            let right = self.parse_unary();
            left = self.ast.alloc(Node::new(NodeKind::Infix { op: InfixOp::BitXor, left, right }, token));
        }
        left
    }

    /// `+ - ! ~ ? @`, right-associative: each case recurses back into
    /// `parse_unary` rather than dropping to postfix, so `!!x` and `?@x`
    /// stack correctly. `?` takes an address; `@` dereferences (the result
    /// is an lvalue, per `Node::is_lvalue_candidate`).
    fn parse_unary(&mut self) -> NodeId {
        let op = match self.peek_kind() {
            TokenKind::Plus => PrefixOp::Pos,
            TokenKind::Minus => PrefixOp::Neg,
            TokenKind::Bang => PrefixOp::Not,
            TokenKind::Tilde => PrefixOp::BitNot,
            TokenKind::Question => PrefixOp::AddrOf,
            TokenKind::At => PrefixOp::Deref,
            _ => return self.parse_postfix(),
        };
        let token = self.advance();
        let expr = self.parse_unary();
        self.ast.alloc(Node::new(NodeKind::Prefix { op, expr }, token))
    }
}
