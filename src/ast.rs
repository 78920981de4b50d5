// expr ::= expr '+' expr
//        | expr '-' expr
//        | expr '*' expr
//        | expr '/' expr
//        | '-' expr
//        | '(' expr ')'
//        | integer

// Precedence
//
// - (unary)
// * /
// + -

use std::fmt;

use crate::token::Span;

#[derive(Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    /// Number of nodes in this tree, counting `self`.
    pub fn node_count(&self) -> usize {
        1 + match &self.kind {
            ExprKind::Number(_) => 0,
            ExprKind::Unary { expr, .. } | ExprKind::Paren(expr) => expr.node_count(),
            ExprKind::Binary { lhs, rhs, .. } => lhs.node_count() + rhs.node_count(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExprKind {
    /// Decimal digits, kept as written in the source.
    Number(Box<str>),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Grouping is already resolved by the tree's shape. The node is kept so
    /// that the tree mirrors the source.
    Paren(Box<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    /// All operators are left-associative; higher binds tighter.
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Sub => 1,
            BinaryOperator::Mul | BinaryOperator::Div => 2,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
