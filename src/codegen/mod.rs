//! Lowering of the expression tree into three-address code.
//!
//! Every value-producing node gets its own temporary, allocated in post-order
//! (children before parents), so an instruction only ever reads temporaries
//! defined by earlier instructions.

use std::fmt;

use crate::ast::{BinaryOperator, Expr, ExprKind, UnaryOperator};

pub mod c;
pub mod eval;

/// Lowers `expr` and renders it as a C program.
pub fn generate(expr: &Expr) -> String {
    c::render(&lower(expr))
}

pub fn lower(expr: &Expr) -> Lowered {
    let mut lowerer = Lowerer {
        instrs: Vec::with_capacity(expr.node_count()),
    };
    let result = lowerer.lower_expr(expr);
    debug_assert_eq!(result.index() + 1, lowerer.instrs.len());
    Lowered {
        instrs: lowerer.instrs,
        result,
    }
}

/// A temporary variable, displayed as `t<id>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temp(pub u32);

impl Temp {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instr {
    pub dest: Temp,
    pub rhs: Rhs,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dest, self.rhs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rhs {
    /// Decimal digits, as written in the source.
    Literal(Box<str>),
    /// Negation, emitted as a subtraction from zero.
    Neg(Temp),
    Binary {
        op: BinaryOperator,
        lhs: Temp,
        rhs: Temp,
    },
}

impl Rhs {
    /// Temporaries read by this right-hand side.
    pub fn operands(&self) -> impl Iterator<Item = Temp> {
        let (a, b) = match *self {
            Rhs::Literal(_) => (None, None),
            Rhs::Neg(t) => (Some(t), None),
            Rhs::Binary { lhs, rhs, .. } => (Some(lhs), Some(rhs)),
        };
        a.into_iter().chain(b)
    }
}

impl fmt::Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rhs::Literal(digits) => f.write_str(digits),
            Rhs::Neg(operand) => write!(f, "0 - {operand}"),
            Rhs::Binary { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

/// The ordered instruction list of one expression, along with the temporary
/// holding its value.
///
/// Temporaries are numbered `0..len` in definition order and `result` is
/// always the last one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lowered {
    instrs: Vec<Instr>,
    result: Temp,
}

impl Lowered {
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn result(&self) -> Temp {
        self.result
    }
}

impl fmt::Display for Lowered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instrs {
            writeln!(f, "{instr}")?;
        }
        write!(f, "return {}", self.result)
    }
}

struct Lowerer {
    instrs: Vec<Instr>,
}

impl Lowerer {
    fn lower_expr(&mut self, expr: &Expr) -> Temp {
        match &expr.kind {
            ExprKind::Number(digits) => self.emit(Rhs::Literal(digits.clone())),
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                expr,
            } => {
                let operand = self.lower_expr(expr);
                self.emit(Rhs::Neg(operand))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs);
                let rhs = self.lower_expr(rhs);
                self.emit(Rhs::Binary { op: *op, lhs, rhs })
            }
            ExprKind::Paren(inner) => self.lower_expr(inner),
        }
    }

    /// Appends an instruction defining the next temporary.
    fn emit(&mut self, rhs: Rhs) -> Temp {
        let dest = Temp(u32::try_from(self.instrs.len()).expect("too many temporaries"));
        self.instrs.push(Instr { dest, rhs });
        dest
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_expr;

    fn lower_src(src: &str) -> Lowered {
        let expr = parse_expr(src, &mut Vec::new()).expect("failed to parse");
        lower(&expr)
    }

    fn lines(lowered: &Lowered) -> Vec<String> {
        lowered.instrs().iter().map(ToString::to_string).collect()
    }

    fn value_nodes(expr: &Expr) -> usize {
        match &expr.kind {
            ExprKind::Number(_) => 1,
            ExprKind::Unary { expr, .. } => 1 + value_nodes(expr),
            ExprKind::Binary { lhs, rhs, .. } => 1 + value_nodes(lhs) + value_nodes(rhs),
            ExprKind::Paren(inner) => value_nodes(inner),
        }
    }

    #[test]
    fn test_single_literal() {
        let lowered = lower_src("42");
        assert_eq!(lines(&lowered), ["t0 = 42"]);
        assert_eq!(lowered.result(), Temp(0));
    }

    #[test]
    fn test_post_order_allocation() {
        let lowered = lower_src("1+2*3");
        assert_eq!(
            lines(&lowered),
            ["t0 = 1", "t1 = 2", "t2 = 3", "t3 = t1 * t2", "t4 = t0 + t3"]
        );
        assert_eq!(lowered.result(), Temp(4));
    }

    #[test]
    fn test_left_associative_lowering() {
        let lowered = lower_src("8-3-2");
        assert_eq!(
            lines(&lowered),
            ["t0 = 8", "t1 = 3", "t2 = t0 - t1", "t3 = 2", "t4 = t2 - t3"]
        );
    }

    #[test]
    fn test_negation_is_subtraction_from_zero() {
        let lowered = lower_src("-5+2");
        assert_eq!(
            lines(&lowered),
            ["t0 = 5", "t1 = 0 - t0", "t2 = 2", "t3 = t1 + t2"]
        );
    }

    #[test]
    fn test_parens_are_transparent() {
        assert_eq!(lower_src("((7))"), lower_src("7"));
        let lowered = lower_src("(1+2)*3");
        assert_eq!(
            lines(&lowered),
            ["t0 = 1", "t1 = 2", "t2 = t0 + t1", "t3 = 3", "t4 = t2 * t3"]
        );
    }

    #[test]
    fn test_temps_are_dense_and_defined_before_use() {
        let inputs = [
            "0",
            "-1",
            "1+2*3",
            "(1 * 2 + 3) - (1 + 2 * 3)",
            "--(4/2) * -(3 - -1)",
            "1-2-3-4-5*6/7",
        ];
        for src in inputs {
            let expr = parse_expr(src, &mut Vec::new()).unwrap();
            let lowered = lower(&expr);

            assert_eq!(lowered.instrs().len(), value_nodes(&expr), "{src}");
            for (id, instr) in lowered.instrs().iter().enumerate() {
                assert_eq!(instr.dest.index(), id, "{src}");
                assert!(instr.rhs.operands().all(|t| t < instr.dest), "{src}: {instr}");
            }
            let last = lowered.instrs().last().unwrap().dest;
            assert_eq!(lowered.result(), last);
        }
    }

    #[test]
    fn test_display() {
        let lowered = lower_src("2*(3+4)");
        let expected = "t0 = 2\nt1 = 3\nt2 = 4\nt3 = t1 + t2\nt4 = t0 * t3\nreturn t4";
        assert_eq!(lowered.to_string(), expected);
    }
}
