//! In-process interpretation of lowered code.
//!
//! Follows the semantics of the generated C program on common targets: `int`
//! is 32 bits, addition, subtraction and multiplication wrap, and division
//! truncates toward zero. Literals are read the way a C compiler reads them,
//! so a leading `0` makes them octal. Unlike the exit status of the native
//! program, the result keeps its sign and full range.

use std::fmt;

use crate::{
    ast::BinaryOperator,
    codegen::{Lowered, Rhs, Temp},
};

pub fn evaluate(lowered: &Lowered) -> Result<i32, EvalError> {
    let mut values: Vec<i32> = Vec::with_capacity(lowered.instrs().len());

    for instr in lowered.instrs() {
        let value = match &instr.rhs {
            Rhs::Literal(digits) => literal(digits, instr.dest)?,
            Rhs::Neg(operand) => 0i32.wrapping_sub(values[operand.index()]),
            Rhs::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (values[lhs.index()], values[rhs.index()]);
                match op {
                    BinaryOperator::Add => lhs.wrapping_add(rhs),
                    BinaryOperator::Sub => lhs.wrapping_sub(rhs),
                    BinaryOperator::Mul => lhs.wrapping_mul(rhs),
                    BinaryOperator::Div if rhs == 0 => {
                        return Err(EvalError::DivisionByZero { at: instr.dest });
                    }
                    BinaryOperator::Div => lhs
                        .checked_div(rhs)
                        .ok_or(EvalError::DivisionOverflow { at: instr.dest })?,
                }
            }
        };
        debug_assert_eq!(values.len(), instr.dest.index());
        values.push(value);
    }

    Ok(values[lowered.result().index()])
}

/// Integer constants wider than `int` are truncated on assignment, as C
/// compilers do for `int t = <constant>;`.
#[allow(clippy::cast_possible_truncation)]
fn literal(digits: &str, at: Temp) -> Result<i32, EvalError> {
    let value = match digits.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => u64::from_str_radix(octal, 8),
        _ => digits.parse::<u64>(),
    };
    value
        .map(|v| v as i32)
        .map_err(|_| EvalError::InvalidLiteral { at })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalError {
    DivisionByZero { at: Temp },
    /// `INT_MIN / -1`, which traps on most hardware.
    DivisionOverflow { at: Temp },
    /// A literal that doesn't fit in 64 bits, or an octal literal with an
    /// `8` or `9` digit.
    InvalidLiteral { at: Temp },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DivisionByZero { at } => write!(f, "division by zero in {at}"),
            EvalError::DivisionOverflow { at } => write!(f, "division overflow in {at}"),
            EvalError::InvalidLiteral { at } => write!(f, "integer literal too large in {at}"),
        }
    }
}

impl std::error::Error for EvalError {}
