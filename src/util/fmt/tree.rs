use std::io::Write;

use crate::{
    ast::{Expr, ExprKind},
    token::Token,
};

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_expr_string(expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Number(digits) => {
            writeln!(w, "number {digits} ({span})")?;
        }
        ExprKind::Unary { op, expr: inner } => {
            writeln!(w, "unary {op:?} ({span})")?;
            print_expr(w, i + 1, inner)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Paren(inner) => {
            writeln!(w, "paren ({span})")?;
            print_expr(w, i + 1, inner)?;
        }
    }
    Ok(())
}

pub fn print_tokens_string(src: &str, tokens: &[Token]) -> String {
    let mut buf = Vec::with_capacity(64 * tokens.len());
    print_tokens(&mut buf, src, tokens).unwrap();
    String::from_utf8(buf).unwrap()
}

/// One line per token: its kind, span and literal text.
pub fn print_tokens(w: &mut impl Write, src: &str, tokens: &[Token]) -> std::io::Result<()> {
    for token in tokens {
        let span = token.span();
        writeln!(w, "{:?} ({span}) {:?}", token.kind, token.text(src))?;
    }
    Ok(())
}
