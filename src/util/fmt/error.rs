use std::fmt::{self, Write};

use crate::token::Span;

/// Renders `message` under the source line holding `span`, pointing at the
/// offending characters with carets.
///
/// ```text
/// (1+2
///     ^ unexpected end of input, expected `)`
/// ```
pub fn caret(src: &str, span: Span, message: impl fmt::Display) -> String {
    let lo = span.lo.min(src.len());
    let line_start = src[..lo].rfind('\n').map_or(0, |i| i + 1);
    let line_end = src[lo..].find('\n').map_or(src.len(), |i| lo + i);
    let line = src[line_start..line_end].trim_end_matches('\r');

    let column = src[line_start..lo].chars().count();
    let hi = span.hi().clamp(lo, line_end);
    let width = src[lo..hi].chars().count().max(1);

    let mut out = String::with_capacity(2 * line.len() + 64);
    // Writing into a `String` can't fail.
    _ = writeln!(out, "{line}");
    _ = write!(out, "{:column$}{:^<width$} {message}", "", "");
    out
}
