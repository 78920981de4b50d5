use std::fmt;

use crate::{
    ast::{BinaryOperator, Expr, ExprKind, UnaryOperator},
    lexer,
    token::{Spanned, Token, TokenKind},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T>;

/// How deep an expression may nest. Groupings, negations and each operator
/// in a chain count as one level. Deeper input is rejected so that parsing,
/// lowering and dropping the tree stay within the stack.
pub const MAX_DEPTH: usize = 1024;

/// Lexes `src` into the provided (clean) buffer and parses a single
/// expression out of it.
pub fn parse_expr(src: &str, tokens: &mut Vec<Token>) -> ParseResult<Expr> {
    assert!(tokens.is_empty());
    lexer::lex(src, tokens);
    parse(src, tokens)
}

/// Parses an already lexed token sequence. The whole sequence must form one
/// expression followed by [`TokenKind::Eof`].
pub fn parse(src: &str, tokens: &[Token]) -> ParseResult<Expr> {
    let mut p = Parser::new(src, tokens);
    let expr = p.parse_expr(1)?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    depth: usize,
}

impl Parser<'_, '_> {
    /// Precedence climbing. Parses a primary, then folds every following
    /// binary operator that binds at least as tight as `min_prec`.
    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let base_depth = self.depth;
        let mut lhs = self.parse_primary()?;

        loop {
            let op_token = self.peek();
            let Some(prec) = op_token.kind.precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance(); // Operator
            self.descend(op_token)?;

            // Strictly greater on the right keeps equal precedence grouping
            // to the left.
            let rhs = self.parse_expr(prec + 1)?;

            let op = match op_token.kind {
                TokenKind::Add => BinaryOperator::Add,
                TokenKind::Sub => BinaryOperator::Sub,
                TokenKind::Mul => BinaryOperator::Mul,
                TokenKind::Div => BinaryOperator::Div,
                _ => unreachable!("token with precedence is a binary operator"),
            };
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }

        self.depth = base_depth;
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek();
        let (kind, span) = match token.kind {
            TokenKind::Number => {
                self.advance();
                let digits = token.text(self.src);
                (ExprKind::Number(Box::from(digits)), token.span())
            }

            // Negation: - primary
            TokenKind::Sub => {
                self.advance();
                self.descend(token)?;
                let expr = self.parse_primary()?;
                self.depth -= 1;
                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op: UnaryOperator::Neg,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            // Grouping: ( expr )
            TokenKind::LParen => {
                self.advance();
                self.descend(token)?;
                let expr = self.parse_expr(1)?;
                let end = self.consume(TokenKind::RParen)?;
                self.depth -= 1;
                (ExprKind::Paren(Box::new(expr)), token.span().to(end.span()))
            }

            actual => {
                const EXPECTED: &[TokenKind] =
                    &[TokenKind::Number, TokenKind::Sub, TokenKind::LParen];
                return Err(token.span().wrap(Error::UnexpectedToken {
                    actual,
                    expected: Box::from(EXPECTED),
                }));
            }
        };

        Ok(Expr { kind, span })
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok [Token]) -> Parser<'src, 'tok> {
        Parser {
            src,
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    /// Enters one nesting level on behalf of `token`.
    fn descend(&mut self, token: Token) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(token.span().wrap(Error::TooDeep { limit: MAX_DEPTH }));
        }
        Ok(())
    }

    /// Returns the current token. Past the end of the buffer this is a
    /// synthetic end-of-input token.
    #[inline]
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        self.cursor += 1;
        c
    }

    /// Advances if the current token matches the provided one. If not,
    /// returns the error describing the mismatch.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if c.kind == expect {
            self.advance();
            Ok(c)
        } else {
            Err(c.span().wrap(Error::UnexpectedToken {
                actual: c.kind,
                expected: Box::from([expect]),
            }))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedToken {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    TooDeep {
        limit: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedToken { actual, expected } => {
                write!(f, "unexpected {actual}")?;
                if let Some((last, init)) = expected.split_last() {
                    f.write_str(", expected ")?;
                    for (idx, kind) in init.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{kind}")?;
                    }
                    if !init.is_empty() {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{last}")?;
                }
                Ok(())
            }
            Error::TooDeep { limit } => {
                write!(f, "expression nests deeper than {limit} levels")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_number() {
            let expr = "42";
            let tree_ok = "number 42 (0..2)";
        }

        fn test_precedence() {
            let expr = "1+2*3";
            let tree_ok = "
                binary Add (0..5)
                  number 1 (0..1)
                  binary Mul (2..5)
                    number 2 (2..3)
                    number 3 (4..5)
            ";
        }

        fn test_left_associativity() {
            let expr = "8-3-2";
            let tree_ok = "
                binary Sub (0..5)
                  binary Sub (0..3)
                    number 8 (0..1)
                    number 3 (2..3)
                  number 2 (4..5)
            ";
        }

        fn test_left_associativity_mixed_levels() {
            let expr = "8 / 2 * 3 - 1 + 4";
            let tree_ok = "
                binary Add (0..17)
                  binary Sub (0..13)
                    binary Mul (0..9)
                      binary Div (0..5)
                        number 8 (0..1)
                        number 2 (4..5)
                      number 3 (8..9)
                    number 1 (12..13)
                  number 4 (16..17)
            ";
        }

        fn test_parens_override_precedence() {
            let expr = "(1+2)*3";
            let tree_ok = "
                binary Mul (0..7)
                  paren (0..5)
                    binary Add (1..4)
                      number 1 (1..2)
                      number 2 (3..4)
                  number 3 (6..7)
            ";
        }

        fn test_simple_expression() {
            let expr = "(1 * 2 + 3) - (1 + 2 * 3)";
            let tree_ok = "
                binary Sub (0..25)
                  paren (0..11)
                    binary Add (1..10)
                      binary Mul (1..6)
                        number 1 (1..2)
                        number 2 (5..6)
                      number 3 (9..10)
                  paren (14..25)
                    binary Add (15..24)
                      number 1 (15..16)
                      binary Mul (19..24)
                        number 2 (19..20)
                        number 3 (23..24)
            ";
        }

        fn test_negation() {
            let expr = "-5+2";
            let tree_ok = "
                binary Add (0..4)
                  unary Neg (0..2)
                    number 5 (1..2)
                  number 2 (3..4)
            ";
        }

        fn test_negation_binds_tighter_than_mul() {
            let expr = "-2*3";
            let tree_ok = "
                binary Mul (0..4)
                  unary Neg (0..2)
                    number 2 (1..2)
                  number 3 (3..4)
            ";
        }

        fn test_double_negation() {
            let expr = "--5";
            let tree_ok = "
                unary Neg (0..3)
                  unary Neg (1..3)
                    number 5 (2..3)
            ";
        }

        fn test_negated_group() {
            let expr = "-(1-2)";
            let tree_ok = "
                unary Neg (0..6)
                  paren (1..6)
                    binary Sub (2..5)
                      number 1 (2..3)
                      number 2 (4..5)
            ";
        }

        fn test_nested_parens() {
            let expr = "((7))";
            let tree_ok = "
                paren (0..5)
                  paren (1..4)
                    number 7 (2..3)
            ";
        }

        fn test_empty_input() {
            let expr = "";
            let expected_errors = &["0..0: unexpected end of input, expected number, `-` or `(`"];
        }

        fn test_blank_input() {
            let expr = "   ";
            let expected_errors = &["3..3: unexpected end of input, expected number, `-` or `(`"];
        }

        fn test_unclosed_paren() {
            let expr = "(1+2";
            let expected_errors = &["4..4: unexpected end of input, expected `)`"];
        }

        fn test_unopened_paren() {
            let expr = "1+2)";
            let expected_errors = &["3..4: unexpected `)`, expected end of input"];
        }

        fn test_trailing_number() {
            let expr = "1 2";
            let expected_errors = &["2..3: unexpected number, expected end of input"];
        }

        fn test_dangling_operator() {
            let expr = "1 +";
            let expected_errors = &["3..3: unexpected end of input, expected number, `-` or `(`"];
        }

        fn test_double_binary_operator() {
            let expr = "1 * / 2";
            let expected_errors = &["4..5: unexpected `/`, expected number, `-` or `(`"];
        }

        fn test_empty_parens() {
            let expr = "()";
            let expected_errors = &["1..2: unexpected `)`, expected number, `-` or `(`"];
        }

        fn test_illegal_character() {
            let expr = "1 + x";
            let expected_errors = &["4..5: unexpected illegal character, expected number, `-` or `(`"];
        }

        fn test_illegal_character_after_expression() {
            let expr = "7 $";
            let expected_errors = &["2..3: unexpected illegal character, expected end of input"];
        }
    );

    #[test]
    fn test_error_kind_and_offset() {
        let mut tokens = Vec::new();
        let error = parse_expr("(1+2", &mut tokens).unwrap_err();
        assert_eq!(error.span.lo, 4);
        assert_eq!(
            error.inner,
            Error::UnexpectedToken {
                actual: TokenKind::Eof,
                expected: Box::from([TokenKind::RParen]),
            }
        );
    }

    #[test]
    fn test_deep_parens_are_rejected() {
        let src = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let error = parse_expr(&src, &mut Vec::new()).unwrap_err();
        assert_eq!(error.span.lo, 1024);
        assert_eq!(error.inner, Error::TooDeep { limit: MAX_DEPTH });
        assert_eq!(
            error.inner.to_string(),
            "expression nests deeper than 1024 levels"
        );
    }

    #[test]
    fn test_deep_negation_is_rejected() {
        let src = format!("{}1", "-".repeat(200_000));
        let error = parse_expr(&src, &mut Vec::new()).unwrap_err();
        assert_eq!(error.span.lo, 1024);
        assert_eq!(error.inner, Error::TooDeep { limit: MAX_DEPTH });
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        // The 1025th `+` sits at byte 2 * 1025 - 1.
        let src = format!("{}1", "1+".repeat(200_000));
        let error = parse_expr(&src, &mut Vec::new()).unwrap_err();
        assert_eq!(error.span.lo, 2049);
        assert_eq!(error.inner, Error::TooDeep { limit: MAX_DEPTH });
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() {
        let src = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        let expr = parse_expr(&src, &mut Vec::new()).unwrap();
        assert_eq!(expr.node_count(), MAX_DEPTH + 1);

        let chain = format!("{}1", "1+".repeat(MAX_DEPTH));
        assert!(parse_expr(&chain, &mut Vec::new()).is_ok());

        // Depth is released once a group closes. The right operand sits one
        // level below the operator.
        let n = MAX_DEPTH - 1;
        let group = format!("{}1{}", "(".repeat(n), ")".repeat(n));
        let siblings = format!("{group} + {group}");
        assert!(parse_expr(&siblings, &mut Vec::new()).is_ok());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let src = "2*(3+4) - -1 / 5";
        let first = parse_expr(src, &mut Vec::new()).unwrap();
        let second = parse_expr(src, &mut Vec::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_from_token_slice() {
        let src = "6/3";
        let tokens = lexer::lex_in_new(src);
        let expr = parse(src, &tokens).unwrap();
        assert_eq!(expr.node_count(), 3);
    }
}
