use crate::{
    codegen, parser,
    token::Spanned,
    util::fmt::tree,
};

pub fn format_errors<E>(e: &[Spanned<E>]) -> Vec<String>
where
    E: std::fmt::Display,
{
    e.iter().map(|e| format!("{e:#}")).collect()
}

/// Each variant contains the input.
pub enum Test {
    ParserExpr(&'static str),
    CodegenExpr(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    CodeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the front end over the test input. Returns the printed tree (or the
/// generated program, for code generation tests) and the formatted errors.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens_buf = &mut Vec::with_capacity(64);

    let (input, render): (_, fn(&crate::ast::Expr) -> String) = match test {
        Test::ParserExpr(input) => (input, tree::print_expr_string),
        Test::CodegenExpr(input) => (input, codegen::generate),
    };

    match parser::parse_expr(input, tokens_buf) {
        Ok(expr) => (render(&expr), vec![]),
        Err(error) => (String::new(), format_errors(&[error])),
    }
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, formatted_actual: &str, formatted_actual_errors: &[String]) {
    match assertion {
        Assertion::TreeOk(expected) | Assertion::CodeOk(expected) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual.trim(), expected.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, code_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::CodeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(codegen, expr), $source:expr) => {
        crate::util::test_utils::Test::CodegenExpr($source)
    };
}
pub(crate) use tree_tests;
