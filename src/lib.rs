/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The code generator lowers an AST into three-address code and renders it
/// as a C program.
pub mod codegen;

/// The driver hands generated programs to a native toolchain and runs the
/// resulting executables.
pub mod driver;

pub mod ast;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

use tracing::debug;

use crate::token::Spanned;

/// Runs the front end over `src`, returning the generated C program.
pub fn compile(src: &str) -> Result<String, Spanned<parser::Error>> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    lexer::lex(src, &mut tokens);
    debug!(tokens = tokens.len(), "lexed source");

    let expr = parser::parse(src, &tokens)?;
    debug!(nodes = expr.node_count(), "parsed expression");

    let lowered = codegen::lower(&expr);
    debug!(
        instrs = lowered.instrs().len(),
        result = %lowered.result(),
        "lowered expression"
    );

    Ok(codegen::c::render(&lowered))
}
