//! Human readable dumps of the pipeline's intermediate stages.

pub mod error;
pub mod tree;

pub use error::caret;
pub use tree::{print_expr, print_expr_string, print_tokens, print_tokens_string};
