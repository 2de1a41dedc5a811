//! SCT parser: converts a token stream into a program tree.

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{parse_expression, parse_module, ParseResult, Parser};
