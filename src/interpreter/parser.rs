/// Expression parsing: primaries, calls, operator precedence and pipe
/// rewriting.
pub mod core;
/// Declaration parsing: `let`, `function`, `external`, and signatures.
mod decl;
/// Statement parsing: blocks, `if`, `return`, and expression statements.
mod stmt;

pub use self::core::{parse_expr_source, parse_program, Parser};
