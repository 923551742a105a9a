/// The checker module performs the first-pass semantic analysis.
///
/// The checker assigns coarse types to named expressions and collects the
/// external commands a program depends on, so that missing `external`
/// declarations are reported before anything is executed.
///
/// # Responsibilities
/// - Assigns `Integer`/`Float`/`String`/`Boolean`/`Function` tags to named
///   expressions.
/// - Validates `pipe`/`pipe_capture` argument shape.
/// - Reports unresolved external dependencies with source positions.
pub mod checker;
/// The environment module implements the scope chain.
///
/// Scopes form a chain from the innermost scope out to the globals. Lookup
/// walks outward; insertion is always into the current scope and refuses to
/// shadow a binding already present there.
pub mod env;
/// The evaluator module executes AST nodes and computes results.
///
/// The evaluator traverses the AST, evaluates expressions and statements,
/// invokes user functions and builtins, and turns external-function calls
/// into lazy process pipelines. It is the core execution engine of the
/// interpreter.
///
/// # Responsibilities
/// - Evaluates AST nodes, performing all supported operations.
/// - Threads piped arguments into functions and child processes.
/// - Reports evaluation errors with source positions.
pub mod evaluator;
/// The lexer module tokenizes host-language source code.
///
/// The lexer reads the raw source text and produces a stream of tokens with
/// byte positions. Newlines are tokens (they terminate statements); spaces
/// and comments are skipped.
pub mod lexer;
/// The parser module builds the host AST from tokens.
///
/// The parser is a recursive-descent parser with Pratt-style operator
/// precedence. String literals are unquoted and handed to the template
/// parser, so a parsed program carries both ASTs.
///
/// # Responsibilities
/// - Parses declarations, signatures, blocks, statements and expressions.
/// - Rewrites `a | f(x)` pipelines into calls with piped arguments.
/// - Reports grammar violations with the offending token's position.
pub mod parser;
/// The value module defines the runtime data types for evaluation.
///
/// This module declares the `Object` enum used during interpretation:
/// numbers, booleans, two-faced strings (rendered text plus argv), lazy
/// pipe streams, functions and builtins.
pub mod value;
