//! # well
//!
//! well is an interpreter for a small shell-replacement scripting
//! language. Programs declare the external commands they depend on, build
//! argument vectors through a quoting-aware string-interpolation
//! sub-language, and wire processes together with `|` pipelines that are
//! spawned lazily and supervised until every child exits.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
)]
#![allow(clippy::missing_errors_doc)]

use std::io::Write;

use log::debug;

use crate::{
    error::{CheckError, WellError},
    interpreter::{
        checker::Checker,
        env::Environment,
        evaluator::Interpreter,
        parser::parse_program,
        value::{Object, PipeStream},
    },
    template::expander::SingleQuoting,
};

/// Defines the structure of parsed code.
///
/// This module declares the declaration, statement and expression types
/// that represent the syntactic structure of a program as a tree. The AST
/// is built by the parser and traversed by the checker and evaluator.
pub mod ast;
/// Provides unified error types for every phase.
///
/// One enum per phase (scanning, parsing, checking, evaluation, process
/// supervision), each variant carrying the source position of the
/// offending token so the driver can render caret diagnostics.
pub mod error;
/// Orchestrates parsing, checking, and execution of programs.
///
/// This module ties together the lexer, parser, checker, environment,
/// runtime values, and the tree-walking evaluator.
pub mod interpreter;
/// Spawns and supervises external process pipelines.
///
/// Given a list of argument vectors, wires each child's stdout to the
/// next child's stdin, mirrors output into log buffers, tolerates broken
/// pipes, and reports fatal failures with truncated logs.
pub mod pipeline;
/// Renders a parsed program back to canonical source text.
pub mod printer;
/// Source positions and caret diagnostics.
pub mod source;
/// The string-interpolation sub-language: scanner, parser, and expander.
pub mod template;

/// Options for one program run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Echo rendered strings and per-child command logs to stderr.
    pub verbose: bool,
    /// Which single-quote style rendered strings use.
    pub quoting: SingleQuoting,
}

/// Parses, checks, and evaluates a program.
///
/// The check pass runs before evaluation: a program that calls external
/// commands it never declared is rejected without anything being spawned.
/// `stdout` receives the program's output; `stderr` receives verbose
/// traces and command logs.
///
/// # Errors
/// Returns the first error of any phase. Render it against the source
/// with [`WellError::render`] for a caret diagnostic.
///
/// # Examples
/// ```
/// let src = "function main() {\n\tprintln(\"hello\")\n}\n";
/// let mut out = Vec::new();
/// well::run_program(src, &mut out, &mut Vec::new(), &well::RunOptions::default()).unwrap();
/// assert_eq!(out, b"hello\n");
/// ```
pub fn run_program<O: Write, E: Write>(src: &str,
                                       stdout: O,
                                       stderr: E,
                                       options: &RunOptions)
                                       -> Result<(), WellError> {
    let program = parse_program(src)?;

    let outcome = Checker::new().check(&program)?;
    if !outcome.unresolved.is_empty() {
        return Err(CheckError::UnresolvedDependencies { deps: outcome.unresolved }.into());
    }
    debug!("check pass ok, {} typed positions", outcome.types.len());

    let mut interp = Interpreter::new(stdout, stderr);
    interp.verbose = options.verbose;
    interp.quoting = options.quoting;

    let env = Environment::new();
    env.set("MainStdin", Object::Stream(PipeStream::host_stdin()))
       .map_err(|e| {
           WellError::Eval(error::EvalError::DuplicateBinding { name: e.name,
                                                                pos:  source::NO_POS, })
       })?;

    interp.eval_program(&program, &env)?;
    Ok(())
}

/// Parses and checks a program without running it, returning the check
/// outcome (type map and unresolved dependencies).
///
/// # Errors
/// Scan, parse, and check errors.
pub fn check_program(src: &str) -> Result<interpreter::checker::CheckOutcome, WellError> {
    let program = parse_program(src)?;
    Ok(Checker::new().check(&program)?)
}

/// Parses a program and renders it in canonical formatting.
///
/// # Errors
/// Scan and parse errors.
pub fn format_source(src: &str) -> Result<String, WellError> {
    let program = parse_program(src)?;
    Ok(printer::format_program(&program))
}
