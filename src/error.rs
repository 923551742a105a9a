/// Checking errors.
///
/// Defines the errors raised by the first-pass semantic checker: unresolved
/// external dependencies, misuse of `pipe`/`pipe_capture` arguments, and
/// duplicate top-level declarations.
pub mod check_error;
/// Evaluation errors.
///
/// Contains all error types that can be raised while tree-walking a parsed
/// program: undefined identifiers, arity and type mismatches, missing
/// template variables, and failed external pipelines.
pub mod eval_error;
/// Parsing errors.
///
/// Defines all error types that can occur while building the host AST or an
/// interpolation template AST: unexpected tokens, unclosed containers, and
/// missing required keywords or symbols.
pub mod parse_error;
/// Process errors.
///
/// Contains the errors produced while spawning and supervising external
/// process pipelines. Broken pipes are deliberately absent: they are a
/// normal way for a pipeline to wind down and are swallowed by the
/// supervisor.
pub mod process_error;
/// Scanning errors.
///
/// Defines the errors raised during lexical analysis of both the host
/// language and the interpolation sub-language.
pub mod scan_error;

pub use check_error::CheckError;
pub use eval_error::EvalError;
pub use parse_error::ParseError;
pub use process_error::ProcessError;
pub use scan_error::ScanError;

use crate::source::Pos;

/// Any error surfaced by the public API, tagged by the phase that produced
/// it.
#[derive(Debug)]
pub enum WellError {
    /// Lexical analysis failed.
    Scan(ScanError),
    /// Syntactic analysis failed.
    Parse(ParseError),
    /// The semantic checker rejected the program.
    Check(CheckError),
    /// Evaluation aborted.
    Eval(EvalError),
}

impl WellError {
    /// The source position the error points at, or
    /// [`NO_POS`](crate::source::NO_POS).
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Scan(e) => e.pos(),
            Self::Parse(e) => e.pos(),
            Self::Check(e) => e.pos(),
            Self::Eval(e) => e.pos(),
        }
    }

    /// Renders the error as a caret diagnostic against the source text it
    /// was produced from.
    #[must_use]
    pub fn render(&self, src: &str) -> String {
        match self {
            Self::Check(e @ CheckError::UnresolvedDependencies { .. }) => e.render(src),
            _ => crate::source::mark_at(src, self.pos(), &self.to_string()),
        }
    }
}

impl std::fmt::Display for WellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Check(e) => write!(f, "{e}"),
            Self::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WellError {}

impl From<ScanError> for WellError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

impl From<ParseError> for WellError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<CheckError> for WellError {
    fn from(e: CheckError) -> Self {
        Self::Check(e)
    }
}

impl From<EvalError> for WellError {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}
