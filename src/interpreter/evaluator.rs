use std::{io::Write, path::PathBuf};

use crate::{error::EvalError, template::expander::SingleQuoting};

/// Operator semantics: arithmetic, comparisons, equality, and the regex
/// match operators.
mod binary;
/// The builtin function table.
mod builtin;
/// Function invocation: user functions, builtins, and external commands.
mod call;
/// Node dispatch: declarations, statements, and expressions.
mod core;

pub use builtin::BUILTIN_NAMES;

/// Result type used by the evaluator.
///
/// Evaluation either produces an optional value (statements and some
/// builtins produce none) or an [`EvalError`] carrying a source position.
pub type EvalResult<T> = Result<T, EvalError>;

/// The tree-walking evaluator.
///
/// One interpreter is created per run and owns everything that the
/// original kept as process-wide state: the output writers, the verbose
/// flag, the quoting variant, the working directory used for spawned
/// children, and the command-log counter.
pub struct Interpreter<Out: Write, ErrOut: Write> {
    /// Where `print`, `println` and consumed pipelines write.
    pub stdout:  Out,
    /// Where verbose traces and command logs are written.
    pub stderr:  ErrOut,
    /// Echo every rendered string literal to stderr, prefixed with `+`,
    /// and emit a YAML command log per pipeline stage.
    pub verbose: bool,
    /// Which single-quote style rendered strings use.
    pub quoting: SingleQuoting,
    /// Working directory for spawned children.
    pub dir:     PathBuf,
    counter:     u64,
}

impl<Out: Write, ErrOut: Write> Interpreter<Out, ErrOut> {
    /// Creates an interpreter writing to the given streams, rooted in the
    /// host's current directory.
    pub fn new(stdout: Out, stderr: ErrOut) -> Self {
        Self { stdout,
               stderr,
               verbose: false,
               quoting: SingleQuoting::default(),
               dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
               counter: 0 }
    }

    /// Runs `body` with the working directory temporarily changed,
    /// restoring the previous directory on the way out.
    pub fn with_dir<T>(&mut self,
                       dir: PathBuf,
                       body: impl FnOnce(&mut Self) -> EvalResult<T>)
                       -> EvalResult<T> {
        let saved = std::mem::replace(&mut self.dir, dir);
        let result = body(self);
        self.dir = saved;
        result
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.counter + 1
    }

    pub(crate) fn advance_seq(&mut self, by: u64) {
        self.counter += by;
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Interpreter;

    #[test]
    fn with_dir_restores_the_previous_directory() {
        let mut interp = Interpreter::<Vec<u8>, Vec<u8>>::new(Vec::new(), Vec::new());
        let before = interp.dir.clone();
        let inside = interp.with_dir(PathBuf::from("/"), |i| Ok(i.dir.clone()))
                           .unwrap();
        assert_eq!(inside, PathBuf::from("/"));
        assert_eq!(interp.dir, before);
    }
}
