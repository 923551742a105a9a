use crate::{error::ProcessError, source::Pos};

#[derive(Debug)]
/// Represents all errors that can be raised during evaluation.
pub enum EvalError {
    /// Looked up a name that is neither bound nor a builtin.
    Missing {
        /// The undefined name.
        name: String,
        /// Byte offset of the reference.
        pos:  Pos,
    },
    /// A name was bound twice in the same scope.
    DuplicateBinding {
        /// The rebound name.
        name: String,
        /// Byte offset of the second binding.
        pos:  Pos,
    },
    /// Tried to call a value that is not a function or builtin.
    NotCallable {
        /// Printable form of the value.
        what: String,
        /// Byte offset of the call.
        pos:  Pos,
    },
    /// A call supplied the wrong number of arguments.
    ArityMismatch {
        /// The function being called.
        name:  String,
        /// Number of parameters declared.
        want:  usize,
        /// Number of arguments supplied.
        got:   usize,
        /// Whether the mismatch is in the piped parameter list.
        piped: bool,
        /// Byte offset of the argument list.
        pos:   Pos,
    },
    /// An operand or argument had the wrong type.
    TypeMismatch {
        /// Details about the mismatch.
        details: String,
        /// Byte offset of the offending expression.
        pos:     Pos,
    },
    /// A template referenced a variable with no value in scope.
    MissingVariable {
        /// The variable name.
        name: String,
        /// Byte offset of the string literal being expanded.
        pos:  Pos,
    },
    /// A template could not be expanded for a reason other than a missing
    /// variable (e.g. unsupported format options).
    Expand {
        /// Details from the expander.
        details: String,
        /// Byte offset of the string literal being expanded.
        pos:     Pos,
    },
    /// The right operand of `~~`/`!~` is not a valid regular expression.
    BadRegex {
        /// The pattern that failed to compile.
        pattern: String,
        /// Byte offset of the operand.
        pos:     Pos,
    },
    /// Attempted division (or remainder) by zero.
    DivisionByZero {
        /// Byte offset of the operation.
        pos: Pos,
    },
    /// A pipe stream was consumed a second time.
    StreamConsumed {
        /// Byte offset of the consuming expression.
        pos: Pos,
    },
    /// A builtin rejected its arguments or failed internally.
    Builtin {
        /// What went wrong.
        details: String,
        /// Byte offset of the builtin call.
        pos:     Pos,
    },
    /// Reading interactive input failed.
    Input {
        /// The underlying I/O error message.
        details: String,
        /// Byte offset of the builtin call.
        pos:     Pos,
    },
    /// An external pipeline failed.
    Process {
        /// The pipeline error.
        source: ProcessError,
        /// Byte offset of the expression that ran the pipeline.
        pos:    Pos,
    },
}

impl EvalError {
    /// The source position the error points at.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Missing { pos, .. }
            | Self::DuplicateBinding { pos, .. }
            | Self::NotCallable { pos, .. }
            | Self::ArityMismatch { pos, .. }
            | Self::TypeMismatch { pos, .. }
            | Self::MissingVariable { pos, .. }
            | Self::Expand { pos, .. }
            | Self::BadRegex { pos, .. }
            | Self::DivisionByZero { pos }
            | Self::StreamConsumed { pos }
            | Self::Builtin { pos, .. }
            | Self::Input { pos, .. }
            | Self::Process { pos, .. } => *pos,
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { name, .. } => write!(f, "{name:?} is missing"),
            Self::DuplicateBinding { name, .. } => write!(f, "duplicate env key {name:?}"),
            Self::NotCallable { what, .. } => write!(f, "{what} is not callable"),
            Self::ArityMismatch { name,
                                  want,
                                  got,
                                  piped, .. } => {
                let which = if *piped { "piped args" } else { "args" };
                write!(f, "{name} takes {want} {which}, call is sending {got}")
            },
            Self::TypeMismatch { details, .. } => write!(f, "type mismatch: {details}"),
            Self::MissingVariable { name, .. } => write!(f, "variable {name} is <nil>"),
            Self::Expand { details, .. } => write!(f, "failed to expand string: {details}"),
            Self::BadRegex { pattern, .. } => write!(f, "invalid regex {pattern:?}"),
            Self::DivisionByZero { .. } => write!(f, "division by zero"),
            Self::StreamConsumed { .. } => write!(f, "stream has already been consumed"),
            Self::Builtin { details, .. } => write!(f, "{details}"),
            Self::Input { details, .. } => write!(f, "failed to read input: {details}"),
            Self::Process { source, .. } => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Process { source, .. } => Some(source),
            _ => None,
        }
    }
}
