use crate::{error::ScanError, source::Pos};

#[derive(Debug, Clone, PartialEq)]
/// Represents all errors that can occur while parsing a program or an
/// interpolation template.
pub enum ParseError {
    /// The scanner rejected the input before a token could be produced.
    Scan(ScanError),
    /// Found a token that does not fit the grammar at this point.
    UnexpectedToken {
        /// Printable form of the token encountered.
        token: String,
        /// Byte offset of the token.
        pos:   Pos,
    },
    /// The input ended in the middle of a production.
    UnexpectedEndOfInput {
        /// Byte offset of the end of input.
        pos: Pos,
    },
    /// A specific keyword or symbol was required.
    Expected {
        /// The literal that was required, e.g. `"{"` or `"function"`.
        want:  String,
        /// Printable form of the token found instead.
        found: String,
        /// Byte offset of the offending token.
        pos:   Pos,
    },
    /// A quoted or guillemet container in a template was never closed.
    UnclosedContainer {
        /// Byte offset of the end of the template.
        pos: Pos,
    },
    /// The right-hand side of `|` must be a call expression.
    PipeIntoNonCall {
        /// Byte offset of the offending expression.
        pos: Pos,
    },
    /// A string literal could not be unquoted or its template is invalid.
    BadStringLiteral {
        /// Explanation of what went wrong inside the literal.
        detail: String,
        /// Byte offset of the string literal.
        pos:    Pos,
    },
    /// A numeric literal was out of range or otherwise unparsable.
    BadNumber {
        /// The literal text.
        literal: String,
        /// Byte offset of the literal.
        pos:     Pos,
    },
}

impl ParseError {
    /// The source position the error points at.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Scan(e) => e.pos(),
            Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEndOfInput { pos }
            | Self::Expected { pos, .. }
            | Self::UnclosedContainer { pos }
            | Self::PipeIntoNonCall { pos }
            | Self::BadStringLiteral { pos, .. }
            | Self::BadNumber { pos, .. } => *pos,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "{e}"),
            Self::UnexpectedToken { token, .. } => write!(f, "unexpected token {token}"),
            Self::UnexpectedEndOfInput { .. } => write!(f, "unexpected end of input"),
            Self::Expected { want, found, .. } => write!(f, "expected {want}, got {found}"),
            Self::UnclosedContainer { .. } => write!(f, "unclosed container"),
            Self::PipeIntoNonCall { .. } => {
                write!(f, "the right side of | must be a call expression")
            },
            Self::BadStringLiteral { detail, .. } => {
                write!(f, "invalid string literal: {detail}")
            },
            Self::BadNumber { literal, .. } => write!(f, "invalid number {literal:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ScanError> for ParseError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}
