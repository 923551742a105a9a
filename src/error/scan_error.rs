use crate::source::Pos;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents all errors that can occur during lexical analysis.
pub enum ScanError {
    /// Found a character that cannot begin any token.
    IllegalCharacter {
        /// The offending character.
        ch:  char,
        /// Byte offset of the character in the source.
        pos: Pos,
    },
    /// A string literal was opened but never closed.
    UnterminatedString {
        /// Byte offset of the opening quote.
        pos: Pos,
    },
    /// A `${…}` variable reference in a template is malformed: the braces
    /// are unbalanced, the name is not an identifier, or the format options
    /// do not start with `%`.
    InvalidVariable {
        /// Byte offset of the `$` in the template.
        pos: Pos,
    },
}

impl ScanError {
    /// The source position the error points at.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::IllegalCharacter { pos, .. }
            | Self::UnterminatedString { pos }
            | Self::InvalidVariable { pos } => *pos,
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalCharacter { ch, .. } => write!(f, "invalid character {ch:?}"),
            Self::UnterminatedString { .. } => write!(f, "unterminated string literal"),
            Self::InvalidVariable { .. } => write!(f, "malformed variable reference"),
        }
    }
}

impl std::error::Error for ScanError {}
