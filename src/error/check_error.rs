use crate::source::{line_col_at, Pos};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents all errors raised by the semantic checker.
pub enum CheckError {
    /// Commands are invoked through `pipe`/`pipe_capture` without a
    /// corresponding `external` declaration in scope.
    UnresolvedDependencies {
        /// Each undeclared command name with the position of its call.
        deps: Vec<(String, Pos)>,
    },
    /// An argument of `pipe`/`pipe_capture` was not a call expression.
    PipeArgNotCall {
        /// Name of the builtin that was misused (`pipe` or `pipe_capture`).
        builtin: String,
        /// Byte offset of the offending argument.
        pos:     Pos,
    },
    /// The same name was declared twice at the top level.
    DuplicateDeclaration {
        /// The redeclared name.
        name: String,
        /// Byte offset of the second declaration.
        pos:  Pos,
    },
}

impl CheckError {
    /// The source position the error points at. For a dependency report
    /// this is the first unresolved call site.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::UnresolvedDependencies { deps } => {
                deps.first().map_or(crate::source::NO_POS, |d| d.1)
            },
            Self::PipeArgNotCall { pos, .. } | Self::DuplicateDeclaration { pos, .. } => *pos,
        }
    }

    /// Renders the error against the source it was produced from. For a
    /// dependency report every undeclared command is listed with its line
    /// and column.
    #[must_use]
    pub fn render(&self, src: &str) -> String {
        match self {
            Self::UnresolvedDependencies { deps } => {
                let mut lines =
                    vec!["The following external commands are undeclared:".to_string()];
                for (name, pos) in deps {
                    let (line, col) = line_col_at(src, *pos);
                    lines.push(format!("   {}:{}: {name}", line + 1, col + 1));
                }
                lines.join("\n")
            },
            _ => crate::source::mark_at(src, self.pos(), &self.to_string()),
        }
    }
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedDependencies { deps } => {
                let names: Vec<&str> = deps.iter().map(|(n, _)| n.as_str()).collect();
                write!(f, "undeclared external commands: {}", names.join(", "))
            },
            Self::PipeArgNotCall { builtin, .. } => {
                write!(f, "args to {builtin} must be call expressions")
            },
            Self::DuplicateDeclaration { name, .. } => {
                write!(f, "duplicate declaration of {name:?}")
            },
        }
    }
}

impl std::error::Error for CheckError {}
