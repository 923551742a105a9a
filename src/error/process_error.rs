use crate::pipeline::CmdRecord;

#[derive(Debug)]
/// Represents all fatal errors produced while running an external process
/// pipeline.
///
/// A broken pipe is not represented here: a downstream consumer that exits
/// early (e.g. `head`) closing its stdin is a normal way for a pipeline to
/// finish, and the supervisor swallows it.
pub enum ProcessError {
    /// A pipeline stage had an empty argv.
    EmptyCommand,
    /// The OS refused to spawn a child process.
    Spawn {
        /// The argv that failed to spawn.
        argv:   Vec<String>,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// A child exited unsuccessfully (other than by broken pipe).
    StageFailed {
        /// The command log record of the failing stage, with truncated
        /// stdout and stderr.
        record: CmdRecord,
    },
    /// Reading or writing one of the pipeline's pipes failed.
    Io {
        /// Which pipe operation failed.
        context: String,
        /// The underlying I/O error.
        source:  std::io::Error,
    },
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "expected at least 1 word in command"),
            Self::Spawn { argv, source } => {
                write!(f, "failed to spawn {:?}: {source}", argv.join(" "))
            },
            Self::StageFailed { record } => {
                let detail = serde_yaml::to_string(record)
                    .unwrap_or_else(|_| format!("{record:?}"));
                write!(f,
                       "command {:?} failed: {}\n{detail}",
                       record.argv.join(" "),
                       record.err.as_deref().unwrap_or("non-zero exit"))
            },
            Self::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
