use std::{
    io::{ErrorKind, Read, Write},
    path::PathBuf,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    time::{SystemTime, UNIX_EPOCH},
};

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::{error::ProcessError, interpreter::value::Stage};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Working directory for every child.
    pub dir: PathBuf,
    /// Strip trailing whitespace from the pipeline's result.
    pub trim_trailing_spaces: bool,
    /// Sequence number assigned to the first stage's log record;
    /// subsequent stages count up from it.
    pub first_seq: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("."),
               trim_trailing_spaces: false,
               first_seq: 1 }
    }
}

/// The outcome of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// The final stage's captured stdout.
    pub stdout:  String,
    /// One log record per stage, in pipeline order.
    pub records: Vec<CmdRecord>,
}

/// The per-child command log record. Serialized to YAML on the verbose
/// log and embedded in failures.
#[derive(Debug, Clone, Serialize)]
pub struct CmdRecord {
    /// Monotonically increasing sequence number, so interleaved records
    /// remain re-orderable by a human reader.
    pub seq:    u64,
    /// Seconds since the Unix epoch when the record was written.
    pub time:   f64,
    /// The rendered command line of this stage.
    pub cmd:    String,
    /// The interpolated argv actually spawned.
    #[serde(rename = "cmd_interpolated_args")]
    pub argv:   Vec<String>,
    /// The host process working directory.
    pub pwd:    String,
    /// Working directory the child ran in.
    pub dir:    String,
    /// Every stage of the pipeline by program name, the current one
    /// marked.
    pub pipe:   Vec<String>,
    /// The stage's stdout, cleaned and truncated.
    pub stdout: String,
    /// The stage's stderr, cleaned and truncated.
    pub stderr: String,
    /// The failure, if the child did not exit cleanly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err:    Option<String>,
}

/// Spawns the stages as a chain of child processes, wires each stage's
/// stdout to the next stage's stdin, supervises them all, and returns the
/// final stage's stdout.
///
/// The first child reads the host's standard input. Every child's stdout
/// is also mirrored into a log buffer, so the returned text is exactly
/// what the downstream stage observed. A child that dies of a broken pipe
/// is treated as finished: that is the normal fate of a producer whose
/// consumer (say, `head`) exits early.
///
/// # Errors
/// - `ProcessError::EmptyCommand` if a stage has no argv.
/// - `ProcessError::Spawn` if a child cannot be started.
/// - `ProcessError::StageFailed` for any fatal child failure, carrying
///   that stage's log record with truncated stdout/stderr.
pub fn run_pipeline(stages: &[Stage], cfg: &RunConfig) -> Result<PipelineOutput, ProcessError> {
    if stages.iter().any(|s| s.argv.is_empty()) {
        return Err(ProcessError::EmptyCommand);
    }
    debug!("running pipeline of {} stages in {:?}", stages.len(), cfg.dir);

    let mut children: Vec<Child> = Vec::with_capacity(stages.len());
    for (i, stage) in stages.iter().enumerate() {
        let mut cmd = Command::new(&stage.argv[0]);
        cmd.args(&stage.argv[1..])
           .current_dir(&cfg.dir)
           .stdout(Stdio::piped())
           .stderr(Stdio::piped());
        if i == 0 {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::piped());
        }
        match cmd.spawn() {
            Ok(child) => children.push(child),
            Err(source) => {
                return Err(ProcessError::Spawn { argv: stage.argv.clone(),
                                                 source });
            },
        }
    }

    // Detach the pipe ends we supervise. Each stage's stdout copier owns
    // the *next* stage's stdin and closes it exactly once, at EOF.
    let mut next_stdins: Vec<Option<ChildStdin>> = Vec::with_capacity(stages.len());
    for i in 0..children.len() {
        if i + 1 < children.len() {
            next_stdins.push(children[i + 1].stdin.take());
        } else {
            next_stdins.push(None);
        }
    }

    let mut stdouts: Vec<Vec<u8>> = Vec::with_capacity(stages.len());
    let mut stderrs: Vec<Vec<u8>> = Vec::with_capacity(stages.len());

    std::thread::scope(|scope| {
        let mut stdout_handles = Vec::with_capacity(children.len());
        let mut stderr_handles = Vec::with_capacity(children.len());

        for (child, downstream) in children.iter_mut().zip(next_stdins.drain(..)) {
            let out = child.stdout.take();
            stdout_handles.push(scope.spawn(move || tee(out, downstream)));
            let err = child.stderr.take();
            stderr_handles.push(scope.spawn(move || tee(err, None)));
        }

        for handle in stdout_handles {
            stdouts.push(handle.join().unwrap_or_default());
        }
        for handle in stderr_handles {
            stderrs.push(handle.join().unwrap_or_default());
        }
    });

    let mut statuses: Vec<ExitStatus> = Vec::with_capacity(children.len());
    for (child, stage) in children.iter_mut().zip(stages) {
        match child.wait() {
            Ok(status) => statuses.push(status),
            Err(source) => {
                return Err(ProcessError::Io { context: format!("failed to await {:?}",
                                                               stage.argv[0]),
                                              source });
            },
        }
    }

    let pwd = std::env::current_dir().map_or_else(|_| String::from("?"),
                                                  |d| d.display().to_string());
    let mut records = Vec::with_capacity(stages.len());
    let mut failure: Option<usize> = None;
    for (i, status) in statuses.iter().enumerate() {
        let fatal = !status.success() && !is_broken_pipe(*status);
        if fatal && failure.is_none() {
            failure = Some(i);
        }
        records.push(CmdRecord { seq:    cfg.first_seq + i as u64,
                                 time:   unix_time(),
                                 cmd:    stages[i].text.clone(),
                                 argv:   stages[i].argv.clone(),
                                 pwd:    pwd.clone(),
                                 dir:    cfg.dir.display().to_string(),
                                 pipe:   pipe_overview(stages, i),
                                 stdout: clean_output(&stdouts[i]),
                                 stderr: clean_output(&stderrs[i]),
                                 err:    if status.success() {
                                             None
                                         } else {
                                             Some(describe_status(*status))
                                         }, });
    }

    if let Some(i) = failure {
        return Err(ProcessError::StageFailed { record: records.swap_remove(i) });
    }

    let mut stdout = String::from_utf8_lossy(stdouts.last().map_or(&[][..], Vec::as_slice))
        .into_owned();
    if cfg.trim_trailing_spaces {
        stdout = stdout.trim().to_string();
    }

    Ok(PipelineOutput { stdout, records })
}

/// Copies a child's output into a buffer, forwarding every chunk to the
/// next stage's stdin when there is one.
///
/// A failed downstream write ends the copy: dropping the reader closes
/// the pipe, so a producer that keeps writing (like `yes`) receives
/// SIGPIPE and winds down instead of filling the buffer forever. Dropping
/// the writer at the end closes the downstream stdin exactly once.
fn tee(reader: Option<impl Read>, mut downstream: Option<ChildStdin>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut reader) = reader else {
        return buf;
    };
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(writer) = downstream.as_mut() {
                    if let Err(e) = writer.write_all(&chunk[..n]) {
                        if e.kind() != ErrorKind::BrokenPipe {
                            debug!("pipe write failed: {e}");
                        }
                        break;
                    }
                }
            },
        }
    }
    buf
}

#[cfg(unix)]
fn is_broken_pipe(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    // SIGPIPE is 13 everywhere Unix. A shell-style 128+13 exit code
    // counts too.
    status.signal() == Some(13) || status.code() == Some(141)
}

#[cfg(not(unix))]
fn is_broken_pipe(_status: ExitStatus) -> bool {
    false
}

#[cfg(unix)]
fn describe_status(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit status {code}"),
        (None, Some(13)) => "signal: broken pipe".to_string(),
        (None, Some(sig)) => format!("signal: {sig}"),
        (None, None) => "unknown failure".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {code}"),
        None => "unknown failure".to_string(),
    }
}

fn unix_time() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH)
                     .map_or(0.0, |d| d.as_secs_f64())
}

fn pipe_overview(stages: &[Stage], current: usize) -> Vec<String> {
    stages.iter()
          .enumerate()
          .map(|(k, stage)| {
              if k == current {
                  format!("{} (current)", stage.argv[0])
              } else {
                  stage.argv[0].clone()
              }
          })
          .collect()
}

/// Normalizes line endings, strips trailing spaces and surrounding
/// whitespace, and truncates long output for the log.
fn clean_output(bytes: &[u8]) -> String {
    static TRAILING_SPACES: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    // The pattern is a literal, so compilation cannot fail.
    let re = TRAILING_SPACES.get_or_init(|| Regex::new(r"[ ]+\n").unwrap());

    let text = String::from_utf8_lossy(bytes).replace("\r\n", "\n");
    let text = re.replace_all(&text, "\n");
    truncate_output(text.trim())
}

const MAX_LOG_BYTES: usize = 500;
const MAX_LOG_LINES: usize = 5;

/// Keeps the first and last ~500 bytes / 5 lines, replacing the middle
/// with a `…(N bytes ~M lines truncated)…` marker.
fn truncate_output(text: &str) -> String {
    let bytes = text.as_bytes();

    let mut head_end = 0;
    let mut head_lines = 0;
    while head_end < bytes.len() {
        if bytes[head_end] == b'\n' {
            head_lines += 1;
        }
        head_end += 1;
        if head_end > MAX_LOG_BYTES || head_lines > MAX_LOG_LINES {
            break;
        }
    }
    if head_end >= bytes.len() {
        return text.to_string();
    }

    let mut tail_start = bytes.len();
    let mut tail_lines = 0;
    while tail_start > head_end {
        if bytes[tail_start - 1] == b'\n' {
            tail_lines += 1;
        }
        if bytes.len() - (tail_start - 1) > MAX_LOG_BYTES || tail_lines > MAX_LOG_LINES {
            break;
        }
        tail_start -= 1;
    }

    let skipped = &text[head_end..tail_start];
    let marker = format!("\n...({} bytes ~{} lines truncated)...\n",
                         skipped.len(),
                         skipped.matches('\n').count());
    if skipped.len() <= marker.len() {
        return text.to_string();
    }

    // Cut points may fall inside multi-byte runes; back off to a char
    // boundary.
    let mut head_end = head_end;
    while !text.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = tail_start;
    while !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    format!("{}{marker}{}", &text[..head_end], &text[tail_start..])
}

/// Renders records as a YAML stream, one document per record keyed by its
/// sequence number.
///
/// # Errors
/// Propagates serialization failures as I/O errors.
pub fn write_records_yaml(out: &mut dyn Write, records: &[CmdRecord]) -> std::io::Result<()> {
    for record in records {
        let mut keyed = std::collections::BTreeMap::new();
        keyed.insert(record.seq, record);
        let doc = serde_yaml::to_string(&keyed).map_err(std::io::Error::other)?;
        writeln!(out, "---")?;
        out.write_all(doc.as_bytes())?;
    }
    Ok(())
}

/// Builds a stage whose log text is just the argv joined by spaces, for
/// callers that have no rendered command line to show.
#[must_use]
pub fn stage(argv: Vec<String>) -> Stage {
    let text = argv.join(" ");
    Stage { argv, text }
}

#[cfg(test)]
mod tests {
    use super::{run_pipeline, stage, truncate_output, RunConfig};

    #[test]
    fn truncation_keeps_head_and_tail() {
        let many: Vec<String> = (0..200).map(|i| format!("line {i}")).collect();
        let text = many.join("\n");
        let out = truncate_output(&text);
        assert!(out.starts_with("line 0\n"));
        assert!(out.ends_with("line 199"));
        assert!(out.contains("lines truncated"));
        assert!(out.len() < text.len());
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("ab\ncd"), "ab\ncd");
    }

    #[cfg(unix)]
    #[test]
    fn single_stage_captures_stdout() {
        let out = run_pipeline(&[stage(vec!["echo".into(), "hello".into()])],
                               &RunConfig::default()).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].stdout, "hello");
        assert!(out.records[0].err.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn stages_chain_stdout_to_stdin() {
        let out = run_pipeline(&[stage(vec!["printf".into(), "b\na\n".into()]),
                                 stage(vec!["sort".into()])],
                               &RunConfig::default()).unwrap();
        assert_eq!(out.stdout, "a\nb\n");
    }

    #[cfg(unix)]
    #[test]
    fn broken_pipe_is_not_fatal() {
        let out = run_pipeline(&[stage(vec!["yes".into()]),
                                 stage(vec!["head".into(), "-n".into(), "3".into()])],
                               &RunConfig::default()).unwrap();
        assert_eq!(out.stdout, "y\ny\ny\n");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_fatal() {
        let err = run_pipeline(&[stage(vec!["false".into()])], &RunConfig::default());
        assert!(matches!(err, Err(crate::error::ProcessError::StageFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn missing_program_fails_to_spawn() {
        let err = run_pipeline(&[stage(vec!["definitely-not-a-real-cmd".into()])],
                               &RunConfig::default());
        assert!(err.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn trim_trailing_spaces_option() {
        let cfg = RunConfig { trim_trailing_spaces: true,
                              ..RunConfig::default() };
        let out = run_pipeline(&[stage(vec!["echo".into(), "hi".into()])], &cfg).unwrap();
        assert_eq!(out.stdout, "hi");
    }
}
