use std::io::{BufRead, Write};

use log::debug;
use regex::Regex;

use crate::{
    ast::CallExpr,
    error::EvalError,
    interpreter::{
        evaluator::{EvalResult, Interpreter},
        value::{Object, PipeStream, Stage},
    },
    source::Pos,
};

/// Every builtin name, including aliases.
pub const BUILTIN_NAMES: &[&str] = &["print",
                                     "println",
                                     "echo",
                                     "read",
                                     "read_int",
                                     "read_regex",
                                     "date",
                                     "exit",
                                     "print_stream",
                                     "_exec",
                                     "pipe",
                                     "pipe_capture",
                                     "external_json"];

/// Whether a name refers to a builtin.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Resolves aliases to the name used in the dispatch table.
#[must_use]
pub fn canonical_name(name: &str) -> &'static str {
    for candidate in BUILTIN_NAMES {
        if *candidate == name {
            // `echo` is an alias of `print`.
            return if *candidate == "echo" { "print" } else { candidate };
        }
    }
    "print"
}

impl<Out: Write, ErrOut: Write> Interpreter<Out, ErrOut> {
    /// Dispatches a builtin call.
    ///
    /// `piped` is the first piped value, if the call had one. Positional
    /// arguments arrive already evaluated, in the caller's scope.
    pub(crate) fn call_builtin(&mut self,
                               name: &str,
                               piped: Option<Object>,
                               args: Vec<Object>,
                               call: &CallExpr)
                               -> EvalResult<Option<Object>> {
        let pos = call.pos;
        debug!("builtin {name}({} args)", args.len());
        match name {
            "print" => {
                self.write_values(&args, false, pos)?;
                Ok(None)
            },
            "println" => {
                self.write_values(&args, true, pos)?;
                Ok(None)
            },
            "read" => {
                expect_arity(name, &args, 0, pos)?;
                let line = read_line(pos)?.unwrap_or_default();
                Ok(Some(Object::from_text(line)))
            },
            "read_int" => self.read_int(&args, pos),
            "read_regex" => self.read_regex(&args, pos),
            "date" => {
                expect_arity(name, &args, 0, pos)?;
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_or(0, |d| d.as_secs());
                Ok(Some(Object::from_text(now.to_string())))
            },
            "exit" => {
                expect_arity(name, &args, 2, pos)?;
                let code = match &args[0] {
                    Object::Integer(code) => *code,
                    other => {
                        return Err(EvalError::TypeMismatch { details: format!("exit code must be an integer, got {}",
                                                                              other.type_name()),
                                                             pos });
                    },
                };
                let _ = writeln!(self.stderr, "{}", args[1]);
                let _ = self.stderr.flush();
                let _ = self.stdout.flush();
                std::process::exit(i32::try_from(code).unwrap_or(1));
            },
            "print_stream" => {
                let stream = stream_arg(name, &args, piped, pos)?;
                let output = self.run_stream(&stream, false, pos)?;
                self.write_all_output(&output, pos)?;
                Ok(None)
            },
            "_exec" => {
                let (argv, text) = string_arg(name, &args, pos)?;
                let mut stages = match piped {
                    Some(Object::Stream(stream)) => {
                        stream.consume().ok_or(EvalError::StreamConsumed { pos })?
                    },
                    Some(other) => {
                        return Err(EvalError::TypeMismatch { details: format!("{name} expects a piped stream, got {}",
                                                                              other.type_name()),
                                                             pos });
                    },
                    None => Vec::new(),
                };
                stages.push(Stage { argv, text });
                Ok(Some(Object::Stream(PipeStream::pending(stages))))
            },
            "pipe" => {
                let stages = chained_stages(name, &args, pos)?;
                let output = self.run_stages(stages, false, pos)?;
                self.write_all_output(&output, pos)?;
                Ok(None)
            },
            "pipe_capture" => {
                let stages = chained_stages(name, &args, pos)?;
                let output = self.run_stages(stages, true, pos)?;
                Ok(Some(Object::from_text(output)))
            },
            "external_json" => self.external_json(&args, pos),
            other => Err(EvalError::Missing { name: other.to_string(),
                                              pos }),
        }
    }

    fn write_values(&mut self, args: &[Object], newline: bool, pos: Pos) -> EvalResult<()> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write_all_output(" ", pos)?;
            }
            let text = arg.to_string();
            self.write_all_output(&text, pos)?;
        }
        if newline {
            self.write_all_output("\n", pos)?;
        }
        Ok(())
    }

    fn write_all_output(&mut self, text: &str, pos: Pos) -> EvalResult<()> {
        self.stdout
            .write_all(text.as_bytes())
            .map_err(|e| EvalError::Input { details: e.to_string(),
                                            pos })
    }

    fn read_int(&mut self, args: &[Object], pos: Pos) -> EvalResult<Option<Object>> {
        if args.len() > 1 {
            return Err(EvalError::Builtin { details: format!("read_int expects 0 or 1 args, got {}",
                                                             args.len()),
                                            pos });
        }
        let default = match args.first() {
            Some(Object::Integer(v)) => Some(*v),
            Some(other) => {
                return Err(EvalError::TypeMismatch { details: format!("read_int default must be an integer, got {}",
                                                                      other.type_name()),
                                                     pos });
            },
            None => None,
        };

        loop {
            let line = read_line(pos)?;
            let Some(line) = line else {
                return match default {
                    Some(v) => Ok(Some(Object::Integer(v))),
                    None => Err(EvalError::Input { details: "end of input".to_string(),
                                                   pos }),
                };
            };
            if line.is_empty() {
                if let Some(v) = default {
                    return Ok(Some(Object::Integer(v)));
                }
            }
            match line.parse::<i64>() {
                Ok(v) => return Ok(Some(Object::Integer(v))),
                Err(e) => {
                    let _ = writeln!(self.stderr, "Invalid int ({e}), please try again:");
                },
            }
        }
    }

    fn read_regex(&mut self, args: &[Object], pos: Pos) -> EvalResult<Option<Object>> {
        expect_arity("read_regex", args, 1, pos)?;
        let Object::Str { rendered, .. } = &args[0] else {
            return Err(EvalError::TypeMismatch { details: format!("read_regex expects a string pattern, got {}",
                                                                  args[0].type_name()),
                                                 pos });
        };
        let re = Regex::new(rendered).map_err(|_| EvalError::BadRegex { pattern:
                                                                            rendered.clone(),
                                                                        pos })?;

        loop {
            let line = read_line(pos)?.ok_or_else(|| EvalError::Input { details: "end of input"
                                                                                     .to_string(),
                                                                        pos })?;
            if re.is_match(&line) {
                return Ok(Some(Object::from_text(line)));
            }
            let _ = writeln!(self.stderr,
                             "Entered text did not match {rendered:?}, please try again:");
        }
    }

    /// Runs a single command and returns a JSON object string with
    /// `stdout` and `stderr` keys.
    fn external_json(&mut self, args: &[Object], pos: Pos) -> EvalResult<Option<Object>> {
        let (argv, _text) = string_arg("external_json", args, pos)?;
        if argv.is_empty() {
            return Err(EvalError::Builtin { details: "external_json got an empty command"
                                                         .to_string(),
                                            pos });
        }

        let output = std::process::Command::new(&argv[0]).args(&argv[1..])
                                                         .current_dir(&self.dir)
                                                         .output()
                                                         .map_err(|source| EvalError::Process {
                                                             source: crate::error::ProcessError::Spawn {
                                                                 argv: argv.clone(),
                                                                 source,
                                                             },
                                                             pos,
                                                         })?;

        let body = serde_json::json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        });
        if output.status.success() {
            Ok(Some(Object::from_text(body.to_string())))
        } else {
            Err(EvalError::Builtin { details: format!("external command failed: {}, output:\n{body}",
                                                      output.status),
                                     pos })
        }
    }
}

fn expect_arity(name: &str, args: &[Object], want: usize, pos: Pos) -> EvalResult<()> {
    if args.len() == want {
        Ok(())
    } else {
        Err(EvalError::ArityMismatch { name: name.to_string(),
                                       want,
                                       got: args.len(),
                                       piped: false,
                                       pos })
    }
}

/// The stream consumed by `print_stream`: its positional argument, or the
/// piped-in value when called as `… | print_stream()`.
fn stream_arg(name: &str,
              args: &[Object],
              piped: Option<Object>,
              pos: Pos)
              -> EvalResult<PipeStream> {
    let candidate = args.first().cloned().or(piped);
    match candidate {
        Some(Object::Stream(stream)) => Ok(stream),
        Some(other) => Err(EvalError::TypeMismatch { details: format!("{name} expects a stream, got {}",
                                                                      other.type_name()),
                                                     pos }),
        None => Err(EvalError::ArityMismatch { name: name.to_string(),
                                               want: 1,
                                               got: 0,
                                               piped: false,
                                               pos }),
    }
}

fn string_arg(name: &str, args: &[Object], pos: Pos) -> EvalResult<(Vec<String>, String)> {
    match args {
        [Object::Str { rendered, argv }] => Ok((argv.clone(), rendered.clone())),
        [other] => Err(EvalError::TypeMismatch { details: format!("{name} expects a string, got {}",
                                                                  other.type_name()),
                                                 pos }),
        _ => Err(EvalError::ArityMismatch { name: name.to_string(),
                                            want: 1,
                                            got: args.len(),
                                            piped: false,
                                            pos }),
    }
}

/// Chains the stream arguments of `pipe`/`pipe_capture` into one stage
/// list, left to right.
fn chained_stages(name: &str, args: &[Object], pos: Pos) -> EvalResult<Vec<Stage>> {
    if args.is_empty() {
        return Err(EvalError::ArityMismatch { name: name.to_string(),
                                              want: 1,
                                              got: 0,
                                              piped: false,
                                              pos });
    }
    let mut stages = Vec::new();
    for arg in args {
        let Object::Stream(stream) = arg else {
            return Err(EvalError::TypeMismatch { details: format!("args to {name} must be call expressions"),
                                                 pos });
        };
        stages.extend(stream.consume().ok_or(EvalError::StreamConsumed { pos })?);
    }
    Ok(stages)
}

/// Reads one line from the host's standard input, without its trailing
/// newline. `None` means end of input.
fn read_line(pos: Pos) -> EvalResult<Option<String>> {
    let mut line = String::new();
    let n = std::io::stdin().lock()
                            .read_line(&mut line)
                            .map_err(|e| EvalError::Input { details: e.to_string(),
                                                            pos })?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
