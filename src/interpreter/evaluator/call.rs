use std::{collections::HashMap, io::Write, rc::Rc};

use log::trace;

use crate::{
    ast::{CallExpr, FuncDecl},
    error::EvalError,
    interpreter::{
        env::Environment,
        evaluator::{
            core::{expand_error, to_template_value},
            EvalResult, Interpreter,
        },
        value::{Object, PipeStream, Stage},
    },
    source::Pos,
    template::expander::{self, TemplateValue},
};

impl<Out: Write, ErrOut: Write> Interpreter<Out, ErrOut> {
    /// Evaluates a call expression.
    ///
    /// The callee must evaluate to a function or a builtin. Positional and
    /// piped argument expressions are evaluated in the caller's scope
    /// before anything is bound.
    pub(crate) fn eval_call(&mut self,
                            call: &CallExpr,
                            env: &Environment)
                            -> EvalResult<Option<Object>> {
        let callee = self.expect_value(&call.fun, env)?;

        let mut positional = Vec::with_capacity(call.arg.exprs.len());
        for expr in &call.arg.exprs {
            positional.push(self.expect_value(expr, env)?);
        }
        let mut piped = Vec::with_capacity(call.piped_arg.exprs.len());
        for expr in &call.piped_arg.exprs {
            piped.push(self.expect_value(expr, env)?);
        }

        match callee {
            Object::Builtin(name) => {
                self.call_builtin(name, piped.into_iter().next(), positional, call)
            },
            Object::Function(func) => {
                self.invoke_function(&func, positional, piped, env, call.arg.pos)
            },
            other => Err(EvalError::NotCallable { what: other.to_string(),
                                                  pos:  call.pos, }),
        }
    }

    /// Invokes a user or external function with already-evaluated
    /// arguments.
    ///
    /// Arity of both argument lists is enforced before any binding. A user
    /// function body runs in a fresh scope whose parent is the *global*
    /// scope, with piped parameters bound first; its `return` value, if
    /// any, becomes the call's value. An external function instead grows a
    /// lazy pipeline: its template is expanded to an argv using the bound
    /// arguments, and the stage is appended to the piped-in stream.
    pub(crate) fn invoke_function(&mut self,
                                  func: &Rc<FuncDecl>,
                                  positional: Vec<Object>,
                                  piped: Vec<Object>,
                                  env: &Environment,
                                  pos: Pos)
                                  -> EvalResult<Option<Object>> {
        trace!("calling {:?}", func.name.name);
        let sig = &func.signature;
        if positional.len() != sig.args.len() {
            return Err(EvalError::ArityMismatch { name:  func.name.name.clone(),
                                                  want:  sig.args.len(),
                                                  got:   positional.len(),
                                                  piped: false,
                                                  pos });
        }
        if piped.len() != sig.piped_args.len() {
            return Err(EvalError::ArityMismatch { name:  func.name.name.clone(),
                                                  want:  sig.piped_args.len(),
                                                  got:   piped.len(),
                                                  piped: true,
                                                  pos });
        }

        if func.is_external {
            return self.spawn_external(func, positional, piped, pos).map(Some);
        }

        let scope = env.global().new_scope();
        for (param, value) in sig.piped_args.iter().zip(piped) {
            scope.set(&param.name, value)
                 .map_err(|e| EvalError::DuplicateBinding { name: e.name,
                                                            pos })?;
        }
        for (param, value) in sig.args.iter().zip(positional) {
            scope.set(&param.name, value)
                 .map_err(|e| EvalError::DuplicateBinding { name: e.name,
                                                            pos })?;
        }

        let body = func.body
                       .as_ref()
                       .ok_or_else(|| EvalError::TypeMismatch { details: format!("function {:?} has no body",
                                                                                 func.name.name),
                                                                pos })?;
        match self.eval_block(body, &scope)? {
            Some(Object::Return(value)) => Ok(*value),
            _ => Ok(None),
        }
    }

    /// Expands an external function's command template against its bound
    /// arguments and appends the stage to the upstream stream. Nothing is
    /// spawned yet; the pipeline runs when the stream is consumed.
    fn spawn_external(&mut self,
                      func: &Rc<FuncDecl>,
                      positional: Vec<Object>,
                      piped: Vec<Object>,
                      pos: Pos)
                      -> EvalResult<Object> {
        let command = func.command
                          .as_ref()
                          .ok_or_else(|| EvalError::TypeMismatch { details: format!("external {:?} has no command template",
                                                                                    func.name.name),
                                                                   pos })?;

        let mut bound: HashMap<&str, TemplateValue> = HashMap::new();
        for (param, value) in func.signature.args.iter().zip(&positional) {
            bound.insert(param.name.as_str(), to_template_value(value));
        }
        let lookup = |name: &str| bound.get(name).cloned();

        let rendered = expander::render_to_string(&command.template, &lookup, self.quoting)
            .map_err(|e| expand_error(e, command.pos))?;
        let argv = expander::to_argv(&command.template, &lookup, self.quoting)
            .map_err(|e| expand_error(e, command.pos))?;

        let mut stages = match piped.into_iter().next() {
            Some(Object::Stream(stream)) => {
                stream.consume().ok_or(EvalError::StreamConsumed { pos })?
            },
            Some(other) => {
                return Err(EvalError::TypeMismatch { details: format!("external {:?} expects a piped stream, got {}",
                                                                      func.name.name,
                                                                      other.type_name()),
                                                     pos });
            },
            None => Vec::new(),
        };
        stages.push(Stage { argv,
                            text: rendered });
        trace!("pipeline for {:?} now has {} stages", func.name.name, stages.len());

        Ok(Object::Stream(PipeStream::pending(stages)))
    }

    /// Consumes a stream object, runs its pipeline, and returns the final
    /// stage's stdout. Used by the stream-consuming builtins.
    pub(crate) fn run_stream(&mut self,
                             stream: &PipeStream,
                             trim_trailing_spaces: bool,
                             pos: Pos)
                             -> EvalResult<String> {
        let stages = stream.consume().ok_or(EvalError::StreamConsumed { pos })?;
        self.run_stages(stages, trim_trailing_spaces, pos)
    }

    pub(crate) fn run_stages(&mut self,
                             stages: Vec<Stage>,
                             trim_trailing_spaces: bool,
                             pos: Pos)
                             -> EvalResult<String> {
        if stages.is_empty() {
            return Ok(String::new());
        }

        let cfg = crate::pipeline::RunConfig { dir: self.dir.clone(),
                                               trim_trailing_spaces,
                                               first_seq: self.next_seq() };
        let result = crate::pipeline::run_pipeline(&stages, &cfg);
        self.advance_seq(stages.len() as u64);

        match result {
            Ok(output) => {
                if self.verbose {
                    let _ = crate::pipeline::write_records_yaml(&mut self.stderr,
                                                                &output.records);
                }
                Ok(output.stdout)
            },
            Err(source) => Err(EvalError::Process { source, pos }),
        }
    }
}

