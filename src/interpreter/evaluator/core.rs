use std::io::Write;

use log::{debug, trace};

use crate::{
    ast::{BlockStmt, Decl, ElseBranch, Expr, IfStmt, LetDecl, Program, Stmt, StringLit},
    error::EvalError,
    interpreter::{
        env::Environment,
        evaluator::{builtin, EvalResult, Interpreter},
        value::Object,
    },
    source::Pos,
    template::expander::{self, ExpandError, TemplateValue},
};

impl<Out: Write, ErrOut: Write> Interpreter<Out, ErrOut> {
    /// Evaluates a program: every top-level declaration, then the
    /// program's `main` function. `main`'s piped parameter, if it
    /// declares one, receives the driver's `MainStdin` stream.
    ///
    /// # Errors
    /// Any evaluation error, including a missing or non-function `main`.
    pub fn eval_program(&mut self,
                        program: &Program,
                        env: &Environment)
                        -> EvalResult<Option<Object>> {
        debug!("evaluating {} declarations", program.decls.len());
        for decl in &program.decls {
            self.eval_decl(decl, env)?;
        }

        let main = env.get("main").ok_or_else(|| EvalError::Missing { name: "main".to_string(),
                                                                      pos:  crate::source::NO_POS, })?;
        let func = match main {
            Object::Function(func) => func,
            other => {
                return Err(EvalError::NotCallable { what: other.to_string(),
                                                    pos:  crate::source::NO_POS, });
            },
        };

        let piped = if func.signature.piped_args.is_empty() {
            Vec::new()
        } else {
            vec![env.get("MainStdin")
                    .ok_or_else(|| EvalError::Missing { name: "MainStdin".to_string(),
                                                        pos:  crate::source::NO_POS, })?]
        };
        self.invoke_function(&func, Vec::new(), piped, env, crate::source::NO_POS)
    }

    pub(crate) fn eval_decl(&mut self, decl: &Decl, env: &Environment) -> EvalResult<()> {
        match decl {
            Decl::Let(let_decl) => self.eval_let(let_decl, env),
            Decl::Func(func) => {
                trace!("declaring function {:?}", func.name.name);
                env.set(&func.name.name, Object::Function(std::rc::Rc::new(func.clone())))
                   .map_err(|e| EvalError::DuplicateBinding { name: e.name,
                                                              pos:  func.name.pos, })
            },
        }
    }

    fn eval_let(&mut self, decl: &LetDecl, env: &Environment) -> EvalResult<()> {
        let value = self.eval_expr(&decl.rhs, env)?
                        .ok_or_else(|| EvalError::TypeMismatch { details: format!("{:?} has no value",
                                                                                  decl.name.name),
                                                                 pos:     decl.rhs.pos(), })?;
        env.set(&decl.name.name, value)
           .map_err(|e| EvalError::DuplicateBinding { name: e.name,
                                                      pos:  decl.name.pos, })
    }

    /// Evaluates the statements of a block in order. A `return` statement
    /// produces a sentinel that stops the block and propagates upward;
    /// statements after it do not run.
    pub(crate) fn eval_block(&mut self,
                             block: &BlockStmt,
                             env: &Environment)
                             -> EvalResult<Option<Object>> {
        for stmt in &block.statements {
            match self.eval_stmt(stmt, env)? {
                Some(ret @ Object::Return(_)) => return Ok(Some(ret)),
                _ => {},
            }
        }
        Ok(None)
    }

    pub(crate) fn eval_stmt(&mut self,
                            stmt: &Stmt,
                            env: &Environment)
                            -> EvalResult<Option<Object>> {
        match stmt {
            Stmt::Let(decl) => {
                self.eval_let(decl, env)?;
                Ok(None)
            },
            Stmt::Expr(expr_stmt) => {
                self.eval_expr(&expr_stmt.expr, env)?;
                Ok(None)
            },
            Stmt::Return(ret) => {
                let value = match &ret.expr {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => None,
                };
                Ok(Some(Object::Return(Box::new(value))))
            },
            Stmt::If(if_stmt) => self.eval_if(if_stmt, env),
        }
    }

    fn eval_if(&mut self, if_stmt: &IfStmt, env: &Environment) -> EvalResult<Option<Object>> {
        let cond = self.eval_expr(&if_stmt.cond, env)?;
        match cond {
            Some(Object::Boolean(true)) => self.eval_block(&if_stmt.body, env),
            Some(Object::Boolean(false)) => match if_stmt.else_branch.as_deref() {
                Some(ElseBranch::If(nested)) => self.eval_if(nested, env),
                Some(ElseBranch::Block(block)) => self.eval_block(block, env),
                None => Ok(None),
            },
            other => Err(EvalError::TypeMismatch { details: format!("if condition must be a boolean, got {}",
                                                                    describe(other.as_ref())),
                                                   pos:     if_stmt.cond.pos(), }),
        }
    }

    /// Evaluates one expression.
    pub fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Option<Object>> {
        match expr {
            Expr::Ident(ident) => {
                if let Some(obj) = env.get(&ident.name) {
                    return Ok(Some(obj));
                }
                if builtin::is_builtin(&ident.name) {
                    return Ok(Some(Object::Builtin(builtin::canonical_name(&ident.name))));
                }
                Err(EvalError::Missing { name: ident.name.clone(),
                                         pos:  ident.pos, })
            },
            Expr::Integer { value, .. } => Ok(Some(Object::Integer(*value))),
            Expr::Float { value, .. } => Ok(Some(Object::Float(*value))),
            Expr::Str(lit) => self.eval_string(lit, env).map(Some),
            Expr::Binary { x, y, op, pos } => {
                self.eval_binary(*op, x, y, env, *pos).map(Some)
            },
            Expr::Unary { x, op, pos } => self.eval_unary(*op, x, env, *pos).map(Some),
            Expr::Paren(paren) => {
                let mut items = Vec::with_capacity(paren.exprs.len());
                for expr in &paren.exprs {
                    let value =
                        self.eval_expr(expr, env)?
                            .ok_or_else(|| EvalError::TypeMismatch { details:
                                                                         "expression has no value"
                                                                             .to_string(),
                                                                     pos: expr.pos(), })?;
                    items.push(value);
                }
                Ok(Some(Object::Paren(items)))
            },
            Expr::Call(call) => self.eval_call(call, env),
        }
    }

    /// Evaluates a string literal by expanding its template against the
    /// current environment, in both render and argv modes.
    pub(crate) fn eval_string(&mut self, lit: &StringLit, env: &Environment) -> EvalResult<Object> {
        let lookup = |name: &str| env.get(name).map(|obj| to_template_value(&obj));

        let rendered = expander::render_to_string(&lit.template, &lookup, self.quoting)
            .map_err(|e| expand_error(e, lit.pos))?;
        let argv = expander::to_argv(&lit.template, &lookup, self.quoting)
            .map_err(|e| expand_error(e, lit.pos))?;

        if self.verbose {
            let _ = writeln!(self.stderr, "+{rendered}");
        }
        Ok(Object::Str { rendered, argv })
    }
}

/// Projects a runtime value into a template value the expander can
/// format.
pub(crate) fn to_template_value(obj: &Object) -> TemplateValue {
    match obj {
        Object::Integer(v) => TemplateValue::Int(*v),
        Object::Float(v) => TemplateValue::Float(*v),
        Object::Boolean(v) => TemplateValue::Bool(*v),
        Object::Str { rendered, .. } => TemplateValue::Str(rendered.clone()),
        other => TemplateValue::Str(other.to_string()),
    }
}

pub(crate) fn expand_error(e: ExpandError, pos: Pos) -> EvalError {
    match e {
        ExpandError::MissingVariable { name } => EvalError::MissingVariable { name, pos },
        other => EvalError::Expand { details: other.to_string(),
                                     pos },
    }
}

pub(crate) fn describe(obj: Option<&Object>) -> String {
    obj.map_or_else(|| "nothing".to_string(), |o| o.type_name().to_string())
}
