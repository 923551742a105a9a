use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    ast::{BlockStmt, Decl, ElseBranch, Expr, Program, Stmt},
    error::CheckError,
    source::Pos,
};

/// The coarse type tag assigned to named expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellType {
    /// An integer literal or binding.
    Integer,
    /// A float literal or binding.
    Float,
    /// A string literal or binding.
    String,
    /// A boolean expression or binding.
    Boolean,
    /// A declared function.
    Function,
}

impl std::fmt::Display for WellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Function => "Function",
        };
        write!(f, "{name}")
    }
}

/// The checker's result: a position-keyed type map plus the external
/// commands the program uses without declaring.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    /// Coarse types of named expressions, keyed by the position of the
    /// name.
    pub types:      HashMap<Pos, WellType>,
    /// Commands invoked through `pipe`/`pipe_capture` that have no
    /// `external` declaration, with their call positions, in source order.
    pub unresolved: Vec<(String, Pos)>,
}

/// The first-pass semantic checker.
///
/// This is a best-effort gate, not a soundness proof: it assigns coarse
/// types to named expressions, validates the shape of `pipe` and
/// `pipe_capture` arguments, and collects external commands that lack a
/// declaration.
#[derive(Debug, Default)]
pub struct Checker {
    types:     HashMap<Pos, WellType>,
    names:     HashMap<String, WellType>,
    externals: HashSet<String>,
    commands:  Vec<(String, Pos)>,
}

impl Checker {
    /// Creates a checker with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a parsed program.
    ///
    /// # Errors
    /// - `CheckError::DuplicateDeclaration` for a name declared twice at
    ///   the top level.
    /// - `CheckError::PipeArgNotCall` when a `pipe`/`pipe_capture`
    ///   argument is not a call expression on a plain identifier.
    pub fn check(mut self, program: &Program) -> Result<CheckOutcome, CheckError> {
        let mut declared: HashSet<&str> = HashSet::new();
        for decl in &program.decls {
            if !declared.insert(decl.name()) {
                return Err(CheckError::DuplicateDeclaration { name: decl.name().to_string(),
                                                              pos:  decl.pos(), });
            }
        }

        for decl in &program.decls {
            self.check_decl(decl)?;
        }

        let unresolved: Vec<(String, Pos)> =
            self.commands
                .iter()
                .filter(|(name, _)| !self.externals.contains(name))
                .cloned()
                .collect();
        debug!("checker found {} unresolved dependencies", unresolved.len());

        Ok(CheckOutcome { types: self.types,
                          unresolved })
    }

    fn check_decl(&mut self, decl: &Decl) -> Result<(), CheckError> {
        match decl {
            Decl::Let(let_decl) => {
                self.check_expr(&let_decl.rhs)?;
                if let Some(typ) = self.type_of(&let_decl.rhs) {
                    self.types.insert(let_decl.name.pos, typ);
                    self.names.insert(let_decl.name.name.clone(), typ);
                }
                Ok(())
            },
            Decl::Func(func) => {
                self.types.insert(func.name.pos, WellType::Function);
                self.names.insert(func.name.name.clone(), WellType::Function);
                if func.is_external {
                    self.externals.insert(func.name.name.clone());
                }
                if let Some(body) = &func.body {
                    self.check_block(body)?;
                }
                Ok(())
            },
        }
    }

    fn check_block(&mut self, block: &BlockStmt) -> Result<(), CheckError> {
        for stmt in &block.statements {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CheckError> {
        match stmt {
            Stmt::Let(let_decl) => {
                self.check_expr(&let_decl.rhs)?;
                if let Some(typ) = self.type_of(&let_decl.rhs) {
                    self.types.insert(let_decl.name.pos, typ);
                    self.names.insert(let_decl.name.name.clone(), typ);
                }
                Ok(())
            },
            Stmt::Expr(expr_stmt) => self.check_expr(&expr_stmt.expr),
            Stmt::Return(ret) => match &ret.expr {
                Some(expr) => self.check_expr(expr),
                None => Ok(()),
            },
            Stmt::If(if_stmt) => self.check_if(if_stmt),
        }
    }

    fn check_if(&mut self, if_stmt: &crate::ast::IfStmt) -> Result<(), CheckError> {
        self.check_expr(&if_stmt.cond)?;
        self.check_block(&if_stmt.body)?;
        match if_stmt.else_branch.as_deref() {
            Some(ElseBranch::If(nested)) => self.check_if(nested),
            Some(ElseBranch::Block(block)) => self.check_block(block),
            None => Ok(()),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<(), CheckError> {
        match expr {
            Expr::Call(call) => {
                if let Expr::Ident(fun) = call.fun.as_ref() {
                    self.types.insert(fun.pos, WellType::Function);
                    if fun.name == "pipe" || fun.name == "pipe_capture" {
                        return self.check_pipe_args(&fun.name, call);
                    }
                }
                for arg in &call.arg.exprs {
                    self.check_expr(arg)?;
                }
                for arg in &call.piped_arg.exprs {
                    self.check_expr(arg)?;
                }
                Ok(())
            },
            Expr::Binary { x, y, .. } => {
                self.check_expr(x)?;
                self.check_expr(y)
            },
            Expr::Unary { x, .. } => self.check_expr(x),
            Expr::Paren(paren) => {
                for e in &paren.exprs {
                    self.check_expr(e)?;
                }
                Ok(())
            },
            Expr::Ident(_) | Expr::Integer { .. } | Expr::Float { .. } | Expr::Str(_) => Ok(()),
        }
    }

    /// Every argument of `pipe`/`pipe_capture` must be a call expression
    /// whose function is a plain identifier; those identifiers name the
    /// external commands the program depends on.
    fn check_pipe_args(&mut self,
                       builtin: &str,
                       call: &crate::ast::CallExpr)
                       -> Result<(), CheckError> {
        for arg in &call.arg.exprs {
            let Expr::Call(cmd) = arg else {
                return Err(CheckError::PipeArgNotCall { builtin: builtin.to_string(),
                                                        pos:     arg.pos(), });
            };
            let Expr::Ident(name) = cmd.fun.as_ref() else {
                return Err(CheckError::PipeArgNotCall { builtin: builtin.to_string(),
                                                        pos:     cmd.pos, });
            };
            self.commands.push((name.name.clone(), name.pos));
            for inner in &cmd.arg.exprs {
                self.check_expr(inner)?;
            }
        }
        Ok(())
    }

    /// Best-effort type of an expression: literals have their own type,
    /// names have whatever they were last assigned, comparisons are
    /// boolean, and arithmetic follows its operands.
    fn type_of(&self, expr: &Expr) -> Option<WellType> {
        match expr {
            Expr::Integer { .. } => Some(WellType::Integer),
            Expr::Float { .. } => Some(WellType::Float),
            Expr::Str(_) => Some(WellType::String),
            Expr::Ident(ident) => self.names.get(&ident.name).copied(),
            Expr::Unary { x, .. } => self.type_of(x),
            Expr::Binary { x, y, op, .. } => {
                use crate::ast::BinOp;
                match op {
                    BinOp::Eql
                    | BinOp::Neq
                    | BinOp::Reg
                    | BinOp::Nreg
                    | BinOp::Lss
                    | BinOp::Gtr
                    | BinOp::Leq
                    | BinOp::Geq => Some(WellType::Boolean),
                    _ => match (self.type_of(x), self.type_of(y)) {
                        (Some(WellType::Float), _) | (_, Some(WellType::Float)) => {
                            Some(WellType::Float)
                        },
                        (Some(WellType::Integer), Some(WellType::Integer)) => {
                            Some(WellType::Integer)
                        },
                        _ => None,
                    },
                }
            },
            Expr::Paren(_) | Expr::Call(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Checker, WellType};
    use crate::interpreter::parser::parse_program;

    fn check(src: &str) -> super::CheckOutcome {
        Checker::new().check(&parse_program(src).unwrap()).unwrap()
    }

    #[test]
    fn literals_and_lets_get_types() {
        let outcome = check(
            "function main() {\n\tlet x = \"hello\"\n\tlet y = 3.14\n\tlet z = 123\n}\n",
        );
        let mut types: Vec<WellType> = Vec::new();
        let mut keys: Vec<_> = outcome.types.iter().collect();
        keys.sort_by_key(|(pos, _)| **pos);
        for (_, typ) in keys {
            types.push(*typ);
        }
        assert_eq!(types,
                   [WellType::Function, WellType::String, WellType::Float, WellType::Integer]);
    }

    #[test]
    fn undeclared_pipe_commands_are_reported() {
        let outcome = check("function main() {\n\tpipe(foo(), nl())\n}\nexternal nl() => \"nl\"\n");
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].0, "foo");
    }

    #[test]
    fn declared_commands_resolve() {
        let outcome = check(
            "external nl() => \"nl\"\nfunction main() {\n\tpipe_capture(nl())\n}\n",
        );
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn pipe_args_must_be_calls() {
        let program = parse_program("function main() {\n\tpipe(\"echo hi\")\n}\n").unwrap();
        let err = Checker::new().check(&program).unwrap_err();
        assert_eq!(err.to_string(), "args to pipe must be call expressions");
    }

    #[test]
    fn duplicate_top_level_names_are_rejected() {
        let program =
            parse_program("let x = 1\nlet x = 2\n").unwrap();
        let err = Checker::new().check(&program).unwrap_err();
        assert!(err.to_string().contains("duplicate declaration"));
    }
}
