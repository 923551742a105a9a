use crate::ast::{
    BlockStmt, CallExpr, Decl, ElseBranch, Expr, FuncDecl, FuncSignature, IfStmt, Program, Stmt,
};

/// Renders a parsed program in canonical form: tab indentation, one
/// statement per line, commas between parameters, and string literals
/// exactly as written.
///
/// Formatting then reparsing yields a structurally equal AST, which is
/// how the `fmt` tool is tested.
///
/// # Examples
/// ```
/// use well::{interpreter::parser::parse_program, printer::format_program};
///
/// let program = parse_program("function  main( ){\nlet x=1\n}\n").unwrap();
/// assert_eq!(format_program(&program), "function main() {\n\tlet x = 1\n}\n");
/// ```
#[must_use]
pub fn format_program(program: &Program) -> String {
    let mut printer = Printer { indent: 0 };
    let mut out = String::new();
    for decl in &program.decls {
        out.push_str(&printer.format_decl(decl));
    }
    out
}

struct Printer {
    indent: usize,
}

impl Printer {
    fn format_decl(&mut self, decl: &Decl) -> String {
        match decl {
            Decl::Let(let_decl) => {
                format!("let {} = {}\n", let_decl.name.name, format_expr(&let_decl.rhs))
            },
            Decl::Func(func) => self.format_func(func),
        }
    }

    fn format_func(&mut self, func: &FuncDecl) -> String {
        let mut head = String::new();
        if func.is_external {
            head.push_str("external ");
        } else {
            head.push_str("function ");
        }
        if !func.signature.piped_args.is_empty() {
            head.push_str(&format!("({}) | ", format_params(&func.signature.piped_args)));
        }
        head.push_str(&func.name.name);
        head.push_str(&format_signature(&func.signature));

        match (&func.command, &func.body) {
            (Some(command), _) => format!("{head} => {}\n", command.raw),
            (None, Some(body)) => format!("{head} {}\n", self.format_block(body)),
            (None, None) => format!("{head}\n"),
        }
    }

    fn format_block(&mut self, block: &BlockStmt) -> String {
        self.indent += 1;
        let mut body = String::new();
        for stmt in &block.statements {
            body.push_str(&self.format_stmt(stmt));
        }
        self.indent -= 1;
        format!("{{\n{body}{}}}", self.tabs())
    }

    fn format_stmt(&mut self, stmt: &Stmt) -> String {
        let tabs = self.tabs();
        match stmt {
            Stmt::Let(let_decl) => format!("{tabs}let {} = {}\n",
                                           let_decl.name.name,
                                           format_expr(&let_decl.rhs)),
            Stmt::Expr(expr_stmt) => format!("{tabs}{}\n", format_expr(&expr_stmt.expr)),
            Stmt::Return(ret) => match &ret.expr {
                Some(expr) => format!("{tabs}return {}\n", format_expr(expr)),
                None => format!("{tabs}return\n"),
            },
            Stmt::If(if_stmt) => format!("{tabs}{}\n", self.format_if(if_stmt)),
        }
    }

    fn format_if(&mut self, if_stmt: &IfStmt) -> String {
        let mut out = format!("if {} {}",
                              format_expr(&if_stmt.cond),
                              self.format_block(&if_stmt.body));
        match if_stmt.else_branch.as_deref() {
            Some(ElseBranch::If(nested)) => {
                out.push_str(" else ");
                out.push_str(&self.format_if(nested));
            },
            Some(ElseBranch::Block(block)) => {
                out.push_str(" else ");
                out.push_str(&self.format_block(block));
            },
            None => {},
        }
        out
    }

    fn tabs(&self) -> String {
        "\t".repeat(self.indent)
    }
}

fn format_signature(sig: &FuncSignature) -> String {
    let params = format_params(&sig.args);
    match sig.ret_types.len() {
        0 => format!("({params})"),
        1 => format!("({params}) {}", sig.ret_types[0]),
        _ => format!("({params}) ({})", sig.ret_types.join(", ")),
    }
}

fn format_params(params: &[crate::ast::Param]) -> String {
    params.iter()
          .map(|p| format!("{} {}", p.name, p.type_name))
          .collect::<Vec<_>>()
          .join(", ")
}

fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(ident) => ident.name.clone(),
        Expr::Integer { value, .. } => value.to_string(),
        Expr::Float { value, .. } => {
            // Keep a decimal point so the literal reparses as a float.
            if value.fract() == 0.0 {
                format!("{value:.1}")
            } else {
                value.to_string()
            }
        },
        Expr::Str(lit) => lit.raw.clone(),
        Expr::Binary { x, y, op, .. } => {
            format!("{} {op} {}", format_expr(x), format_expr(y))
        },
        Expr::Unary { x, op, .. } => format!("{op}{}", format_expr(x)),
        Expr::Paren(paren) => format!("({})",
                                      paren.exprs
                                           .iter()
                                           .map(format_expr)
                                           .collect::<Vec<_>>()
                                           .join(", ")),
        Expr::Call(call) => format_call(call),
    }
}

fn format_call(call: &CallExpr) -> String {
    let args = call.arg
                   .exprs
                   .iter()
                   .map(format_expr)
                   .collect::<Vec<_>>()
                   .join(", ");
    let callee = format!("{}({args})", format_expr(&call.fun));
    match call.piped_arg.exprs.as_slice() {
        [] => callee,
        [upstream] => format!("{} | {callee}", format_expr(upstream)),
        many => {
            let upstream = many.iter().map(format_expr).collect::<Vec<_>>().join(", ");
            format!("({upstream}) | {callee}")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::format_program;
    use crate::interpreter::parser::parse_program;

    fn canonical(src: &str) -> String {
        format_program(&parse_program(src).unwrap())
    }

    #[test]
    fn formatting_is_a_fixpoint() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nexternal (stdin reader) | nl() => \"nl\"\nfunction (stdin reader) | main() {\nlet out = echo(\"hi\") | nl()\nprint_stream(out)\nif out ~~ \"x\" {\nreturn out\n} else {\nreturn\n}\n}\n";
        let first = canonical(src);
        let second = canonical(&first);
        assert_eq!(first, second);
    }

    #[test]
    fn canonical_shape() {
        let got = canonical("function  main( )  {\nlet x=1+2\n}\n");
        assert_eq!(got, "function main() {\n\tlet x = 1 + 2\n}\n");
    }

    #[test]
    fn external_round_trip() {
        let got = canonical("external echo(s string)=>\"echo ${s:%q}\"\n");
        assert_eq!(got, "external echo(s string) => \"echo ${s:%q}\"\n");
    }

    #[test]
    fn pipelines_print_infix() {
        let got = canonical("function main() {\nlet out = a() | b(1) | c()\n}\n");
        assert_eq!(got, "function main() {\n\tlet out = a() | b(1) | c()\n}\n");
    }
}
