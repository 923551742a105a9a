use crate::{
    ast::{BlockStmt, ElseBranch, ExprStmt, IfStmt, ReturnStmt, Stmt},
    error::ParseError,
    interpreter::{
        lexer::TokenKind,
        parser::core::{ParseResult, Parser},
    },
};

impl Parser {
    /// Parses a `{ … }` block: an opening brace, a newline, statements
    /// separated by newlines, and a closing brace.
    pub(crate) fn parse_block(&mut self) -> ParseResult<BlockStmt> {
        let pos = self.expect(&TokenKind::LBrace, "\"{\"")?;
        self.expect(&TokenKind::Newline, "newline")?;

        let mut statements = Vec::new();
        loop {
            match self.current_kind() {
                Some(TokenKind::RBrace) | None => break,
                Some(TokenKind::Newline) => self.skip_newlines(),
                Some(_) => statements.push(self.parse_stmt()?),
            }
        }
        self.expect(&TokenKind::RBrace, "\"}\"")?;

        Ok(BlockStmt { statements, pos })
    }

    /// Parses one statement, dispatching on the leading keyword.
    pub(crate) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        if self.at_keyword("let") {
            return Ok(Stmt::Let(self.parse_let_decl()?));
        }
        if self.at_keyword("return") {
            return Ok(Stmt::Return(self.parse_return_stmt()?));
        }
        if self.at_keyword("if") {
            return Ok(Stmt::If(self.parse_if_stmt()?));
        }

        match self.current_kind() {
            Some(TokenKind::Ident(_)) => {
                let pos = self.pos();
                Ok(Stmt::Expr(ExprStmt { expr: self.parse_expr(0)?,
                                         pos }))
            },
            Some(kind) => Err(ParseError::UnexpectedToken { token: kind.to_string(),
                                                            pos:   self.pos(), }),
            None => Err(ParseError::UnexpectedEndOfInput { pos: self.pos() }),
        }
    }

    /// Parses a `return` with an optional value expression.
    fn parse_return_stmt(&mut self) -> ParseResult<ReturnStmt> {
        let pos = self.expect_keyword("return")?;
        let expr = match self.current_kind() {
            Some(TokenKind::Newline | TokenKind::RBrace) | None => None,
            Some(_) => Some(self.parse_expr(0)?),
        };
        Ok(ReturnStmt { expr, pos })
    }

    /// Parses an `if` statement with optional `else if` chains and a final
    /// `else` block.
    fn parse_if_stmt(&mut self) -> ParseResult<IfStmt> {
        let pos = self.expect_keyword("if")?;
        let cond = self.parse_expr(0)?;
        let body = self.parse_block()?;

        let else_branch = if self.at_keyword("else") {
            self.advance();
            if self.at_keyword("if") {
                Some(Box::new(ElseBranch::If(self.parse_if_stmt()?)))
            } else {
                Some(Box::new(ElseBranch::Block(self.parse_block()?)))
            }
        } else {
            None
        };

        Ok(IfStmt { cond,
                    body,
                    else_branch,
                    pos })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{BinOp, Decl, ElseBranch, Expr, Stmt},
        interpreter::parser::parse_program,
    };

    fn main_statements(body: &str) -> Vec<Stmt> {
        let src = format!("function main() {{\n{body}\n}}\n");
        let program = parse_program(&src).unwrap();
        let Decl::Func(func) = &program.decls[0] else { panic!() };
        func.body.as_ref().unwrap().statements.clone()
    }

    #[test]
    fn if_else_if_else_chain() {
        let stmts = main_statements(
            "\tif x ~~ \".+\" {\n\t} else if x !~ \"hi\" {\n\t} else {\n\t}",
        );
        let Stmt::If(if_stmt) = &stmts[0] else { panic!("expected if") };
        assert!(matches!(if_stmt.cond, Expr::Binary { op: BinOp::Reg, .. }));
        let Some(else_branch) = &if_stmt.else_branch else { panic!() };
        let ElseBranch::If(else_if) = &**else_branch else { panic!() };
        assert!(matches!(else_if.cond, Expr::Binary { op: BinOp::Nreg, .. }));
        assert!(matches!(else_if.else_branch.as_deref(), Some(ElseBranch::Block(_))));
    }

    #[test]
    fn return_with_value() {
        let stmts = main_statements("\treturn input");
        assert!(matches!(&stmts[0], Stmt::Return(r) if r.expr.is_some()));
    }

    #[test]
    fn expression_statements_must_start_with_an_identifier() {
        let src = "function main() {\n\t3 + 4\n}\n";
        assert!(parse_program(src).is_err());
    }

    #[test]
    fn nested_let() {
        let stmts = main_statements("\tlet input = read()");
        assert!(matches!(&stmts[0], Stmt::Let(decl) if decl.name.name == "input"));
    }
}
