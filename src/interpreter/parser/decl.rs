use log::trace;

use crate::{
    ast::{Decl, FuncDecl, FuncSignature, LetDecl, Param, StringLit},
    error::ParseError,
    interpreter::{
        lexer::TokenKind,
        parser::core::{ParseResult, Parser},
    },
};

impl Parser {
    /// Parses declarations until end of input, skipping blank lines.
    pub(crate) fn parse_decls(&mut self) -> ParseResult<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                return Ok(decls);
            }
            decls.push(self.parse_decl()?);
        }
    }

    /// Parses one declaration, dispatching on the leading keyword.
    pub(crate) fn parse_decl(&mut self) -> ParseResult<Decl> {
        if self.at_keyword("let") {
            return Ok(Decl::Let(self.parse_let_decl()?));
        }
        if self.at_keyword("function") {
            return Ok(Decl::Func(self.parse_func_decl(false)?));
        }
        if self.at_keyword("external") {
            return Ok(Decl::Func(self.parse_func_decl(true)?));
        }
        match self.current_kind() {
            Some(kind) => Err(ParseError::UnexpectedToken { token: kind.to_string(),
                                                            pos:   self.pos(), }),
            None => Err(ParseError::UnexpectedEndOfInput { pos: self.pos() }),
        }
    }

    /// Parses a `let NAME = expr` binding.
    pub(crate) fn parse_let_decl(&mut self) -> ParseResult<LetDecl> {
        let pos = self.expect_keyword("let")?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Assign, "\"=\"")?;
        let rhs = self.parse_expr(0)?;
        Ok(LetDecl { name, rhs, pos })
    }

    /// Parses a function or external declaration.
    ///
    /// ```text
    /// function NAME(args) [ret] { … }
    /// function (piped params) | NAME(args) [ret] { … }
    /// external NAME(args) => "template"
    /// external (piped params) | NAME(args) => "template"
    /// ```
    ///
    /// After `external` the `function` keyword is optional.
    pub(crate) fn parse_func_decl(&mut self, is_external: bool) -> ParseResult<FuncDecl> {
        let pos = if is_external {
            let pos = self.expect_keyword("external")?;
            if self.at_keyword("function") {
                self.advance();
            }
            pos
        } else {
            self.expect_keyword("function")?
        };

        let piped_args = if matches!(self.current_kind(), Some(TokenKind::LParen)) {
            let params = self.parse_params()?;
            self.expect(&TokenKind::Pipe, "\"|\"")?;
            params
        } else {
            Vec::new()
        };

        let name = self.expect_ident()?;
        trace!("parsing declaration of {:?}", name.name);
        let mut signature = self.parse_func_signature()?;
        signature.piped_args = piped_args;

        if is_external {
            self.expect(&TokenKind::Arrow, "\"=>\"")?;
            let command = self.parse_command_template()?;
            Ok(FuncDecl { name,
                          signature,
                          body: None,
                          command: Some(command),
                          is_external,
                          pos })
        } else {
            let body = self.parse_block()?;
            Ok(FuncDecl { name,
                          signature,
                          body: Some(body),
                          command: None,
                          is_external,
                          pos })
        }
    }

    /// Parses the `(name type, …)` parameter list and optional return
    /// types: either a bare identifier or a parenthesized list.
    fn parse_func_signature(&mut self) -> ParseResult<FuncSignature> {
        let sig_pos = self.pos();
        let args = self.parse_params()?;

        let mut ret_types = Vec::new();
        match self.current_kind() {
            Some(TokenKind::Ident(_)) => {
                let typ = self.expect_ident()?;
                ret_types.push(typ.name);
            },
            Some(TokenKind::LParen) => {
                self.expect(&TokenKind::LParen, "\"(\"")?;
                loop {
                    match self.current_kind() {
                        Some(TokenKind::RParen) | None => break,
                        Some(TokenKind::Comma) => self.advance(),
                        Some(TokenKind::Newline) => self.skip_newlines(),
                        Some(_) => ret_types.push(self.expect_ident()?.name),
                    }
                }
                self.expect(&TokenKind::RParen, "\")\"")?;
            },
            _ => {},
        }

        Ok(FuncSignature { args,
                           piped_args: Vec::new(),
                           ret_types,
                           pos: sig_pos })
    }

    /// Parses a comma-separated `(name type, …)` list. Newlines and
    /// redundant commas are tolerated.
    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut params = Vec::new();
        loop {
            match self.current_kind() {
                Some(TokenKind::RParen) | None => break,
                Some(TokenKind::Comma) => self.advance(),
                Some(TokenKind::Newline) => self.skip_newlines(),
                Some(_) => {
                    let name = self.expect_ident()?;
                    let typ = self.expect_ident()?;
                    params.push(Param { name:      name.name,
                                        type_name: typ.name, });
                },
            }
        }
        self.expect(&TokenKind::RParen, "\")\"")?;
        Ok(params)
    }

    /// Parses the command template of an external declaration.
    fn parse_command_template(&mut self) -> ParseResult<StringLit> {
        match self.current_kind() {
            Some(TokenKind::Str(raw)) => {
                let lit = self.parse_string_literal(raw, self.pos())?;
                self.advance();
                Ok(lit)
            },
            Some(kind) => Err(ParseError::Expected { want:  "command template string".to_string(),
                                                     found: kind.to_string(),
                                                     pos:   self.pos(), }),
            None => Err(ParseError::UnexpectedEndOfInput { pos: self.pos() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Decl, Expr, Stmt},
        interpreter::parser::parse_program,
    };

    #[test]
    fn function_with_params_and_body() {
        let src = "\nfunction main(s string, i int) {\n\tlet x = 3\n\treturn\n}\n";
        let program = parse_program(src).unwrap();
        let Decl::Func(func) = &program.decls[0] else {
            panic!("expected function")
        };
        assert_eq!(func.name.name, "main");
        assert_eq!(func.signature.args.len(), 2);
        assert_eq!(func.signature.args[0].name, "s");
        assert_eq!(func.signature.args[0].type_name, "string");
        assert!(func.signature.ret_types.is_empty());
        let body = func.body.as_ref().unwrap();
        assert_eq!(body.statements.len(), 2);
        assert!(matches!(body.statements[1], Stmt::Return(ref r) if r.expr.is_none()));
    }

    #[test]
    fn return_type_single_and_list() {
        let src = "function f() string {\n\treturn \"x\"\n}\nfunction g() (string, int) {\n\treturn\n}\n";
        let program = parse_program(src).unwrap();
        let Decl::Func(f) = &program.decls[0] else { panic!() };
        assert_eq!(f.signature.ret_types, ["string"]);
        let Decl::Func(g) = &program.decls[1] else { panic!() };
        assert_eq!(g.signature.ret_types, ["string", "int"]);
    }

    #[test]
    fn external_declarations() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nexternal (stdin reader) | head(n int) => \"head -n ${n}\"\n";
        let program = parse_program(src).unwrap();
        let Decl::Func(echo) = &program.decls[0] else { panic!() };
        assert!(echo.is_external);
        assert!(echo.body.is_none());
        assert!(echo.command.is_some());
        let Decl::Func(head) = &program.decls[1] else { panic!() };
        assert_eq!(head.signature.piped_args.len(), 1);
        assert_eq!(head.signature.piped_args[0].name, "stdin");
        assert_eq!(head.signature.piped_args[0].type_name, "reader");
        assert_eq!(head.signature.args[0].name, "n");
    }

    #[test]
    fn external_function_keyword_is_accepted() {
        let src = "external function nl() => \"nl\"\n";
        let program = parse_program(src).unwrap();
        let Decl::Func(nl) = &program.decls[0] else { panic!() };
        assert!(nl.is_external);
        assert_eq!(nl.name.name, "nl");
    }

    #[test]
    fn piped_params_on_user_functions() {
        let src = "function (stdin reader) | main() {\n\treturn\n}\n";
        let program = parse_program(src).unwrap();
        let Decl::Func(main) = &program.decls[0] else { panic!() };
        assert_eq!(main.signature.piped_args.len(), 1);
        assert!(main.signature.args.is_empty());
    }

    #[test]
    fn top_level_let() {
        let program = parse_program("let x = 1 + 2\n").unwrap();
        let Decl::Let(decl) = &program.decls[0] else { panic!() };
        assert_eq!(decl.name.name, "x");
        assert!(matches!(decl.rhs, Expr::Binary { .. }));
    }

    #[test]
    fn stray_token_at_top_level() {
        assert!(parse_program("42\n").is_err());
    }
}
