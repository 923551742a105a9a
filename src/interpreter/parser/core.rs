use log::debug;

use crate::{
    ast::{BinOp, CallExpr, Expr, Ident, ParenExpr, Program, StringLit, UnOp},
    error::ParseError,
    interpreter::lexer::{self, precedence, Token, TokenKind},
    source::Pos,
    template,
};

/// Result type used by the parser.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete program.
///
/// # Errors
/// Scan errors and grammar violations, each carrying the byte offset of
/// the offending token.
///
/// # Examples
/// ```
/// use well::interpreter::parser::parse_program;
///
/// let program = parse_program("function main() {\n\tprintln(\"hi\")\n}\n").unwrap();
/// assert_eq!(program.decls.len(), 1);
///
/// // Newlines terminate declarations, so this is incomplete.
/// assert!(parse_program("let x =\n1\n").is_err());
/// ```
pub fn parse_program(src: &str) -> ParseResult<Program> {
    debug!("parsing program ({} bytes)", src.len());
    let mut parser = Parser::new(src)?;
    let decls = parser.parse_decls()?;
    Ok(Program { decls })
}

/// Parses a single expression, used by tests and the expression-oriented
/// tools.
///
/// # Errors
/// Same conditions as [`parse_program`].
pub fn parse_expr_source(src: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(src)?;
    parser.parse_expr(0)
}

/// The recursive-descent parser over a scanned token stream.
pub struct Parser {
    tokens: Vec<Token>,
    idx:    usize,
    eof:    Pos,
}

impl Parser {
    /// Scans `src` and positions the parser at its first token.
    ///
    /// # Errors
    /// Propagates scan errors.
    pub fn new(src: &str) -> ParseResult<Self> {
        let tokens = lexer::scan(src)?;
        Ok(Self { tokens,
                  idx: 0,
                  eof: Pos(src.len()) })
    }

    /// The kind of the token under the cursor, or `None` at end of input.
    /// Returned by value so the cursor can move while the caller holds it.
    pub(crate) fn current_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.idx).map(|t| t.kind.clone())
    }

    /// Position of the token under the cursor, or of the end of input.
    pub(crate) fn pos(&self) -> Pos {
        self.tokens.get(self.idx).map_or(self.eof, |t| t.pos)
    }

    pub(crate) fn advance(&mut self) {
        self.idx += 1;
    }

    /// Skips any run of newline tokens.
    pub(crate) fn skip_newlines(&mut self) {
        while matches!(self.current_kind(), Some(TokenKind::Newline)) {
            self.advance();
        }
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.idx >= self.tokens.len()
    }

    /// Whether the current token is the given identifier literal.
    pub(crate) fn at_keyword(&self, word: &str) -> bool {
        matches!(self.tokens.get(self.idx).map(|t| &t.kind),
                 Some(TokenKind::Ident(name)) if name == word)
    }

    fn unexpected_end(&self) -> ParseError {
        ParseError::UnexpectedEndOfInput { pos: self.eof }
    }

    /// Consumes the current token, which must match `want` exactly.
    pub(crate) fn expect(&mut self, want: &TokenKind, describe: &str) -> ParseResult<Pos> {
        match self.current_kind() {
            Some(kind) if kind == *want => {
                let pos = self.pos();
                self.advance();
                Ok(pos)
            },
            Some(kind) => Err(ParseError::Expected { want:  describe.to_string(),
                                                     found: kind.to_string(),
                                                     pos:   self.pos(), }),
            None => Err(self.unexpected_end()),
        }
    }

    /// Consumes the current token, which must be an identifier, returning
    /// it.
    pub(crate) fn expect_ident(&mut self) -> ParseResult<Ident> {
        match self.current_kind() {
            Some(TokenKind::Ident(name)) => {
                let ident = Ident { name,
                                    pos: self.pos() };
                self.advance();
                Ok(ident)
            },
            Some(kind) => Err(ParseError::Expected { want:  "identifier".to_string(),
                                                     found: kind.to_string(),
                                                     pos:   self.pos(), }),
            None => Err(self.unexpected_end()),
        }
    }

    /// Consumes the current token, which must be a keyword spelled as an
    /// identifier.
    pub(crate) fn expect_keyword(&mut self, word: &str) -> ParseResult<Pos> {
        match self.current_kind() {
            Some(TokenKind::Ident(name)) if name == word => {
                let pos = self.pos();
                self.advance();
                Ok(pos)
            },
            Some(kind) => Err(ParseError::Expected { want:  format!("{word:?}"),
                                                     found: kind.to_string(),
                                                     pos:   self.pos(), }),
            None => Err(self.unexpected_end()),
        }
    }

    /// Parses a Pratt expression starting at `min_prec`.
    ///
    /// On `(` the accumulated expression becomes a call; on `|` the
    /// accumulated expression is rewritten into the piped argument of the
    /// call on the right, so `x | f() | g()` associates as
    /// `g(piped=(f(piped=(x))))`.
    pub(crate) fn parse_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_primary()?;

        loop {
            let Some(kind) = self.current_kind() else {
                return Ok(lhs);
            };
            let Some(prec) = precedence(&kind) else {
                return Ok(lhs);
            };
            if prec < min_prec {
                return Ok(lhs);
            }
            let op_pos = self.pos();

            match kind {
                TokenKind::LParen => {
                    let paren = self.parse_paren_expr()?;
                    lhs = Expr::Call(CallExpr { pos:       lhs.pos(),
                                                fun:       Box::new(lhs),
                                                arg:       paren,
                                                piped_arg: ParenExpr::default(), });
                },
                TokenKind::Pipe => {
                    self.advance();
                    let mut call = match self.parse_expr(prec + 1)? {
                        Expr::Call(call) => call,
                        other => return Err(ParseError::PipeIntoNonCall { pos: other.pos() }),
                    };
                    call.piped_arg = ParenExpr { exprs: vec![lhs],
                                                 pos:   op_pos, };
                    lhs = Expr::Call(call);
                },
                other => {
                    let op = binop_for(&other);
                    self.advance();
                    let rhs = self.parse_expr(prec)?;
                    lhs = Expr::Binary { x:   Box::new(lhs),
                                         y:   Box::new(rhs),
                                         op,
                                         pos: op_pos, };
                },
            }
        }
    }

    /// Parses a primary expression: a literal, identifier, signed
    /// expression, or parenthesized list.
    pub(crate) fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(kind) = self.current_kind() else {
            return Err(self.unexpected_end());
        };
        let pos = self.pos();

        match kind {
            TokenKind::Str(raw) => {
                let lit = self.parse_string_literal(raw, pos)?;
                self.advance();
                Ok(Expr::Str(lit))
            },
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(Ident { name, pos }))
            },
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expr::Integer { value, pos })
            },
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Float { value, pos })
            },
            TokenKind::Add | TokenKind::Sub | TokenKind::Not => {
                let op = match kind {
                    TokenKind::Add => UnOp::Pos,
                    TokenKind::Sub => UnOp::Neg,
                    _ => UnOp::Not,
                };
                self.advance();
                match self.current_kind() {
                    Some(TokenKind::Integer(_)
                         | TokenKind::Float(_)
                         | TokenKind::Ident(_)
                         | TokenKind::LParen) => Ok(Expr::Unary { x: Box::new(self.parse_primary()?),
                                                                  op,
                                                                  pos }),
                    Some(other) => Err(ParseError::UnexpectedToken { token: other.to_string(),
                                                                     pos:   self.pos(), }),
                    None => Err(self.unexpected_end()),
                }
            },
            TokenKind::LParen => Ok(Expr::Paren(self.parse_paren_expr()?)),
            other => Err(ParseError::UnexpectedToken { token: other.to_string(),
                                                       pos }),
        }
    }

    /// Parses a parenthesized, comma-separated expression list. Newlines
    /// and redundant commas between items are tolerated; the formatter
    /// canonicalizes them away.
    pub(crate) fn parse_paren_expr(&mut self) -> ParseResult<ParenExpr> {
        let pos = self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut exprs = Vec::new();

        loop {
            match self.current_kind() {
                Some(TokenKind::RParen) => break,
                Some(TokenKind::Newline) => self.skip_newlines(),
                Some(TokenKind::Comma) => self.advance(),
                Some(_) => exprs.push(self.parse_expr(0)?),
                None => return Err(self.unexpected_end()),
            }
        }
        self.expect(&TokenKind::RParen, "\")\"")?;

        Ok(ParenExpr { exprs, pos })
    }

    /// Unquotes a string literal and parses its interpolation template.
    /// Backtick literals are raw: their content is kept opaque.
    pub(crate) fn parse_string_literal(&self, raw: String, pos: Pos) -> ParseResult<StringLit> {
        let template = if raw.starts_with('`') {
            template::parser::TemplateRoot::raw(&raw[1..raw.len() - 1])
        } else {
            let unquoted = unquote(&raw).map_err(|detail| ParseError::BadStringLiteral { detail,
                                                                                         pos })?;
            template::parser::parse(&unquoted).map_err(|e| {
                ParseError::BadStringLiteral { detail: e.to_string(),
                                               pos }
            })?
        };
        Ok(StringLit { template, raw, pos })
    }
}

fn binop_for(kind: &TokenKind) -> BinOp {
    match kind {
        TokenKind::Add => BinOp::Add,
        TokenKind::Sub => BinOp::Sub,
        TokenKind::Mul => BinOp::Mul,
        TokenKind::Quo => BinOp::Quo,
        TokenKind::Rem => BinOp::Rem,
        TokenKind::Eql => BinOp::Eql,
        TokenKind::Neq => BinOp::Neq,
        TokenKind::Reg => BinOp::Reg,
        TokenKind::Nreg => BinOp::Nreg,
        TokenKind::Lss => BinOp::Lss,
        TokenKind::Gtr => BinOp::Gtr,
        TokenKind::Leq => BinOp::Leq,
        // precedence() admits no other kind into the binary loop
        _ => BinOp::Geq,
    }
}

/// Removes the surrounding quotes of a `"…"` literal and processes its
/// backslash escapes.
fn unquote(raw: &str) -> Result<String, String> {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('`') => out.push('`'),
            Some(other) => return Err(format!("unknown escape \\{other}")),
            None => return Err("trailing backslash".to_string()),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{parse_expr_source, unquote};
    use crate::ast::{BinOp, Expr};

    #[test]
    fn unquote_processes_escapes() {
        assert_eq!(unquote(r#""a\nb\\c\"d""#).unwrap(), "a\nb\\c\"d");
        assert!(unquote(r#""bad \x escape""#).is_err());
    }

    #[test]
    fn pipes_rewrite_into_piped_args() {
        let expr = parse_expr_source("curl() | jq() | head()").unwrap();
        let Expr::Call(head) = expr else { panic!("expected call") };
        assert!(matches!(*head.fun, Expr::Ident(ref id) if id.name == "head"));
        let Expr::Call(jq) = &head.piped_arg.exprs[0] else {
            panic!("expected piped call")
        };
        assert!(matches!(*jq.fun, Expr::Ident(ref id) if id.name == "jq"));
        let Expr::Call(curl) = &jq.piped_arg.exprs[0] else {
            panic!("expected piped call")
        };
        assert!(curl.piped_arg.exprs.is_empty());
    }

    #[test]
    fn piping_into_a_non_call_is_rejected() {
        assert!(parse_expr_source("a | b").is_err());
    }

    #[test]
    fn signed_primaries() {
        let expr = parse_expr_source("-1 + +2").unwrap();
        let Expr::Binary { op: BinOp::Add, x, y, .. } = expr else {
            panic!("expected addition")
        };
        assert!(matches!(*x, Expr::Unary { .. }));
        assert!(matches!(*y, Expr::Unary { .. }));
    }

    #[test]
    fn raw_strings_are_opaque() {
        let expr = parse_expr_source("`echo ${not_parsed}`").unwrap();
        let Expr::Str(lit) = expr else { panic!("expected string") };
        assert_eq!(lit.template.to_string(), "echo ${not_parsed}");
        assert_eq!(lit.template.items.len(), 1);
    }
}
