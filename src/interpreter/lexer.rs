use logos::Logos;

use crate::{error::ScanError, source::Pos};

/// Represents a lexical token of the host language.
///
/// Newlines are significant (they terminate declarations and statements)
/// and are returned as tokens; spaces, tabs and `//` comments are skipped.
/// Keywords (`let`, `function`, `external`, `return`, `if`, `else`) lex as
/// identifiers; the parser dispatches on their literals.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    /// Identifier or keyword, such as `main` or `let`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Integer literal, such as `42`.
    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Integer(i64),

    /// Float literal, such as `123.45`.
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse().ok())]
    Float(f64),

    /// String literal, either `"…"` (with `\x` escapes) or a raw backtick
    /// literal. The payload is the literal as written, quotes included.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r"`[^`]*`", |lex| lex.slice().to_string())]
    Str(String),

    /// Statement terminator.
    #[regex(r"[\r\n]")]
    Newline,

    /// `|`
    #[token("|")]
    Pipe,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBrack,
    /// `]`
    #[token("]")]
    RBrack,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `:`
    #[token(":")]
    Colon,
    /// `,`
    #[token(",")]
    Comma,
    /// `.`
    #[token(".")]
    Period,
    /// `+`
    #[token("+")]
    Add,
    /// `-`
    #[token("-")]
    Sub,
    /// `!`
    #[token("!")]
    Not,
    /// `*`
    #[token("*")]
    Mul,
    /// `/`
    #[token("/")]
    Quo,
    /// `%`
    #[token("%")]
    Rem,
    /// `==`
    #[token("==")]
    Eql,
    /// `~~`
    #[token("~~")]
    Reg,
    /// `!~`
    #[token("!~")]
    Nreg,
    /// `<`
    #[token("<")]
    Lss,
    /// `>`
    #[token(">")]
    Gtr,
    /// `=`
    #[token("=")]
    Assign,
    /// `!=`
    #[token("!=")]
    Neq,
    /// `<=`
    #[token("<=")]
    Leq,
    /// `>=`
    #[token(">=")]
    Geq,
    /// `=>`
    #[token("=>")]
    Arrow,
}

/// A token together with the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was lexed.
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub pos:  Pos,
}

/// Operator precedence. Token kinds absent from this table terminate
/// expression parsing.
#[must_use]
pub fn precedence(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Pipe
        | TokenKind::Add
        | TokenKind::Sub
        | TokenKind::Reg
        | TokenKind::Nreg
        | TokenKind::Eql
        | TokenKind::Neq
        | TokenKind::Lss
        | TokenKind::Gtr
        | TokenKind::Leq
        | TokenKind::Geq => Some(1),
        TokenKind::Mul | TokenKind::Quo | TokenKind::Rem => Some(2),
        TokenKind::LParen => Some(3),
        _ => None,
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier {name:?}"),
            Self::Integer(v) => write!(f, "integer {v}"),
            Self::Float(v) => write!(f, "float {v}"),
            Self::Str(lit) => write!(f, "string {lit}"),
            Self::Newline => write!(f, "newline"),
            Self::Pipe => write!(f, "\"|\""),
            Self::LParen => write!(f, "\"(\""),
            Self::RParen => write!(f, "\")\""),
            Self::LBrack => write!(f, "\"[\""),
            Self::RBrack => write!(f, "\"]\""),
            Self::LBrace => write!(f, "\"{{\""),
            Self::RBrace => write!(f, "\"}}\""),
            Self::Colon => write!(f, "\":\""),
            Self::Comma => write!(f, "\",\""),
            Self::Period => write!(f, "\".\""),
            Self::Add => write!(f, "\"+\""),
            Self::Sub => write!(f, "\"-\""),
            Self::Not => write!(f, "\"!\""),
            Self::Mul => write!(f, "\"*\""),
            Self::Quo => write!(f, "\"/\""),
            Self::Rem => write!(f, "\"%\""),
            Self::Eql => write!(f, "\"==\""),
            Self::Reg => write!(f, "\"~~\""),
            Self::Nreg => write!(f, "\"!~\""),
            Self::Lss => write!(f, "\"<\""),
            Self::Gtr => write!(f, "\">\""),
            Self::Assign => write!(f, "\"=\""),
            Self::Neq => write!(f, "\"!=\""),
            Self::Leq => write!(f, "\"<=\""),
            Self::Geq => write!(f, "\">=\""),
            Self::Arrow => write!(f, "\"=>\""),
        }
    }
}

/// Tokenizes host-language source text.
///
/// # Errors
/// - `ScanError::UnterminatedString` for an unclosed `"` or backtick
///   literal.
/// - `ScanError::IllegalCharacter` for anything no token can begin with
///   (e.g. a lone `~`).
pub fn scan(src: &str) -> Result<Vec<Token>, ScanError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(src);

    while let Some(result) = lexer.next() {
        let pos = Pos(lexer.span().start);
        match result {
            Ok(kind) => tokens.push(Token { kind, pos }),
            Err(()) => {
                let slice = lexer.slice();
                let ch = slice.chars().next().unwrap_or('\u{fffd}');
                return Err(if ch == '"' || ch == '`' {
                               ScanError::UnterminatedString { pos }
                           } else {
                               ScanError::IllegalCharacter { ch, pos }
                           });
            },
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{scan, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        scan(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(kinds("== => ~~ != !~ <= >="),
                   vec![TokenKind::Eql,
                        TokenKind::Arrow,
                        TokenKind::Reg,
                        TokenKind::Neq,
                        TokenKind::Nreg,
                        TokenKind::Leq,
                        TokenKind::Geq]);
    }

    #[test]
    fn newlines_are_significant_spaces_are_not() {
        assert_eq!(kinds("a\nb c"),
                   vec![TokenKind::Ident("a".into()),
                        TokenKind::Newline,
                        TokenKind::Ident("b".into()),
                        TokenKind::Ident("c".into())]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(kinds("1 // comment ~~~\n2"),
                   vec![TokenKind::Integer(1), TokenKind::Newline, TokenKind::Integer(2)]);
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("42 123.45"),
                   vec![TokenKind::Integer(42), TokenKind::Float(123.45)]);
    }

    #[test]
    fn strings_keep_their_quotes() {
        assert_eq!(kinds(r#""a\"b" `raw ${x}`"#),
                   vec![TokenKind::Str(r#""a\"b""#.into()),
                        TokenKind::Str("`raw ${x}`".into())]);
    }

    #[test]
    fn lone_tilde_is_illegal() {
        assert!(scan("a ~ b").is_err());
    }

    #[test]
    fn unterminated_string() {
        let err = scan("let x = \"abc").unwrap_err();
        assert_eq!(err.to_string(), "unterminated string literal");
    }

    #[test]
    fn token_positions_are_byte_offsets() {
        let tokens = scan("let x = 3").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.pos.0).collect();
        assert_eq!(positions, vec![0, 4, 6, 8]);
    }
}
