use logos::Logos;

use crate::{
    error::ScanError,
    source::Pos,
};

/// Represents a lexical token of the interpolation sub-language.
///
/// Unlike most lexers, whitespace is significant here and is returned as a
/// token: the expander later uses it to split argv elements.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum CmdToken {
    /// A run of literal text, up to the next delimiter. An escape such as
    /// `\«` or `\$` also lexes as a word holding just the escaped rune, and
    /// a backslash before any other rune is a word holding the backslash.
    #[regex(r#"[^\\'"«»‹›$ \t\r\n]+"#, |lex| lex.slice().to_string())]
    #[regex(r"\\[«»‹›$]", |lex| lex.slice()[1..].to_string())]
    #[token("\\", |_| "\\".to_string())]
    Word(String),

    /// A run of whitespace characters, aggregated into one token.
    #[regex(r"[ \t\r\n]+", |lex| lex.slice().to_string())]
    Space(String),

    /// A variable reference `${name}` or `${name:%opts}`. The literal is
    /// `name` or `name:%opts`.
    #[regex(r"\$\{[A-Za-z_][A-Za-z0-9_]*(:%[^}]*)?\}", trim_variable)]
    Arg(String),

    /// `'`
    #[token("'")]
    SingleQuote,
    /// `"`
    #[token("\"")]
    DoubleQuote,
    /// `«`
    #[token("«")]
    LDoubleGuillemet,
    /// `»`
    #[token("»")]
    RDoubleGuillemet,
    /// `‹`
    #[token("‹")]
    LSingleGuillemet,
    /// `›`
    #[token("›")]
    RSingleGuillemet,
}

/// Strips the `${` and `}` from a variable reference.
fn trim_variable(lex: &logos::Lexer<CmdToken>) -> String {
    let s = lex.slice();
    s["${".len()..s.len() - 1].to_string()
}

impl std::fmt::Display for CmdToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Word(lit) => write!(f, "word({lit:?})"),
            Self::Space(lit) => write!(f, "space({lit:?})"),
            Self::Arg(lit) => write!(f, "${{{lit}}}"),
            Self::SingleQuote => write!(f, "'"),
            Self::DoubleQuote => write!(f, "\""),
            Self::LDoubleGuillemet => write!(f, "«"),
            Self::RDoubleGuillemet => write!(f, "»"),
            Self::LSingleGuillemet => write!(f, "‹"),
            Self::RSingleGuillemet => write!(f, "›"),
        }
    }
}

/// Tokenizes a template, returning each token with the byte offset it
/// starts at.
///
/// # Errors
/// Returns a `ScanError` for malformed `${…}` references. Every other
/// character sequence lexes as a word.
pub fn scan(src: &str) -> Result<Vec<(CmdToken, Pos)>, ScanError> {
    let mut tokens = Vec::new();
    let mut lexer = CmdToken::lexer(src);

    while let Some(result) = lexer.next() {
        let pos = Pos(lexer.span().start);
        match result {
            Ok(token) => tokens.push((token, pos)),
            Err(()) => {
                let slice = lexer.slice();
                return Err(if slice.starts_with('$') {
                               ScanError::InvalidVariable { pos }
                           } else {
                               ScanError::IllegalCharacter { ch:  slice.chars()
                                                                       .next()
                                                                       .unwrap_or('\u{fffd}'),
                                                             pos }
                           });
            },
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{scan, CmdToken};

    fn kinds(src: &str) -> Vec<CmdToken> {
        scan(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn words_and_spaces_aggregate() {
        assert_eq!(kinds("ls  -lash"),
                   vec![CmdToken::Word("ls".into()),
                        CmdToken::Space("  ".into()),
                        CmdToken::Word("-lash".into())]);
    }

    #[test]
    fn variable_with_options() {
        assert_eq!(kinds("${key:%q}"), vec![CmdToken::Arg("key:%q".into())]);
        assert_eq!(kinds("${key}"), vec![CmdToken::Arg("key".into())]);
    }

    #[test]
    fn escapes_become_words() {
        assert_eq!(kinds(r"\«x\$"),
                   vec![CmdToken::Word("«".into()),
                        CmdToken::Word("x".into()),
                        CmdToken::Word("$".into())]);
        // A backslash before anything else is a literal backslash.
        assert_eq!(kinds(r"\n"),
                   vec![CmdToken::Word("\\".into()), CmdToken::Word("n".into())]);
    }

    #[test]
    fn guillemets_are_single_tokens() {
        assert_eq!(kinds("«»‹›"),
                   vec![CmdToken::LDoubleGuillemet,
                        CmdToken::RDoubleGuillemet,
                        CmdToken::LSingleGuillemet,
                        CmdToken::RSingleGuillemet]);
    }

    #[test]
    fn raw_braces_are_words() {
        assert_eq!(kinds("{key}"), vec![CmdToken::Word("{key}".into())]);
    }

    #[test]
    fn malformed_variable_is_an_error() {
        assert!(scan("${key").is_err());
        assert!(scan("${1a}").is_err());
        assert!(scan("${key:q}").is_err());
    }
}
