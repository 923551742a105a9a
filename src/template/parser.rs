use log::trace;

use crate::{
    error::ParseError,
    source::Pos,
    template::scanner::{self, CmdToken},
};

/// The kind of a bracketed region in a template, which decides the quoting
/// applied when the region is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// `"…"`
    DoubleQuote,
    /// `'…'`
    SingleQuote,
    /// `«…»`
    DoubleGuillemet,
    /// `‹…›`
    SingleGuillemet,
}

impl ContainerKind {
    /// The opening delimiter of this container kind.
    #[must_use]
    pub const fn opener(self) -> char {
        match self {
            Self::DoubleQuote => '"',
            Self::SingleQuote => '\'',
            Self::DoubleGuillemet => '«',
            Self::SingleGuillemet => '‹',
        }
    }

    /// The closing delimiter of this container kind.
    #[must_use]
    pub const fn closer(self) -> char {
        match self {
            Self::DoubleQuote => '"',
            Self::SingleQuote => '\'',
            Self::DoubleGuillemet => '»',
            Self::SingleGuillemet => '›',
        }
    }
}

/// A node of the interpolation AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// A raw literal fragment.
    Word(String),
    /// A whitespace fragment, kept verbatim.
    Space(String),
    /// An interpolation placeholder with its format options (`""`, `"%s"`,
    /// `"%q"`, `"%Q"`, `"%f"`, `"%-"`).
    Var {
        /// Name of the variable to look up.
        name: String,
        /// Format options, empty or starting with `%`.
        opts: String,
    },
    /// A bracketed region whose items preserve source order. Containers
    /// nest.
    Container {
        /// Which bracket pair delimits the region.
        kind:  ContainerKind,
        /// The region's contents in source order.
        items: Vec<TemplateNode>,
    },
}

/// A parsed template: the ordered top-level items of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateRoot {
    /// Top-level items in source order.
    pub items: Vec<TemplateNode>,
}

impl TemplateRoot {
    /// Wraps raw text in a template that expands to exactly that text.
    /// Used for backtick string literals, which are opaque to the
    /// interpolation language.
    #[must_use]
    pub fn raw(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self { items: vec![TemplateNode::Word(text.to_string())] }
    }
}

impl std::fmt::Display for TemplateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Word(lit) => match lit.as_str() {
                "«" | "»" | "‹" | "›" | "$" => write!(f, "\\{lit}"),
                _ => write!(f, "{lit}"),
            },
            Self::Space(lit) => write!(f, "{lit}"),
            Self::Var { name, opts } => {
                if opts.is_empty() {
                    write!(f, "${{{name}}}")
                } else {
                    write!(f, "${{{name}:{opts}}}")
                }
            },
            Self::Container { kind, items } => {
                write!(f, "{}", kind.opener())?;
                for item in items {
                    write!(f, "{item}")?;
                }
                write!(f, "{}", kind.closer())
            },
        }
    }
}

impl std::fmt::Display for TemplateRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for item in &self.items {
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Parses a template string into its AST.
///
/// # Errors
/// - `ParseError::Scan` if tokenization fails.
/// - `ParseError::UnclosedContainer` if the input ends inside a container.
/// - `ParseError::UnexpectedToken` for a stray closing delimiter.
///
/// # Examples
/// ```
/// use well::template::parser::{parse, TemplateNode};
///
/// let root = parse("echo ${name}").unwrap();
/// assert_eq!(root.items.len(), 3);
/// assert!(matches!(&root.items[2], TemplateNode::Var { name, .. } if name == "name"));
/// assert!(parse("unclosed «").is_err());
/// ```
pub fn parse(src: &str) -> Result<TemplateRoot, ParseError> {
    trace!("parsing template {src:?}");
    let tokens = scanner::scan(src)?;
    let mut cursor = tokens.into_iter().peekable();
    let items = parse_items(&mut cursor, None, Pos(src.len()))?;
    Ok(TemplateRoot { items })
}

/// Parses nodes until the given closer (or the end of input at top level).
fn parse_items<I>(cursor: &mut std::iter::Peekable<I>,
                  until: Option<CmdToken>,
                  end: Pos)
                  -> Result<Vec<TemplateNode>, ParseError>
    where I: Iterator<Item = (CmdToken, Pos)>
{
    let mut items = Vec::new();

    loop {
        let Some((token, pos)) = cursor.next() else {
            return match until {
                None => Ok(items),
                Some(_) => Err(ParseError::UnclosedContainer { pos: end }),
            };
        };

        if Some(&token) == until.as_ref() {
            return Ok(items);
        }

        let node = match token {
            CmdToken::Word(lit) => TemplateNode::Word(lit),
            CmdToken::Space(lit) => TemplateNode::Space(lit),
            CmdToken::Arg(lit) => {
                let (name, opts) = match lit.split_once(':') {
                    Some((name, opts)) => (name.to_string(), opts.to_string()),
                    None => (lit, String::new()),
                };
                TemplateNode::Var { name, opts }
            },
            CmdToken::SingleQuote => parse_container(cursor, ContainerKind::SingleQuote, end)?,
            CmdToken::DoubleQuote => parse_container(cursor, ContainerKind::DoubleQuote, end)?,
            CmdToken::LDoubleGuillemet => {
                parse_container(cursor, ContainerKind::DoubleGuillemet, end)?
            },
            CmdToken::LSingleGuillemet => {
                parse_container(cursor, ContainerKind::SingleGuillemet, end)?
            },
            closer @ (CmdToken::RDoubleGuillemet | CmdToken::RSingleGuillemet) => {
                return Err(ParseError::UnexpectedToken { token: closer.to_string(),
                                                         pos });
            },
        };
        items.push(node);
    }
}

fn parse_container<I>(cursor: &mut std::iter::Peekable<I>,
                      kind: ContainerKind,
                      end: Pos)
                      -> Result<TemplateNode, ParseError>
    where I: Iterator<Item = (CmdToken, Pos)>
{
    let closer = match kind {
        ContainerKind::SingleQuote => CmdToken::SingleQuote,
        ContainerKind::DoubleQuote => CmdToken::DoubleQuote,
        ContainerKind::DoubleGuillemet => CmdToken::RDoubleGuillemet,
        ContainerKind::SingleGuillemet => CmdToken::RSingleGuillemet,
    };
    let items = parse_items(cursor, Some(closer), end)?;
    Ok(TemplateNode::Container { kind, items })
}

#[cfg(test)]
mod tests {
    use super::{parse, ContainerKind, TemplateNode, TemplateRoot};

    #[test]
    fn words_spaces_and_variables() {
        let root = parse("echo ${name:%q}!").unwrap();
        assert_eq!(root,
                   TemplateRoot { items: vec![TemplateNode::Word("echo".into()),
                                              TemplateNode::Space(" ".into()),
                                              TemplateNode::Var { name: "name".into(),
                                                                  opts: "%q".into(), },
                                              TemplateNode::Word("!".into())], });
    }

    #[test]
    fn containers_nest() {
        let root = parse("«a ‹b›»").unwrap();
        let TemplateNode::Container { kind, items } = &root.items[0] else {
            panic!("expected container, got {root:?}");
        };
        assert_eq!(*kind, ContainerKind::DoubleGuillemet);
        assert!(matches!(&items[2],
                         TemplateNode::Container { kind: ContainerKind::SingleGuillemet, .. }));
    }

    #[test]
    fn unclosed_container() {
        let err = parse("unclosed open «guillemet").unwrap_err();
        assert_eq!(err.to_string(), "unclosed container");
    }

    #[test]
    fn stray_closer() {
        let err = parse("double guillemet ‹closed››").unwrap_err();
        assert_eq!(err.to_string(), "unexpected token ›");
    }

    #[test]
    fn quotes_pair_like_containers() {
        let err = parse("double quote \"closed\"\"").unwrap_err();
        assert_eq!(err.to_string(), "unclosed container");
    }

    #[test]
    fn display_round_trips_escapes() {
        let src = r"actual \«double\» and ‹x› ${v:%-}";
        let root = parse(src).unwrap();
        assert_eq!(root.to_string(), src);
    }
}
