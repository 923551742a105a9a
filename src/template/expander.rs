use log::trace;
use regex::Regex;

use crate::template::parser::{self, ContainerKind, TemplateNode, TemplateRoot};

/// How single-quoted output is produced.
///
/// `Basic` wraps in plain `'…'` with backslash escapes. `BashAnsiC` wraps
/// in `$'…'`, which bash requires for the backslash escapes to be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleQuoting {
    /// `'it\'s great'`
    #[default]
    Basic,
    /// `$'it\'s great'`
    BashAnsiC,
}

/// A value that can be interpolated into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// Text, printed as-is.
    Str(String),
    /// An integer, printed in decimal.
    Int(i64),
    /// A float; `%f` prints it with six decimal places.
    Float(f64),
    /// A boolean, printed as `true`/`false`.
    Bool(bool),
}

impl TemplateValue {
    fn display(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    fn display_float(&self) -> String {
        match self {
            Self::Float(x) => format!("{x:.6}"),
            Self::Int(n) => format!("{:.6}", *n as f64),
            other => other.display(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for TemplateValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors produced while expanding a template against a variable mapping.
pub enum ExpandError {
    /// The mapping had no value for a referenced variable.
    MissingVariable {
        /// The variable name.
        name: String,
    },
    /// A variable used format options the expander does not know.
    UnsupportedOpts {
        /// The offending options string.
        opts: String,
    },
}

impl std::fmt::Display for ExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVariable { name } => write!(f, "variable {name} is <nil>"),
            Self::UnsupportedOpts { opts } => {
                write!(f, "unsupported variable flags {opts:?}")
            },
        }
    }
}

impl std::error::Error for ExpandError {}

/// A variable referenced by a template, with its coarse type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// The variable name.
    pub name: String,
    /// The coarse type of the expected value. Always `"string"` today.
    pub typ:  String,
}

type Lookup<'a> = dyn Fn(&str) -> Option<TemplateValue> + 'a;

/// Builds a lookup function over a slice of `(name, value)` pairs, the way
/// tests and the CLI tools provide mappings.
#[must_use]
pub fn mapping_from_pairs<'a>(pairs: &'a [(&'a str, TemplateValue)])
                              -> impl Fn(&str) -> Option<TemplateValue> + 'a {
    move |name| {
        pairs.iter()
             .find(|(n, _)| *n == name)
             .map(|(_, v)| v.clone())
    }
}

/// One encoded fragment of output. Only `Var` fragments may be split at
/// whitespace when building argv, and only when the `%-` option asked for
/// it; everything else is an indivisible unit.
enum Frag {
    Word(String),
    Space(String),
    /// A `%-` variable value, splittable at internal whitespace.
    Splittable(String),
}

impl Frag {
    fn value(&self) -> &str {
        match self {
            Self::Word(s) | Self::Space(s) | Self::Splittable(s) => s,
        }
    }
}

/// Renders the template as a single string which, if printed, is a safe
/// command line. Containers apply their quoting; the outermost layer of
/// output is not wrapped in additional quotes.
///
/// # Errors
/// `ExpandError::MissingVariable` if the lookup has no value for a
/// referenced name, `ExpandError::UnsupportedOpts` for unknown `%` options.
///
/// # Examples
/// ```
/// use well::template::{expander, parser};
///
/// let root = parser::parse("jq «.${key:%q} | .»").unwrap();
/// let lookup = |name: &str| {
///     (name == "key").then(|| expander::TemplateValue::from("a long key"))
/// };
/// let rendered =
///     expander::render_to_string(&root, &lookup, expander::SingleQuoting::Basic).unwrap();
/// assert_eq!(rendered, "jq \".\\\"a long key\\\" | .\"");
/// ```
pub fn render_to_string(root: &TemplateRoot,
                        lookup: &Lookup<'_>,
                        quoting: SingleQuoting)
                        -> Result<String, ExpandError> {
    let mut out = String::new();
    for item in &root.items {
        out.push_str(encode(item, true, lookup, quoting)?.value());
    }
    trace!("rendered template to {out:?}");
    Ok(out)
}

/// Parses and renders a template in one step.
///
/// # Errors
/// Parse errors are stringified into `ExpandError::UnsupportedOpts`-free
/// form; see [`render_to_string`] for expansion errors.
pub fn parse_and_render(src: &str,
                        lookup: &Lookup<'_>,
                        quoting: SingleQuoting)
                        -> Result<String, String> {
    let root = parser::parse(src).map_err(|e| e.to_string())?;
    render_to_string(&root, lookup, quoting).map_err(|e| e.to_string())
}

/// Converts the template into an argv vector.
///
/// Top-level whitespace separates elements. Containers and interpolated
/// variables contribute a single indivisible element fragment each, except
/// for `%-` variables, whose values are split at internal whitespace as if
/// the whitespace had appeared in the template itself.
///
/// # Errors
/// Same conditions as [`render_to_string`].
///
/// # Examples
/// ```
/// use well::template::{expander, parser};
///
/// let root = parser::parse("echo ${file:%-}").unwrap();
/// let lookup = |name: &str| {
///     (name == "file").then(|| expander::TemplateValue::from("file A"))
/// };
/// let argv = expander::to_argv(&root, &lookup, expander::SingleQuoting::Basic).unwrap();
/// assert_eq!(argv, ["echo", "file", "A"]);
/// ```
pub fn to_argv(root: &TemplateRoot,
               lookup: &Lookup<'_>,
               quoting: SingleQuoting)
               -> Result<Vec<String>, ExpandError> {
    let ws = whitespace_re();
    let mut args: Vec<String> = Vec::new();
    let mut acc = String::new();

    let close = |args: &mut Vec<String>, acc: &mut String| {
        if !acc.is_empty() {
            args.push(std::mem::take(acc));
        }
    };

    for item in &root.items {
        match encode(item, false, lookup, quoting)? {
            Frag::Space(_) => close(&mut args, &mut acc),
            Frag::Word(lit) => acc.push_str(&lit),
            Frag::Splittable(value) => {
                let words: Vec<&str> = ws.split(&value).collect();
                for (i, word) in words.iter().enumerate() {
                    acc.push_str(word);
                    if i < words.len() - 1 {
                        close(&mut args, &mut acc);
                    }
                }
            },
        }
    }
    close(&mut args, &mut acc);

    trace!("expanded template to argv {args:?}");
    Ok(args)
}

/// Lists the variables referenced by a template, in first-appearance
/// order, without expanding it.
///
/// # Errors
/// Returns the parse error message if the template is invalid.
pub fn get_variables(src: &str) -> Result<Vec<Variable>, String> {
    let root = parser::parse(src).map_err(|e| e.to_string())?;
    let mut vars: Vec<Variable> = Vec::new();
    collect_variables(&root.items, &mut vars);
    Ok(vars)
}

fn collect_variables(items: &[TemplateNode], out: &mut Vec<Variable>) {
    for item in items {
        match item {
            TemplateNode::Var { name, .. } => {
                if !out.iter().any(|v| v.name == *name) {
                    out.push(Variable { name: name.clone(),
                                        typ:  "string".to_string(), });
                }
            },
            TemplateNode::Container { items, .. } => collect_variables(items, out),
            TemplateNode::Word(_) | TemplateNode::Space(_) => {},
        }
    }
}

/// Encodes one node into a fragment. `escape_outer` decides whether a
/// container at this level materializes its quotes: children of a container
/// always do, the top level only when rendering to a string.
fn encode(node: &TemplateNode,
          escape_outer: bool,
          lookup: &Lookup<'_>,
          quoting: SingleQuoting)
          -> Result<Frag, ExpandError> {
    match node {
        TemplateNode::Word(lit) => Ok(Frag::Word(lit.clone())),
        TemplateNode::Space(lit) => Ok(Frag::Space(lit.clone())),
        TemplateNode::Container { kind, items } => {
            let mut joined = String::new();
            for item in items {
                joined.push_str(encode(item, true, lookup, quoting)?.value());
            }
            if escape_outer {
                Ok(Frag::Word(quote(&joined, *kind, quoting)))
            } else {
                Ok(Frag::Word(joined))
            }
        },
        TemplateNode::Var { name, opts } => {
            let value = lookup(name).ok_or_else(|| {
                                        ExpandError::MissingVariable { name: name.clone() }
                                    })?;
            format_var(&value, opts, escape_outer, quoting)
        },
    }
}

/// Applies a variable's format options.
fn format_var(value: &TemplateValue,
              opts: &str,
              escape_outer: bool,
              quoting: SingleQuoting)
              -> Result<Frag, ExpandError> {
    match opts {
        "" | "%s" => Ok(Frag::Word(value.display())),
        "%f" => Ok(Frag::Word(value.display_float())),
        "%q" => {
            let node = TemplateNode::Container { kind:  ContainerKind::DoubleQuote,
                                                 items: vec![TemplateNode::Word(value.display())], };
            encode(&node, escape_outer, &|_| None, quoting)
        },
        "%Q" => {
            let node = TemplateNode::Container { kind:  ContainerKind::SingleQuote,
                                                 items: vec![TemplateNode::Word(value.display())], };
            encode(&node, escape_outer, &|_| None, quoting)
        },
        "%-" => Ok(Frag::Splittable(value.display())),
        other => Err(ExpandError::UnsupportedOpts { opts: other.to_string() }),
    }
}

/// Quotes joined container content according to the container kind.
fn quote(joined: &str, kind: ContainerKind, quoting: SingleQuoting) -> String {
    match kind {
        ContainerKind::DoubleQuote | ContainerKind::DoubleGuillemet => {
            double_quote_escape(joined)
        },
        ContainerKind::SingleQuote | ContainerKind::SingleGuillemet => {
            single_quote_escape(joined, quoting)
        },
    }
}

/// Wraps content in double quotes, escaping `"` and `\`.
#[must_use]
pub fn double_quote_escape(s: &str) -> String {
    let escaped = s.replace('\\', r"\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Wraps content in single quotes, escaping `'` and `\`, in the configured
/// variant.
#[must_use]
pub fn single_quote_escape(s: &str, quoting: SingleQuoting) -> String {
    let escaped = s.replace('\\', r"\\").replace('\'', r"\'");
    match quoting {
        SingleQuoting::Basic => format!("'{escaped}'"),
        SingleQuoting::BashAnsiC => format!("$'{escaped}'"),
    }
}

fn whitespace_re() -> Regex {
    // The pattern is a literal, so compilation cannot fail.
    Regex::new(r"\s").unwrap()
}

#[cfg(test)]
mod tests {
    use super::{
        get_variables, mapping_from_pairs, parse_and_render, to_argv, SingleQuoting,
        TemplateValue, Variable,
    };
    use crate::template::parser::parse;

    fn argv(src: &str, pairs: &[(&str, TemplateValue)]) -> Vec<String> {
        let root = parse(src).unwrap();
        to_argv(&root, &mapping_from_pairs(pairs), SingleQuoting::Basic).unwrap()
    }

    fn render(src: &str, pairs: &[(&str, TemplateValue)]) -> String {
        parse_and_render(src, &mapping_from_pairs(pairs), SingleQuoting::Basic).unwrap()
    }

    #[test]
    fn plain_words_split_at_whitespace() {
        assert_eq!(argv("ls  -lash --directory -C ./something", &[]),
                   ["ls", "-lash", "--directory", "-C", "./something"]);
    }

    #[test]
    fn newlines_split_like_spaces() {
        assert_eq!(argv("\n\t\tls  -lash\n\t\t--directory\n", &[]),
                   ["ls", "-lash", "--directory"]);
    }

    #[test]
    fn quoted_variable_stays_one_arg() {
        assert_eq!(argv("echo \"Hello ${name}!\"", &[("name", "sina".into())]),
                   ["echo", "Hello sina!"]);
    }

    #[test]
    fn guillemets_preserve_inner_pipe() {
        assert_eq!(argv("jq «.${key:%q} | .»", &[("key", "a long key".into())]),
                   ["jq", ".\"a long key\" | ."]);
        assert_eq!(argv("jq «.«${key}» | .»", &[("key", "a long key".into())]),
                   ["jq", ".\"a long key\" | ."]);
    }

    #[test]
    fn adjacent_fragments_join() {
        assert_eq!(argv("jq .« ${key} »", &[("key", "a long key".into())]),
                   ["jq", ". a long key "]);
    }

    #[test]
    fn nested_guillemets_escape_inner_quotes() {
        assert_eq!(argv("abc « «1» ««2»» »", &[]), ["abc", " \"1\" \"\\\"2\\\"\" "]);
    }

    #[test]
    fn single_and_double_quotes_unwrap_at_top() {
        assert_eq!(argv("a «\"b\"»", &[]), ["a", "\"b\""]);
        assert_eq!(argv("a '\"b\"'", &[]), ["a", "\"b\""]);
    }

    #[test]
    fn plain_variables_are_not_split() {
        assert_eq!(argv("echo ${file_1} ${file_2}",
                        &[("file_1", "file A".into()), ("file_2", "file B".into())]),
                   ["echo", "file A", "file B"]);
        assert_eq!(argv("echo ${file_1}${file_2}",
                        &[("file_1", "file A".into()), ("file_2", "file B".into())]),
                   ["echo", "file Afile B"]);
    }

    #[test]
    fn dash_option_splits_at_whitespace() {
        assert_eq!(argv("echo ${file:%-}", &[("file", "file A".into())]),
                   ["echo", "file", "A"]);
        assert_eq!(argv("echo ${file_1:%-} ${file_2:%-}",
                        &[("file_1", "file A".into()), ("file_2", "file B".into())]),
                   ["echo", "file", "A", "file", "B"]);
    }

    #[test]
    fn render_keeps_whitespace_verbatim() {
        assert_eq!(render("ls  -lash --directory -C ./something", &[]),
                   "ls  -lash --directory -C ./something");
    }

    #[test]
    fn render_quotes_top_level_containers() {
        assert_eq!(render("echo \"Hello ${name}!\"", &[("name", "sina".into())]),
                   "echo \"Hello sina!\"");
        assert_eq!(render("jq «.${key:%q} | .»", &[("key", "a long key".into())]),
                   "jq \".\\\"a long key\\\" | .\"");
    }

    #[test]
    fn render_keeps_escapes_literal() {
        assert_eq!(render(r"actual \«double\» and \‹single\› guillemets and backslashes \ \\ \",
                          &[]),
                   r"actual «double» and ‹single› guillemets and backslashes \ \\ \");
    }

    #[test]
    fn render_allows_raw_braces() {
        assert_eq!(render("hello {key}", &[]), "hello {key}");
    }

    #[test]
    fn missing_variable_is_nil_error() {
        let err = parse_and_render("hello ${key}",
                                   &mapping_from_pairs(&[]),
                                   SingleQuoting::Basic).unwrap_err();
        assert_eq!(err, "variable key is <nil>");
    }

    #[test]
    fn capital_q_single_quotes_basic() {
        assert_eq!(render("abc ${key:%Q}", &[("key", "a long key".into())]),
                   "abc 'a long key'");
    }

    #[test]
    fn capital_q_single_quotes_bash_ansi_c() {
        let out = parse_and_render("abc ${key:%Q}",
                                   &mapping_from_pairs(&[("key", "a long key".into())]),
                                   SingleQuoting::BashAnsiC).unwrap();
        assert_eq!(out, "abc $'a long key'");
    }

    #[test]
    fn nested_double_guillemets_compound_escaping() {
        assert_eq!(render("abc « «1» ««2»» »", &[]), "abc \" \\\"1\\\" \\\"\\\\\\\"2\\\\\\\"\\\" \"");
    }

    #[test]
    fn triple_nested_single_guillemets() {
        assert_eq!(render("echo ‹echo ‹echo ‹${name}›››", &[("name", "O'Reilly".into())]),
                   r"echo 'echo \'echo \\\'O\\\\\\\'Reilly\\\'\''");
    }

    #[test]
    fn triple_nested_single_guillemets_bash_ansi_c() {
        let out = parse_and_render("echo ‹echo ‹echo ‹${name}›››",
                                   &mapping_from_pairs(&[("name", "O'Reilly".into())]),
                                   SingleQuoting::BashAnsiC).unwrap();
        assert_eq!(out, r"echo $'echo $\'echo $\\\'O\\\\\\\'Reilly\\\'\''");
    }

    #[test]
    fn integer_and_float_formatting() {
        assert_eq!(argv("head -n ${n}", &[("n", 3i64.into())]), ["head", "-n", "3"]);
        assert_eq!(argv("x ${v:%f}", &[("v", 2.5f64.into())]), ["x", "2.500000"]);
    }

    #[test]
    fn variables_listed_in_order() {
        assert_eq!(get_variables("echo \"Hello ${your_name}!\"").unwrap(),
                   [Variable { name: "your_name".into(),
                               typ:  "string".into(), }]);
    }
}
