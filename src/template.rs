/// The expander turns a parsed template plus a variable lookup into either
/// a rendered command line or a ready-to-spawn argv vector.
///
/// # Responsibilities
/// - Applies the quoting rules of each container kind.
/// - Formats interpolated variables according to their `%` options.
/// - Splits argv elements at unquoted whitespace.
pub mod expander;
/// The template parser builds the interpolation AST.
///
/// Quote pairing is done here, not in the scanner: an opening quote or
/// guillemet starts a container node whose items are parsed recursively
/// until the matching closer.
///
/// # Responsibilities
/// - Builds `TemplateRoot` trees of words, spaces, variables and containers.
/// - Rejects unclosed containers and stray closers.
pub mod parser;
/// The template scanner tokenizes interpolation source text.
///
/// Whitespace is kept as tokens: whether it separates argv elements is a
/// decision that belongs to the expander, not the scanner.
///
/// # Responsibilities
/// - Aggregates whitespace runs and word runs into single tokens.
/// - Lexes `${name}` / `${name:%opts}` references and quote escapes.
pub mod scanner;
