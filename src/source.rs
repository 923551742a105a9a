/// A byte offset into the source text of a program or template.
///
/// Every AST node records the position of its leading token so that errors
/// can point back at the exact source location. [`NO_POS`] marks nodes that
/// were synthesized rather than parsed (for example the implicit `main()`
/// call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(pub usize);

/// Sentinel position for synthesized nodes.
pub const NO_POS: Pos = Pos(usize::MAX);

impl Pos {
    /// Returns `true` unless this is the [`NO_POS`] sentinel.
    #[must_use]
    pub fn is_some(self) -> bool {
        self != NO_POS
    }
}

impl Default for Pos {
    /// Defaults to [`NO_POS`], the position of synthesized nodes.
    fn default() -> Self {
        NO_POS
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_some() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "-")
        }
    }
}

/// Computes the zero-based `(line, column)` of a byte offset.
///
/// Columns count characters, not bytes, so that the caret drawn by
/// [`mark_at`] lines up under multi-byte runes such as guillemets.
///
/// # Examples
/// ```
/// use well::source::{line_col_at, Pos};
///
/// assert_eq!(line_col_at("ab\ncd", Pos(4)), (1, 1));
/// ```
#[must_use]
pub fn line_col_at(src: &str, pos: Pos) -> (usize, usize) {
    let mut line = 0;
    let mut column = 0;
    for (offset, ch) in src.char_indices() {
        if offset >= pos.0 {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Renders a caret diagnostic pointing at `pos` in `src`.
///
/// The output is the offending source line followed by a marker column and
/// the message, e.g.:
///
/// ```text
///     let x = foo()
///             ▲
///             │
///             ╰── at line 3 column 13: "foo" is missing
/// ```
///
/// Positions past the end of the source (including [`NO_POS`]) degrade to
/// the message alone.
#[must_use]
pub fn mark_at(src: &str, pos: Pos, msg: &str) -> String {
    if !pos.is_some() || pos.0 > src.len() {
        return msg.to_string();
    }

    let (line, column) = line_col_at(src, pos);
    let line_text = src.lines().nth(line).unwrap_or("");

    // Keep tabs as tabs in the marker indent so the caret stays aligned
    // however the terminal expands them.
    let indent: String = line_text.chars()
                                  .take(column)
                                  .map(|ch| if ch == '\t' { '\t' } else { ' ' })
                                  .collect();

    format!("{line_text}\n{indent}▲\n{indent}│\n{indent}╰── at line {} column {}: {msg}",
            line + 1,
            column + 1)
}

/// Formats source text with 1-based line numbers, used by verbose parse
/// failures and tests to show exactly what was being interpreted.
#[must_use]
pub fn number_lines(src: &str) -> String {
    src.lines()
       .enumerate()
       .map(|(i, line)| format!("{:3}| {line}", i + 1))
       .collect::<Vec<_>>()
       .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{line_col_at, mark_at, Pos, NO_POS};

    #[test]
    fn line_col_counts_chars_not_bytes() {
        let src = "ab\n«x»y";
        // `y` is at byte 3 + 2 + 1 + 2 = 8, but column 3 of line 1.
        assert_eq!(line_col_at(src, Pos(8)), (1, 3));
    }

    #[test]
    fn mark_points_at_column() {
        let src = "let x = 3\nlet y = zz\n";
        let marked = mark_at(src, Pos(18), "\"zz\" is missing");
        let mut lines = marked.lines();
        assert_eq!(lines.next(), Some("let y = zz"));
        assert_eq!(lines.next(), Some("        ▲"));
        assert!(marked.ends_with("╰── at line 2 column 9: \"zz\" is missing"));
    }

    #[test]
    fn no_pos_degrades_to_message() {
        assert_eq!(mark_at("src", NO_POS, "boom"), "boom");
    }
}
