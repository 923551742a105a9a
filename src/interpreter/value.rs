use std::{cell::RefCell, rc::Rc};

use crate::ast::FuncDecl;

/// Represents a runtime value in the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// A 64-bit signed integer.
    Integer(i64),
    /// A double-precision float.
    Float(f64),
    /// A boolean, produced by comparisons and the regex operators.
    Boolean(bool),
    /// A string literal value. Every evaluated string carries both its
    /// rendered form and its pre-split argv form.
    Str {
        /// The template rendered to a single (safely quoted) string.
        rendered: String,
        /// The template split into argv elements.
        argv:     Vec<String>,
    },
    /// A lazy, single-consumer chain of external commands.
    Stream(PipeStream),
    /// A user-defined or external function.
    Function(Rc<FuncDecl>),
    /// A builtin, identified by name in the builtin table.
    Builtin(&'static str),
    /// A parenthesized list of values.
    Paren(Vec<Object>),
    /// The value carried by a `return` statement on its way out of a
    /// block.
    Return(Box<Option<Object>>),
}

impl Object {
    /// Builds a string object from plain text: the text is both the
    /// rendered form and the single argv element.
    ///
    /// # Examples
    /// ```
    /// use well::interpreter::value::Object;
    ///
    /// let obj = Object::from_text("hello");
    /// assert_eq!(obj.to_string(), "hello");
    /// ```
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::Str { argv:     vec![text.clone()],
                    rendered: text, }
    }

    /// A short name for the value's type, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Str { .. } => "string",
            Self::Stream(_) => "stream",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin",
            Self::Paren(_) => "paren",
            Self::Return(_) => "return",
        }
    }

    /// Whether two values are equal under `==`: both sides are projected
    /// to their primitive form and compared. Values of different types
    /// (including integer vs float) are never equal.
    #[must_use]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Str { rendered: a, .. }, Self::Str { rendered: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Str { rendered, .. } => write!(f, "{rendered}"),
            Self::Stream(_) => write!(f, "<stream>"),
            Self::Function(decl) => write!(f, "function {}", decl.name.name),
            Self::Builtin(name) => write!(f, "builtin {name}"),
            Self::Paren(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            },
            Self::Return(inner) => match inner.as_ref() {
                Some(obj) => write!(f, "return {obj}"),
                None => write!(f, "return"),
            },
        }
    }
}

/// One stage of a pending pipeline: the argv to spawn and the rendered
/// command text for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// The argument vector, program name first.
    pub argv: Vec<String>,
    /// The rendered command line, for log records.
    pub text: String,
}

/// A lazy chain of external commands.
///
/// Calling an external function does not spawn anything; it appends a
/// stage to the chain. The chain runs when a consumer (`print_stream`,
/// `pipe`, `pipe_capture`) takes the stages, at most once: the stream is
/// single-consumer, and ownership of the stages moves to the consumer.
///
/// The driver's `MainStdin` binding is a stream with no stages at all:
/// piping it into an external function makes that command read the host's
/// standard input, which is where every pipeline's first child reads from
/// anyway.
#[derive(Debug, Clone)]
pub struct PipeStream {
    stages: Rc<RefCell<Option<Vec<Stage>>>>,
}

impl PipeStream {
    /// A stream with pending stages.
    #[must_use]
    pub fn pending(stages: Vec<Stage>) -> Self {
        Self { stages: Rc::new(RefCell::new(Some(stages))) }
    }

    /// The host's standard input: a chain with no stages.
    #[must_use]
    pub fn host_stdin() -> Self {
        Self::pending(Vec::new())
    }

    /// Takes the pending stages, leaving the stream consumed. Returns
    /// `None` if the stream was already consumed.
    #[must_use]
    pub fn consume(&self) -> Option<Vec<Stage>> {
        self.stages.borrow_mut().take()
    }
}

impl PartialEq for PipeStream {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.stages, &other.stages)
    }
}

#[cfg(test)]
mod tests {
    use super::{Object, PipeStream, Stage};

    #[test]
    fn streams_are_single_consumer() {
        let stream = PipeStream::pending(vec![Stage { argv: vec!["yes".into()],
                                                      text: "yes".into(), }]);
        let clone = stream.clone();
        assert!(clone.consume().is_some());
        assert!(stream.consume().is_none());
    }

    #[test]
    fn equality_projects_to_primitives() {
        let a = Object::from_text("x");
        let b = Object::Str { rendered: "x".into(),
                              argv:     vec!["different".into()], };
        assert!(a.loosely_equals(&b));
        assert!(!Object::Integer(1).loosely_equals(&Object::Float(1.0)));
        assert!(Object::Integer(1).loosely_equals(&Object::Integer(1)));
    }
}
