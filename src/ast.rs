use crate::{source::Pos, template::parser::TemplateRoot};

/// A parsed program: the ordered top-level declarations of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level declarations in source order.
    pub decls: Vec<Decl>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// A `let` binding.
    Let(LetDecl),
    /// A function or external-command declaration.
    Func(FuncDecl),
}

/// A `let NAME = expr` binding, usable both at the top level and inside
/// blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct LetDecl {
    /// The bound name.
    pub name: Ident,
    /// The bound expression.
    pub rhs:  Expr,
    /// Byte offset of the `let` keyword.
    pub pos:  Pos,
}

/// A function declaration.
///
/// A user function carries a block body. An `external` declaration instead
/// carries a command template whose expansion becomes the argv of a spawned
/// process.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    /// The function name.
    pub name:        Ident,
    /// Positional parameters, piped parameters and return types.
    pub signature:   FuncSignature,
    /// The body of a user function; `None` for external declarations.
    pub body:        Option<BlockStmt>,
    /// The command template of an external declaration; `None` for user
    /// functions.
    pub command:     Option<StringLit>,
    /// Whether this is an `external` declaration.
    pub is_external: bool,
    /// Byte offset of the leading keyword.
    pub pos:         Pos,
}

/// A function signature: regular parameters, piped parameters, and return
/// types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncSignature {
    /// Positional parameters.
    pub args:       Vec<Param>,
    /// Parameters filled by `|`-piped values; for externals these map to
    /// the child's stdin.
    pub piped_args: Vec<Param>,
    /// Declared return type names (zero, one, or a parenthesized list).
    pub ret_types:  Vec<String>,
    /// Byte offset of the opening parenthesis.
    pub pos:        Pos,
}

/// One `name type` parameter pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name:      String,
    /// Declared type name (e.g. `string`, `int`, `reader`).
    pub type_name: String,
}

/// A `{ … }` statement block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    /// The statements in source order.
    pub statements: Vec<Stmt>,
    /// Byte offset of the opening brace.
    pub pos:        Pos,
}

/// A statement inside a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A nested `let` binding.
    Let(LetDecl),
    /// An expression evaluated for its effects.
    Expr(ExprStmt),
    /// A `return` with an optional value.
    Return(ReturnStmt),
    /// An `if`/`else if`/`else` chain.
    If(IfStmt),
}

/// An expression statement; its value is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    /// The expression to evaluate.
    pub expr: Expr,
    /// Byte offset of the expression.
    pub pos:  Pos,
}

/// A `return` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    /// The returned expression, if any.
    pub expr: Option<Expr>,
    /// Byte offset of the `return` keyword.
    pub pos:  Pos,
}

/// An `if` statement with an optional else branch.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// The condition; must evaluate to a boolean.
    pub cond:        Expr,
    /// The body evaluated when the condition holds.
    pub body:        BlockStmt,
    /// The `else` branch, either another `if` or a block.
    pub else_branch: Option<Box<ElseBranch>>,
    /// Byte offset of the `if` keyword.
    pub pos:         Pos,
}

/// The `else` branch of an [`IfStmt`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `else if …`
    If(IfStmt),
    /// `else { … }`
    Block(BlockStmt),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A name reference.
    Ident(Ident),
    /// An integer literal.
    Integer {
        /// The literal value.
        value: i64,
        /// Byte offset of the literal.
        pos:   Pos,
    },
    /// A float literal.
    Float {
        /// The literal value.
        value: f64,
        /// Byte offset of the literal.
        pos:   Pos,
    },
    /// A string literal with its parsed interpolation template.
    Str(StringLit),
    /// A binary operation.
    Binary {
        /// Left operand.
        x:   Box<Expr>,
        /// Right operand.
        y:   Box<Expr>,
        /// The operator.
        op:  BinOp,
        /// Byte offset of the operator.
        pos: Pos,
    },
    /// A signed or negated expression.
    Unary {
        /// The operand.
        x:   Box<Expr>,
        /// The operator.
        op:  UnOp,
        /// Byte offset of the operator.
        pos: Pos,
    },
    /// A parenthesized, comma-separated expression list.
    Paren(ParenExpr),
    /// A function call, possibly with piped arguments.
    Call(CallExpr),
}

/// A name reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// The referenced name.
    pub name: String,
    /// Byte offset of the identifier.
    pub pos:  Pos,
}

/// A string literal: the retained raw literal plus its parsed template.
///
/// Backtick literals are raw: their template is a single opaque word and
/// interpolation syntax inside them is not interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    /// The parsed interpolation template.
    pub template: TemplateRoot,
    /// The literal as written, including its quotes.
    pub raw:      String,
    /// Byte offset of the opening quote.
    pub pos:      Pos,
}

/// A parenthesized expression list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParenExpr {
    /// The expressions between the parentheses.
    pub exprs: Vec<Expr>,
    /// Byte offset of the opening parenthesis.
    pub pos:   Pos,
}

/// A call expression. `piped_arg` holds the values flowing in via `|`:
/// `a | f(x)` parses as `f(x)` with `piped_arg = (a)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// The callee expression.
    pub fun:       Box<Expr>,
    /// Positional arguments.
    pub arg:       ParenExpr,
    /// Piped arguments.
    pub piped_arg: ParenExpr,
    /// Byte offset of the callee.
    pub pos:       Pos,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// Division (`/`)
    Quo,
    /// Remainder (`%`)
    Rem,
    /// Equality (`==`)
    Eql,
    /// Inequality (`!=`)
    Neq,
    /// Regex match (`~~`)
    Reg,
    /// Negated regex match (`!~`)
    Nreg,
    /// Less than (`<`)
    Lss,
    /// Greater than (`>`)
    Gtr,
    /// Less than or equal (`<=`)
    Leq,
    /// Greater than or equal (`>=`)
    Geq,
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Identity sign (`+x`)
    Pos,
    /// Negation (`-x`)
    Neg,
    /// Logical not (`!x`)
    Not,
}

impl Expr {
    /// Gets the source position of the expression's leading token.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Ident(ident) => ident.pos,
            Self::Integer { pos, .. } | Self::Float { pos, .. } => *pos,
            Self::Str(lit) => lit.pos,
            Self::Binary { x, .. } => x.pos(),
            Self::Unary { pos, .. } => *pos,
            Self::Paren(paren) => paren.pos,
            Self::Call(call) => call.pos,
        }
    }
}

impl Stmt {
    /// Gets the source position of the statement's leading token.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Let(decl) => decl.pos,
            Self::Expr(stmt) => stmt.pos,
            Self::Return(stmt) => stmt.pos,
            Self::If(stmt) => stmt.pos,
        }
    }
}

impl Decl {
    /// Gets the source position of the declaration's leading token.
    #[must_use]
    pub fn pos(&self) -> Pos {
        match self {
            Self::Let(decl) => decl.pos,
            Self::Func(decl) => decl.pos,
        }
    }

    /// The declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Let(decl) => &decl.name.name,
            Self::Func(decl) => &decl.name.name,
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Quo => "/",
            Self::Rem => "%",
            Self::Eql => "==",
            Self::Neq => "!=",
            Self::Reg => "~~",
            Self::Nreg => "!~",
            Self::Lss => "<",
            Self::Gtr => ">",
            Self::Leq => "<=",
            Self::Geq => ">=",
        };
        write!(f, "{op}")
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Pos => "+",
            Self::Neg => "-",
            Self::Not => "!",
        };
        write!(f, "{op}")
    }
}
