//! The A0 abstract syntax tree.
//!
//! Every node carries its own [`SourceSpan`]; `Expr`/`Stmt`/`Header` each
//! expose a `span()` accessor via an exhaustive match, rather than a shared
//! trait object, so the formatter and diagnostics can stay free of dynamic
//! dispatch.

use a0_core::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub headers: Vec<Header>,
    pub statements: Vec<Stmt>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    CapDecl {
        keys: Vec<String>,
        span: SourceSpan,
    },
    BudgetDecl {
        fields: Vec<(String, f64)>,
        span: SourceSpan,
    },
    ImportDecl {
        name: String,
        span: SourceSpan,
    },
}

impl Header {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Header::CapDecl { span, .. }
            | Header::BudgetDecl { span, .. }
            | Header::ImportDecl { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
        span: SourceSpan,
    },
    Expr {
        expr: Expr,
        arrow_target: Option<String>,
        span: SourceSpan,
    },
    FnDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    Return {
        value: Expr,
        span: SourceSpan,
    },
}

impl Stmt {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Stmt::Let { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::FnDecl { span, .. }
            | Stmt::Return { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    Pair(String, Expr),
    Spread(Expr),
}

/// The two ways a program can reach out to the host: `call?` is read-mode
/// (no side effects, usable anywhere) and `do` is effect-mode (recorded and
/// budgeted the same way, but only legal on effect tools).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallMode {
    Read,
    Effect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null(SourceSpan),
    Bool(bool, SourceSpan),
    Number(f64, SourceSpan),
    Str(String, SourceSpan),
    IdentPath {
        base: String,
        path: Vec<PathSegment>,
        span: SourceSpan,
    },
    List(Vec<Expr>, SourceSpan),
    Record(Vec<RecordEntry>, SourceSpan),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: SourceSpan,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: SourceSpan,
    },
    IfBlock {
        cond: Box<Expr>,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: SourceSpan,
    },
    IfRecord {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        span: SourceSpan,
    },
    For {
        binding: String,
        iter: Box<Expr>,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    FilterBlock {
        binding: String,
        iter: Box<Expr>,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    Loop {
        init: Option<Box<Expr>>,
        times: Option<Box<Expr>>,
        binding: Option<String>,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    Match {
        scrutinee: Box<Expr>,
        ok_arm: Option<MatchArm>,
        err_arm: Option<MatchArm>,
        span: SourceSpan,
    },
    Try {
        try_body: Vec<Stmt>,
        catch_binding: String,
        catch_body: Vec<Stmt>,
        span: SourceSpan,
    },
    Assert {
        that: Box<Expr>,
        msg: Box<Expr>,
        span: SourceSpan,
    },
    Check {
        that: Box<Expr>,
        msg: Box<Expr>,
        span: SourceSpan,
    },
    ToolCall {
        mode: ToolCallMode,
        tool: String,
        args: Box<Expr>,
        span: SourceSpan,
    },
    FnCall {
        name: String,
        args: Box<Expr>,
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub binding: String,
    pub body: Vec<Stmt>,
}

impl Expr {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Expr::Null(span)
            | Expr::Bool(_, span)
            | Expr::Number(_, span)
            | Expr::Str(_, span)
            | Expr::IdentPath { span, .. }
            | Expr::List(_, span)
            | Expr::Record(_, span)
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::IfBlock { span, .. }
            | Expr::IfRecord { span, .. }
            | Expr::For { span, .. }
            | Expr::FilterBlock { span, .. }
            | Expr::Loop { span, .. }
            | Expr::Match { span, .. }
            | Expr::Try { span, .. }
            | Expr::Assert { span, .. }
            | Expr::Check { span, .. }
            | Expr::ToolCall { span, .. }
            | Expr::FnCall { span, .. } => span,
        }
    }
}
