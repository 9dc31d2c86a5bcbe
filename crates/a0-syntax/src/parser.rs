//! Recursive-descent parser.
//!
//! No error recovery: the first parse error halts the pass and is reported
//! as `E_PARSE`. Precedence, low to high: comparisons, additive, multiplicative,
//! unary `-`.

use crate::ast::*;
use crate::tokens::{Token, TokenKind};
use a0_core::SourceSpan;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("{span}: unexpected token {found}, expected {expected}")]
    Unexpected {
        span: SourceSpan,
        found: String,
        expected: String,
    },
    #[error("{span}: unexpected end of input, expected {expected}")]
    UnexpectedEof { span: SourceSpan, expected: String },
}

impl ParseError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ParseError::Unexpected { span, .. } | ParseError::UnexpectedEof { span, .. } => {
                span.clone()
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> PResult<Program> {
        let start = self.peek().span.clone();
        let mut headers = Vec::new();
        while self.at_header_start() {
            headers.push(self.parse_header()?);
        }
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        let end = self.peek().span.clone();
        Ok(Program {
            headers,
            statements,
            span: start.merge(&end),
        })
    }

    // ---- headers ----------------------------------------------------

    fn at_header_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Cap | TokenKind::Budget | TokenKind::Import
        )
    }

    fn parse_header(&mut self) -> PResult<Header> {
        match &self.peek().kind {
            TokenKind::Cap => self.parse_cap_decl(),
            TokenKind::Budget => self.parse_budget_decl(),
            TokenKind::Import => self.parse_import_decl(),
            _ => unreachable!("at_header_start guards this"),
        }
    }

    fn parse_cap_decl(&mut self) -> PResult<Header> {
        let start = self.advance().span.clone(); // `cap`
        self.expect(&TokenKind::LBrace)?;
        let mut keys = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_dotted_name()?;
            self.expect(&TokenKind::Colon)?;
            self.expect(&TokenKind::True)?;
            keys.push(key);
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok(Header::CapDecl {
            keys,
            span: start.merge(&end),
        })
    }

    fn parse_budget_decl(&mut self) -> PResult<Header> {
        let start = self.advance().span.clone(); // `budget`
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.expect_number()?;
            fields.push((name, value));
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok(Header::BudgetDecl {
            fields,
            span: start.merge(&end),
        })
    }

    fn parse_import_decl(&mut self) -> PResult<Header> {
        let start = self.advance().span.clone(); // `import`
        let (name, name_span) = self.parse_dotted_name_spanned()?;
        Ok(Header::ImportDecl {
            name,
            span: start.merge(&name_span),
        })
    }

    // ---- statements ---------------------------------------------------

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match &self.peek().kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::Fn => self.parse_fn_decl(),
            TokenKind::Return => self.parse_return(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_let(&mut self) -> PResult<Stmt> {
        let start = self.advance().span.clone();
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let span = start.merge(value.span());
        Ok(Stmt::Let { name, value, span })
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let start = self.advance().span.clone();
        let value = self.parse_expr()?;
        let span = start.merge(value.span());
        Ok(Stmt::Return { value, span })
    }

    fn parse_fn_decl(&mut self) -> PResult<Stmt> {
        let start = self.advance().span.clone(); // `fn`
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            params.push(self.expect_ident()?);
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let (body, end) = self.parse_block_body()?;
        Ok(Stmt::FnDecl {
            name,
            params,
            body,
            span: start.merge(&end),
        })
    }

    fn parse_expr_stmt(&mut self) -> PResult<Stmt> {
        let expr = self.parse_expr()?;
        let mut span = expr.span().clone();
        let arrow_target = if self.advance_if(&TokenKind::Arrow) {
            let tok = self.expect_ident_tok()?;
            span = span.merge(&tok.span);
            Some(match tok.kind {
                TokenKind::Ident(name) => name,
                _ => unreachable!(),
            })
        } else {
            None
        };
        Ok(Stmt::Expr {
            expr,
            arrow_target,
            span,
        })
    }

    // ---- expressions ----------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.check(&TokenKind::Minus) {
            let start = self.advance().span.clone();
            let expr = self.parse_unary()?;
            let span = start.merge(expr.span());
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n, tok.span))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::Str(s, tok.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, tok.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, tok.span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(tok.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_record(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Filter => self.parse_filter(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Check => self.parse_check(),
            TokenKind::CallQuestion => self.parse_tool_call(ToolCallMode::Read),
            TokenKind::Do => self.parse_tool_call(ToolCallMode::Effect),
            TokenKind::Ident(_) => self.parse_ident_or_call(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `[`
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBracket)?.span.clone();
        Ok(Expr::List(items, start.merge(&end)))
    }

    fn parse_record(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `{`
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.advance_if(&TokenKind::DotDotDot) {
                let expr = self.parse_expr()?;
                entries.push(RecordEntry::Spread(expr));
            } else {
                let key = self.expect_ident()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                entries.push(RecordEntry::Pair(key, value));
            }
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok(Expr::Record(entries, start.merge(&end)))
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `if`
        if self.check(&TokenKind::LBrace) {
            return self.parse_if_record(start);
        }
        let cond = if self.advance_if(&TokenKind::LParen) {
            let c = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            c
        } else {
            self.parse_expr()?
        };
        let (then_body, _) = self.parse_block_body()?;
        let (else_body, end) = if self.advance_if(&TokenKind::Else) {
            let (b, end) = self.parse_block_body()?;
            (Some(b), end)
        } else {
            let end = self.prev_span();
            (None, end)
        };
        Ok(Expr::IfBlock {
            cond: Box::new(cond),
            then_body,
            else_body,
            span: start.merge(&end),
        })
    }

    fn parse_if_record(&mut self, start: SourceSpan) -> PResult<Expr> {
        let (mut entries, end) = self.parse_keyed_header()?;
        let cond = self.require_entry(&mut entries, "cond", &end)?;
        let then_branch = self.require_entry(&mut entries, "then", &end)?;
        let else_branch = self.require_entry(&mut entries, "else", &end)?;
        Ok(Expr::IfRecord {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span: start.merge(&end),
        })
    }

    fn parse_for(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `for`
        let (mut entries, header_end) = self.parse_keyed_header()?;
        let iter = self.require_entry(&mut entries, "in", &header_end)?;
        let binding = self.require_string_entry(&mut entries, "as", &header_end)?;
        let (body, end) = self.parse_block_body()?;
        Ok(Expr::For {
            binding,
            iter: Box::new(iter),
            body,
            span: start.merge(&end),
        })
    }

    fn parse_filter(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `filter`
        let (mut entries, header_end) = self.parse_keyed_header()?;
        let iter = self.require_entry(&mut entries, "in", &header_end)?;
        let binding = self.require_string_entry(&mut entries, "as", &header_end)?;
        let (body, end) = self.parse_block_body()?;
        Ok(Expr::FilterBlock {
            binding,
            iter: Box::new(iter),
            body,
            span: start.merge(&end),
        })
    }

    fn parse_loop(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `loop`
        let (mut entries, header_end) = self.parse_keyed_header()?;
        let init = take_entry(&mut entries, "in").map(Box::new);
        let times = take_entry(&mut entries, "times").map(Box::new);
        let binding = take_string_entry(&mut entries, "as")
            .map_err(|e| self.bad_header_value("as", &header_end, e))?;
        let (body, end) = if self.check(&TokenKind::LBrace) {
            self.parse_block_body()?
        } else {
            (Vec::new(), header_end.clone())
        };
        Ok(Expr::Loop {
            init,
            times,
            binding,
            body,
            span: start.merge(&end),
        })
    }

    fn parse_match(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `match`
        let scrutinee = self.parse_match_subject()?;
        self.expect(&TokenKind::LBrace)?;
        let mut ok_arm = None;
        let mut err_arm = None;
        loop {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            if self.advance_if(&TokenKind::Ok) {
                ok_arm = Some(self.parse_match_arm()?);
            } else if self.advance_if(&TokenKind::Err) {
                err_arm = Some(self.parse_match_arm()?);
            } else {
                return Err(self.unexpected("`ok` or `err`"));
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok(Expr::Match {
            scrutinee: Box::new(scrutinee),
            ok_arm,
            err_arm,
            span: start.merge(&end),
        })
    }

    /// `match`'s subject is deliberately narrow (identPath or a parenthesized
    /// expression) so the brace that opens the arm list is never mistaken
    /// for a record-literal call argument.
    fn parse_match_subject(&mut self) -> PResult<Expr> {
        if self.advance_if(&TokenKind::LParen) {
            let e = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(e);
        }
        let tok = self.expect_ident_tok()?.clone();
        let name = match tok.kind {
            TokenKind::Ident(name) => name,
            _ => unreachable!(),
        };
        let mut path = Vec::new();
        let mut span = tok.span.clone();
        loop {
            if self.advance_if(&TokenKind::Dot) {
                let field = self.expect_ident()?;
                span = span.merge(&self.prev_span());
                path.push(PathSegment::Field(field));
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let idx = self.expect_number()? as i64;
                let end = self.expect(&TokenKind::RBracket)?.span.clone();
                span = span.merge(&end);
                path.push(PathSegment::Index(idx));
            } else {
                break;
            }
        }
        Ok(Expr::IdentPath { base: name, path, span })
    }

    fn parse_match_arm(&mut self) -> PResult<MatchArm> {
        self.expect(&TokenKind::LBrace)?;
        let binding = self.expect_ident()?;
        self.expect(&TokenKind::RBrace)?;
        let (body, _) = self.parse_block_body()?;
        Ok(MatchArm { binding, body })
    }

    fn parse_try(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `try`
        let (try_body, _) = self.parse_block_body()?;
        self.expect(&TokenKind::Catch)?;
        self.expect(&TokenKind::LBrace)?;
        let catch_binding = self.expect_ident()?;
        self.expect(&TokenKind::RBrace)?;
        let (catch_body, end) = self.parse_block_body()?;
        Ok(Expr::Try {
            try_body,
            catch_binding,
            catch_body,
            span: start.merge(&end),
        })
    }

    fn parse_assert(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `assert`
        let (mut entries, end) = self.parse_keyed_header()?;
        let that = self.require_entry(&mut entries, "that", &end)?;
        let msg = self.require_entry(&mut entries, "msg", &end)?;
        Ok(Expr::Assert {
            that: Box::new(that),
            msg: Box::new(msg),
            span: start.merge(&end),
        })
    }

    fn parse_check(&mut self) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `check`
        let (mut entries, end) = self.parse_keyed_header()?;
        let that = self.require_entry(&mut entries, "that", &end)?;
        let msg = self.require_entry(&mut entries, "msg", &end)?;
        Ok(Expr::Check {
            that: Box::new(that),
            msg: Box::new(msg),
            span: start.merge(&end),
        })
    }

    fn parse_tool_call(&mut self, mode: ToolCallMode) -> PResult<Expr> {
        let start = self.advance().span.clone(); // `call?` or `do`
        let tool = self.parse_dotted_name()?;
        let args = self.parse_record()?;
        let end = args.span().clone();
        Ok(Expr::ToolCall {
            mode,
            tool,
            args: Box::new(args),
            span: start.merge(&end),
        })
    }

    fn parse_ident_or_call(&mut self) -> PResult<Expr> {
        let tok = self.advance().clone();
        let name = match tok.kind {
            TokenKind::Ident(name) => name,
            _ => unreachable!(),
        };
        // Function/tool argument is exactly one record literal, written
        // directly after the name with no separating punctuation.
        if self.check(&TokenKind::LBrace) {
            let args = self.parse_record()?;
            let end = args.span().clone();
            return Ok(Expr::FnCall {
                name,
                args: Box::new(args),
                span: tok.span.merge(&end),
            });
        }

        let mut path = Vec::new();
        let mut span = tok.span.clone();
        loop {
            if self.advance_if(&TokenKind::Dot) {
                let field = self.expect_ident()?;
                span = span.merge(&self.prev_span());
                path.push(PathSegment::Field(field));
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let idx = self.expect_number()? as i64;
                let end = self.expect(&TokenKind::RBracket)?.span.clone();
                span = span.merge(&end);
                path.push(PathSegment::Index(idx));
            } else {
                break;
            }
        }
        Ok(Expr::IdentPath {
            base: name,
            path,
            span,
        })
    }

    // ---- block and keyed-header helpers ---------------------------------

    /// Parses a brace-delimited statement list, as used by `fn` bodies,
    /// `if`/`for`/`filter`/`loop` bodies, `match` arms, and `try`/`catch`.
    fn parse_block_body(&mut self) -> PResult<(Vec<Stmt>, SourceSpan)> {
        self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            body.push(self.parse_statement()?);
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok((body, end))
    }

    /// Parses the `{ key: EXPR, ... }` header used by `if`, `for`, `filter`,
    /// `loop`, `assert`, and `check`. Keys are plain identifiers except
    /// `else`, which is its own reserved token even in key position.
    fn parse_keyed_header(&mut self) -> PResult<(Vec<(String, Expr)>, SourceSpan)> {
        let start = self.expect(&TokenKind::LBrace)?.span.clone();
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.expect_header_key()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.advance_if(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.clone();
        Ok((entries, start.merge(&end)))
    }

    fn expect_header_key(&mut self) -> PResult<String> {
        let tok = self.peek().clone();
        let key = match &tok.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Else => "else".to_string(),
            _ => return Err(self.unexpected("a record key")),
        };
        self.advance();
        Ok(key)
    }

    fn require_entry(
        &self,
        entries: &mut Vec<(String, Expr)>,
        key: &str,
        end: &SourceSpan,
    ) -> PResult<Expr> {
        take_entry(entries, key).ok_or_else(|| ParseError::Unexpected {
            span: end.clone(),
            found: "}".to_string(),
            expected: format!("a `{key}: ...` field"),
        })
    }

    fn require_string_entry(
        &self,
        entries: &mut Vec<(String, Expr)>,
        key: &str,
        end: &SourceSpan,
    ) -> PResult<String> {
        let value = self.require_entry(entries, key, end)?;
        match value {
            Expr::Str(s, _) => Ok(s),
            other => Err(ParseError::Unexpected {
                span: other.span().clone(),
                found: format!("{other:?}"),
                expected: format!("a string literal for `{key}`"),
            }),
        }
    }

    fn bad_header_value(&self, key: &str, end: &SourceSpan, expr: Expr) -> ParseError {
        ParseError::Unexpected {
            span: expr.span().clone(),
            found: format!("{expr:?}"),
            expected: format!("a string literal for `{key}` (around {end})"),
        }
    }

    // ---- low-level helpers ----------------------------------------------

    fn parse_dotted_name(&mut self) -> PResult<String> {
        Ok(self.parse_dotted_name_spanned()?.0)
    }

    fn parse_dotted_name_spanned(&mut self) -> PResult<(String, SourceSpan)> {
        let first = self.expect_ident_tok()?;
        let mut span = first.span.clone();
        let mut name = match first.kind {
            TokenKind::Ident(n) => n,
            _ => unreachable!(),
        };
        while self.check(&TokenKind::Dot) {
            self.advance();
            let seg = self.expect_ident_tok()?;
            span = span.merge(&seg.span);
            name.push('.');
            match seg.kind {
                TokenKind::Ident(n) => name.push_str(&n),
                _ => unreachable!(),
            }
        }
        Ok((name, span))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn prev_span(&self) -> SourceSpan {
        self.tokens[self.pos - 1].span.clone()
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance_if(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.expect_ident_tok()?.kind.clone() {
            TokenKind::Ident(name) => Ok(name),
            _ => unreachable!(),
        }
    }

    fn expect_ident_tok(&mut self) -> PResult<&Token> {
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Ok(self.advance())
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    fn expect_number(&mut self) -> PResult<f64> {
        match self.peek().kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                span: tok.span.clone(),
                expected: expected.to_string(),
            }
        } else {
            ParseError::Unexpected {
                span: tok.span.clone(),
                found: format!("{:?}", tok.kind),
                expected: expected.to_string(),
            }
        }
    }
}

fn take_entry(entries: &mut Vec<(String, Expr)>, key: &str) -> Option<Expr> {
    let idx = entries.iter().position(|(k, _)| k == key)?;
    Some(entries.remove(idx).1)
}

fn take_string_entry(entries: &mut Vec<(String, Expr)>, key: &str) -> Result<Option<String>, Expr> {
    match take_entry(entries, key) {
        Some(Expr::Str(s, _)) => Ok(Some(s)),
        Some(other) => Err(other),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> PResult<Program> {
        let tokens = Lexer::new("main.a0", src).tokenize().unwrap();
        Parser::new(tokens).parse_program()
    }

    #[test]
    fn parses_minimal_program() {
        let prog = parse("return 1").unwrap();
        assert_eq!(prog.statements.len(), 1);
        assert!(matches!(prog.statements[0], Stmt::Return { .. }));
    }

    #[test]
    fn parses_headers() {
        let prog = parse(
            "cap { fs.read: true }\nbudget { maxToolCalls: 3, timeMs: 1000 }\nreturn 1",
        )
        .unwrap();
        assert_eq!(prog.headers.len(), 2);
        match &prog.headers[0] {
            Header::CapDecl { keys, .. } => assert_eq!(keys, &["fs.read".to_string()]),
            other => panic!("expected CapDecl, got {other:?}"),
        }
    }

    #[test]
    fn import_header_parses_but_is_flagged_later() {
        let prog = parse("import foo\nreturn 1").unwrap();
        assert!(matches!(prog.headers[0], Header::ImportDecl { .. }));
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let prog = parse("return 1 + 2 * 3").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected top-level Add, got {other:?}"),
        }
    }

    #[test]
    fn parses_let_and_fn_and_arrow_binding() {
        let prog = parse(
            "let x = 1\nfn add { a, b } { return a + b }\ndo fs.write { path: \"x\" } -> result\nreturn x",
        )
        .unwrap();
        assert_eq!(prog.statements.len(), 4);
        assert!(matches!(prog.statements[0], Stmt::Let { .. }));
        assert!(matches!(prog.statements[1], Stmt::FnDecl { .. }));
        match &prog.statements[2] {
            Stmt::Expr { arrow_target, .. } => {
                assert_eq!(arrow_target.as_deref(), Some("result"));
            }
            other => panic!("expected ExprStmt, got {other:?}"),
        }
    }

    #[test]
    fn parses_record_with_spread() {
        let prog = parse("return { x: 1, ...base, y: 2 }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        let Expr::Record(entries, _) = value else {
            panic!()
        };
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[1], RecordEntry::Spread(_)));
    }

    #[test]
    fn parses_match_expr() {
        let prog = parse(
            "let out = match r { ok { v } { return v } err { e } { return e.message } }\nreturn out",
        )
        .unwrap();
        let Stmt::Let { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Match { ok_arm, err_arm, .. } => {
                assert!(ok_arm.is_some());
                assert!(err_arm.is_some());
            }
            other => panic!("expected Match, got {other:?}"),
        }
    }

    #[test]
    fn parses_match_with_only_ok_arm() {
        let prog = parse("return match (r) { ok { v } { return v } }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Match { ok_arm, err_arm, .. } => {
                assert!(ok_arm.is_some());
                assert!(err_arm.is_none());
            }
            other => panic!("expected Match, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_has_no_recovery() {
        let err = parse("let x = ").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. } | ParseError::Unexpected { .. }));
    }

    #[test]
    fn parses_loop_expr() {
        let prog =
            parse("return loop { in: 0, times: 3, as: \"acc\" } { return acc + 1 }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Loop { init, times, binding, .. } => {
                assert!(init.is_some());
                assert!(times.is_some());
                assert_eq!(binding.as_deref(), Some("acc"));
            }
            other => panic!("expected Loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_loop_times_zero_with_no_body() {
        let prog = parse("return loop { times: 0 }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Loop { init, binding, body, .. } => {
                assert!(init.is_none());
                assert!(binding.is_none());
                assert!(body.is_empty());
            }
            other => panic!("expected Loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_call_question_and_do() {
        let prog = parse(
            "cap { fs.read: true }\nreturn call? fs.read { path: \"a\" }",
        )
        .unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        assert!(matches!(
            value,
            Expr::ToolCall {
                mode: ToolCallMode::Read,
                ..
            }
        ));
    }

    #[test]
    fn parses_assert_and_check_records() {
        let prog = parse(
            "assert { that: true, msg: \"ok\" }\ncheck { that: false, msg: \"warn\" }\nreturn 1",
        )
        .unwrap();
        assert!(matches!(prog.statements[0], Stmt::Expr { .. }));
        assert!(matches!(prog.statements[1], Stmt::Expr { .. }));
    }

    #[test]
    fn parses_if_record_form() {
        let prog = parse("return if { cond: true, then: 1, else: 2 }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        assert!(matches!(value, Expr::IfRecord { .. }));
    }

    #[test]
    fn parses_if_block_form() {
        let prog = parse("return if (true) { return 1 } else { return 2 }").unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::IfBlock { then_body, else_body, .. } => {
                assert_eq!(then_body.len(), 1);
                assert!(else_body.is_some());
            }
            other => panic!("expected IfBlock, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_and_filter() {
        let prog = parse(
            "let ys = for { in: [1, 2, 3], as: \"x\" } { return x }\nlet zs = filter { in: ys, as: \"y\" } { return y }\nreturn zs",
        )
        .unwrap();
        assert!(matches!(prog.statements[0], Stmt::Let { .. }));
        assert!(matches!(prog.statements[1], Stmt::Let { .. }));
    }

    #[test]
    fn parses_try_catch_with_braced_binding() {
        let prog = parse(
            "return try { return 1 } catch { e } { return e.message }",
        )
        .unwrap();
        let Stmt::Return { value, .. } = &prog.statements[0] else {
            panic!()
        };
        match value {
            Expr::Try { catch_binding, .. } => assert_eq!(catch_binding, "e"),
            other => panic!("expected Try, got {other:?}"),
        }
    }

    #[test]
    fn fn_call_takes_single_record_argument() {
        let prog = parse("let out = double { x: 21 }\nreturn out").unwrap();
        let Stmt::Let { value, .. } = &prog.statements[0] else {
            panic!()
        };
        assert!(matches!(value, Expr::FnCall { .. }));
    }
}
