//! Static validation for A0 programs.
//!
//! The validator never mutates the AST. It collects every diagnostic it can
//! find in one pass rather than stopping at the first problem, so a program
//! with five unbound names gets five `E_UNBOUND` diagnostics back, not one.

mod scope;

use a0_diagnostics::{Diagnostic, ErrorCode};
use a0_syntax::{Expr, Header, Program, RecordEntry, Stmt, ToolCallMode, UnaryOp};
use scope::Scope;
use std::collections::{HashMap, HashSet};

/// Capabilities A0 programs may declare. `http.read` is reserved and always
/// rejected: the language only ever fetches over `http.get`.
pub const KNOWN_CAPABILITIES: &[&str] = &["fs.read", "fs.write", "http.get", "sh.exec"];

/// Tool names and whether invoking them performs a side effect. Read tools
/// may be called with either `call?` or `do`; effect tools require `do`.
pub const KNOWN_TOOLS: &[(&str, bool)] = &[
    ("fs.read", false),
    ("fs.write", true),
    ("http.get", false),
    ("sh.exec", true),
];

const KNOWN_BUDGET_FIELDS: &[&str] = &["timeMs", "maxToolCalls", "maxBytesWritten", "maxIterations"];

const STDLIB_NAMES: &[&str] = &[
    "eq", "not", "and", "or", "coalesce", "typeof", "len", "append", "concat", "sort", "filter",
    "find", "range", "join", "unique", "pluck", "flat", "get", "put", "patch", "parse.json",
    "keys", "values", "merge", "entries", "math.max", "math.min", "str.concat", "str.split",
    "str.starts", "str.ends", "str.replace", "str.template", "map", "reduce", "contains",
];

/// The result of validating a program: declared capabilities, budget
/// fields, and user-defined function names, plus any diagnostics found.
#[derive(Debug, Default)]
pub struct ValidatedProgram {
    pub declared_caps: HashSet<String>,
    pub budget_fields: HashMap<String, f64>,
    pub fn_names: HashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidatedProgram {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.iter().all(|d| d.severity != a0_diagnostics::Severity::Error)
    }
}

pub fn validate(program: &Program) -> ValidatedProgram {
    let mut out = ValidatedProgram::default();
    validate_headers(program, &mut out);
    let root = Scope::root();
    for name in &out.fn_names {
        root.declare_fn(name.clone());
    }
    validate_block(&program.statements, &root, &out.declared_caps, &mut out.diagnostics);
    out
}

fn validate_headers(program: &Program, out: &mut ValidatedProgram) {
    let mut seen_budget = false;
    for header in &program.headers {
        match header {
            Header::CapDecl { keys, span } => {
                for key in keys {
                    if !KNOWN_CAPABILITIES.contains(&key.as_str()) {
                        out.diagnostics.push(Diagnostic::error(
                            ErrorCode::EUnknownCap,
                            format!("unknown capability `{key}`"),
                            Some(span.clone()),
                        ));
                    } else {
                        out.declared_caps.insert(key.clone());
                    }
                }
            }
            Header::BudgetDecl { fields, span } => {
                if seen_budget {
                    out.diagnostics.push(Diagnostic::error(
                        ErrorCode::EAst,
                        "duplicate `budget` header".to_string(),
                        Some(span.clone()),
                    ));
                }
                seen_budget = true;
                for (name, value) in fields {
                    if !KNOWN_BUDGET_FIELDS.contains(&name.as_str()) {
                        out.diagnostics.push(Diagnostic::error(
                            ErrorCode::EUnknownBudget,
                            format!("unknown budget field `{name}`"),
                            Some(span.clone()),
                        ));
                    } else {
                        out.budget_fields.insert(name.clone(), *value);
                    }
                }
            }
            Header::ImportDecl { name, span } => {
                out.diagnostics.push(Diagnostic::error(
                    ErrorCode::EImportUnsupported,
                    format!("`import {name}` is not supported"),
                    Some(span.clone()),
                ));
            }
        }
    }
    for stmt in &program.statements {
        if let Stmt::FnDecl { name, span, .. } = stmt {
            if !out.fn_names.insert(name.clone()) {
                out.diagnostics.push(Diagnostic::error(
                    ErrorCode::EFnDup,
                    format!("function `{name}` is already defined"),
                    Some(span.clone()),
                ));
            }
        }
    }
}

/// Every statement block (program body, `fn` body, `for`/`filter`/`loop`
/// body, `if`-block branch, `try`/`catch` block, `match`-arm body) must end
/// in exactly one `return`, and only at the end: a `return` in the middle of
/// a block is `E_RETURN_NOT_LAST`, a block that never returns is
/// `E_NO_RETURN`. Checked once per `validate_block` call, so it applies
/// uniformly to every kind of block without each call site repeating it.
fn validate_returns(stmts: &[Stmt], diags: &mut Vec<Diagnostic>) {
    for (i, stmt) in stmts.iter().enumerate() {
        let is_last = i + 1 == stmts.len();
        if let Stmt::Return { span, .. } = stmt {
            if !is_last {
                diags.push(Diagnostic::error(
                    ErrorCode::EReturnNotLast,
                    "`return` must be the last statement in its block".to_string(),
                    Some(span.clone()),
                ));
            }
        }
    }
    if !matches!(stmts.last(), Some(Stmt::Return { .. })) {
        let span = stmts.last().map(|s| s.span().clone());
        diags.push(Diagnostic::error(
            ErrorCode::ENoReturn,
            "block must end in `return`".to_string(),
            span,
        ));
    }
}

fn validate_block(
    stmts: &[Stmt],
    parent: &Scope,
    caps: &HashSet<String>,
    diags: &mut Vec<Diagnostic>,
) {
    validate_returns(stmts, diags);
    let scope = Scope::child(parent);
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, value, span } => {
                validate_expr(value, &scope, caps, diags);
                if !scope.declare_var(name.clone()) {
                    diags.push(Diagnostic::error(
                        ErrorCode::EDupBinding,
                        format!("`{name}` is already bound in this scope"),
                        Some(span.clone()),
                    ));
                }
            }
            Stmt::Expr {
                expr, arrow_target, ..
            } => {
                validate_expr(expr, &scope, caps, diags);
                if let Some(name) = arrow_target {
                    if !scope.declare_var(name.clone()) {
                        diags.push(Diagnostic::error(
                            ErrorCode::EDupBinding,
                            format!("`{name}` is already bound in this scope"),
                            Some(expr.span().clone()),
                        ));
                    }
                }
            }
            Stmt::FnDecl { name, params, body, .. } => {
                // Top-level functions are pre-declared onto `root` before
                // this walk starts (so they can call each other in any
                // order); a function nested inside a block only becomes
                // callable from the point of its own declaration onward.
                scope.declare_fn(name.clone());
                let fn_scope = Scope::child(&scope);
                for p in params {
                    fn_scope.declare_var(p.clone());
                }
                validate_block(body, &fn_scope, caps, diags);
            }
            Stmt::Return { value, .. } => {
                validate_expr(value, &scope, caps, diags);
            }
        }
    }
}

fn validate_expr(expr: &Expr, scope: &Scope, caps: &HashSet<String>, diags: &mut Vec<Diagnostic>) {
    match expr {
        Expr::Null(_) | Expr::Bool(_, _) | Expr::Number(_, _) | Expr::Str(_, _) => {}
        Expr::IdentPath { base, span, .. } => {
            if !scope.is_var_bound(base) {
                diags.push(Diagnostic::error(
                    ErrorCode::EUnbound,
                    format!("`{base}` is not defined"),
                    Some(span.clone()),
                ));
            }
        }
        Expr::List(items, _) => {
            for item in items {
                validate_expr(item, scope, caps, diags);
            }
        }
        Expr::Record(entries, _) => {
            for entry in entries {
                match entry {
                    RecordEntry::Pair(_, value) => validate_expr(value, scope, caps, diags),
                    RecordEntry::Spread(value) => validate_expr(value, scope, caps, diags),
                }
            }
        }
        Expr::Unary { op: UnaryOp::Neg, expr, .. } => validate_expr(expr, scope, caps, diags),
        Expr::Binary { lhs, rhs, .. } => {
            validate_expr(lhs, scope, caps, diags);
            validate_expr(rhs, scope, caps, diags);
        }
        Expr::IfBlock {
            cond,
            then_body,
            else_body,
            ..
        } => {
            validate_expr(cond, scope, caps, diags);
            validate_block(then_body, scope, caps, diags);
            if let Some(body) = else_body {
                validate_block(body, scope, caps, diags);
            }
        }
        Expr::IfRecord {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            validate_expr(cond, scope, caps, diags);
            validate_expr(then_branch, scope, caps, diags);
            validate_expr(else_branch, scope, caps, diags);
        }
        Expr::For {
            binding, iter, body, ..
        } => {
            validate_expr(iter, scope, caps, diags);
            let inner = Scope::child(scope);
            inner.declare_var(binding.clone());
            validate_block(body, &inner, caps, diags);
        }
        Expr::FilterBlock {
            binding, iter, body, ..
        } => {
            validate_expr(iter, scope, caps, diags);
            let inner = Scope::child(scope);
            inner.declare_var(binding.clone());
            validate_block(body, &inner, caps, diags);
        }
        Expr::Loop {
            init,
            times,
            binding,
            body,
            ..
        } => {
            if let Some(e) = init {
                validate_expr(e, scope, caps, diags);
            }
            if let Some(e) = times {
                validate_expr(e, scope, caps, diags);
            }
            // `loop { times: 0 }` may omit the trailing body block
            // altogether; an empty body then has nothing to validate.
            if !body.is_empty() {
                let inner = Scope::child(scope);
                if let Some(name) = binding {
                    inner.declare_var(name.clone());
                }
                validate_block(body, &inner, caps, diags);
            }
        }
        Expr::Match {
            scrutinee,
            ok_arm,
            err_arm,
            ..
        } => {
            validate_expr(scrutinee, scope, caps, diags);
            if let Some(arm) = ok_arm {
                let ok_scope = Scope::child(scope);
                ok_scope.declare_var(arm.binding.clone());
                validate_block(&arm.body, &ok_scope, caps, diags);
            }
            if let Some(arm) = err_arm {
                let err_scope = Scope::child(scope);
                err_scope.declare_var(arm.binding.clone());
                validate_block(&arm.body, &err_scope, caps, diags);
            }
        }
        Expr::Try {
            try_body,
            catch_binding,
            catch_body,
            ..
        } => {
            validate_block(try_body, scope, caps, diags);
            let inner = Scope::child(scope);
            inner.declare_var(catch_binding.clone());
            validate_block(catch_body, &inner, caps, diags);
        }
        Expr::Assert { that, msg, .. } | Expr::Check { that, msg, .. } => {
            validate_expr(that, scope, caps, diags);
            validate_expr(msg, scope, caps, diags);
        }
        Expr::ToolCall {
            mode, tool, args, span,
        } => {
            validate_expr(args, scope, caps, diags);
            match KNOWN_TOOLS.iter().find(|(name, _)| name == tool) {
                None => diags.push(Diagnostic::error(
                    ErrorCode::EUnknownTool,
                    format!("unknown tool `{tool}`"),
                    Some(span.clone()),
                )),
                Some((_, is_effect)) => {
                    if *is_effect && *mode == ToolCallMode::Read {
                        diags.push(Diagnostic::error(
                            ErrorCode::ECallEffect,
                            format!("`{tool}` has side effects and must be called with `do`, not `call?`"),
                            Some(span.clone()),
                        ));
                    }
                    if !caps.contains(tool.as_str()) {
                        diags.push(Diagnostic::error(
                            ErrorCode::EUndeclaredCap,
                            format!("`{tool}` requires an undeclared capability `cap {{ {tool}: true }}`"),
                            Some(span.clone()),
                        ));
                    }
                }
            }
        }
        Expr::FnCall { name, args, span } => {
            validate_expr(args, scope, caps, diags);
            if !STDLIB_NAMES.contains(&name.as_str()) && !scope.is_fn_bound(name) {
                let hint = if KNOWN_TOOLS.iter().any(|(t, _)| t == name) {
                    format!(" (did you mean `call? {name} {{ ... }}` or `do {name} {{ ... }}`?)")
                } else {
                    String::new()
                };
                diags.push(Diagnostic::error(
                    ErrorCode::EUnknownFn,
                    format!("unknown function `{name}`{hint}"),
                    Some(span.clone()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a0_syntax::parse_source;

    fn validate_src(src: &str) -> ValidatedProgram {
        let program = parse_source("main.a0", src).unwrap();
        validate(&program)
    }

    #[test]
    fn accepts_minimal_valid_program() {
        let v = validate_src("return 1");
        assert!(v.is_ok(), "{:?}", v.diagnostics);
    }

    #[test]
    fn flags_missing_return() {
        let v = validate_src("let x = 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::ENoReturn));
    }

    #[test]
    fn flags_unbound_name() {
        let v = validate_src("return y");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EUnbound));
    }

    #[test]
    fn flags_duplicate_binding() {
        let v = validate_src("let x = 1\nlet x = 2\nreturn x");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EDupBinding));
    }

    #[test]
    fn flags_unknown_capability() {
        let v = validate_src("cap { nope.nope: true }\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EUnknownCap));
    }

    #[test]
    fn flags_undeclared_capability_on_tool_call() {
        let v = validate_src("return call? fs.read { path: \"a\" }");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EUndeclaredCap));
    }

    #[test]
    fn flags_effect_tool_called_with_call_question() {
        let v = validate_src(
            "cap { fs.write: true }\nreturn call? fs.write { path: \"a\", content: \"b\" }",
        );
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::ECallEffect));
    }

    #[test]
    fn accepts_effect_tool_called_with_do() {
        let v = validate_src(
            "cap { fs.write: true }\nreturn do fs.write { path: \"a\", content: \"b\" }",
        );
        assert!(v.is_ok(), "{:?}", v.diagnostics);
    }

    #[test]
    fn flags_unknown_tool() {
        let v = validate_src("return call? ftp.get { path: \"a\" }");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EUnknownTool));
    }

    #[test]
    fn flags_unknown_function_with_tool_hint() {
        let v = validate_src("cap { fs.read: true }\nreturn fs.read { path: \"a\" }");
        let diag = v
            .diagnostics
            .iter()
            .find(|d| d.code == ErrorCode::EUnknownFn)
            .unwrap();
        assert!(diag.message.contains("call?"));
    }

    #[test]
    fn flags_duplicate_function_names() {
        let v = validate_src("fn f { x } { return x }\nfn f { x } { return x }\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EFnDup));
    }

    #[test]
    fn allows_forward_reference_to_later_function() {
        let v = validate_src(
            "fn a { x } { return b { x: x } }\nfn b { x } { return x }\nreturn a { x: 1 }",
        );
        assert!(v.is_ok(), "{:?}", v.diagnostics);
    }

    #[test]
    fn flags_duplicate_budget_header() {
        let v = validate_src("budget { timeMs: 100 }\nbudget { timeMs: 200 }\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EAst));
    }

    #[test]
    fn flags_unknown_budget_field() {
        let v = validate_src("budget { nope: 1 }\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EUnknownBudget));
    }

    #[test]
    fn flags_import_header() {
        let v = validate_src("import foo\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EImportUnsupported));
    }

    #[test]
    fn flags_return_not_last() {
        let v = validate_src("fn f { } { return 1\nreturn 2 }\nreturn 1");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::EReturnNotLast));
    }

    #[test]
    fn flags_missing_return_in_for_body() {
        let v = validate_src("let ys = for { in: [1], as: \"x\" } { let z = x }\nreturn ys");
        assert!(v.diagnostics.iter().any(|d| d.code == ErrorCode::ENoReturn));
    }

    #[test]
    fn accepts_match_with_single_arm() {
        let v = validate_src(
            "let s = { ok: 1 }\nlet out = match s { ok { v } { return v } }\nreturn out",
        );
        assert!(v.is_ok(), "{:?}", v.diagnostics);
    }
}
