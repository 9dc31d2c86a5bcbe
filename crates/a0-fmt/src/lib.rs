//! The canonical A0 source formatter.
//!
//! `format(parse(format(parse(src)))) == format(parse(src))` for any
//! syntactically valid `src`: formatting only ever depends on the AST, never
//! on the original source text, so running it twice is a no-op.

use a0_syntax::{BinaryOp, Expr, Header, PathSegment, Program, RecordEntry, Stmt, ToolCallMode, UnaryOp};

pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for header in &program.headers {
        out.push_str(&format_header(header));
        out.push('\n');
    }
    if !program.headers.is_empty() {
        out.push('\n');
    }
    for (i, stmt) in program.statements.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        format_stmt(stmt, 0, &mut out);
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn format_header(header: &Header) -> String {
    match header {
        Header::CapDecl { keys, .. } => {
            let body = keys.iter().map(|k| format!("{k}: true")).collect::<Vec<_>>().join(", ");
            format!("cap {{ {body} }}")
        }
        Header::BudgetDecl { fields, .. } => {
            let body = fields
                .iter()
                .map(|(name, value)| format!("{name}: {}", format_number(*value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("budget {{ {body} }}")
        }
        Header::ImportDecl { name, .. } => format!("import {name}"),
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

fn format_block(stmts: &[Stmt], level: usize) -> String {
    let mut out = String::new();
    out.push_str("{\n");
    for stmt in stmts {
        format_stmt(stmt, level + 1, &mut out);
    }
    out.push_str(&indent(level));
    out.push('}');
    out
}

fn format_stmt(stmt: &Stmt, level: usize, out: &mut String) {
    out.push_str(&indent(level));
    match stmt {
        Stmt::Let { name, value, .. } => {
            out.push_str(&format!("let {name} = {}\n", format_expr(value, 0, level)));
        }
        Stmt::Expr { expr, arrow_target, .. } => {
            out.push_str(&format_expr(expr, 0, level));
            if let Some(target) = arrow_target {
                out.push_str(&format!(" -> {target}"));
            }
            out.push('\n');
        }
        Stmt::FnDecl { name, params, body, .. } => {
            out.push_str(&format!("fn {name} {{ {} }} {}\n", params.join(", "), format_block(body, level)));
        }
        Stmt::Return { value, .. } => {
            out.push_str(&format!("return {}\n", format_expr(value, 0, level)));
        }
    }
}

/// Precedence tiers, lowest to highest; used to decide when a nested
/// `Binary`/`Unary` needs parentheses to round-trip unambiguously.
fn precedence(op: BinaryOp) -> u8 {
    use BinaryOp::*;
    match op {
        Eq | NotEq | Lt | LtEq | Gt | GtEq => 0,
        Add | Sub => 1,
        Mul | Div | Mod => 2,
    }
}

fn format_expr(expr: &Expr, min_prec: u8, level: usize) -> String {
    match expr {
        Expr::Null(_) => "null".to_string(),
        Expr::Bool(b, _) => b.to_string(),
        Expr::Number(n, _) => format_number(*n),
        Expr::Str(s, _) => format_string(s),
        Expr::IdentPath { base, path, .. } => {
            let mut out = base.clone();
            for seg in path {
                match seg {
                    PathSegment::Field(f) => out.push_str(&format!(".{f}")),
                    PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
                }
            }
            out
        }
        Expr::List(items, _) => {
            format!(
                "[{}]",
                items.iter().map(|e| format_expr(e, 0, level)).collect::<Vec<_>>().join(", ")
            )
        }
        Expr::Record(entries, _) => {
            let body = entries
                .iter()
                .map(|entry| match entry {
                    RecordEntry::Pair(key, value) => format!("{key}: {}", format_expr(value, 0, level)),
                    RecordEntry::Spread(value) => format!("...{}", format_expr(value, 0, level)),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
        Expr::Unary { op: UnaryOp::Neg, expr, .. } => format!("-{}", format_expr(expr, 3, level)),
        Expr::Binary { op, lhs, rhs, .. } => {
            let prec = precedence(*op);
            let text = format!(
                "{} {} {}",
                format_expr(lhs, prec, level),
                binary_op_str(*op),
                format_expr(rhs, prec + 1, level)
            );
            if prec < min_prec {
                format!("({text})")
            } else {
                text
            }
        }
        Expr::IfBlock { cond, then_body, else_body, .. } => {
            let mut out = format!("if ({}) {}", format_expr(cond, 0, level), format_block(then_body, level));
            if let Some(body) = else_body {
                out.push_str(&format!(" else {}", format_block(body, level)));
            }
            out
        }
        Expr::IfRecord { cond, then_branch, else_branch, .. } => format!(
            "if {{ cond: {}, then: {}, else: {} }}",
            format_expr(cond, 0, level),
            format_expr(then_branch, 0, level),
            format_expr(else_branch, 0, level)
        ),
        Expr::For { binding, iter, body, .. } => format!(
            "for {{ in: {}, as: {} }} {}",
            format_expr(iter, 0, level),
            format_string(binding),
            format_block(body, level)
        ),
        Expr::FilterBlock { binding, iter, body, .. } => format!(
            "filter {{ in: {}, as: {} }} {}",
            format_expr(iter, 0, level),
            format_string(binding),
            format_block(body, level)
        ),
        Expr::Loop { init, times, binding, body, .. } => {
            let mut header = Vec::new();
            if let Some(e) = init {
                header.push(format!("in: {}", format_expr(e, 0, level)));
            }
            if let Some(e) = times {
                header.push(format!("times: {}", format_expr(e, 0, level)));
            }
            if let Some(name) = binding {
                header.push(format!("as: {}", format_string(name)));
            }
            if body.is_empty() {
                format!("loop {{ {} }}", header.join(", "))
            } else {
                format!("loop {{ {} }} {}", header.join(", "), format_block(body, level))
            }
        }
        Expr::Match { scrutinee, ok_arm, err_arm, .. } => {
            let mut out = format!("match ({}) {{ ", format_expr(scrutinee, 0, level));
            if let Some(arm) = ok_arm {
                out.push_str(&format!("ok {{ {} }} {} ", arm.binding, format_block(&arm.body, level)));
            }
            if let Some(arm) = err_arm {
                out.push_str(&format!("err {{ {} }} {} ", arm.binding, format_block(&arm.body, level)));
            }
            out.push('}');
            out
        }
        Expr::Try { try_body, catch_binding, catch_body, .. } => format!(
            "try {} catch {{ {catch_binding} }} {}",
            format_block(try_body, level),
            format_block(catch_body, level)
        ),
        Expr::Assert { that, msg, .. } => {
            format!("assert {{ that: {}, msg: {} }}", format_expr(that, 0, level), format_expr(msg, 0, level))
        }
        Expr::Check { that, msg, .. } => {
            format!("check {{ that: {}, msg: {} }}", format_expr(that, 0, level), format_expr(msg, 0, level))
        }
        Expr::ToolCall { mode, tool, args, .. } => {
            let keyword = match mode {
                ToolCallMode::Read => "call?",
                ToolCallMode::Effect => "do",
            };
            format!("{keyword} {tool} {}", format_expr(args, 0, level))
        }
        Expr::FnCall { name, args, .. } => {
            format!("{name} {}", format_expr(args, 0, level))
        }
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        Eq => "==",
        NotEq => "!=",
        Lt => "<",
        LtEq => "<=",
        Gt => ">",
        GtEq => ">=",
    }
}

/// Literal numbers in source are always finite (the lexer has no NaN/Inf
/// syntax), so this just defers to `f64`'s own `Display`.
fn format_number(n: f64) -> String {
    format!("{n}")
}

fn format_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use a0_syntax::parse_source;

    fn roundtrip(src: &str) -> String {
        let program = parse_source("main.a0", src).unwrap();
        format_program(&program)
    }

    #[test]
    fn formatting_is_idempotent() {
        let src = "cap { fs.read: true }\nlet x = 1 + 2 * 3\nreturn x";
        let once = roundtrip(src);
        let program_again = parse_source("main.a0", &once).unwrap();
        let twice = format_program(&program_again);
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_required_parens_around_lower_precedence_subexpr() {
        let src = "return (1 + 2) * 3";
        let formatted = roundtrip(src);
        assert!(formatted.contains("(1 + 2) * 3"));
    }

    #[test]
    fn formats_headers_before_statements() {
        let formatted = roundtrip("cap { fs.read: true }\nreturn 1");
        assert!(formatted.starts_with("cap { fs.read: true }\n\n"));
    }

    #[test]
    fn formats_fn_decl_with_braced_params_and_body() {
        let formatted = roundtrip("fn double { x } { return x * 2 }\nreturn double { x: 1 }");
        assert!(formatted.contains("fn double { x } {\n  return x * 2\n}\n"));
    }

    #[test]
    fn formats_fn_call_as_juxtaposed_record() {
        let formatted = roundtrip("fn double { x } { return x * 2 }\nreturn double { x: 1 }");
        assert!(formatted.contains("double { x: 1 }"));
    }
}
