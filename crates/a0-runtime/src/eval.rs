//! The tree-walking evaluator.
//!
//! Functions are values only in the sense that they can be called by name;
//! there is no anonymous-function literal in the grammar, so the
//! higher-order stdlib entries (`map`, `reduce`, `filter`, `find`, `sort`,
//! `pluck`) take the *name* of an already-declared function as a plain
//! string argument and look it up dynamically at call time.

use crate::budget::BudgetAccountant;
use crate::stdlib;
use crate::tools::ToolRegistry;
use crate::trace::{TraceEventKind, Tracer};
use a0_core::{Record, Value};
use a0_diagnostics::{Diagnostic, ErrorCode};
use a0_syntax::{BinaryOp, Expr, PathSegment, Program, RecordEntry, Stmt, ToolCallMode, UnaryOp};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const DEFAULT_LOOP_TIMES: f64 = 1.0;

struct FnDef {
    params: Vec<String>,
    body: Rc<[Stmt]>,
}

pub struct Env {
    vars: RefCell<HashMap<String, Value>>,
    fns: RefCell<HashMap<String, Rc<FnDef>>>,
    parent: Option<Rc<Env>>,
}

impl Env {
    fn root() -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(HashMap::new()),
            fns: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    fn child(parent: &Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(HashMap::new()),
            fns: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    fn bind_var(&self, name: String, value: Value) {
        self.vars.borrow_mut().insert(name, value);
    }

    fn get_var(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_var(name))
    }

    fn bind_fn(&self, name: String, def: FnDef) {
        self.fns.borrow_mut().insert(name, Rc::new(def));
    }

    fn get_fn(&self, name: &str) -> Option<Rc<FnDef>> {
        if let Some(f) = self.fns.borrow().get(name) {
            return Some(Rc::clone(f));
        }
        self.parent.as_ref().and_then(|p| p.get_fn(name))
    }
}

/// Owns everything a single run needs: the tool registry it was configured
/// with, budget accounting, the trace stream, and any non-fatal `check`
/// failures collected along the way.
pub struct Evaluator<'a> {
    tools: &'a ToolRegistry,
    budget: BudgetAccountant,
    tracer: Tracer,
    pub checks_failed: Vec<Diagnostic>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tools: &'a ToolRegistry, budget: BudgetAccountant, tracer: Tracer) -> Self {
        Evaluator {
            tools,
            budget,
            tracer,
            checks_failed: Vec::new(),
        }
    }

    pub fn into_tracer(self) -> Tracer {
        self.tracer
    }

    pub fn budget(&self) -> &BudgetAccountant {
        &self.budget
    }

    pub fn run_program(&mut self, program: &Program) -> Result<Value, Diagnostic> {
        self.tracer.emit(TraceEventKind::ProgramStart, None, Value::Null);
        let env = Env::root();
        let result = self.eval_block(&program.statements, &env);
        match &result {
            Ok(value) => self.tracer.emit(
                TraceEventKind::ProgramEnd,
                None,
                Value::record(vec![("result".to_string(), value.clone())]),
            ),
            Err(diag) => self.tracer.emit(
                TraceEventKind::Error,
                diag.span.clone(),
                Value::record(vec![
                    ("code".to_string(), Value::String(diag.code.as_str().to_string())),
                    ("message".to_string(), Value::String(diag.message.clone())),
                ]),
            ),
        }
        result
    }

    fn eval_block(&mut self, stmts: &[Stmt], parent: &Rc<Env>) -> Result<Value, Diagnostic> {
        let env = Env::child(parent);
        for stmt in stmts {
            self.budget.check_time()?;
            match stmt {
                Stmt::Let { name, value, .. } => {
                    let v = self.eval_expr(value, &env)?;
                    self.tracer.emit(
                        TraceEventKind::Let,
                        Some(stmt.span().clone()),
                        Value::record(vec![("name".to_string(), Value::String(name.clone()))]),
                    );
                    env.bind_var(name.clone(), v);
                }
                Stmt::Expr {
                    expr, arrow_target, ..
                } => {
                    let v = self.eval_expr(expr, &env)?;
                    if let Some(name) = arrow_target {
                        env.bind_var(name.clone(), v);
                    }
                }
                Stmt::FnDecl {
                    name, params, body, ..
                } => {
                    env.bind_fn(
                        name.clone(),
                        FnDef {
                            params: params.clone(),
                            body: Rc::from(body.clone()),
                        },
                    );
                }
                Stmt::Return { value, .. } => {
                    let v = self.eval_expr(value, &env)?;
                    self.tracer.emit(
                        TraceEventKind::Return,
                        Some(stmt.span().clone()),
                        Value::Null,
                    );
                    return Ok(v);
                }
            }
        }
        // Validation guarantees every reachable block ends in `return`; an
        // empty slice only happens for a function with no statements at all,
        // which validation also rejects. Null is the least surprising value
        // if that guarantee is ever violated by a caller that skips it.
        Ok(Value::Null)
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, Diagnostic> {
        match expr {
            Expr::Null(_) => Ok(Value::Null),
            Expr::Bool(b, _) => Ok(Value::Boolean(*b)),
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _) => Ok(Value::String(s.clone())),
            Expr::IdentPath { base, path, span } => {
                let root = env.get_var(base).ok_or_else(|| {
                    Diagnostic::error(ErrorCode::EUnbound, format!("`{base}` is not defined"), Some(span.clone()))
                })?;
                apply_path(&root, path, span)
            }
            Expr::List(items, _) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(item, env)?);
                }
                Ok(Value::List(out))
            }
            Expr::Record(entries, span) => {
                let mut record = Record::new();
                for entry in entries {
                    match entry {
                        RecordEntry::Pair(key, value) => {
                            record.insert(key.clone(), self.eval_expr(value, env)?);
                        }
                        RecordEntry::Spread(value) => {
                            let spread = self.eval_expr(value, env)?;
                            match spread {
                                Value::Record(fields) => {
                                    for (k, v) in fields {
                                        record.insert(k, v);
                                    }
                                }
                                other => {
                                    return Err(Diagnostic::error(
                                        ErrorCode::EType,
                                        format!("cannot spread a {} into a record", other.type_name()),
                                        Some(span.clone()),
                                    ))
                                }
                            }
                        }
                    }
                }
                Ok(Value::Record(record))
            }
            Expr::Unary { op: UnaryOp::Neg, expr, span } => {
                let v = self.eval_expr(expr, env)?;
                let n = v.as_number().ok_or_else(|| type_err(span, &v))?;
                Ok(Value::Number(-n))
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                eval_binary(*op, &l, &r, span)
            }
            Expr::IfBlock {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let cond_val = self.eval_expr(cond, env)?;
                self.tracer.emit(TraceEventKind::If, Some(expr.span().clone()), Value::Null);
                if cond_val.is_truthy() {
                    self.eval_block(then_body, env)
                } else if let Some(body) = else_body {
                    self.eval_block(body, env)
                } else {
                    Ok(Value::Null)
                }
            }
            Expr::IfRecord {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.tracer.emit(TraceEventKind::If, Some(expr.span().clone()), Value::Null);
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_expr(then_branch, env)
                } else {
                    self.eval_expr(else_branch, env)
                }
            }
            Expr::For {
                binding, iter, body, span,
            } => {
                let list = self.eval_list(iter, env, span)?;
                let mut out = Vec::with_capacity(list.len());
                for item in list {
                    self.budget.record_iteration()?;
                    let inner = Env::child(env);
                    inner.bind_var(binding.clone(), item);
                    out.push(self.eval_block(body, &inner)?);
                }
                Ok(Value::List(out))
            }
            Expr::FilterBlock {
                binding, iter, body, span,
            } => {
                self.tracer.emit(TraceEventKind::FilterEnter, Some(span.clone()), Value::Null);
                let list = self.eval_list(iter, env, span)?;
                let mut out = Vec::new();
                for item in list {
                    self.budget.record_iteration()?;
                    let inner = Env::child(env);
                    inner.bind_var(binding.clone(), item.clone());
                    if self.eval_block(body, &inner)?.is_truthy() {
                        out.push(item);
                    }
                }
                self.tracer.emit(TraceEventKind::FilterExit, Some(span.clone()), Value::Null);
                Ok(Value::List(out))
            }
            Expr::Loop {
                init, times, binding, body, span,
            } => {
                self.tracer.emit(TraceEventKind::LoopEnter, Some(span.clone()), Value::Null);
                let mut acc = match init {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Null,
                };
                let n = match times {
                    Some(e) => {
                        let v = self.eval_expr(e, env)?;
                        v.as_number().ok_or_else(|| type_err(span, &v))?
                    }
                    None => DEFAULT_LOOP_TIMES,
                };
                if n < 0.0 {
                    return Err(type_err(span, &Value::Number(n)));
                }
                let n = n as u64;
                if n > 0 && !body.is_empty() {
                    for _ in 0..n {
                        self.budget.record_iteration()?;
                        let inner = Env::child(env);
                        if let Some(name) = binding {
                            inner.bind_var(name.clone(), acc.clone());
                        }
                        acc = self.eval_block(body, &inner)?;
                    }
                }
                self.tracer.emit(TraceEventKind::LoopExit, Some(span.clone()), Value::Null);
                Ok(acc)
            }
            Expr::Match {
                scrutinee,
                ok_arm,
                err_arm,
                span,
            } => {
                let value = self.eval_expr(scrutinee, env)?;
                self.tracer.emit(TraceEventKind::Match, Some(span.clone()), Value::Null);
                let Value::Record(fields) = &value else {
                    return Err(Diagnostic::error(
                        ErrorCode::EMatchNotRecord,
                        "`match` requires an ok(..)/err(..) shaped record".to_string(),
                        Some(span.clone()),
                    ));
                };
                if let (Some(ok_value), Some(arm)) = (fields.get("ok"), ok_arm) {
                    let inner = Env::child(env);
                    inner.bind_var(arm.binding.clone(), ok_value.clone());
                    self.eval_block(&arm.body, &inner)
                } else if let (Some(err_value), Some(arm)) = (fields.get("err"), err_arm) {
                    let inner = Env::child(env);
                    inner.bind_var(arm.binding.clone(), err_value.clone());
                    self.eval_block(&arm.body, &inner)
                } else {
                    Err(Diagnostic::error(
                        ErrorCode::EMatchNoArm,
                        "matched record has neither a handled `ok` nor `err` arm".to_string(),
                        Some(span.clone()),
                    ))
                }
            }
            Expr::Try {
                try_body,
                catch_binding,
                catch_body,
                span,
            } => {
                self.tracer.emit(TraceEventKind::TryEnter, Some(span.clone()), Value::Null);
                let result = self.eval_block(try_body, env);
                self.tracer.emit(TraceEventKind::TryExit, Some(span.clone()), Value::Null);
                match result {
                    Ok(v) => Ok(v),
                    Err(diag) => {
                        let inner = Env::child(env);
                        inner.bind_var(
                            catch_binding.clone(),
                            Value::record(vec![
                                ("code".to_string(), Value::String(diag.code.as_str().to_string())),
                                ("message".to_string(), Value::String(diag.message)),
                            ]),
                        );
                        self.eval_block(catch_body, &inner)
                    }
                }
            }
            Expr::Assert { that, msg, span } => {
                let that_val = self.eval_expr(that, env)?;
                let msg_val = self.eval_expr(msg, env)?;
                self.tracer.emit(TraceEventKind::Assert, Some(span.clone()), Value::Boolean(that_val.is_truthy()));
                if !that_val.is_truthy() {
                    return Err(Diagnostic::error(
                        ErrorCode::EAssert,
                        render_message(&msg_val),
                        Some(span.clone()),
                    ));
                }
                Ok(Value::Boolean(true))
            }
            Expr::Check { that, msg, span } => {
                let that_val = self.eval_expr(that, env)?;
                let msg_val = self.eval_expr(msg, env)?;
                let passed = that_val.is_truthy();
                self.tracer.emit(TraceEventKind::Check, Some(span.clone()), Value::Boolean(passed));
                if !passed {
                    self.checks_failed.push(Diagnostic::error(
                        ErrorCode::EAssert,
                        render_message(&msg_val),
                        Some(span.clone()),
                    ));
                }
                Ok(Value::Boolean(passed))
            }
            Expr::ToolCall { mode, tool, args, span } => self.eval_tool_call(*mode, tool, args, span, env),
            Expr::FnCall { name, args, span } => self.eval_fn_call(name, args, span, env),
        }
    }

    fn eval_list(&mut self, expr: &Expr, env: &Rc<Env>, span: &a0_core::SourceSpan) -> Result<Vec<Value>, Diagnostic> {
        match self.eval_expr(expr, env)? {
            Value::List(items) => Ok(items),
            other => Err(Diagnostic::error(
                ErrorCode::EForNotList,
                format!("expected a list to iterate, found a {}", other.type_name()),
                Some(span.clone()),
            )),
        }
    }

    fn eval_tool_call(
        &mut self,
        mode: ToolCallMode,
        tool: &str,
        args: &Expr,
        span: &a0_core::SourceSpan,
        env: &Rc<Env>,
    ) -> Result<Value, Diagnostic> {
        let args_value = self.eval_expr(args, env)?;
        self.tracer.emit(
            TraceEventKind::ToolCall,
            Some(span.clone()),
            Value::record(vec![("tool".to_string(), Value::String(tool.to_string()))]),
        );
        self.budget.record_tool_call()?;
        let outcome = self
            .tools
            .execute(tool, &args_value)
            .unwrap_or_else(|| Err(Diagnostic::error(ErrorCode::EUnknownTool, format!("unknown tool `{tool}`"), Some(span.clone()))));

        if let Ok(value) = &outcome {
            if tool == "fs.write" {
                if let Some(bytes) = value.as_record().and_then(|r| r.get("bytesWritten")).and_then(Value::as_number) {
                    self.budget.record_bytes_written(bytes as u64)?;
                }
            }
        }

        self.tracer.emit(
            TraceEventKind::ToolResult,
            Some(span.clone()),
            Value::record(vec![
                ("tool".to_string(), Value::String(tool.to_string())),
                ("ok".to_string(), Value::Boolean(outcome.is_ok())),
            ]),
        );

        match mode {
            ToolCallMode::Read => Ok(match outcome {
                Ok(v) => Value::record(vec![("ok".to_string(), v)]),
                Err(diag) => Value::record(vec![(
                    "err".to_string(),
                    Value::record(vec![
                        ("code".to_string(), Value::String(diag.code.as_str().to_string())),
                        ("message".to_string(), Value::String(diag.message)),
                    ]),
                )]),
            }),
            ToolCallMode::Effect => outcome,
        }
    }

    fn eval_fn_call(
        &mut self,
        name: &str,
        args: &Expr,
        span: &a0_core::SourceSpan,
        env: &Rc<Env>,
    ) -> Result<Value, Diagnostic> {
        let record = match self.eval_expr(args, env)? {
            Value::Record(r) => r,
            _ => Record::new(),
        };

        if stdlib::HIGHER_ORDER_NAMES.contains(&name) {
            return self.eval_higher_order(name, &record, span, env);
        }
        if let Some(f) = stdlib::lookup(name) {
            return f(&record);
        }
        self.call_user_fn(name, record, span, env)
    }

    fn call_user_fn(
        &mut self,
        name: &str,
        args: Record,
        span: &a0_core::SourceSpan,
        env: &Rc<Env>,
    ) -> Result<Value, Diagnostic> {
        let def = env.get_fn(name).ok_or_else(|| unknown_fn(name, span))?;
        self.invoke_fn_def(name, &def, args, span, env)
    }

    fn invoke_fn_def(
        &mut self,
        name: &str,
        def: &Rc<FnDef>,
        args: Record,
        span: &a0_core::SourceSpan,
        env: &Rc<Env>,
    ) -> Result<Value, Diagnostic> {
        self.tracer.emit(
            TraceEventKind::FnCall,
            Some(span.clone()),
            Value::record(vec![("name".to_string(), Value::String(name.to_string()))]),
        );
        let call_env = Env::child(env);
        for param in &def.params {
            call_env.bind_var(param.clone(), args.get(param).cloned().unwrap_or(Value::Null));
        }
        let result = self.eval_block(&def.body, &call_env);
        self.tracer.emit(
            TraceEventKind::FnReturn,
            Some(span.clone()),
            Value::record(vec![("name".to_string(), Value::String(name.to_string()))]),
        );
        result
    }

    fn eval_higher_order(
        &mut self,
        name: &str,
        args: &Record,
        span: &a0_core::SourceSpan,
        env: &Rc<Env>,
    ) -> Result<Value, Diagnostic> {
        match name {
            "map" => {
                let list = required_list(args, "map", span)?.clone();
                let fn_name = required_fn_name(args, "map", span)?.to_string();
                let def = env.get_fn(&fn_name).ok_or_else(|| unknown_fn(&fn_name, span))?;
                let mut out = Vec::with_capacity(list.len());
                for item in list {
                    let call_args = element_args(&def.params, &item);
                    out.push(self.invoke_fn_def(&fn_name, &def, call_args, span, env)?);
                }
                Ok(Value::List(out))
            }
            "filter" => {
                let list = required_list(args, "filter", span)?.clone();
                if let Some(by) = args.get("by") {
                    let key = by.as_str().ok_or_else(|| type_err(span, by))?.to_string();
                    let out = list
                        .into_iter()
                        .filter(|item| match item {
                            Value::Record(fields) => fields.get(&key).map(Value::is_truthy).unwrap_or(false),
                            _ => false,
                        })
                        .collect();
                    Ok(Value::List(out))
                } else {
                    let fn_name = required_fn_name(args, "filter", span)?.to_string();
                    let def = env.get_fn(&fn_name).ok_or_else(|| unknown_fn(&fn_name, span))?;
                    let mut out = Vec::new();
                    for item in list {
                        let call_args = element_args(&def.params, &item);
                        let result = self.invoke_fn_def(&fn_name, &def, call_args, span, env)?;
                        let truthy = match &result {
                            Value::Record(fields) => fields.values().next().map(Value::is_truthy).unwrap_or(false),
                            other => other.is_truthy(),
                        };
                        if truthy {
                            out.push(item);
                        }
                    }
                    Ok(Value::List(out))
                }
            }
            "find" => {
                let list = required_list(args, "find", span)?.clone();
                let fn_name = required_fn_name(args, "find", span)?.to_string();
                let def = env.get_fn(&fn_name).ok_or_else(|| unknown_fn(&fn_name, span))?;
                for item in list {
                    let call_args = element_args(&def.params, &item);
                    if self.invoke_fn_def(&fn_name, &def, call_args, span, env)?.is_truthy() {
                        return Ok(item);
                    }
                }
                Ok(Value::Null)
            }
            "reduce" => {
                let list = required_list(args, "reduce", span)?.clone();
                let fn_name = required_fn_name(args, "reduce", span)?.to_string();
                let def = env.get_fn(&fn_name).ok_or_else(|| unknown_fn(&fn_name, span))?;
                let mut acc = args.get("init").cloned().unwrap_or(Value::Null);
                self.tracer.emit(TraceEventKind::ReduceEnter, Some(span.clone()), Value::Null);
                for item in list {
                    let mut call_args = Record::new();
                    if let Some(p0) = def.params.first() {
                        call_args.insert(p0.clone(), acc.clone());
                    }
                    if let Some(p1) = def.params.get(1) {
                        call_args.insert(p1.clone(), item.clone());
                    }
                    acc = self.invoke_fn_def(&fn_name, &def, call_args, span, env)?;
                }
                self.tracer.emit(TraceEventKind::ReduceExit, Some(span.clone()), Value::Null);
                Ok(acc)
            }
            "sort" => {
                let list = required_list(args, "sort", span)?.clone();
                let mut list = list;
                if let Some(fn_val) = args.get("fn") {
                    let fn_name = fn_val.as_str().ok_or_else(|| type_err(span, fn_val))?.to_string();
                    let def = env.get_fn(&fn_name).ok_or_else(|| unknown_fn(&fn_name, span))?;
                    let mut err = None;
                    list.sort_by(|a, b| {
                        if err.is_some() {
                            return std::cmp::Ordering::Equal;
                        }
                        let mut call_args = Record::new();
                        if let Some(p0) = def.params.first() {
                            call_args.insert(p0.clone(), a.clone());
                        }
                        if let Some(p1) = def.params.get(1) {
                            call_args.insert(p1.clone(), b.clone());
                        }
                        match self.invoke_fn_def(&fn_name, &def, call_args, span, env) {
                            Ok(v) => v
                                .as_number()
                                .and_then(|n| n.partial_cmp(&0.0))
                                .unwrap_or(std::cmp::Ordering::Equal),
                            Err(e) => {
                                err = Some(e);
                                std::cmp::Ordering::Equal
                            }
                        }
                    });
                    if let Some(e) = err {
                        return Err(e);
                    }
                } else {
                    list.sort_by(|a, b| compare_default(a, b));
                }
                Ok(Value::List(list))
            }
            "pluck" => {
                let list = required_list(args, "pluck", span)?.clone();
                let field_val = required_field(args, "pluck", "field", span)?;
                let field = field_val.as_str().ok_or_else(|| type_err(span, field_val))?;
                Ok(Value::List(
                    list.iter()
                        .map(|item| crate::json_ops::get(item, field).unwrap_or(Value::Null))
                        .collect(),
                ))
            }
            other => unreachable!("{other} is not a registered higher-order stdlib name"),
        }
    }
}

/// Builds the argument record for a single list element passed to a user
/// `fn` inside `map`/`filter`/`find`: a single-param function receives the
/// element under its one name; a multi-param function destructures a record
/// element's matching fields, or binds a non-record element to the first
/// param with the rest defaulting to `null`.
fn element_args(params: &[String], element: &Value) -> Record {
    let mut out = Record::new();
    if params.len() <= 1 {
        if let Some(p) = params.first() {
            out.insert(p.clone(), element.clone());
        }
        return out;
    }
    match element {
        Value::Record(fields) => {
            for p in params {
                out.insert(p.clone(), fields.get(p).cloned().unwrap_or(Value::Null));
            }
        }
        other => {
            for (i, p) in params.iter().enumerate() {
                out.insert(p.clone(), if i == 0 { other.clone() } else { Value::Null });
            }
        }
    }
    out
}

fn required_field<'a>(args: &'a Record, name: &str, key: &str, span: &a0_core::SourceSpan) -> Result<&'a Value, Diagnostic> {
    args.get(key).ok_or_else(|| {
        Diagnostic::error(ErrorCode::EToolArgs, format!("`{name}` requires a `{key}` field"), Some(span.clone()))
    })
}

fn required_list<'a>(args: &'a Record, name: &str, span: &a0_core::SourceSpan) -> Result<&'a Vec<Value>, Diagnostic> {
    match required_field(args, name, "list", span)? {
        Value::List(list) => Ok(list),
        other => Err(type_err(span, other)),
    }
}

fn required_fn_name<'a>(args: &'a Record, name: &str, span: &a0_core::SourceSpan) -> Result<&'a str, Diagnostic> {
    let v = required_field(args, name, "fn", span)?;
    v.as_str().ok_or_else(|| type_err(span, v))
}

fn unknown_fn(name: &str, span: &a0_core::SourceSpan) -> Diagnostic {
    Diagnostic::error(ErrorCode::EUnknownFn, format!("unknown function `{name}`"), Some(span.clone()))
}

fn compare_default(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    }
}

fn type_err(span: &a0_core::SourceSpan, value: &Value) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::EType,
        format!("unexpected {} here", value.type_name()),
        Some(span.clone()),
    )
}

fn render_message(value: &Value) -> String {
    value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string())
}

fn apply_path(root: &Value, path: &[PathSegment], span: &a0_core::SourceSpan) -> Result<Value, Diagnostic> {
    let mut current = root.clone();
    for segment in path {
        current = match (segment, &current) {
            (PathSegment::Field(name), Value::Record(record)) => record
                .get(name)
                .cloned()
                .ok_or_else(|| Diagnostic::error(ErrorCode::EPath, format!("no field `{name}`"), Some(span.clone())))?,
            (PathSegment::Index(i), Value::List(items)) => {
                let idx = if *i < 0 { None } else { usize::try_from(*i).ok() };
                idx.and_then(|i| items.get(i))
                    .cloned()
                    .ok_or_else(|| Diagnostic::error(ErrorCode::EPath, format!("index {i} out of bounds"), Some(span.clone())))?
            }
            (_, other) => {
                return Err(Diagnostic::error(
                    ErrorCode::EPath,
                    format!("cannot index into a {}", other.type_name()),
                    Some(span.clone()),
                ))
            }
        };
    }
    Ok(current)
}

fn eval_binary(op: BinaryOp, l: &Value, r: &Value, span: &a0_core::SourceSpan) -> Result<Value, Diagnostic> {
    use BinaryOp::*;
    if matches!(op, Eq) {
        return Ok(Value::Boolean(l == r));
    }
    if matches!(op, NotEq) {
        return Ok(Value::Boolean(l != r));
    }
    match op {
        Add | Sub | Mul | Div | Mod | Lt | LtEq | Gt | GtEq => {
            let a = l.as_number().ok_or_else(|| type_err(span, l))?;
            let b = r.as_number().ok_or_else(|| type_err(span, r))?;
            Ok(match op {
                Add => Value::Number(a + b),
                Sub => Value::Number(a - b),
                Mul => Value::Number(a * b),
                Div => {
                    if b == 0.0 {
                        return Err(Diagnostic::error(ErrorCode::EType, "division by zero".to_string(), Some(span.clone())));
                    }
                    Value::Number(a / b)
                }
                Mod => Value::Number(a % b),
                Lt => Value::Boolean(a < b),
                LtEq => Value::Boolean(a <= b),
                Gt => Value::Boolean(a > b),
                GtEq => Value::Boolean(a >= b),
                _ => unreachable!(),
            })
        }
        Eq | NotEq => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use a0_syntax::parse_source;

    fn run(src: &str) -> Result<Value, Diagnostic> {
        let program = parse_source("main.a0", src).unwrap();
        let tools = ToolRegistry::new();
        let mut eval = Evaluator::new(&tools, BudgetAccountant::unlimited(), Tracer::null());
        eval.run_program(&program)
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run("return 1 + 2 * 3").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn let_binding_and_arrow_target_are_visible_later() {
        let v = run("let x = 10\nreturn x + 1").unwrap();
        assert_eq!(v, Value::Number(11.0));
    }

    #[test]
    fn if_block_picks_branch() {
        assert_eq!(run("return if (true) { return 1 } else { return 2 }").unwrap(), Value::Number(1.0));
        assert_eq!(run("return if (false) { return 1 } else { return 2 }").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn if_record_picks_branch() {
        let v = run("return if { cond: true, then: 1, else: 2 }").unwrap();
        assert_eq!(v, Value::Number(1.0));
    }

    #[test]
    fn for_collects_mapped_values() {
        let v = run("return for { in: [1, 2, 3], as: \"x\" } { return x * 2 }").unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(6.0)])
        );
    }

    #[test]
    fn filter_keeps_truthy_elements() {
        let v = run("return filter { in: [1, 2, 3, 4], as: \"x\" } { return x > 2 }").unwrap();
        assert_eq!(v, Value::List(vec![Value::Number(3.0), Value::Number(4.0)]));
    }

    #[test]
    fn loop_zero_times_returns_init_unchanged() {
        let v = run("return loop { in: 5, times: 0, as: \"acc\" } { return acc + 1 }").unwrap();
        assert_eq!(v, Value::Number(5.0));
    }

    #[test]
    fn loop_accumulates_across_iterations() {
        let v = run("return loop { in: 0, times: 3, as: \"acc\" } { return acc + 1 }").unwrap();
        assert_eq!(v, Value::Number(3.0));
    }

    #[test]
    fn user_function_call_round_trips() {
        let v = run("fn double { x } { return x * 2 }\nreturn double { x: 21 }").unwrap();
        assert_eq!(v, Value::Number(42.0));
    }

    #[test]
    fn assert_false_throws_and_halts() {
        let err = run("assert { that: false, msg: \"nope\" }\nreturn 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::EAssert);
    }

    #[test]
    fn try_catch_recovers_from_thrown_error() {
        let v = run("return try { assert { that: false, msg: \"boom\" } } catch { e } { return e.message }").unwrap();
        assert_eq!(v, Value::String("boom".to_string()));
    }

    #[test]
    fn match_dispatches_on_ok_and_err() {
        let v = run(
            "let s = { ok: 5 }\nreturn match (s) { ok { v } { return v + 1 } err { e } { return 0 } }",
        )
        .unwrap();
        assert_eq!(v, Value::Number(6.0));
        let v = run(
            "let s = { err: \"x\" }\nreturn match (s) { ok { v } { return v } err { e } { return e } }",
        )
        .unwrap();
        assert_eq!(v, Value::String("x".to_string()));
    }

    #[test]
    fn map_destructures_record_elements_by_param_name() {
        let v = run(
            "fn area { w, h } { return w * h }\nreturn map { list: [{w: 2, h: 3}, {w: 4, h: 5}], fn: \"area\" }",
        )
        .unwrap();
        assert_eq!(v, Value::List(vec![Value::Number(6.0), Value::Number(20.0)]));
    }

    #[test]
    fn reduce_binds_params_positionally() {
        let v = run(
            "fn add { acc, item } { return acc + item }\nreturn reduce { list: [1, 2, 3], fn: \"add\", init: 0 }",
        )
        .unwrap();
        assert_eq!(v, Value::Number(6.0));
    }

    #[test]
    fn filter_by_key_keeps_truthy_field() {
        let v = run("return filter { list: [{ok: true, v: 1}, {ok: false, v: 2}], by: \"ok\" }").unwrap();
        let Value::List(items) = v else { panic!() };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn record_spread_merges_fields() {
        let v = run("let base = {a: 1}\nreturn {...base, b: 2}").unwrap();
        let Value::Record(r) = v else { panic!() };
        assert_eq!(r.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(r.get("b"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn ident_path_navigates_nested_structures() {
        let v = run("let r = {a: [1, {b: 2}]}\nreturn r.a[1].b").unwrap();
        assert_eq!(v, Value::Number(2.0));
    }
}
