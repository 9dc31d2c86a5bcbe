//! Top-level orchestration: validate, enforce policy, then evaluate.
//!
//! This is the one function a host actually calls. Everything upstream of
//! it (lexing, parsing, validation, policy) is pure and side-effect free;
//! everything downstream (the evaluator) is where a program's declared
//! capabilities actually get used.

use crate::budget::BudgetLimits;
use crate::eval::Evaluator;
use crate::tools::ToolRegistry;
use crate::trace::Tracer;
use a0_core::Value;
use a0_diagnostics::{Diagnostic, ErrorCode, RunError};
use a0_policy::Policy;
use a0_syntax::SyntaxError;
use a0_validate::validate;

#[derive(Debug)]
pub enum RunOutcome {
    Success {
        value: Value,
    },
    /// The program produced a value, but one or more `check` calls failed
    /// along the way: the host still sees the value, but the run's exit
    /// code is the evidence-failure code, not success.
    SuccessWithFailedChecks {
        value: Value,
        checks_failed: Vec<RunError>,
    },
    Failure(RunError),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success { .. } => 0,
            RunOutcome::SuccessWithFailedChecks { .. } => ErrorCode::EAssert.exit_code(),
            RunOutcome::Failure(err) => err.code.exit_code(),
        }
    }
}

pub fn run_source(
    file: &str,
    source: &str,
    tools: &ToolRegistry,
    policy: &Policy,
    tracer: Tracer,
) -> (RunOutcome, Tracer) {
    let program = match a0_syntax::parse_source(file, source) {
        Ok(p) => p,
        Err(e) => {
            let code = match &e {
                SyntaxError::Lex(_) => ErrorCode::ELex,
                SyntaxError::Parse(_) => ErrorCode::EParse,
            };
            return (
                RunOutcome::Failure(RunError {
                    code,
                    message: e.to_string(),
                    span: Some(e.span()),
                }),
                tracer,
            );
        }
    };

    let validated = validate(&program);
    if !validated.is_ok() {
        let first = validated
            .diagnostics
            .iter()
            .find(|d| d.severity == a0_diagnostics::Severity::Error)
            .expect("is_ok() is false, so an error diagnostic exists");
        return (RunOutcome::Failure(RunError::from(first)), tracer);
    }

    let denied = policy.enforce(&validated.declared_caps);
    if let Some(first) = denied.first() {
        return (RunOutcome::Failure(RunError::from(first)), tracer);
    }

    let limits = BudgetLimits::from_fields(&validated.budget_fields);
    let budget = crate::budget::BudgetAccountant::new(limits);
    let mut evaluator = Evaluator::new(tools, budget, tracer);
    let result = evaluator.run_program(&program);
    let checks_failed: Vec<RunError> = evaluator.checks_failed.iter().map(RunError::from).collect();
    let tracer = evaluator.into_tracer();

    let outcome = match result {
        Ok(value) if checks_failed.is_empty() => RunOutcome::Success { value },
        Ok(value) => RunOutcome::SuccessWithFailedChecks { value, checks_failed },
        Err(diag) => RunOutcome::Failure(RunError::from(&diag)),
    };
    (outcome, tracer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::InMemorySink;

    #[test]
    fn successful_run_reports_exit_zero() {
        let tools = ToolRegistry::new();
        let policy = Policy::empty();
        let tracer = Tracer::new(Box::new(InMemorySink::default()));
        let (outcome, _) = run_source("main.a0", "return 1 + 1", &tools, &policy, tracer);
        assert_eq!(outcome.exit_code(), 0);
        assert!(matches!(outcome, RunOutcome::Success { value } if value == Value::Number(2.0)));
    }

    #[test]
    fn parse_error_maps_to_exit_two() {
        let tools = ToolRegistry::new();
        let policy = Policy::empty();
        let (outcome, _) = run_source("main.a0", "let x = ", &tools, &policy, Tracer::null());
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn undeclared_capability_maps_to_exit_three() {
        let tools = ToolRegistry::new();
        let policy = Policy::empty();
        let src = "cap { fs.read: true }\nreturn call? fs.read { path: \"x\" }";
        let (outcome, _) = run_source("main.a0", src, &tools, &policy, Tracer::null());
        assert_eq!(outcome.exit_code(), 3);
    }

    #[test]
    fn failed_check_maps_to_exit_five_but_keeps_the_value() {
        let tools = ToolRegistry::new();
        let policy = Policy::empty();
        let src = "check { that: false, msg: \"should have held\" }\nreturn 42";
        let (outcome, _) = run_source("main.a0", src, &tools, &policy, Tracer::null());
        assert_eq!(outcome.exit_code(), 5);
        assert!(matches!(
            outcome,
            RunOutcome::SuccessWithFailedChecks { value, .. } if value == Value::Number(42.0)
        ));
    }
}
