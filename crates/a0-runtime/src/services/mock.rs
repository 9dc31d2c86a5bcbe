//! A scripted [`ToolExecutor`] for tests: each call to `execute` consumes
//! the next queued response for that tool name, in order, so a test can
//! assert both what a program computed and exactly what it asked the host
//! to do along the way.

use crate::tools::ToolExecutor;
use a0_core::Value;
use a0_diagnostics::{Diagnostic, ErrorCode};
use std::sync::Mutex;

pub struct MockToolExecutor {
    responses: Mutex<Vec<Result<Value, Diagnostic>>>,
    calls: Mutex<Vec<Value>>,
}

impl MockToolExecutor {
    /// `responses` is consumed front-to-back as `execute` is called.
    pub fn new(responses: Vec<Result<Value, Diagnostic>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        MockToolExecutor {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolExecutor for MockToolExecutor {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
        self.calls.lock().unwrap().push(args.clone());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(Diagnostic::error(ErrorCode::ETool, "mock exhausted", None)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_responses_in_order_and_records_calls() {
        let mock = MockToolExecutor::new(vec![
            Ok(Value::Number(1.0)),
            Ok(Value::Number(2.0)),
        ]);
        assert_eq!(mock.execute(&Value::Null).unwrap(), Value::Number(1.0));
        assert_eq!(mock.execute(&Value::Null).unwrap(), Value::Number(2.0));
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn exhausted_mock_returns_tool_error() {
        let mock = MockToolExecutor::new(vec![]);
        assert!(mock.execute(&Value::Null).is_err());
    }
}
