//! Budget accounting across the four dimensions a program can declare a
//! limit for. Each dimension is independently optional: an undeclared
//! dimension is simply never checked.

use a0_diagnostics::{Diagnostic, ErrorCode};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetLimits {
    pub time_ms: Option<u64>,
    pub max_tool_calls: Option<u64>,
    pub max_bytes_written: Option<u64>,
    pub max_iterations: Option<u64>,
}

impl BudgetLimits {
    pub fn from_fields(fields: &std::collections::HashMap<String, f64>) -> Self {
        let get = |key: &str| fields.get(key).map(|v| v.max(0.0) as u64);
        BudgetLimits {
            time_ms: get("timeMs"),
            max_tool_calls: get("maxToolCalls"),
            max_bytes_written: get("maxBytesWritten"),
            max_iterations: get("maxIterations"),
        }
    }
}

/// Tracks consumption against [`BudgetLimits`] for a single run. `record_*`
/// methods check-then-increment: a call that would exceed the limit is
/// rejected and the counter is left unchanged.
pub struct BudgetAccountant {
    limits: BudgetLimits,
    start: Instant,
    tool_calls: u64,
    bytes_written: u64,
    iterations: u64,
}

impl BudgetAccountant {
    pub fn new(limits: BudgetLimits) -> Self {
        BudgetAccountant {
            limits,
            start: Instant::now(),
            tool_calls: 0,
            bytes_written: 0,
            iterations: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(BudgetLimits::default())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn tool_calls(&self) -> u64 {
        self.tool_calls
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Called at every statement/expression boundary in the evaluator so a
    /// long-running program without any tool calls or loops still gets
    /// stopped once its wall-clock budget runs out.
    pub fn check_time(&self) -> Result<(), Diagnostic> {
        if let Some(limit) = self.limits.time_ms {
            if self.elapsed_ms() > limit {
                return Err(exceeded("timeMs", limit, self.elapsed_ms()));
            }
        }
        Ok(())
    }

    pub fn record_tool_call(&mut self) -> Result<(), Diagnostic> {
        self.check_time()?;
        if let Some(limit) = self.limits.max_tool_calls {
            if self.tool_calls >= limit {
                return Err(exceeded("maxToolCalls", limit, self.tool_calls + 1));
            }
        }
        self.tool_calls += 1;
        Ok(())
    }

    pub fn record_bytes_written(&mut self, n: u64) -> Result<(), Diagnostic> {
        if let Some(limit) = self.limits.max_bytes_written {
            if self.bytes_written + n > limit {
                return Err(exceeded("maxBytesWritten", limit, self.bytes_written + n));
            }
        }
        self.bytes_written += n;
        Ok(())
    }

    /// Called once per iteration of `for`, `filter`, and `loop`.
    pub fn record_iteration(&mut self) -> Result<(), Diagnostic> {
        self.check_time()?;
        if let Some(limit) = self.limits.max_iterations {
            if self.iterations >= limit {
                return Err(exceeded("maxIterations", limit, self.iterations + 1));
            }
        }
        self.iterations += 1;
        Ok(())
    }
}

fn exceeded(dimension: &str, limit: u64, attempted: u64) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::EBudget,
        format!("budget `{dimension}` exceeded: limit {limit}, attempted {attempted}"),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_never_rejects() {
        let mut b = BudgetAccountant::unlimited();
        for _ in 0..1000 {
            b.record_tool_call().unwrap();
            b.record_iteration().unwrap();
        }
    }

    #[test]
    fn tool_call_limit_is_enforced() {
        let mut b = BudgetAccountant::new(BudgetLimits {
            max_tool_calls: Some(2),
            ..Default::default()
        });
        b.record_tool_call().unwrap();
        b.record_tool_call().unwrap();
        assert!(b.record_tool_call().is_err());
    }

    #[test]
    fn bytes_written_limit_rejects_before_incrementing() {
        let mut b = BudgetAccountant::new(BudgetLimits {
            max_bytes_written: Some(10),
            ..Default::default()
        });
        b.record_bytes_written(8).unwrap();
        assert!(b.record_bytes_written(5).is_err());
        assert_eq!(b.bytes_written(), 8);
    }

    #[test]
    fn iteration_limit_is_enforced() {
        let mut b = BudgetAccountant::new(BudgetLimits {
            max_iterations: Some(3),
            ..Default::default()
        });
        for _ in 0..3 {
            b.record_iteration().unwrap();
        }
        assert!(b.record_iteration().is_err());
    }

    #[test]
    fn from_fields_ignores_unknown_keys() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("maxToolCalls".to_string(), 5.0);
        let limits = BudgetLimits::from_fields(&fields);
        assert_eq!(limits.max_tool_calls, Some(5));
        assert_eq!(limits.time_ms, None);
    }
}
