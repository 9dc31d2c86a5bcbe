//! The tool plugin contract: the fixed set of things a program may reach
//! out to the host for, each either read-only (`call?`) or effectful
//! (`do`). A0 ships four built-in tools; a host embedding the interpreter
//! may register its own [`ToolExecutor`] implementations under the same
//! names to substitute mocks, sandboxed shims, or production backends.

use a0_core::Value;
use a0_diagnostics::Diagnostic;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Effect,
}

pub struct ToolSpec {
    pub name: &'static str,
    pub kind: ToolKind,
}

/// Implements one tool's behavior. `execute` receives the already-evaluated
/// argument record and returns either a success value or a tool-level
/// error, never a language-level panic.
pub trait ToolExecutor: Send + Sync {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic>;
}

pub struct ToolRegistry {
    tools: HashMap<&'static str, (ToolKind, Box<dyn ToolExecutor>)>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, kind: ToolKind, executor: Box<dyn ToolExecutor>) {
        self.tools.insert(name, (kind, executor));
    }

    pub fn kind_of(&self, name: &str) -> Option<ToolKind> {
        self.tools.get(name).map(|(kind, _)| *kind)
    }

    pub fn execute(&self, name: &str, args: &Value) -> Option<Result<Value, Diagnostic>> {
        self.tools.get(name).map(|(_, exec)| exec.execute(args))
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a0_diagnostics::ErrorCode;

    struct Echo;
    impl ToolExecutor for Echo {
        fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
            Ok(args.clone())
        }
    }

    struct AlwaysFails;
    impl ToolExecutor for AlwaysFails {
        fn execute(&self, _args: &Value) -> Result<Value, Diagnostic> {
            Err(Diagnostic::error(ErrorCode::ETool, "boom", None))
        }
    }

    #[test]
    fn registers_and_executes_a_tool() {
        let mut registry = ToolRegistry::new();
        registry.register("fs.read", ToolKind::Read, Box::new(Echo));
        let result = registry
            .execute("fs.read", &Value::Number(1.0))
            .unwrap()
            .unwrap();
        assert_eq!(result, Value::Number(1.0));
    }

    #[test]
    fn unknown_tool_yields_none() {
        let registry = ToolRegistry::new();
        assert!(registry.execute("nope", &Value::Null).is_none());
    }

    #[test]
    fn tool_error_propagates() {
        let mut registry = ToolRegistry::new();
        registry.register("sh.exec", ToolKind::Effect, Box::new(AlwaysFails));
        let err = registry.execute("sh.exec", &Value::Null).unwrap();
        assert!(err.is_err());
    }
}
