//! Budget accounting, tracing, tool/stdlib plugin contracts, and the
//! tree-walking evaluator for A0.

pub mod budget;
pub mod eval;
pub mod json_ops;
pub mod run;
pub mod services;
pub mod stdlib;
pub mod tools;
pub mod trace;

pub use budget::{BudgetAccountant, BudgetLimits};
pub use eval::Evaluator;
pub use run::{run_source, RunOutcome};
pub use tools::{ToolExecutor, ToolKind, ToolRegistry, ToolSpec};
pub use trace::{InMemorySink, JsonlSink, NullSink, TraceEvent, TraceEventKind, Tracer};

/// Builds the default [`ToolRegistry`] backed by the real host
/// filesystem/network/process, as opposed to [`services::mock`]'s scripted
/// fixtures. CLI hosts use this; test suites build their own registry
/// around [`services::mock::MockToolExecutor`] instead.
pub fn default_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register("fs.read", ToolKind::Read, Box::new(services::stdio_tools::FsReadTool));
    registry.register("fs.write", ToolKind::Effect, Box::new(services::stdio_tools::FsWriteTool));
    registry.register("http.get", ToolKind::Read, Box::new(services::stdio_tools::HttpGetTool));
    registry.register("sh.exec", ToolKind::Effect, Box::new(services::stdio_tools::ShExecTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_four_builtin_tools() {
        let registry = default_tool_registry();
        assert_eq!(registry.kind_of("fs.read"), Some(ToolKind::Read));
        assert_eq!(registry.kind_of("fs.write"), Some(ToolKind::Effect));
        assert_eq!(registry.kind_of("http.get"), Some(ToolKind::Read));
        assert_eq!(registry.kind_of("sh.exec"), Some(ToolKind::Effect));
    }
}
