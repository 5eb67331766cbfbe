//! Ragline Tools - capability registry with timeout-isolated invocation
//!
//! Each tool is a self-contained file in src/tools/. To add a tool:
//! create the file, implement the Tool trait, register it in
//! create_default_registry().

pub mod registry;
pub mod tools;

pub use registry::{Tool, ToolRegistry, ToolResult};

/// Create the default registry with all builtin tools.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::calculator::CalculatorTool::new());
    registry
}
