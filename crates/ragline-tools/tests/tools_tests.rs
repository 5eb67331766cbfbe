//! Registry invocation tests: lookup, timeout isolation, panic containment.

use ragline_core::Error;
use ragline_tools::{create_default_registry, Tool, ToolRegistry, ToolResult};
use serde_json::{json, Value};
use std::time::Duration;

struct SleepyTool;

#[async_trait::async_trait]
impl Tool for SleepyTool {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn description(&self) -> &str {
        "Sleeps forever"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> ToolResult {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        ToolResult::text("never happens")
    }
}

struct PanickyTool;

#[async_trait::async_trait]
impl Tool for PanickyTool {
    fn name(&self) -> &str {
        "panicky"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> ToolResult {
        panic!("boom");
    }
}

#[tokio::test]
async fn calculator_via_registry() {
    let registry = create_default_registry();
    let outcome = registry
        .invoke(
            "calculator",
            "call_1",
            json!({"expression": "2 + 3 * 4"}),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(outcome.call_id, "call_1");
    assert_eq!(outcome.content, "14");
    assert!(!outcome.is_error);
}

#[tokio::test]
async fn calculator_error_is_flagged_not_fatal() {
    let registry = create_default_registry();
    let outcome = registry
        .invoke(
            "calculator",
            "call_2",
            json!({"expression": "1 / 0"}),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert!(outcome.is_error);
    assert!(outcome.content.contains("Division by zero"));
}

#[tokio::test]
async fn unknown_tool_is_an_error() {
    let registry = create_default_registry();
    let err = registry
        .invoke("no_such_tool", "call_3", json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownTool(ref name) if name == "no_such_tool"));
}

#[tokio::test(start_paused = true)]
async fn slow_tool_times_out() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepyTool);

    let err = registry
        .invoke("sleepy", "call_4", json!({}), Duration::from_millis(100))
        .await
        .unwrap_err();

    match err {
        Error::ToolTimeout { name, timeout_ms } => {
            assert_eq!(name, "sleepy");
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected ToolTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn panicking_tool_is_contained() {
    let mut registry = ToolRegistry::new();
    registry.register(PanickyTool);

    let err = registry
        .invoke("panicky", "call_5", json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(err.is_absorbed());
    match err {
        Error::ToolExecution { name, message } => {
            assert_eq!(name, "panicky");
            assert!(message.contains("panicked"));
        }
        other => panic!("expected ToolExecution, got {:?}", other),
    }
}

#[tokio::test]
async fn definitions_cover_registered_tools() {
    let registry = create_default_registry();
    let defs = registry.definitions();
    assert!(defs.iter().any(|d| d.name == "calculator"));
    assert!(registry.get("calculator").is_some());
    assert!(!registry.is_empty());
}
