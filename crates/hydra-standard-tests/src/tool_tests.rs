//! Conformance tests for [`Tool`] implementations.
//!
//! Implement [`ToolConformance`] for a small wrapper around your tool and
//! call each `test_*` method from a `#[tokio::test]` in your own crate.

use hydra_core::tool::Permission;
use hydra_tools::Tool;
use serde_json::Value;

/// Minimal fixture a tool implementation supplies to run the suite
/// against it.
#[async_trait::async_trait]
pub trait ToolConformance {
    fn tool(&self) -> &dyn Tool;

    /// A valid argument payload the tool accepts.
    fn example_args(&self) -> Value;

    /// A tool must report a non-empty name.
    fn test_has_name(&self) {
        let descriptor = self.tool().descriptor();
        assert!(!descriptor.name.is_empty(), "tool must have a non-empty name");
    }

    /// A tool must report a non-empty description (used by the Reasoning
    /// Engine and model prompt to decide when to call it).
    fn test_has_description(&self) {
        let descriptor = self.tool().descriptor();
        assert!(!descriptor.description.is_empty(), "tool must have a non-empty description");
    }

    /// The declared JSON schema must be an object schema, the only shape
    /// the Agent Loop's tool-call argument parser accepts.
    fn test_schema_is_object(&self) {
        let descriptor = self.tool().descriptor();
        let schema_type = descriptor.parameters.get("type").and_then(Value::as_str);
        assert_eq!(schema_type, Some("object"), "tool parameter schema must be type: object");
    }

    /// Critical tools must never report `Permission::Safe`: the Approval
    /// Tracker's auto-approve path would otherwise never gate them.
    fn test_critical_tools_are_never_safe(&self) {
        let descriptor = self.tool().descriptor();
        if descriptor.permission == Permission::Critical {
            assert_ne!(descriptor.permission, Permission::Safe);
        }
    }

    /// Calling the tool with `example_args` must succeed and return a
    /// well-formed JSON value.
    async fn test_call_succeeds(&self) {
        let result = self.tool().call(self.example_args()).await;
        assert!(result.is_ok(), "tool call with example args should succeed: {:?}", result.err());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_testing::MockTool;
    use serde_json::json;

    struct MockToolFixture(MockTool);

    #[async_trait::async_trait]
    impl ToolConformance for MockToolFixture {
        fn tool(&self) -> &dyn Tool {
            &self.0
        }

        fn example_args(&self) -> Value {
            json!({"input": "x"})
        }
    }

    #[tokio::test]
    async fn mock_tool_passes_the_conformance_suite() {
        let fixture = MockToolFixture(MockTool::new("probe").with_fixed_response(json!({"ok": true})));
        fixture.test_has_name();
        fixture.test_has_description();
        fixture.test_schema_is_object();
        fixture.test_critical_tools_are_never_safe();
        fixture.test_call_succeeds().await;
    }
}
