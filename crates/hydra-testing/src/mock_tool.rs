//! Mock tool for testing the Agent Loop and Tool Registry without a real
//! filesystem, subprocess, or git workspace behind it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hydra_core::tool::{Permission, ToolDescriptor};
use hydra_core::{Error, Result};
use hydra_tools::Tool;
use serde_json::Value;

/// Handler invoked on `call`. Returns the tool's JSON output or an error
/// message, mirroring the signature every built-in tool settles on.
pub type MockToolHandler = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// A configurable stand-in for a real [`Tool`] implementation.
///
/// ```
/// use hydra_testing::MockTool;
/// use serde_json::json;
///
/// let tool = MockTool::new("echo").with_fixed_response(json!({"ok": true}));
/// assert_eq!(tool.call_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockTool {
    name: String,
    description: String,
    permission: Permission,
    handler: Option<MockToolHandler>,
    fixed_response: Value,
    call_history: Arc<Mutex<Vec<(Value, Value)>>>,
    call_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    error_message: String,
}

impl std::fmt::Debug for MockTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTool")
            .field("name", &self.name)
            .field("call_count", &self.call_count())
            .finish()
    }
}

impl MockTool {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "a mock tool for testing".to_string(),
            permission: Permission::Safe,
            handler: None,
            fixed_response: Value::String("ok".to_string()),
            call_history: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
            error_message: "mock tool failure".to_string(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_fixed_response(mut self, response: Value) -> Self {
        self.fixed_response = response;
        self
    }

    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        *self.should_fail.lock().unwrap() = true;
        self
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    #[must_use]
    pub fn call_history(&self) -> Vec<(Value, Value)> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }
}

#[async_trait]
impl Tool for MockTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: schemars::schema_for!(Value),
            permission: self.permission,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        *self.call_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::configuration(self.error_message.clone()));
        }

        let output = match &self.handler {
            Some(handler) => handler(&args).map_err(Error::configuration)?,
            None => self.fixed_response.clone(),
        };

        self.call_history.lock().unwrap().push((args, output.clone()));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fixed_response_is_returned_and_recorded() {
        let tool = MockTool::new("echo").with_fixed_response(json!({"value": 1}));
        let out = tool.call(json!({"input": "x"})).await.unwrap();
        assert_eq!(out, json!({"value": 1}));
        assert_eq!(tool.call_count(), 1);
        assert_eq!(tool.call_history().len(), 1);
    }

    #[tokio::test]
    async fn handler_overrides_fixed_response() {
        let tool = MockTool::new("adder").with_handler(|args| {
            let n = args.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n + 1))
        });
        let out = tool.call(json!({"n": 4})).await.unwrap();
        assert_eq!(out, json!(5));
    }

    #[tokio::test]
    async fn should_fail_returns_configuration_error() {
        let tool = MockTool::new("broken").with_error("boom");
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn descriptor_reflects_permission() {
        let tool = MockTool::new("critical_tool").with_permission(Permission::Critical);
        assert_eq!(tool.descriptor().permission, Permission::Critical);
    }
}
