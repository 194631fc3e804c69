//! Typed access to validated tool call arguments.

use crate::error::ToolError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool: String,
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(tool: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            value,
        }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    fn missing(&self, kind: &str, key: &str) -> ToolError {
        ToolError::invalid_arguments(&self.tool, format!("Missing {kind} argument: {key}"))
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ToolError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.missing("string", key))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an optional string argument, treating blank strings as absent.
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get_str_opt(key).filter(|s| !s.trim().is_empty())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ToolError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.missing("integer", key))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ToolError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| self.missing("boolean", key))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            ToolError::invalid_arguments(&self.tool, format!("Failed to deserialize arguments: {e}"))
        })
    }
}
