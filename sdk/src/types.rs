//! Tool input/output types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input to a tool method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInput {
    pub method: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolInput {
    /// Create a new ToolInput
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Build an input from a JSON object of parameters.
    ///
    /// `null` is accepted as "no parameters"; any other non-object is rejected.
    pub fn from_json_params(
        method: impl Into<String>,
        params: serde_json::Value,
    ) -> Result<Self, ToolError> {
        let params = match params {
            serde_json::Value::Null => HashMap::new(),
            serde_json::Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(ToolError::InvalidParameter(format!(
                    "params must be a JSON object, got {}",
                    other
                )))
            }
        };
        Ok(Self {
            method: method.into(),
            params,
        })
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Get an optional i64 parameter
    ///
    /// Numeric strings are accepted too, since agents often quote numbers.
    pub fn param_i64_opt(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(|v| match v {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            other => other.as_i64(),
        })
    }

    /// Get a parameter as a JSON value
    pub fn param_json(&self, key: &str) -> Result<&serde_json::Value, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }
}

/// Output from a tool method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful output with text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            data: serde_json::json!({ "text": text.into() }),
            error: None,
        }
    }

    /// Create a successful output with text and an attached payload
    pub fn text_with_data(text: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: serde_json::json!({ "text": text.into(), "data": data }),
            error: None,
        }
    }

    /// Create an error output
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    /// The human-readable text of this output: the message on success, the
    /// error on failure.
    pub fn as_text(&self) -> &str {
        if self.success {
            self.data
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
        } else {
            self.error.as_deref().unwrap_or_default()
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Tool-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),
}
