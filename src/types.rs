use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ValidationIssue;

pub const INVALID_PARAMETERS: &str = "Invalid parameters";
pub const TOOL_NOT_FOUND: &str = "Tool not found";

/// A tool call as it arrives from a transport.
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationRequest {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}

/// Outcome of a single dispatch. Every variant is an expected result;
/// none of them is a transport fault.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success { value: Value },
    ValidationFailure { errors: Vec<ValidationIssue> },
    NotFound { tool: String },
    HandlerFailure { message: String },
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Uniform wire shape for results:
/// `{"status": "success", "result": ...}` or `{"status": "error", "message": ..., "errors"?: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        result: Value,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<ValidationIssue>>,
    },
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            errors: None,
        }
    }
}

impl From<InvocationResult> for Envelope {
    fn from(result: InvocationResult) -> Self {
        match result {
            InvocationResult::Success { value } => Self::Success { result: value },
            InvocationResult::ValidationFailure { errors } => Self::Error {
                message: INVALID_PARAMETERS.into(),
                errors: Some(errors),
            },
            InvocationResult::NotFound { .. } => Self::error(TOOL_NOT_FOUND),
            InvocationResult::HandlerFailure { message } => Self::error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_shape() {
        let env = Envelope::from(InvocationResult::Success {
            value: json!({"message": "Hello, world!"}),
        });
        assert_eq!(
            serde_json::to_value(env).unwrap(),
            json!({"status": "success", "result": {"message": "Hello, world!"}})
        );
    }

    #[test]
    fn validation_envelope_carries_errors() {
        let env = Envelope::from(InvocationResult::ValidationFailure {
            errors: vec![ValidationIssue {
                path: "".into(),
                message: "\"text\" is a required property".into(),
            }],
        });
        let v = serde_json::to_value(env).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], INVALID_PARAMETERS);
        assert_eq!(v["errors"][0]["message"], "\"text\" is a required property");
    }

    #[test]
    fn not_found_and_handler_failure_omit_errors() {
        let not_found = serde_json::to_value(Envelope::from(InvocationResult::NotFound {
            tool: "x".into(),
        }))
        .unwrap();
        assert_eq!(not_found, json!({"status": "error", "message": TOOL_NOT_FOUND}));

        let failed = serde_json::to_value(Envelope::from(InvocationResult::HandlerFailure {
            message: "boom".into(),
        }))
        .unwrap();
        assert_eq!(failed, json!({"status": "error", "message": "boom"}));
    }

    #[test]
    fn request_params_default_to_null() {
        let req: InvocationRequest = serde_json::from_value(json!({"tool": "hello_world"})).unwrap();
        assert_eq!(req.tool, "hello_world");
        assert!(req.params.is_null());
    }
}
