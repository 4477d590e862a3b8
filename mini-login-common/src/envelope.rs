//! Response envelope used by every endpoint.
//!
//! The HTTP status is always 200 on the login path; success and failure are
//! told apart by `code`, which is `0` on success.

use serde::{Deserialize, Serialize};

/// `code` value of a successful response.
pub const SUCCESS_CODE: i64 = 0;

/// `{ "code", "message", "data"?, "errors"? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-level problems, shaped like the request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: serde_json::Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}
