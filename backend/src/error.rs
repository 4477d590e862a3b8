//! Login failures and their response envelope.
//!
//! Every failure is answered with HTTP 200 and a non-zero `code` in the body,
//! which is what mini-program clients check.

use axum::extract::rejection::JsonRejection;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mini_login_common::ApiResponse;
use serde_json::{json, Map, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::identity::ExchangeError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid request parameters")]
    Validation(#[from] ValidationErrors),

    #[error("request body must be valid JSON")]
    MalformedBody(String),

    /// The identity provider rejected the code; its own code is passed on.
    #[error("identity provider call failed: {message}")]
    Upstream { code: i64, message: String },

    #[error("failed to obtain openid")]
    MissingIdentity,

    #[error("identity provider unavailable")]
    UpstreamUnavailable(String),

    #[error("server error")]
    Persistence(String),

    #[error("request timed out")]
    TimedOut,
}

impl LoginError {
    /// Value of the envelope's `code` field.
    pub fn code(&self) -> i64 {
        match self {
            LoginError::Validation(_) | LoginError::MalformedBody(_) => 400,
            LoginError::Upstream { code, .. } => *code,
            LoginError::MissingIdentity
            | LoginError::UpstreamUnavailable(_)
            | LoginError::Persistence(_)
            | LoginError::TimedOut => 500,
        }
    }
}

impl From<JsonRejection> for LoginError {
    fn from(rejection: JsonRejection) -> Self {
        LoginError::MalformedBody(rejection.body_text())
    }
}

impl From<ExchangeError> for LoginError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::Rejected { code, message } => LoginError::Upstream { code, message },
            ExchangeError::MissingOpenid => LoginError::MissingIdentity,
            ExchangeError::RequestFailed(_) | ExchangeError::InvalidResponse(_) => {
                LoginError::UpstreamUnavailable(e.to_string())
            }
        }
    }
}

impl From<StoreError> for LoginError {
    fn from(e: StoreError) -> Self {
        LoginError::Persistence(e.to_string())
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match &self {
            LoginError::Validation(_) | LoginError::MalformedBody(_) => {
                tracing::debug!("Rejected login request: {}", self)
            }
            LoginError::Upstream { code, message } => {
                tracing::warn!(errcode = code, errmsg = %message, "Identity provider rejected login code")
            }
            LoginError::MissingIdentity => {
                tracing::error!("Identity provider response carried no openid")
            }
            LoginError::UpstreamUnavailable(detail) => {
                tracing::error!("Identity provider error: {}", detail)
            }
            LoginError::Persistence(detail) => tracing::error!("User store error: {}", detail),
            LoginError::TimedOut => tracing::error!("Request exceeded the server timeout"),
        }

        let mut body: ApiResponse<()> = ApiResponse::failure(self.code(), self.to_string());
        body = match self {
            LoginError::Validation(errors) => body.with_errors(validation_errors_json(&errors)),
            LoginError::MalformedBody(detail) => body.with_errors(json!({ "body": [detail] })),
            _ => body,
        };

        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Replaces the bare 408 of the timeout layer with the failure envelope.
/// Must sit outside `TimeoutLayer`.
pub async fn timeout_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return LoginError::TimedOut.into_response();
    }

    response
}

/// Request bodies use camelCase keys while `validator` reports Rust field
/// names, so `user_info` becomes `userInfo`.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;

    for c in field.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Render validation errors shaped like the request body:
/// `{"code": ["..."], "userInfo": {"nickName": ["..."]}}`.
pub fn validation_errors_json(errors: &ValidationErrors) -> Value {
    let mut out = Map::new();

    for (field, kind) in errors.errors() {
        let value = match kind {
            ValidationErrorsKind::Field(issues) => Value::Array(
                issues
                    .iter()
                    .map(|issue| {
                        Value::String(
                            issue
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| issue.code.to_string()),
                        )
                    })
                    .collect(),
            ),
            ValidationErrorsKind::Struct(nested) => validation_errors_json(nested),
            ValidationErrorsKind::List(items) => Value::Object(
                items
                    .iter()
                    .map(|(index, nested)| (index.to_string(), validation_errors_json(nested)))
                    .collect(),
            ),
        };
        out.insert(wire_name(field), value);
    }

    Value::Object(out)
}
