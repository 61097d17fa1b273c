use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::schema::ValidationIssue;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  /// Missing credential or disabled integration. Caused by the caller, never retried.
  #[error("Configuration error: {0}")]
  Configuration(String),

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Validation failed: {}", join_issues(.0))]
  Validation(Vec<ValidationIssue>),

  #[error("Upstream error: {0}")]
  Upstream(String),

  #[error("Upstream rate limit: {0}")]
  UpstreamRateLimited(String),

  #[error("Upstream timed out: {0}")]
  UpstreamTimeout(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Configuration(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::UpstreamRateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Io(_) | AppError::Json(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Whether the caller, rather than this server or its upstreams, is at fault.
  pub fn is_client_error(&self) -> bool {
    self.status().is_client_error()
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      AppError::UpstreamTimeout(err.to_string())
    } else {
      AppError::Upstream(err.to_string())
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      AppError::Configuration(msg)
      | AppError::BadRequest(msg)
      | AppError::Upstream(msg)
      | AppError::UpstreamRateLimited(msg)
      | AppError::UpstreamTimeout(msg) => msg.clone(),
      AppError::Validation(issues) => join_issues(issues),
      AppError::Io(_) | AppError::Json(_) | AppError::Internal(_) => {
        tracing::error!(target: "mock_interview_backend", error = %self, "Internal error");
        "An unexpected error occurred".to_string()
      }
    };

    let body = Json(json!({ "error": message }));
    (status, body).into_response()
  }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
  issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_separates_client_and_upstream_faults() {
    assert!(AppError::Configuration("no key".into()).is_client_error());
    assert!(AppError::BadRequest("x".into()).is_client_error());
    assert!(!AppError::Upstream("boom".into()).is_client_error());
    assert_eq!(AppError::UpstreamRateLimited("slow down".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(AppError::UpstreamTimeout("idle".into()).status(), StatusCode::GATEWAY_TIMEOUT);
  }

  #[tokio::test]
  async fn response_body_is_error_object() {
    let resp = AppError::Configuration("API key is required".into()).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.expect("body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(v, json!({ "error": "API key is required" }));
  }
}
