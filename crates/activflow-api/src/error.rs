//! API error type and [`axum::response::IntoResponse`] implementation.

use activflow_core::Error as CoreError;
use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Body text of every 500. The cause is only logged.
pub const MSG_INTERNAL: &str = "internal server error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or wrong credentials.
  #[error("unauthorized")]
  Unauthorized,

  /// A request parameter that could not be parsed.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// A failure outside the core, such as password hashing.
  #[error("internal error: {0}")]
  Internal(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Core(CoreError::store(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::Unauthorized | ApiError::Core(CoreError::Unauthorized(_)) => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "invalid credentials" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"activflow\""),
        );
        return res;
      }
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_owned())
      }
      ApiError::Core(e) => match e {
        CoreError::NotFound(m) => (StatusCode::NOT_FOUND, m),
        CoreError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
        CoreError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
        CoreError::Conflict(m) => (StatusCode::CONFLICT, m),
        other => {
          tracing::error!(error = %other, "internal error");
          (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_owned())
        }
      },
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
