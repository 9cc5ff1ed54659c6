//! API error type and its rendering into an [`Envelope`].

use axum::{
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use internlink_core::{Error as CoreError, principal::PrincipalKind};
use thiserror::Error;
use tracing::{debug, error};

use crate::envelope::Envelope;

/// An error returned by an API handler or extractor.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// No usable bearer token on the request.
  #[error("authentication required")]
  Unauthorized,

  /// A valid session of the wrong kind for this endpoint.
  #[error("this endpoint is only available to {0} accounts")]
  WrongKind(PrincipalKind),

  /// Malformed JSON body or path parameter.
  #[error("{0}")]
  BadRequest(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::Core(e) => match e {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::InvalidCredentials
        | CoreError::TokenExpired
        | CoreError::TokenInvalid => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::AccountKindConflict
        | CoreError::Conflict(_)
        | CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoreError::Store(_) | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::WrongKind(_) => StatusCode::FORBIDDEN,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let (message, errors) = match &self {
      Self::Core(CoreError::Validation(detail)) | Self::BadRequest(detail) => {
        ("validation failed".to_owned(), Some(vec![detail.clone()]))
      }
      Self::Core(CoreError::Store(_) | CoreError::Internal(_)) => {
        error!(error = %self, "request failed");
        ("internal server error".to_owned(), None)
      }
      other => (other.to_string(), None),
    };
    if status == StatusCode::UNAUTHORIZED {
      debug!(reason = %self, "request not authenticated");
    }
    Envelope::failure(status, message, errors).into_response()
  }
}
