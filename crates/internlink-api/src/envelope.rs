//! The response envelope every endpoint answers with, success or failure.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `{success, message, data, errors, statusCode, timestamp}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
  pub success:     bool,
  pub message:     String,
  pub data:        Option<T>,
  pub errors:      Option<Vec<String>>,
  pub status_code: u16,
  pub timestamp:   DateTime<Utc>,
  #[serde(skip)]
  status:          StatusCode,
}

impl<T> Envelope<T> {
  pub fn ok(message: impl Into<String>, data: T) -> Self {
    Self::success(StatusCode::OK, message, data)
  }

  pub fn created(message: impl Into<String>, data: T) -> Self {
    Self::success(StatusCode::CREATED, message, data)
  }

  fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
    Self {
      success: true,
      message: message.into(),
      data: Some(data),
      errors: None,
      status_code: status.as_u16(),
      timestamp: Utc::now(),
      status,
    }
  }
}

impl Envelope<()> {
  pub fn failure(status: StatusCode, message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
    Self {
      success: false,
      message: message.into(),
      data: None,
      errors,
      status_code: status.as_u16(),
      timestamp: Utc::now(),
      status,
    }
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { (self.status, Json(self)).into_response() }
}
