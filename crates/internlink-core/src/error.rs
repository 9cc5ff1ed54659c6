//! Error types for `internlink-core`.
//!
//! Every failure the identity and application subsystems can produce is one
//! of these variants. They are rendered into the wire envelope only at the
//! HTTP boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::application::ApplicationStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or missing input.
  #[error("validation failed: {0}")]
  Validation(String),

  /// Deliberately unspecific: unknown email, OAuth-only account and wrong
  /// password all produce this.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("email is registered to an account of a different kind")]
  AccountKindConflict,

  #[error("session token has expired")]
  TokenExpired,

  #[error("session token is invalid")]
  TokenInvalid,

  #[error("not permitted to access this resource")]
  Forbidden,

  #[error("{0} not found")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("cannot move application from {from} to {to}")]
  InvalidTransition {
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A failure outside the store that the caller cannot fix, such as a
  /// password hasher rejecting its own parameters.
  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  /// Wrap a backend failure. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn project_not_found(id: Uuid) -> Self {
    Self::NotFound(format!("project {id}"))
  }

  pub fn application_not_found(id: Uuid) -> Self {
    Self::NotFound(format!("application {id}"))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
