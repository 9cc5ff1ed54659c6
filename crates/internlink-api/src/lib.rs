//! JSON REST API for InternLink.
//!
//! Exposes an axum [`Router`] backed by any store implementing the
//! principal, project and application traits, plus an
//! [`IdentityVerifier`] for OAuth logins. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = internlink_api::api_router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod applications;
pub mod auth;
pub mod envelope;
pub mod error;
pub mod projects;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post},
};
use internlink_auth::{IdentityResolver, IdentityVerifier};
use internlink_core::{
  store::{ApplicationStore, PrincipalStore, ProjectStore},
  workflow::ApplicationWorkflow,
};

pub use envelope::Envelope;
pub use error::ApiError;

/// Everything a store backend must provide to serve the API.
pub trait Backend: PrincipalStore + ProjectStore + ApplicationStore + 'static {}

impl<T> Backend for T where T: PrincipalStore + ProjectStore + ApplicationStore + 'static {}

/// Shared handler state. Cheap to clone.
pub struct AppState<S, V> {
  pub identity: IdentityResolver<S>,
  pub workflow: ApplicationWorkflow<S>,
  pub verifier: Arc<V>,
}

impl<S, V> Clone for AppState<S, V> {
  fn clone(&self) -> Self {
    Self {
      identity: self.identity.clone(),
      workflow: self.workflow.clone(),
      verifier: self.verifier.clone(),
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, V>(state: AppState<S, V>) -> Router<()>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  Router::new()
    // Identity
    .route("/auth/register/student", post(auth::register_student::<S, V>))
    .route("/auth/register/company", post(auth::register_company::<S, V>))
    .route("/auth/login", post(auth::login::<S, V>))
    .route("/auth/google-login", post(auth::google_login::<S, V>))
    .route("/auth/me", get(auth::me::<S, V>))
    // Projects
    .route("/projects", post(projects::create::<S, V>))
    .route("/projects/{projectId}", get(projects::get_one::<S, V>))
    .route(
      "/projects/{projectId}/applications",
      get(applications::list_for_project::<S, V>).post(applications::submit::<S, V>),
    )
    // Applications
    .route("/applications/mine", get(applications::mine::<S, V>))
    .route(
      "/applications/{applicationId}",
      get(applications::get_one::<S, V>).patch(applications::review::<S, V>),
    )
    .fallback(not_found)
    .method_not_allowed_fallback(method_not_allowed)
    .with_state(state)
}

async fn not_found() -> impl IntoResponse {
  Envelope::failure(StatusCode::NOT_FOUND, "no such endpoint", None)
}

async fn method_not_allowed() -> impl IntoResponse {
  Envelope::failure(StatusCode::METHOD_NOT_ALLOWED, "method not allowed on this endpoint", None)
}
