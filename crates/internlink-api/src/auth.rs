//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register/student` | 201 + account summary |
//! | `POST` | `/auth/register/company` | 201 + account summary |
//! | `POST` | `/auth/login` | email + password → session |
//! | `POST` | `/auth/google-login` | Google ID token → session, creating or linking |
//! | `GET`  | `/auth/me` | bearer session → account summary |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use internlink_auth::{IdentityVerifier, OAuthLogin, Session};
use internlink_core::{
  principal::{OAuthProvider, Principal, PrincipalKind},
  profile::{CompanyProfile, Profile, ProfileSeed, StudentProfile},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, Backend, envelope::Envelope, error::ApiError, session::Authenticated};

// ─── Views ────────────────────────────────────────────────────────────────────

/// Account summary: the principal's public fields with its profile inlined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
  pub principal_id:     Uuid,
  pub email:            String,
  pub linked_providers: Vec<OAuthProvider>,
  pub has_password:     bool,
  pub created_at:       DateTime<Utc>,
  #[serde(flatten)]
  pub profile:          Profile,
}

impl AccountView {
  fn new(principal: Principal, profile: Profile) -> Self {
    Self {
      principal_id: principal.principal_id,
      email: principal.email,
      linked_providers: principal.oauth_identities.iter().map(|i| i.provider).collect(),
      has_password: principal.password_hash.is_some(),
      created_at: principal.created_at,
      profile,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSessionView {
  #[serde(flatten)]
  pub session:     Session,
  pub is_new_user: bool,
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody<P> {
  pub email:    String,
  pub password: String,
  #[serde(flatten)]
  pub profile:  P,
}

async fn register<S, V>(
  state: &AppState<S, V>,
  email: &str,
  password: &str,
  profile: Profile,
) -> Result<Envelope<AccountView>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let principal = state.identity.register(email, password, profile.clone()).await?;
  Ok(Envelope::created("registration successful", AccountView::new(principal, profile)))
}

/// `POST /auth/register/student`
pub async fn register_student<S, V>(
  State(state): State<AppState<S, V>>,
  body: Result<Json<RegisterBody<StudentProfile>>, JsonRejection>,
) -> Result<Envelope<AccountView>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Json(body) = body?;
  register(&state, &body.email, &body.password, Profile::Student(body.profile)).await
}

/// `POST /auth/register/company`
pub async fn register_company<S, V>(
  State(state): State<AppState<S, V>>,
  body: Result<Json<RegisterBody<CompanyProfile>>, JsonRejection>,
) -> Result<Envelope<AccountView>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Json(body) = body?;
  register(&state, &body.email, &body.password, Profile::Company(body.profile)).await
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S, V>(
  State(state): State<AppState<S, V>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Envelope<Session>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Json(body) = body?;
  let who = state.identity.resolve_by_password(&body.email, &body.password).await?;
  let session = state.identity.issue_session(who)?;
  info!(principal_id = %who.principal_id, kind = %who.kind, "password login");
  Ok(Envelope::ok("login successful", session))
}

// ─── Google ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginBody {
  #[serde(alias = "providerToken")]
  pub id_token:  String,
  pub user_type: PrincipalKind,
  /// Profile fields used only if this login creates the account.
  #[serde(flatten)]
  pub seed:      ProfileSeed,
}

/// `POST /auth/google-login`
pub async fn google_login<S, V>(
  State(state): State<AppState<S, V>>,
  body: Result<Json<GoogleLoginBody>, JsonRejection>,
) -> Result<Envelope<OAuthSessionView>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Json(body) = body?;
  let identity = state.verifier.verify(&body.id_token).await?;
  let outcome = state
    .identity
    .resolve_or_create_by_oauth(OAuthLogin {
      identity,
      declared_kind: body.user_type,
      seed: body.seed,
    })
    .await?;

  let who = outcome.principal();
  let session = state.identity.issue_session(who)?;
  info!(principal_id = %who.principal_id, kind = %who.kind, outcome = ?outcome, "google login");

  let view = OAuthSessionView { session, is_new_user: outcome.created() };
  Ok(if outcome.created() {
    Envelope::created("account created", view)
  } else {
    Envelope::ok("login successful", view)
  })
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S, V>(
  State(state): State<AppState<S, V>>,
  Authenticated(who): Authenticated,
) -> Result<Envelope<AccountView>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let (principal, profile) = state.identity.whoami(who).await?;
  Ok(Envelope::ok("current account", AccountView::new(principal, profile)))
}
