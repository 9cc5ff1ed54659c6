//! Bearer-session extractors.
//!
//! [`Authenticated`] accepts any valid session. [`StudentSession`] and
//! [`CompanySession`] additionally require the matching kind and answer 403
//! otherwise.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use internlink_core::principal::{PrincipalKind, PrincipalRef};
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError};
use internlink_auth::IdentityVerifier;

/// The token after `Bearer ` in the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let token = value
    .strip_prefix("Bearer ")
    .ok_or(ApiError::Unauthorized)?
    .trim();
  if token.is_empty() {
    return Err(ApiError::Unauthorized);
  }
  Ok(token)
}

/// Any authenticated principal.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub PrincipalRef);

/// An authenticated student; holds the student's principal id.
#[derive(Debug, Clone, Copy)]
pub struct StudentSession(pub Uuid);

/// An authenticated company; holds the company's principal id.
#[derive(Debug, Clone, Copy)]
pub struct CompanySession(pub Uuid);

impl<S, V> FromRequestParts<AppState<S, V>> for Authenticated
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    Ok(Authenticated(state.identity.authenticate(token)?))
  }
}

async fn require_kind<S, V>(
  parts: &mut Parts,
  state: &AppState<S, V>,
  kind: PrincipalKind,
) -> Result<Uuid, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Authenticated(who) = Authenticated::from_request_parts(parts, state).await?;
  if who.kind != kind {
    return Err(ApiError::WrongKind(kind));
  }
  Ok(who.principal_id)
}

impl<S, V> FromRequestParts<AppState<S, V>> for StudentSession
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    require_kind(parts, state, PrincipalKind::Student).await.map(StudentSession)
  }
}

impl<S, V> FromRequestParts<AppState<S, V>> for CompanySession
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    require_kind(parts, state, PrincipalKind::Company).await.map(CompanySession)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn extracts_bearer_token() {
    assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
  }

  #[test]
  fn rejects_missing_or_foreign_scheme() {
    assert!(matches!(bearer_token(&HeaderMap::new()), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(&headers("Basic dXNlcjpwdw==")), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(&headers("Bearer   ")), Err(ApiError::Unauthorized)));
  }
}
