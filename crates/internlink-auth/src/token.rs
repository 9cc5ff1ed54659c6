//! HS256 session tokens.
//!
//! A token carries the principal id and kind, its issue time and its expiry.
//! Tokens are not persisted and cannot be renewed; a client logs in again
//! once one expires.

use chrono::{DateTime, Duration, Utc};
use internlink_core::{
  Error, Result,
  principal::{PrincipalKind, PrincipalRef},
};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_SECRET_BYTES: usize = 32;

/// Longest session lifetime accepted, one year.
pub const MAX_TTL_MINUTES: i64 = 366 * 24 * 60;

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  Uuid,
  pub kind: PrincipalKind,
  pub iat:  i64,
  pub exp:  i64,
}

/// What a successful login hands back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token:        String,
  pub kind:         PrincipalKind,
  pub principal_id: Uuid,
  pub expires_at:   DateTime<Utc>,
}

/// Signs and checks session tokens with one process-wide secret.
pub struct TokenIssuer {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl TokenIssuer {
  /// Fails with [`Error::Validation`] if `secret` is shorter than
  /// [`MIN_SECRET_BYTES`] or `ttl` is not in `1..=MAX_TTL_MINUTES` minutes.
  pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
    if secret.len() < MIN_SECRET_BYTES {
      return Err(Error::Validation(format!(
        "signing secret must be at least {MIN_SECRET_BYTES} bytes"
      )));
    }
    if ttl <= Duration::zero() {
      return Err(Error::Validation("token lifetime must be positive".into()));
    }
    if ttl > Duration::minutes(MAX_TTL_MINUTES) {
      return Err(Error::Validation(format!(
        "token lifetime must be at most {MAX_TTL_MINUTES} minutes"
      )));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    })
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Issue a session for `principal` starting now.
  pub fn issue(&self, principal: PrincipalRef) -> Result<Session> {
    self.issue_at(principal, Utc::now())
  }

  /// Issue a session as if the current time were `now`.
  pub fn issue_at(&self, principal: PrincipalRef, now: DateTime<Utc>) -> Result<Session> {
    let expires_at = now
      .checked_add_signed(self.ttl)
      .ok_or_else(|| Error::Internal("token expiry out of range".into()))?;
    let claims = Claims {
      sub:  principal.principal_id,
      kind: principal.kind,
      iat:  now.timestamp(),
      exp:  expires_at.timestamp(),
    };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::Internal(format!("token signing failed: {e}")))?;

    Ok(Session {
      token,
      kind: principal.kind,
      principal_id: principal.principal_id,
      expires_at,
    })
  }

  /// Check signature and expiry, returning the principal the token names.
  pub fn validate(&self, token: &str) -> Result<PrincipalRef> {
    let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::TokenInvalid,
      })?;
    Ok(PrincipalRef {
      principal_id: data.claims.sub,
      kind:         data.claims.kind,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

  fn issuer() -> TokenIssuer { TokenIssuer::new(SECRET, Duration::hours(24)).unwrap() }

  fn student() -> PrincipalRef {
    PrincipalRef { principal_id: Uuid::new_v4(), kind: PrincipalKind::Student }
  }

  #[test]
  fn issue_then_validate() {
    let issuer = issuer();
    let who = student();
    let session = issuer.issue(who).unwrap();
    assert_eq!(session.principal_id, who.principal_id);
    assert_eq!(session.kind, PrincipalKind::Student);
    assert_eq!(issuer.validate(&session.token).unwrap(), who);
  }

  #[test]
  fn expiry_is_issue_time_plus_ttl() {
    let issuer = issuer();
    let now = Utc::now();
    let session = issuer.issue_at(student(), now).unwrap();
    assert_eq!(session.expires_at, now + Duration::hours(24));
  }

  #[test]
  fn lifetime_is_bounded() {
    assert!(TokenIssuer::new(SECRET, Duration::minutes(MAX_TTL_MINUTES)).is_ok());
    assert!(matches!(
      TokenIssuer::new(SECRET, Duration::minutes(MAX_TTL_MINUTES + 1)),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn expiry_past_the_calendar_is_an_error() {
    let issuer = issuer();
    assert!(matches!(
      issuer.issue_at(student(), DateTime::<Utc>::MAX_UTC),
      Err(Error::Internal(_))
    ));
  }

  #[test]
  fn expired_token_is_rejected() {
    let issuer = issuer();
    let long_ago = Utc::now() - Duration::hours(25);
    let session = issuer.issue_at(student(), long_ago).unwrap();
    assert!(matches!(issuer.validate(&session.token), Err(Error::TokenExpired)));
  }

  #[test]
  fn no_grace_period_after_expiry() {
    let issuer = TokenIssuer::new(SECRET, Duration::seconds(60)).unwrap();
    let session = issuer
      .issue_at(student(), Utc::now() - Duration::seconds(62))
      .unwrap();
    assert!(matches!(issuer.validate(&session.token), Err(Error::TokenExpired)));
  }

  #[test]
  fn tampered_token_is_invalid() {
    let issuer = issuer();
    let session = issuer.issue(student()).unwrap();

    let mut parts: Vec<String> = session.token.split('.').map(str::to_owned).collect();
    let mut sig = parts[2].clone().into_bytes();
    sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
    parts[2] = String::from_utf8(sig).unwrap();
    let forged = parts.join(".");

    assert!(matches!(issuer.validate(&forged), Err(Error::TokenInvalid)));
  }

  #[test]
  fn token_from_another_secret_is_invalid() {
    let other = TokenIssuer::new(&[7u8; 32], Duration::hours(1)).unwrap();
    let session = other.issue(student()).unwrap();
    assert!(matches!(issuer().validate(&session.token), Err(Error::TokenInvalid)));
  }

  #[test]
  fn garbage_is_invalid() {
    assert!(matches!(issuer().validate("not.a.token"), Err(Error::TokenInvalid)));
    assert!(matches!(issuer().validate(""), Err(Error::TokenInvalid)));
  }

  #[test]
  fn short_secret_is_refused() {
    assert!(matches!(
      TokenIssuer::new(b"too-short", Duration::hours(1)),
      Err(Error::Validation(_))
    ));
    assert!(TokenIssuer::new(SECRET, Duration::zero()).is_err());
  }

  #[test]
  fn company_kind_survives_roundtrip() {
    let issuer = issuer();
    let who = PrincipalRef { principal_id: Uuid::new_v4(), kind: PrincipalKind::Company };
    let session = issuer.issue(who).unwrap();
    assert_eq!(issuer.validate(&session.token).unwrap().kind, PrincipalKind::Company);
  }
}
