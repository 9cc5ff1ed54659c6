//! Principals: the two disjoint kinds of account that can hold a session.
//!
//! A principal carries only identity-core data: email, credential and OAuth
//! links. Everything kind-specific lives in its [`Profile`](crate::profile::Profile),
//! keyed by the same identifier.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, profile::Profile};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of account. Fixed at creation; never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
  #[serde(alias = "STUDENT", alias = "Student")]
  Student,
  #[serde(alias = "COMPANY", alias = "Company")]
  Company,
}

impl PrincipalKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Company => "company",
    }
  }
}

impl fmt::Display for PrincipalKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── OAuth ───────────────────────────────────────────────────────────────────

/// Third-party identity providers accepted for login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
  Google,
}

impl OAuthProvider {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Google => "google",
    }
  }
}

impl fmt::Display for OAuthProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A (provider, provider-subject) pair bound to exactly one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthIdentity {
  pub provider:  OAuthProvider,
  /// Stable account identifier issued by the provider (`sub`).
  pub subject:   String,
  pub linked_at: DateTime<Utc>,
}

// ─── Principal ───────────────────────────────────────────────────────────────

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub principal_id:     Uuid,
  pub kind:             PrincipalKind,
  /// Normalised (trimmed, lower-case); unique across both kinds.
  pub email:            String,
  /// argon2 PHC string. `None` for OAuth-only accounts.
  #[serde(skip_serializing)]
  pub password_hash:    Option<String>,
  pub oauth_identities: Vec<OAuthIdentity>,
  pub created_at:       DateTime<Utc>,
}

impl Principal {
  pub fn reference(&self) -> PrincipalRef {
    PrincipalRef { principal_id: self.principal_id, kind: self.kind }
  }

  pub fn linked_to(&self, provider: OAuthProvider) -> Option<&OAuthIdentity> {
    self.oauth_identities.iter().find(|i| i.provider == provider)
  }
}

/// The resolved identity carried by a session: who, and which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRef {
  pub principal_id: Uuid,
  pub kind:         PrincipalKind,
}

// ─── NewPrincipal ────────────────────────────────────────────────────────────

/// Input to [`crate::store::PrincipalStore::create_principal`].
///
/// The store writes the principal, its profile and (if present) the OAuth
/// link in one transaction. The kind is taken from the profile.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
  pub email:         String,
  pub password_hash: Option<String>,
  pub profile:       Profile,
  pub oauth:         Option<(OAuthProvider, String)>,
}

impl NewPrincipal {
  pub fn kind(&self) -> PrincipalKind { self.profile.kind() }
}

// ─── Email ───────────────────────────────────────────────────────────────────

/// Trim and lower-case an email address, rejecting anything that is not
/// shaped like `local@domain`.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  let valid = email.len() <= 254
    && !email.contains(char::is_whitespace)
    && matches!(
      email.split_once('@'),
      Some((local, domain))
        if !local.is_empty() && domain.contains('.') && !domain.contains('@')
          && !domain.starts_with('.') && !domain.ends_with('.')
    );

  if valid {
    Ok(email)
  } else {
    Err(Error::Validation(format!("{raw:?} is not a valid email address")))
  }
}
