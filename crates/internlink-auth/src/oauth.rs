//! Third-party identity token verification.

use std::{future::Future, time::Duration};

use internlink_core::{Error, Result, principal::OAuthProvider};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// An identity the provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
  pub provider:    OAuthProvider,
  /// The provider's stable account id (`sub`).
  pub subject:     String,
  /// Verified by the provider; not yet normalised.
  pub email:       String,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

/// Turns an opaque provider token into a [`VerifiedIdentity`].
///
/// Every failure, whether the token is bad or the provider is unreachable,
/// is reported as [`Error::InvalidCredentials`].
pub trait IdentityVerifier: Send + Sync {
  fn verify<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<VerifiedIdentity>> + Send + 'a;
}

// ─── Google ──────────────────────────────────────────────────────────────────

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Verifies Google ID tokens against the `tokeninfo` endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GoogleVerifier {
  client:    Client,
  client_id: String,
  endpoint:  String,
}

impl GoogleVerifier {
  /// `client_id` is the OAuth client id tokens must be issued for.
  pub fn new(client_id: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      client,
      client_id: client_id.into(),
      endpoint: GOOGLE_TOKENINFO_URL.to_owned(),
    })
  }

  /// Point at a different `tokeninfo`-compatible endpoint.
  pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into();
    self
  }

  async fn fetch(&self, token: &str) -> Result<TokenInfo, String> {
    let resp = self
      .client
      .get(&self.endpoint)
      .query(&[("id_token", token)])
      .send()
      .await
      .map_err(|e| format!("tokeninfo request failed: {e}"))?;

    if !resp.status().is_success() {
      return Err(format!("tokeninfo → {}", resp.status()));
    }
    resp
      .json()
      .await
      .map_err(|e| format!("deserialising tokeninfo: {e}"))
  }
}

impl IdentityVerifier for GoogleVerifier {
  async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
    let info = self.fetch(token).await.map_err(|reason| {
      debug!(%reason, "google token rejected");
      Error::InvalidCredentials
    })?;
    info.check(&self.client_id).map_err(|reason| {
      debug!(%reason, "google token rejected");
      Error::InvalidCredentials
    })
  }
}

/// Google sends booleans in `tokeninfo` as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
  Bool(bool),
  Text(String),
}

impl Flag {
  fn is_true(&self) -> bool {
    match self {
      Self::Bool(b) => *b,
      Self::Text(s) => s.eq_ignore_ascii_case("true"),
    }
  }
}

/// The subset of Google's `tokeninfo` response that matters here.
#[derive(Debug, Deserialize)]
struct TokenInfo {
  aud:            String,
  iss:            String,
  sub:            String,
  email:          Option<String>,
  email_verified: Option<Flag>,
  given_name:     Option<String>,
  family_name:    Option<String>,
}

impl TokenInfo {
  fn check(self, client_id: &str) -> Result<VerifiedIdentity, String> {
    if self.aud != client_id {
      return Err(format!("audience {} does not match", self.aud));
    }
    if !GOOGLE_ISSUERS.contains(&self.iss.as_str()) {
      return Err(format!("unexpected issuer {}", self.iss));
    }
    if self.sub.is_empty() {
      return Err("missing subject".into());
    }
    let email = self.email.ok_or("missing email")?;
    if !self.email_verified.is_some_and(|f| f.is_true()) {
      return Err("email not verified".into());
    }
    Ok(VerifiedIdentity {
      provider: OAuthProvider::Google,
      subject: self.sub,
      email,
      given_name: self.given_name.filter(|s| !s.trim().is_empty()),
      family_name: self.family_name.filter(|s| !s.trim().is_empty()),
    })
  }
}
