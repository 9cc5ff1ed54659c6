//! Identity resolution: turning credentials into a principal, creating or
//! linking accounts on OAuth login, and issuing sessions.

use std::sync::Arc;

use internlink_core::{
  Error, Result,
  principal::{NewPrincipal, Principal, PrincipalKind, PrincipalRef, normalize_email},
  profile::{Profile, ProfileSeed},
  store::{PrincipalStore, Write},
};
use tracing::{debug, info};

use crate::{
  oauth::VerifiedIdentity,
  password::{Passwords, validate_password},
  token::{Session, TokenIssuer},
};

/// An OAuth login request after the provider token has been verified.
#[derive(Debug, Clone)]
pub struct OAuthLogin {
  pub identity:      VerifiedIdentity,
  /// The kind the client asks for. Only decides anything when the login
  /// creates or links an account.
  pub declared_kind: PrincipalKind,
  /// Profile fields for a new account. Ignored for existing ones.
  pub seed:          ProfileSeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthOutcome {
  /// The provider identity was already linked.
  Existing(PrincipalRef),
  /// The provider identity was linked to a password account with the same
  /// email.
  Linked(PrincipalRef),
  /// A new account was created.
  Created(PrincipalRef),
}

impl OAuthOutcome {
  pub fn principal(self) -> PrincipalRef {
    match self {
      Self::Existing(p) | Self::Linked(p) | Self::Created(p) => p,
    }
  }

  pub fn created(self) -> bool { matches!(self, Self::Created(_)) }
}

/// Resolves credentials against a [`PrincipalStore`] and issues sessions.
pub struct IdentityResolver<S> {
  store:     Arc<S>,
  passwords: Passwords,
  tokens:    Arc<TokenIssuer>,
}

impl<S> Clone for IdentityResolver<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      passwords: self.passwords.clone(),
      tokens:    self.tokens.clone(),
    }
  }
}

impl<S: PrincipalStore> IdentityResolver<S> {
  pub fn new(store: Arc<S>, passwords: Passwords, tokens: Arc<TokenIssuer>) -> Self {
    Self { store, passwords, tokens }
  }

  pub fn tokens(&self) -> &TokenIssuer { &self.tokens }

  // ── Password accounts ─────────────────────────────────────────────────

  /// Create a password account; the kind comes from `profile`.
  ///
  /// Fails with [`Error::Conflict`] if the email is taken by an account of
  /// either kind.
  pub async fn register(
    &self,
    email: &str,
    password: &str,
    profile: Profile,
  ) -> Result<Principal> {
    let email = normalize_email(email)?;
    validate_password(password)?;
    profile.validate()?;
    let password_hash = self.passwords.hash(password)?;

    let input = NewPrincipal {
      email,
      password_hash: Some(password_hash),
      profile,
      oauth: None,
    };
    match self.store.create_principal(input).await.map_err(Error::store)? {
      Write::Applied(principal) => {
        info!(principal_id = %principal.principal_id, kind = %principal.kind, "registered");
        Ok(principal)
      }
      Write::Conflict => Err(Error::Conflict("email is already registered".into())),
    }
  }

  /// Check an email and password.
  ///
  /// Unknown email, an account without a password and a wrong password all
  /// fail with the same [`Error::InvalidCredentials`], and each of them costs
  /// one hash verification.
  pub async fn resolve_by_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<PrincipalRef> {
    let Ok(email) = normalize_email(email) else {
      self.passwords.verify_dummy(password);
      return Err(Error::InvalidCredentials);
    };

    let principal = self.store.find_by_email(&email).await.map_err(Error::store)?;
    let hash = principal.as_ref().and_then(|p| p.password_hash.as_deref());

    match (principal.as_ref(), hash) {
      (Some(p), Some(hash)) if self.passwords.verify(password, hash) => Ok(p.reference()),
      (Some(_), Some(_)) => Err(Error::InvalidCredentials),
      _ => {
        self.passwords.verify_dummy(password);
        Err(Error::InvalidCredentials)
      }
    }
  }

  // ── OAuth ─────────────────────────────────────────────────────────────

  /// Resolve a verified provider identity to a principal, linking or
  /// creating an account as needed.
  ///
  /// The match is ordered: an existing link wins, then an account owning the
  /// verified email (linked only if its kind matches the declared one), then
  /// a new account built from the seed. If a concurrent login commits first,
  /// resolution restarts once from the top.
  pub async fn resolve_or_create_by_oauth(&self, login: OAuthLogin) -> Result<OAuthOutcome> {
    let email = normalize_email(&login.identity.email)?;
    for attempt in 0..2 {
      if let Some(outcome) = self.try_resolve(&login, &email).await? {
        return Ok(outcome);
      }
      debug!(attempt, subject = %login.identity.subject, "oauth resolution raced, retrying");
    }
    Err(Error::Conflict(
      "another sign-in for this account is in progress".into(),
    ))
  }

  /// One pass of the ordered match. `None` means a store write lost a race.
  async fn try_resolve(&self, login: &OAuthLogin, email: &str) -> Result<Option<OAuthOutcome>> {
    let identity = &login.identity;

    if let Some(existing) = self
      .store
      .find_by_oauth(identity.provider, &identity.subject)
      .await
      .map_err(Error::store)?
    {
      return Ok(Some(OAuthOutcome::Existing(existing.reference())));
    }

    if let Some(owner) = self.store.find_by_email(email).await.map_err(Error::store)? {
      if owner.kind != login.declared_kind {
        info!(
          principal_id = %owner.principal_id,
          declared = %login.declared_kind,
          "oauth login refused: account kind mismatch"
        );
        return Err(Error::AccountKindConflict);
      }
      if owner.linked_to(identity.provider).is_some() {
        return Err(Error::Conflict(format!(
          "account is already linked to a different {} identity",
          identity.provider
        )));
      }
      let write = self
        .store
        .link_oauth(owner.principal_id, identity.provider, identity.subject.clone())
        .await
        .map_err(Error::store)?;
      return Ok(write.applied().map(|p| {
        info!(principal_id = %p.principal_id, provider = %identity.provider, "oauth identity linked");
        OAuthOutcome::Linked(p.reference())
      }));
    }

    let profile = seed_with_identity(login.seed.clone(), identity).into_profile(login.declared_kind)?;
    let input = NewPrincipal {
      email: email.to_owned(),
      password_hash: None,
      profile,
      oauth: Some((identity.provider, identity.subject.clone())),
    };
    let write = self.store.create_principal(input).await.map_err(Error::store)?;
    Ok(write.applied().map(|p| {
      info!(principal_id = %p.principal_id, kind = %p.kind, "account created from oauth login");
      OAuthOutcome::Created(p.reference())
    }))
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  pub fn issue_session(&self, principal: PrincipalRef) -> Result<Session> {
    self.tokens.issue(principal)
  }

  /// Validate a bearer token.
  pub fn authenticate(&self, token: &str) -> Result<PrincipalRef> {
    self.tokens.validate(token)
  }

  /// The stored account and profile behind a session.
  pub async fn whoami(&self, principal: PrincipalRef) -> Result<(Principal, Profile)> {
    let not_found = || Error::NotFound(format!("account {}", principal.principal_id));
    let account = self
      .store
      .get_principal(principal.principal_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(not_found)?;
    let profile = self
      .store
      .get_profile(principal.principal_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(not_found)?;
    Ok((account, profile))
  }
}

/// Fill a student's missing names from the provider's claims.
fn seed_with_identity(mut seed: ProfileSeed, identity: &VerifiedIdentity) -> ProfileSeed {
  if seed.first_name.is_none() {
    seed.first_name = identity.given_name.clone();
  }
  if seed.last_name.is_none() {
    seed.last_name = identity.family_name.clone();
  }
  seed
}
