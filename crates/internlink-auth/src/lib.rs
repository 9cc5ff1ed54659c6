//! Authentication for InternLink: password hashing, OAuth identity
//! verification, session tokens and the identity resolver that ties them to
//! a [`PrincipalStore`](internlink_core::store::PrincipalStore).

#![allow(async_fn_in_trait)]

pub mod identity;
pub mod oauth;
pub mod password;
pub mod token;

pub use identity::{IdentityResolver, OAuthLogin, OAuthOutcome};
pub use oauth::{GoogleVerifier, IdentityVerifier, VerifiedIdentity};
pub use password::Passwords;
pub use token::{Claims, Session, TokenIssuer};
