//! argon2id password hashing with a timing-equalising dummy hash.

use argon2::{
  Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
  Version, password_hash::SaltString,
};
use internlink_core::{Error, Result};
use rand_core::OsRng;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;

/// Hashes and verifies passwords with one fixed set of argon2 parameters.
///
/// Holds a hash of a throwaway password made with the same parameters, so a
/// login for an unknown account can burn the same amount of work as a real
/// verification.
#[derive(Clone)]
pub struct Passwords {
  argon2: Argon2<'static>,
  dummy:  String,
}

impl Passwords {
  /// argon2id with the crate's default (production) cost.
  pub fn new() -> Result<Self> { Self::with_params(Params::default()) }

  /// argon2id with `memory_kib` of memory and `iterations` passes over it,
  /// on a single lane. Mostly useful for cheap hashes in tests.
  pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
    let params = Params::new(memory_kib, iterations, 1, None)
      .map_err(|e| Error::Internal(format!("argon2 parameters: {e}")))?;
    Self::with_params(params)
  }

  pub fn with_params(params: Params) -> Result<Self> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut passwords = Self { argon2, dummy: String::new() };
    passwords.dummy = passwords.hash("internlink-dummy-password")?;
    Ok(passwords)
  }

  /// Hash `password` into a PHC string with a fresh random salt.
  pub fn hash(&self, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    self
      .argon2
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
  }

  /// `true` if `password` matches the PHC string `hash`. A hash that does not
  /// parse never matches.
  pub fn verify(&self, password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
      .and_then(|parsed| self.argon2.verify_password(password.as_bytes(), &parsed))
      .is_ok()
  }

  /// Run a verification that always fails, costing the same as a real one.
  pub fn verify_dummy(&self, password: &str) {
    let _ = self.verify(password, &self.dummy);
  }
}

/// Enforce the password length policy, counted in characters.
pub fn validate_password(password: &str) -> Result<()> {
  let len = password.chars().count();
  if len < MIN_PASSWORD_CHARS {
    return Err(Error::Validation(format!(
      "password must be at least {MIN_PASSWORD_CHARS} characters"
    )));
  }
  if len > MAX_PASSWORD_CHARS {
    return Err(Error::Validation(format!(
      "password must be at most {MAX_PASSWORD_CHARS} characters"
    )));
  }
  Ok(())
}
