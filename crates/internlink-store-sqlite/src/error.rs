//! Error type for `internlink-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside the set the schema allows.
  #[error("unexpected {column} value: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("principal {0} not found")]
  PrincipalNotFound(uuid::Uuid),

  /// A profile row was missing for a principal that exists.
  #[error("principal {0} has no profile")]
  MissingProfile(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
