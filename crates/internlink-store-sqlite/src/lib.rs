//! SQLite backend for the InternLink principal, project and application
//! stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Uniqueness rules (one email per
//! principal, one live application per student and project) are enforced by
//! the schema, so racing writers cannot both succeed.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
