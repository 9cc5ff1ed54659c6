//! Core types, store traits and the application workflow for InternLink.
//!
//! This crate is deliberately free of HTTP, database and logging
//! dependencies. Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod application;
pub mod error;
pub mod principal;
pub mod profile;
pub mod project;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
