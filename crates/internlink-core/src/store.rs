//! Storage traits for principals, projects and applications.
//!
//! The traits are implemented by storage backends (e.g.
//! `internlink-store-sqlite`). The identity resolver and the application
//! workflow depend on these abstractions, not on any concrete backend.
//!
//! Writes that can collide with a uniqueness rule return a [`Write`] rather
//! than an error, so callers can tell a lost race from a broken backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  application::{Application, ApplicationStatus, NewApplication},
  principal::{NewPrincipal, OAuthProvider, Principal},
  profile::Profile,
  project::{NewProject, Project},
};

// ─── Write outcome ───────────────────────────────────────────────────────────

/// Result of a conditional or uniqueness-constrained write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write<T> {
  /// The write committed.
  Applied(T),
  /// A uniqueness constraint or compare-and-swap condition rejected the
  /// write. Nothing was changed.
  Conflict,
}

impl<T> Write<T> {
  pub fn applied(self) -> Option<T> {
    match self {
      Self::Applied(t) => Some(t),
      Self::Conflict => None,
    }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Common error type shared by every store trait a backend implements.
///
/// All methods on the store traits return `Send` futures so they can be used
/// in multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

/// Durable credentials, OAuth links and profiles.
pub trait PrincipalStore: Store {
  /// Look up a principal by normalised email, across both kinds.
  fn find_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + 'a;

  /// Look up the principal bound to `(provider, subject)`.
  fn find_by_oauth<'a>(
    &'a self,
    provider: OAuthProvider,
    subject: &'a str,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + 'a;

  fn get_principal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Atomically insert a principal, its profile and its optional OAuth link.
  ///
  /// Returns [`Write::Conflict`] if the email or the OAuth subject is already
  /// taken.
  fn create_principal(
    &self,
    input: NewPrincipal,
  ) -> impl Future<Output = Result<Write<Principal>, Self::Error>> + Send + '_;

  /// Bind `(provider, subject)` to an existing principal.
  ///
  /// Returns [`Write::Conflict`] if the subject is already bound anywhere or
  /// the principal already has a link for `provider`.
  fn link_oauth(
    &self,
    principal_id: Uuid,
    provider: OAuthProvider,
    subject: String,
  ) -> impl Future<Output = Result<Write<Principal>, Self::Error>> + Send + '_;
}

/// Projects, to the extent needed for ownership checks.
pub trait ProjectStore: Store {
  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;
}

/// Durable application records.
pub trait ApplicationStore: Store {
  /// Insert a `Pending` application.
  ///
  /// The live-uniqueness check and the insert are one atomic operation:
  /// returns [`Write::Conflict`] if a `Pending` or `Reviewed` application
  /// already exists for the same (student, project).
  fn insert_application(
    &self,
    input: NewApplication,
  ) -> impl Future<Output = Result<Write<Application>, Self::Error>> + Send + '_;

  fn get_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// The live application for (student, project), if any.
  fn find_live_application(
    &self,
    student_id: Uuid,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// Compare-and-swap the status of an application.
  ///
  /// Applies only if the current status equals `expected`. `reviewed_at` is
  /// written only if the stored value is still null. Returns
  /// [`Write::Conflict`] if the condition did not hold.
  fn update_status(
    &self,
    id: Uuid,
    expected: ApplicationStatus,
    next: ApplicationStatus,
    reviewed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Write<Application>, Self::Error>> + Send + '_;

  /// All applications submitted by a student, newest first.
  fn list_for_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  /// All applications to a project, newest first.
  fn list_for_project(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;
}
