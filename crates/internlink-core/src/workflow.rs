//! The application workflow: role-scoped operations over the
//! [`ApplicationStore`] that enforce the status state machine.
//!
//! The workflow trusts the caller to have authenticated the acting principal
//! and checked its kind; it is responsible for *ownership*.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  application::{
    Application, ApplicationStatus, NewApplication, normalize_cover_letter,
  },
  principal::{PrincipalKind, PrincipalRef},
  project::{NewProject, Project},
  store::{ApplicationStore, ProjectStore, Write},
};

pub struct ApplicationWorkflow<S> {
  store: Arc<S>,
}

impl<S> Clone for ApplicationWorkflow<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S> ApplicationWorkflow<S>
where
  S: ApplicationStore + ProjectStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  // ── Projects ──────────────────────────────────────────────────────────

  /// Create a project owned by `company_id`.
  pub async fn open_project(
    &self,
    company_id: Uuid,
    title: String,
    description: Option<String>,
  ) -> Result<Project> {
    let input = NewProject { company_id, title, description }.normalized()?;
    self.store.create_project(input).await.map_err(Error::store)
  }

  pub async fn project(&self, project_id: Uuid) -> Result<Project> {
    self
      .store
      .get_project(project_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::project_not_found(project_id))
  }

  // ── Student side ──────────────────────────────────────────────────────

  /// Submit a `Pending` application.
  ///
  /// Fails with [`Error::Conflict`] if the student already has a live
  /// application for this project, including when a concurrent submission
  /// wins the race.
  pub async fn submit(
    &self,
    student_id: Uuid,
    project_id: Uuid,
    cover_letter: Option<String>,
  ) -> Result<Application> {
    let cover_letter = normalize_cover_letter(cover_letter)?;
    let project = self.project(project_id).await?;

    let input = NewApplication {
      student_id,
      project_id,
      company_id: project.company_id,
      cover_letter,
    };

    match self.store.insert_application(input).await.map_err(Error::store)? {
      Write::Applied(application) => Ok(application),
      Write::Conflict => {
        let existing = self
          .store
          .find_live_application(student_id, project_id)
          .await
          .map_err(Error::store)?;
        Err(Error::Conflict(match existing {
          Some(a) => format!(
            "application {} for this project is still {}",
            a.application_id, a.status
          ),
          None => "an application for this project is already active".into(),
        }))
      }
    }
  }

  /// Applications submitted by `student_id`, newest first.
  pub async fn list_mine(&self, student_id: Uuid) -> Result<Vec<Application>> {
    self
      .store
      .list_for_student(student_id)
      .await
      .map_err(Error::store)
  }

  // ── Company side ──────────────────────────────────────────────────────

  /// Move an application to `next` on behalf of `company_id`.
  ///
  /// Checks run in order: existence, ownership, then the transition table.
  /// The write is a compare-and-swap on the status read here, so a
  /// concurrent reviewer that got there first turns this call into
  /// [`Error::Conflict`] rather than overwriting its result.
  pub async fn review(
    &self,
    application_id: Uuid,
    company_id: Uuid,
    next: ApplicationStatus,
  ) -> Result<Application> {
    let current = self.load(application_id).await?;
    if current.company_id != company_id {
      return Err(Error::Forbidden);
    }
    current.status.check_transition(next)?;

    let write = self
      .store
      .update_status(application_id, current.status, next, Utc::now())
      .await
      .map_err(Error::store)?;

    write.applied().ok_or_else(|| {
      Error::Conflict(format!(
        "application {application_id} was modified concurrently"
      ))
    })
  }

  /// Applications to a project, visible only to the owning company.
  pub async fn list_for_project(
    &self,
    company_id: Uuid,
    project_id: Uuid,
  ) -> Result<Vec<Application>> {
    let project = self.project(project_id).await?;
    if project.company_id != company_id {
      return Err(Error::Forbidden);
    }
    self
      .store
      .list_for_project(project_id)
      .await
      .map_err(Error::store)
  }

  // ── Either side ───────────────────────────────────────────────────────

  /// Fetch one application as `viewer`.
  ///
  /// A student asking for someone else's application sees
  /// [`Error::NotFound`], so ids cannot be probed. A company asking for an
  /// application to another company's project sees [`Error::Forbidden`].
  pub async fn get_for(
    &self,
    viewer: PrincipalRef,
    application_id: Uuid,
  ) -> Result<Application> {
    let application = self.load(application_id).await?;
    match viewer.kind {
      PrincipalKind::Student if application.student_id != viewer.principal_id => {
        Err(Error::application_not_found(application_id))
      }
      PrincipalKind::Company if application.company_id != viewer.principal_id => {
        Err(Error::Forbidden)
      }
      _ => Ok(application),
    }
  }

  async fn load(&self, application_id: Uuid) -> Result<Application> {
    self
      .store
      .get_application(application_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::application_not_found(application_id))
  }
}
