//! Handlers for application endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/projects/{projectId}/applications` | Student only. Body: `{"coverLetter":"…"}` |
//! | `GET`   | `/projects/{projectId}/applications` | Owning company only |
//! | `GET`   | `/applications/mine` | Student only, newest first |
//! | `GET`   | `/applications/{applicationId}` | The applicant or the owning company |
//! | `PATCH` | `/applications/{applicationId}` | Owning company only. Body: `{"status":"accepted"}` |

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use internlink_auth::IdentityVerifier;
use internlink_core::application::{Application, ApplicationStatus};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  envelope::Envelope,
  error::ApiError,
  session::{Authenticated, CompanySession, StudentSession},
};

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
  #[serde(default)]
  pub cover_letter: Option<String>,
}

/// `POST /projects/{projectId}/applications`
pub async fn submit<S, V>(
  State(state): State<AppState<S, V>>,
  StudentSession(student_id): StudentSession,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<Envelope<Application>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Path(project_id) = id?;
  // A bare POST with no body applies without a cover letter.
  let body = match body {
    Ok(Json(body)) => body,
    Err(JsonRejection::MissingJsonContentType(_)) => SubmitBody::default(),
    Err(other) => return Err(other.into()),
  };

  let application = state
    .workflow
    .submit(student_id, project_id, body.cover_letter)
    .await?;
  info!(
    application_id = %application.application_id,
    %student_id,
    %project_id,
    "application submitted"
  );
  Ok(Envelope::created("application submitted", application))
}

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /projects/{projectId}/applications`
pub async fn list_for_project<S, V>(
  State(state): State<AppState<S, V>>,
  CompanySession(company_id): CompanySession,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Envelope<Vec<Application>>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Path(project_id) = id?;
  let applications = state.workflow.list_for_project(company_id, project_id).await?;
  Ok(Envelope::ok("applications for project", applications))
}

/// `GET /applications/mine`
pub async fn mine<S, V>(
  State(state): State<AppState<S, V>>,
  StudentSession(student_id): StudentSession,
) -> Result<Envelope<Vec<Application>>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let applications = state.workflow.list_mine(student_id).await?;
  Ok(Envelope::ok("your applications", applications))
}

// ─── One application ──────────────────────────────────────────────────────────

/// `GET /applications/{applicationId}`
pub async fn get_one<S, V>(
  State(state): State<AppState<S, V>>,
  Authenticated(who): Authenticated,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Envelope<Application>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Path(application_id) = id?;
  let application = state.workflow.get_for(who, application_id).await?;
  Ok(Envelope::ok("application", application))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub status: ApplicationStatus,
}

/// `PATCH /applications/{applicationId}`
pub async fn review<S, V>(
  State(state): State<AppState<S, V>>,
  CompanySession(company_id): CompanySession,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<Envelope<Application>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Path(application_id) = id?;
  let Json(body) = body?;
  let application = state
    .workflow
    .review(application_id, company_id, body.status)
    .await?;
  info!(%application_id, %company_id, status = %application.status, "application reviewed");
  Ok(Envelope::ok("application updated", application))
}
