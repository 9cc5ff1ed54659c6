//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/projects` | Company only. Body: `{"title":"…","description":"…"}` |
//! | `GET`  | `/projects/{projectId}` | Any session; 404 if not found |

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use internlink_auth::IdentityVerifier;
use internlink_core::project::Project;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  envelope::Envelope,
  error::ApiError,
  session::{Authenticated, CompanySession},
};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
}

/// `POST /projects`
pub async fn create<S, V>(
  State(state): State<AppState<S, V>>,
  CompanySession(company_id): CompanySession,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<Envelope<Project>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Json(body) = body?;
  let project = state
    .workflow
    .open_project(company_id, body.title, body.description)
    .await?;
  info!(project_id = %project.project_id, %company_id, "project opened");
  Ok(Envelope::created("project created", project))
}

/// `GET /projects/{projectId}`
pub async fn get_one<S, V>(
  State(state): State<AppState<S, V>>,
  _session: Authenticated,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Envelope<Project>, ApiError>
where
  S: Backend,
  V: IdentityVerifier + 'static,
{
  let Path(project_id) = id?;
  let project = state.workflow.project(project_id).await?;
  Ok(Envelope::ok("project", project))
}
