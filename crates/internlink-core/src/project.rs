//! Projects: the postings students apply to.
//!
//! Only the fields needed to establish ownership are modelled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub project_id:  Uuid,
  pub company_id:  Uuid,
  pub title:       String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ProjectStore::create_project`].
#[derive(Debug, Clone)]
pub struct NewProject {
  pub company_id:  Uuid,
  pub title:       String,
  pub description: Option<String>,
}

impl NewProject {
  /// Trim fields and check the title bound.
  pub fn normalized(self) -> Result<Self> {
    let title = self.title.trim().to_owned();
    if title.is_empty() {
      return Err(Error::Validation("title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
      return Err(Error::Validation(format!(
        "title must be at most {MAX_TITLE_CHARS} characters"
      )));
    }
    let description = self
      .description
      .map(|d| d.trim().to_owned())
      .filter(|d| !d.is_empty());
    Ok(Self { company_id: self.company_id, title, description })
  }
}
