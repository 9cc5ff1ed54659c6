//! Applications and their status state machine.
//!
//! ```text
//! Pending ──► Reviewed ──► Accepted
//!    │            └──────► Rejected
//!    ├──────────────────► Accepted
//!    └──────────────────► Rejected
//! ```
//!
//! `Accepted` and `Rejected` are terminal. At most one application per
//! (student, project) may be *live* (`Pending` or `Reviewed`) at a time; the
//! store enforces this with a uniqueness constraint.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on cover letter length, in characters.
pub const MAX_COVER_LETTER_CHARS: usize = 5000;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
  #[serde(alias = "PENDING")]
  Pending,
  #[serde(alias = "REVIEWED")]
  Reviewed,
  #[serde(alias = "ACCEPTED")]
  Accepted,
  #[serde(alias = "REJECTED")]
  Rejected,
}

impl ApplicationStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Reviewed => "reviewed",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
    }
  }

  /// Live applications block a new submission for the same project.
  pub fn is_live(self) -> bool { matches!(self, Self::Pending | Self::Reviewed) }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Accepted | Self::Rejected)
  }

  /// Whether a company may move an application from `self` to `next`.
  /// Re-applying the current status is not a transition.
  pub fn can_transition_to(self, next: Self) -> bool {
    use ApplicationStatus::*;
    matches!(
      (self, next),
      (Pending, Reviewed)
        | (Pending, Accepted)
        | (Pending, Rejected)
        | (Reviewed, Accepted)
        | (Reviewed, Rejected)
    )
  }

  /// [`Self::can_transition_to`] as a `Result`.
  pub fn check_transition(self, next: Self) -> Result<()> {
    if self.can_transition_to(next) {
      Ok(())
    } else {
      Err(Error::InvalidTransition { from: self, to: next })
    }
  }
}

impl fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

/// One student's application to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
  pub application_id: Uuid,
  pub student_id:     Uuid,
  pub project_id:     Uuid,
  /// Owner of `project_id` at submission time.
  pub company_id:     Uuid,
  pub cover_letter:   Option<String>,
  pub status:         ApplicationStatus,
  pub submitted_at:   DateTime<Utc>,
  /// Set by the first transition out of `Pending`; never changed afterwards.
  pub reviewed_at:    Option<DateTime<Utc>>,
}

/// Input to [`crate::store::ApplicationStore::insert_application`].
/// The id, status and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewApplication {
  pub student_id:   Uuid,
  pub project_id:   Uuid,
  pub company_id:   Uuid,
  pub cover_letter: Option<String>,
}

/// Trim a cover letter, treat blank as absent, and enforce the length bound.
pub fn normalize_cover_letter(raw: Option<String>) -> Result<Option<String>> {
  let Some(text) = raw else { return Ok(None) };
  let text = text.trim();
  if text.is_empty() {
    return Ok(None);
  }
  if text.chars().count() > MAX_COVER_LETTER_CHARS {
    return Err(Error::Validation(format!(
      "coverLetter must be at most {MAX_COVER_LETTER_CHARS} characters"
    )));
  }
  Ok(Some(text.to_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use ApplicationStatus::*;

  const ALL: [ApplicationStatus; 4] = [Pending, Reviewed, Accepted, Rejected];

  #[test]
  fn transition_table() {
    let allowed = [
      (Pending, Reviewed),
      (Pending, Accepted),
      (Pending, Rejected),
      (Reviewed, Accepted),
      (Reviewed, Rejected),
    ];
    for from in ALL {
      for to in ALL {
        assert_eq!(
          from.can_transition_to(to),
          allowed.contains(&(from, to)),
          "{from} -> {to}"
        );
      }
    }
  }

  #[test]
  fn terminal_states_have_no_exits() {
    for from in [Accepted, Rejected] {
      assert!(from.is_terminal());
      assert!(ALL.iter().all(|to| !from.can_transition_to(*to)));
    }
  }

  #[test]
  fn nothing_returns_to_pending() {
    for from in ALL {
      assert!(matches!(
        from.check_transition(Pending),
        Err(Error::InvalidTransition { to: Pending, .. })
      ));
    }
  }

  #[test]
  fn live_statuses() {
    assert!(Pending.is_live());
    assert!(Reviewed.is_live());
    assert!(!Accepted.is_live());
    assert!(!Rejected.is_live());
  }

  #[test]
  fn cover_letter_bounds() {
    assert_eq!(normalize_cover_letter(None).unwrap(), None);
    assert_eq!(normalize_cover_letter(Some("  \n".into())).unwrap(), None);
    assert_eq!(
      normalize_cover_letter(Some(" hello ".into())).unwrap().as_deref(),
      Some("hello")
    );
    let long = "x".repeat(MAX_COVER_LETTER_CHARS + 1);
    assert!(matches!(
      normalize_cover_letter(Some(long)),
      Err(Error::Validation(_))
    ));
  }
}
