//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enums are stored as their lower-case names.

use chrono::{DateTime, SecondsFormat, Utc};
use internlink_core::{
  application::{Application, ApplicationStatus},
  principal::{OAuthIdentity, OAuthProvider, Principal, PrincipalKind},
  profile::{CompanyProfile, Profile, StudentProfile},
  project::Project,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width UTC form so that text ordering matches time ordering.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_kind(k: PrincipalKind) -> &'static str { k.as_str() }

pub fn decode_kind(s: &str) -> Result<PrincipalKind> {
  match s {
    "student" => Ok(PrincipalKind::Student),
    "company" => Ok(PrincipalKind::Company),
    other => Err(Error::Decode { column: "kind", value: other.to_owned() }),
  }
}

pub fn encode_provider(p: OAuthProvider) -> &'static str { p.as_str() }

pub fn decode_provider(s: &str) -> Result<OAuthProvider> {
  match s {
    "google" => Ok(OAuthProvider::Google),
    other => Err(Error::Decode { column: "provider", value: other.to_owned() }),
  }
}

pub fn encode_status(s: ApplicationStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<ApplicationStatus> {
  match s {
    "pending" => Ok(ApplicationStatus::Pending),
    "reviewed" => Ok(ApplicationStatus::Reviewed),
    "accepted" => Ok(ApplicationStatus::Accepted),
    "rejected" => Ok(ApplicationStatus::Rejected),
    other => Err(Error::Decode { column: "status", value: other.to_owned() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `principals` row.
pub struct RawPrincipal {
  pub principal_id:  String,
  pub kind:          String,
  pub email:         String,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

/// Raw strings read from an `oauth_identities` row.
pub struct RawOAuthIdentity {
  pub provider:  String,
  pub subject:   String,
  pub linked_at: String,
}

impl RawOAuthIdentity {
  pub fn into_identity(self) -> Result<OAuthIdentity> {
    Ok(OAuthIdentity {
      provider:  decode_provider(&self.provider)?,
      subject:   self.subject,
      linked_at: decode_dt(&self.linked_at)?,
    })
  }
}

impl RawPrincipal {
  pub fn into_principal(self, links: Vec<RawOAuthIdentity>) -> Result<Principal> {
    Ok(Principal {
      principal_id:     decode_uuid(&self.principal_id)?,
      kind:             decode_kind(&self.kind)?,
      email:            self.email,
      password_hash:    self.password_hash,
      oauth_identities: links
        .into_iter()
        .map(RawOAuthIdentity::into_identity)
        .collect::<Result<_>>()?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// A `student_profiles` row. Integer columns come out of SQLite as `i64`.
pub struct RawStudentProfile {
  pub first_name:      String,
  pub last_name:       String,
  pub university_name: String,
  pub department:      String,
  pub current_year:    i64,
  pub graduation_year: i64,
}

impl RawStudentProfile {
  pub fn into_profile(self) -> Result<Profile> {
    let current_year = u8::try_from(self.current_year).map_err(|_| Error::Decode {
      column: "current_year",
      value:  self.current_year.to_string(),
    })?;
    let graduation_year =
      u16::try_from(self.graduation_year).map_err(|_| Error::Decode {
        column: "graduation_year",
        value:  self.graduation_year.to_string(),
      })?;
    Ok(Profile::Student(StudentProfile {
      first_name: self.first_name,
      last_name: self.last_name,
      university_name: self.university_name,
      department: self.department,
      current_year,
      graduation_year,
    }))
  }
}

/// A profile row from whichever table matches the principal's kind. Company
/// rows map one-to-one onto [`CompanyProfile`].
pub enum RawProfile {
  Student(RawStudentProfile),
  Company(CompanyProfile),
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    match self {
      Self::Student(raw) => raw.into_profile(),
      Self::Company(c) => Ok(Profile::Company(c)),
    }
  }
}

/// Raw strings read from a `projects` row.
pub struct RawProject {
  pub project_id:  String,
  pub company_id:  String,
  pub title:       String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawProject {
  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id:  decode_uuid(&self.project_id)?,
      company_id:  decode_uuid(&self.company_id)?,
      title:       self.title,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from an `applications` row.
pub struct RawApplication {
  pub application_id: String,
  pub student_id:     String,
  pub project_id:     String,
  pub company_id:     String,
  pub cover_letter:   Option<String>,
  pub status:         String,
  pub submitted_at:   String,
  pub reviewed_at:    Option<String>,
}

/// Column list matching [`RawApplication::from_row`].
pub const APPLICATION_COLUMNS: &str = "application_id, student_id, project_id, \
   company_id, cover_letter, status, submitted_at, reviewed_at";

impl RawApplication {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      student_id:     row.get(1)?,
      project_id:     row.get(2)?,
      company_id:     row.get(3)?,
      cover_letter:   row.get(4)?,
      status:         row.get(5)?,
      submitted_at:   row.get(6)?,
      reviewed_at:    row.get(7)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id: decode_uuid(&self.application_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      project_id:     decode_uuid(&self.project_id)?,
      company_id:     decode_uuid(&self.company_id)?,
      cover_letter:   self.cover_letter,
      status:         decode_status(&self.status)?,
      submitted_at:   decode_dt(&self.submitted_at)?,
      reviewed_at:    self.reviewed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
