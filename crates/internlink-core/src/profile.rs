//! Kind-specific profile records.
//!
//! A profile is created together with its principal and shares its id. The
//! identity core never reads profile fields except to validate them.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, principal::PrincipalKind};

const MAX_NAME_CHARS: usize = 120;

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
  pub first_name:      String,
  pub last_name:       String,
  pub university_name: String,
  pub department:      String,
  /// Year of study, 1-based.
  pub current_year:    u8,
  pub graduation_year: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
  pub company_name: String,
  pub industry:     String,
  pub website:      Option<String>,
  pub description:  Option<String>,
}

/// A profile of either kind. The variant determines the principal's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum Profile {
  Student(StudentProfile),
  Company(CompanyProfile),
}

impl Profile {
  pub fn kind(&self) -> PrincipalKind {
    match self {
      Self::Student(_) => PrincipalKind::Student,
      Self::Company(_) => PrincipalKind::Company,
    }
  }

  /// A short human-readable label (full name or company name).
  pub fn display_name(&self) -> String {
    match self {
      Self::Student(s) => format!("{} {}", s.first_name, s.last_name),
      Self::Company(c) => c.company_name.clone(),
    }
  }

  /// Check the mandatory fields for this kind.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Student(s) => {
        required("firstName", &s.first_name)?;
        required("lastName", &s.last_name)?;
        required("universityName", &s.university_name)?;
        required("department", &s.department)?;
        if !(1..=8).contains(&s.current_year) {
          return Err(Error::Validation(
            "currentYear must be between 1 and 8".into(),
          ));
        }
        let this_year = Utc::now().year();
        let grad = i32::from(s.graduation_year);
        if grad < this_year - 1 || grad > this_year + 10 {
          return Err(Error::Validation(format!(
            "graduationYear {grad} is out of range"
          )));
        }
        Ok(())
      }
      Self::Company(c) => {
        required("companyName", &c.company_name)?;
        required("industry", &c.industry)?;
        Ok(())
      }
    }
  }
}

fn required(field: &str, value: &str) -> Result<()> {
  let len = value.trim().chars().count();
  if len == 0 {
    return Err(Error::Validation(format!("{field} is required")));
  }
  if len > MAX_NAME_CHARS {
    return Err(Error::Validation(format!(
      "{field} must be at most {MAX_NAME_CHARS} characters"
    )));
  }
  Ok(())
}

// ─── Seed ────────────────────────────────────────────────────────────────────

/// Loosely-typed profile fields supplied alongside an OAuth login.
///
/// Only consulted when the login creates a new account; every field is
/// optional on the wire and checked against the declared kind by
/// [`ProfileSeed::into_profile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSeed {
  pub first_name:      Option<String>,
  pub last_name:       Option<String>,
  pub university_name: Option<String>,
  pub department:      Option<String>,
  pub current_year:    Option<u8>,
  pub graduation_year: Option<u16>,
  pub company_name:    Option<String>,
  pub industry:        Option<String>,
  pub website:         Option<String>,
  pub description:     Option<String>,
}

impl ProfileSeed {
  /// Build and validate a profile of `kind`, failing with
  /// [`Error::Validation`] if a mandatory field is missing.
  pub fn into_profile(self, kind: PrincipalKind) -> Result<Profile> {
    let profile = match kind {
      PrincipalKind::Student => Profile::Student(StudentProfile {
        first_name:      take("firstName", self.first_name)?,
        last_name:       take("lastName", self.last_name)?,
        university_name: take("universityName", self.university_name)?,
        department:      take("department", self.department)?,
        current_year:    take("currentYear", self.current_year)?,
        graduation_year: take("graduationYear", self.graduation_year)?,
      }),
      PrincipalKind::Company => Profile::Company(CompanyProfile {
        company_name: take("companyName", self.company_name)?,
        industry:     take("industry", self.industry)?,
        website:      self.website,
        description:  self.description,
      }),
    };
    profile.validate()?;
    Ok(profile)
  }
}

fn take<T>(field: &str, value: Option<T>) -> Result<T> {
  value.ok_or_else(|| Error::Validation(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn student_seed() -> ProfileSeed {
    ProfileSeed {
      first_name: Some("Ada".into()),
      last_name: Some("Lovelace".into()),
      university_name: Some("University of London".into()),
      department: Some("Mathematics".into()),
      current_year: Some(2),
      graduation_year: Some(Utc::now().year() as u16 + 2),
      ..Default::default()
    }
  }

  #[test]
  fn complete_student_seed_builds_profile() {
    let profile = student_seed().into_profile(PrincipalKind::Student).unwrap();
    assert_eq!(profile.kind(), PrincipalKind::Student);
    assert_eq!(profile.display_name(), "Ada Lovelace");
  }

  #[test]
  fn student_seed_is_not_a_company_profile() {
    let err = student_seed()
      .into_profile(PrincipalKind::Company)
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("companyName")));
  }

  #[test]
  fn blank_field_is_rejected() {
    let mut seed = student_seed();
    seed.department = Some("   ".into());
    assert!(matches!(
      seed.into_profile(PrincipalKind::Student),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn current_year_out_of_range() {
    let mut seed = student_seed();
    seed.current_year = Some(0);
    assert!(seed.into_profile(PrincipalKind::Student).is_err());
  }

  #[test]
  fn company_needs_name_and_industry() {
    let seed = ProfileSeed {
      company_name: Some("Acme".into()),
      ..Default::default()
    };
    let err = seed.into_profile(PrincipalKind::Company).unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("industry")));
  }
}
