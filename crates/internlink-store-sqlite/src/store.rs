//! [`SqliteStore`]: the SQLite implementation of the InternLink store traits.

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use internlink_core::{
  application::{Application, ApplicationStatus, NewApplication},
  principal::{NewPrincipal, OAuthIdentity, OAuthProvider, Principal},
  profile::{CompanyProfile, Profile},
  project::{NewProject, Project},
  store::{ApplicationStore, PrincipalStore, ProjectStore, Store, Write},
};

use crate::{
  Error, Result,
  encode::{
    APPLICATION_COLUMNS, RawApplication, RawOAuthIdentity, RawPrincipal,
    RawProfile, RawProject, RawStudentProfile, encode_dt, encode_kind,
    encode_provider, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An InternLink store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All
/// statements run on the connection's dedicated thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load a principal and its OAuth links by an arbitrary key column.
  async fn load_principal(
    &self,
    filter: &'static str,
    params: Vec<String>,
  ) -> Result<Option<Principal>> {
    let found = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT p.principal_id, p.kind, p.email, p.password_hash, p.created_at
           FROM principals p
           {filter}"
        );
        let raw = conn
          .query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
            Ok(RawPrincipal {
              principal_id:  row.get(0)?,
              kind:          row.get(1)?,
              email:         row.get(2)?,
              password_hash: row.get(3)?,
              created_at:    row.get(4)?,
            })
          })
          .optional()?;

        let Some(raw) = raw else { return Ok(None) };
        let links = select_links(conn, &raw.principal_id)?;
        Ok(Some((raw, links)))
      })
      .await?;

    found
      .map(|(raw, links)| raw.into_principal(links))
      .transpose()
  }

  async fn load_application(&self, id: Uuid) -> Result<Option<Application>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawApplication> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = ?1"
              ),
              rusqlite::params![id_str],
              RawApplication::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn list_applications(
    &self,
    column: &'static str,
    id: Uuid,
  ) -> Result<Vec<Application>> {
    let id_str = encode_uuid(id);

    let raws: Vec<RawApplication> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {APPLICATION_COLUMNS} FROM applications
           WHERE {column} = ?1
           ORDER BY submitted_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawApplication::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApplication::into_application).collect()
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Timestamps are stored at microsecond precision; truncate up front so that
/// values returned from a write compare equal to the same row read back.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// `true` for UNIQUE and PRIMARY KEY failures only. FOREIGN KEY and CHECK
/// failures are integrity errors, not lost races.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// Run a single write, mapping a uniqueness violation to `Ok(false)`.
fn execute_unique(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  match conn.execute(sql, params) {
    Ok(_) => Ok(true),
    Err(e) if is_unique_violation(&e) => Ok(false),
    Err(e) => Err(e),
  }
}

fn select_links(
  conn: &rusqlite::Connection,
  principal_id: &str,
) -> rusqlite::Result<Vec<RawOAuthIdentity>> {
  let mut stmt = conn.prepare(
    "SELECT provider, subject, linked_at FROM oauth_identities
     WHERE principal_id = ?1 ORDER BY linked_at",
  )?;
  stmt
    .query_map(rusqlite::params![principal_id], |row| {
      Ok(RawOAuthIdentity {
        provider:  row.get(0)?,
        subject:   row.get(1)?,
        linked_at: row.get(2)?,
      })
    })?
    .collect()
}

fn insert_profile(
  tx: &Transaction<'_>,
  principal_id: &str,
  profile: &Profile,
) -> rusqlite::Result<()> {
  match profile {
    Profile::Student(s) => tx.execute(
      "INSERT INTO student_profiles (
         principal_id, first_name, last_name, university_name,
         department, current_year, graduation_year
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      rusqlite::params![
        principal_id,
        s.first_name,
        s.last_name,
        s.university_name,
        s.department,
        s.current_year,
        s.graduation_year,
      ],
    )?,
    Profile::Company(c) => tx.execute(
      "INSERT INTO company_profiles (
         principal_id, company_name, industry, website, description
       ) VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        principal_id,
        c.company_name,
        c.industry,
        c.website,
        c.description,
      ],
    )?,
  };
  Ok(())
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;
}

impl PrincipalStore for SqliteStore {
  async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
    self
      .load_principal("WHERE p.email = ?1", vec![email.to_owned()])
      .await
  }

  async fn find_by_oauth(
    &self,
    provider: OAuthProvider,
    subject: &str,
  ) -> Result<Option<Principal>> {
    self
      .load_principal(
        "JOIN oauth_identities o ON o.principal_id = p.principal_id
         WHERE o.provider = ?1 AND o.subject = ?2",
        vec![encode_provider(provider).to_owned(), subject.to_owned()],
      )
      .await
  }

  async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>> {
    self
      .load_principal("WHERE p.principal_id = ?1", vec![encode_uuid(id)])
      .await
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let raw: Option<Option<RawProfile>> = self
      .conn
      .call(move |conn| {
        let kind: Option<String> = conn
          .query_row(
            "SELECT kind FROM principals WHERE principal_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        let profile = match kind.as_deref() {
          None => return Ok(None),
          Some("student") => conn
            .query_row(
              "SELECT first_name, last_name, university_name, department,
                      current_year, graduation_year
               FROM student_profiles WHERE principal_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawProfile::Student(RawStudentProfile {
                  first_name:      row.get(0)?,
                  last_name:       row.get(1)?,
                  university_name: row.get(2)?,
                  department:      row.get(3)?,
                  current_year:    row.get(4)?,
                  graduation_year: row.get(5)?,
                }))
              },
            )
            .optional()?,
          Some(_) => conn
            .query_row(
              "SELECT company_name, industry, website, description
               FROM company_profiles WHERE principal_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawProfile::Company(CompanyProfile {
                  company_name: row.get(0)?,
                  industry:     row.get(1)?,
                  website:      row.get(2)?,
                  description:  row.get(3)?,
                }))
              },
            )
            .optional()?,
        };
        Ok(Some(profile))
      })
      .await?;

    match raw {
      None => Ok(None),
      Some(None) => Err(Error::MissingProfile(id)),
      Some(Some(raw)) => raw.into_profile().map(Some),
    }
  }

  async fn create_principal(&self, input: NewPrincipal) -> Result<Write<Principal>> {
    let created_at = now();
    let principal = Principal {
      principal_id:     Uuid::new_v4(),
      kind:             input.kind(),
      email:            input.email,
      password_hash:    input.password_hash,
      oauth_identities: input
        .oauth
        .map(|(provider, subject)| OAuthIdentity {
          provider,
          subject,
          linked_at: created_at,
        })
        .into_iter()
        .collect(),
      created_at,
    };

    let id_str   = encode_uuid(principal.principal_id);
    let kind_str = encode_kind(principal.kind).to_owned();
    let email    = principal.email.clone();
    let hash     = principal.password_hash.clone();
    let at_str   = encode_dt(created_at);
    let link     = principal
      .oauth_identities
      .first()
      .map(|i| (encode_provider(i.provider).to_owned(), i.subject.clone()));
    let profile  = input.profile;

    let committed = self
      .conn
      .call(move |conn| {
        // Dropping `tx` without commit rolls everything back.
        let tx = conn.transaction()?;

        if !execute_unique(
          &tx,
          "INSERT INTO principals (principal_id, kind, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, kind_str, email, hash, at_str],
        )? {
          return Ok(false);
        }

        insert_profile(&tx, &id_str, &profile)?;

        if let Some((provider, subject)) = link
          && !execute_unique(
            &tx,
            "INSERT INTO oauth_identities (provider, subject, principal_id, linked_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![provider, subject, id_str, at_str],
          )?
        {
          return Ok(false);
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if committed { Write::Applied(principal) } else { Write::Conflict })
  }

  async fn link_oauth(
    &self,
    principal_id: Uuid,
    provider: OAuthProvider,
    subject: String,
  ) -> Result<Write<Principal>> {
    let id_str       = encode_uuid(principal_id);
    let provider_str = encode_provider(provider).to_owned();
    let at_str       = encode_dt(now());

    let linked = self
      .conn
      .call(move |conn| {
        Ok(execute_unique(
          conn,
          "INSERT INTO oauth_identities (provider, subject, principal_id, linked_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![provider_str, subject, id_str, at_str],
        )?)
      })
      .await?;

    if !linked {
      return Ok(Write::Conflict);
    }
    // The foreign key guarantees the principal exists once the link is in.
    self
      .get_principal(principal_id)
      .await?
      .map(Write::Applied)
      .ok_or(Error::PrincipalNotFound(principal_id))
  }
}

impl ProjectStore for SqliteStore {
  async fn create_project(&self, input: NewProject) -> Result<Project> {
    let project = Project {
      project_id:  Uuid::new_v4(),
      company_id:  input.company_id,
      title:       input.title,
      description: input.description,
      created_at:  now(),
    };

    let id_str      = encode_uuid(project.project_id);
    let company_str = encode_uuid(project.company_id);
    let title       = project.title.clone();
    let description = project.description.clone();
    let at_str      = encode_dt(project.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, company_id, title, description, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, company_str, title, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT project_id, company_id, title, description, created_at
               FROM projects WHERE project_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawProject {
                  project_id:  row.get(0)?,
                  company_id:  row.get(1)?,
                  title:       row.get(2)?,
                  description: row.get(3)?,
                  created_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }
}

impl ApplicationStore for SqliteStore {
  async fn insert_application(
    &self,
    input: NewApplication,
  ) -> Result<Write<Application>> {
    let application = Application {
      application_id: Uuid::new_v4(),
      student_id:     input.student_id,
      project_id:     input.project_id,
      company_id:     input.company_id,
      cover_letter:   input.cover_letter,
      status:         ApplicationStatus::Pending,
      submitted_at:   now(),
      reviewed_at:    None,
    };

    let id_str       = encode_uuid(application.application_id);
    let student_str  = encode_uuid(application.student_id);
    let project_str  = encode_uuid(application.project_id);
    let company_str  = encode_uuid(application.company_id);
    let cover_letter = application.cover_letter.clone();
    let status_str   = encode_status(application.status).to_owned();
    let at_str       = encode_dt(application.submitted_at);

    // The partial unique index `applications_live_idx` makes the liveness
    // check and the insert a single atomic step.
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(execute_unique(
          conn,
          "INSERT INTO applications (
             application_id, student_id, project_id, company_id,
             cover_letter, status, submitted_at, reviewed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
          rusqlite::params![
            id_str,
            student_str,
            project_str,
            company_str,
            cover_letter,
            status_str,
            at_str,
          ],
        )?)
      })
      .await?;

    Ok(if inserted { Write::Applied(application) } else { Write::Conflict })
  }

  async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
    self.load_application(id).await
  }

  async fn find_live_application(
    &self,
    student_id: Uuid,
    project_id: Uuid,
  ) -> Result<Option<Application>> {
    let student_str = encode_uuid(student_id);
    let project_str = encode_uuid(project_id);

    let raw: Option<RawApplication> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications
                 WHERE student_id = ?1 AND project_id = ?2
                   AND status IN ('pending', 'reviewed')"
              ),
              rusqlite::params![student_str, project_str],
              RawApplication::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn update_status(
    &self,
    id: Uuid,
    expected: ApplicationStatus,
    next: ApplicationStatus,
    reviewed_at: DateTime<Utc>,
  ) -> Result<Write<Application>> {
    let id_str       = encode_uuid(id);
    let expected_str = encode_status(expected).to_owned();
    let next_str     = encode_status(next).to_owned();
    let at_str       = encode_dt(reviewed_at.trunc_subsecs(6));

    let raw: Option<RawApplication> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE applications
                 SET status = ?3, reviewed_at = COALESCE(reviewed_at, ?4)
                 WHERE application_id = ?1 AND status = ?2
                 RETURNING {APPLICATION_COLUMNS}"
              ),
              rusqlite::params![id_str, expected_str, next_str, at_str],
              RawApplication::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => Ok(Write::Applied(raw.into_application()?)),
      None => Ok(Write::Conflict),
    }
  }

  async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Application>> {
    self.list_applications("student_id", student_id).await
  }

  async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Application>> {
    self.list_applications("project_id", project_id).await
  }
}
