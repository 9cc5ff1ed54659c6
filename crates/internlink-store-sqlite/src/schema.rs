//! SQL schema for the InternLink SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Email is unique across both kinds: a student and a company cannot share it.
CREATE TABLE IF NOT EXISTS principals (
    principal_id   TEXT PRIMARY KEY,
    kind           TEXT NOT NULL CHECK (kind IN ('student', 'company')),
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT,             -- NULL for OAuth-only accounts
    created_at     TEXT NOT NULL
);

-- A provider subject is bound to exactly one principal, and a principal
-- holds at most one link per provider.
CREATE TABLE IF NOT EXISTS oauth_identities (
    provider      TEXT NOT NULL,
    subject       TEXT NOT NULL,
    principal_id  TEXT NOT NULL REFERENCES principals(principal_id),
    linked_at     TEXT NOT NULL,
    PRIMARY KEY (provider, subject),
    UNIQUE (principal_id, provider)
);

CREATE TABLE IF NOT EXISTS student_profiles (
    principal_id     TEXT PRIMARY KEY REFERENCES principals(principal_id),
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    university_name  TEXT NOT NULL,
    department       TEXT NOT NULL,
    current_year     INTEGER NOT NULL,
    graduation_year  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS company_profiles (
    principal_id  TEXT PRIMARY KEY REFERENCES principals(principal_id),
    company_name  TEXT NOT NULL,
    industry      TEXT NOT NULL,
    website       TEXT,
    description   TEXT
);

CREATE TABLE IF NOT EXISTS projects (
    project_id   TEXT PRIMARY KEY,
    company_id   TEXT NOT NULL REFERENCES principals(principal_id),
    title        TEXT NOT NULL,
    description  TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    application_id  TEXT PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES principals(principal_id),
    project_id      TEXT NOT NULL REFERENCES projects(project_id),
    company_id      TEXT NOT NULL REFERENCES principals(principal_id),
    cover_letter    TEXT,
    status          TEXT NOT NULL
                    CHECK (status IN ('pending', 'reviewed', 'accepted', 'rejected')),
    submitted_at    TEXT NOT NULL,
    reviewed_at     TEXT
);

-- At most one live application per (student, project). Terminal ones do not
-- block a resubmission.
CREATE UNIQUE INDEX IF NOT EXISTS applications_live_idx
    ON applications(student_id, project_id)
    WHERE status IN ('pending', 'reviewed');

CREATE INDEX IF NOT EXISTS applications_student_idx ON applications(student_id);
CREATE INDEX IF NOT EXISTS applications_project_idx ON applications(project_id);
CREATE INDEX IF NOT EXISTS oauth_principal_idx      ON oauth_identities(principal_id);

PRAGMA user_version = 1;
";
