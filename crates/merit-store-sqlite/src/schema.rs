//! SQL schemas for the two Merit SQLite databases.
//!
//! Each is executed once at connection startup and is idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`.

/// Content database: one JSON document per achievement.
pub const CONTENT_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The full document lives in doc; the other columns mirror fields that are
-- filtered on. is_deleted and deleted_at are authoritative over the copy in doc.
CREATE TABLE IF NOT EXISTS achievement_documents (
    content_id    TEXT PRIMARY KEY,
    student_code  TEXT NOT NULL,
    doc           TEXT NOT NULL,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    deleted_at    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_student_idx ON achievement_documents(student_code);
CREATE INDEX IF NOT EXISTS documents_live_idx    ON achievement_documents(is_deleted);

PRAGMA user_version = 1;
";

/// Reference database: workflow rows plus the student/lecturer directory.
pub const REFERENCE_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS lecturers (
    lecturer_id    TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL UNIQUE,
    lecturer_code  TEXT NOT NULL UNIQUE,
    full_name      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id     TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL UNIQUE,
    student_code   TEXT NOT NULL UNIQUE,
    full_name      TEXT NOT NULL,
    advisor_id     TEXT REFERENCES lecturers(lecturer_id)
);

-- Rows are never deleted; 'deleted' is a status.
CREATE TABLE IF NOT EXISTS achievement_references (
    reference_id    TEXT PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES students(student_id),
    content_id      TEXT NOT NULL UNIQUE,
    status          TEXT NOT NULL DEFAULT 'draft',
    submitted_at    TEXT,
    verified_at     TEXT,
    verified_by     TEXT,
    rejection_note  TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    version         INTEGER NOT NULL DEFAULT 1,
    CHECK (status IN ('draft', 'submitted', 'verified', 'rejected', 'deleted'))
);

CREATE INDEX IF NOT EXISTS references_student_idx ON achievement_references(student_id);
CREATE INDEX IF NOT EXISTS references_status_idx  ON achievement_references(status);

PRAGMA user_version = 1;
";
