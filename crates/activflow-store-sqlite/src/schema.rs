//! SQL schema for the ActivFlow SQLite store.
//!
//! Executed once at connection startup. Every table carrying an
//! `is_deleted` flag has a `live_*` view filtering it out; reads use the
//! views so the soft-delete predicate lives in one place.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT    NOT NULL,
    firstname     TEXT    NOT NULL,
    lastname      TEXT    NOT NULL,
    profile       TEXT    NOT NULL,   -- 'admin' | 'supervisor' | 'sampler' | 'viewer'
    password_hash TEXT    NOT NULL,   -- argon2 PHC string
    is_active     INTEGER NOT NULL DEFAULT 1,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    team_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    code       TEXT    NOT NULL,
    name       TEXT    NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    member_id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id   INTEGER NOT NULL REFERENCES teams(team_id),
    user_id   INTEGER NOT NULL REFERENCES users(user_id),
    UNIQUE (team_id, user_id)
);

CREATE TABLE IF NOT EXISTS forms (
    form_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT    NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS form_fields (
    field_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id       INTEGER NOT NULL REFERENCES forms(form_id),
    label         TEXT    NOT NULL,
    slug          TEXT    NOT NULL,
    field_type    TEXT    NOT NULL,
    optional      INTEGER NOT NULL DEFAULT 0,
    select_values TEXT    NOT NULL DEFAULT '',  -- semicolon-delimited
    rank          INTEGER NOT NULL,
    is_deleted    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS activities (
    activity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    description TEXT,
    form_id     INTEGER REFERENCES forms(form_id),
    is_active   INTEGER NOT NULL DEFAULT 1,
    is_deleted  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_teams (
    assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    activity_id   INTEGER NOT NULL REFERENCES activities(activity_id),
    team_id       INTEGER NOT NULL REFERENCES teams(team_id),
    UNIQUE (activity_id, team_id)
);

-- One row per (session, field). Rows of a session are written in one
-- transaction and never updated.
CREATE TABLE IF NOT EXISTS submissions (
    row_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT    NOT NULL,
    field_id   INTEGER NOT NULL REFERENCES form_fields(field_id),
    user_id    INTEGER NOT NULL REFERENCES users(user_id),
    value      TEXT    NOT NULL,
    created_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS kpis (
    kpi_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    activity_id INTEGER NOT NULL REFERENCES activities(activity_id),
    name        TEXT    NOT NULL,
    slug        TEXT    NOT NULL,
    kpi_type    TEXT    NOT NULL,   -- 'objective' | 'result'
    description TEXT,
    value       REAL    NOT NULL DEFAULT 0,
    is_active   INTEGER NOT NULL DEFAULT 1,
    is_deleted  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS team_objective_kpis (
    team_id INTEGER NOT NULL REFERENCES teams(team_id),
    kpi_id  INTEGER NOT NULL REFERENCES kpis(kpi_id),
    value   REAL    NOT NULL,
    PRIMARY KEY (team_id, kpi_id)
);

-- Append-only result log.
CREATE TABLE IF NOT EXISTS team_result_kpis (
    row_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id     INTEGER NOT NULL REFERENCES teams(team_id),
    kpi_id      INTEGER NOT NULL REFERENCES kpis(kpi_id),
    value       REAL    NOT NULL,
    recorded_at TEXT    NOT NULL
);

-- A result is linked to at most one objective.
CREATE TABLE IF NOT EXISTS objective_result_links (
    result_id    INTEGER PRIMARY KEY REFERENCES kpis(kpi_id),
    objective_id INTEGER NOT NULL REFERENCES kpis(kpi_id),
    created_at   TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_idx
    ON users(email) WHERE is_deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS teams_code_idx
    ON teams(code) WHERE is_deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS form_fields_slug_idx
    ON form_fields(form_id, slug) WHERE is_deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS kpis_slug_idx
    ON kpis(activity_id, slug) WHERE is_deleted = 0;

CREATE INDEX IF NOT EXISTS submissions_session_idx ON submissions(session_id);
CREATE INDEX IF NOT EXISTS submissions_user_idx    ON submissions(user_id, created_at);
CREATE INDEX IF NOT EXISTS results_kpi_idx         ON team_result_kpis(kpi_id, recorded_at);

CREATE VIEW IF NOT EXISTS live_users       AS SELECT * FROM users       WHERE is_deleted = 0;
CREATE VIEW IF NOT EXISTS live_teams       AS SELECT * FROM teams       WHERE is_deleted = 0;
CREATE VIEW IF NOT EXISTS live_forms       AS SELECT * FROM forms       WHERE is_deleted = 0;
CREATE VIEW IF NOT EXISTS live_form_fields AS SELECT * FROM form_fields WHERE is_deleted = 0;
CREATE VIEW IF NOT EXISTS live_activities  AS SELECT * FROM activities  WHERE is_deleted = 0;
CREATE VIEW IF NOT EXISTS live_kpis        AS SELECT * FROM kpis        WHERE is_deleted = 0;

PRAGMA user_version = 1;
";
