//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, microsecond
//! precision) so that text comparison is chronological. Enum tags are stored
//! as their lowercase/kebab-case names. Id lists passed to `IN` filters are
//! bound as one JSON array and expanded with `json_each`.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use activflow_core::{
  activity::{Activity, Team},
  form::{FieldDefinition, FieldType, Form, parse_select_values},
  kpi::{Kpi, KpiType},
  user::{Profile, User},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Encode ids as a JSON array for `IN (SELECT value FROM json_each(?))`.
pub fn encode_ids(ids: &[i64]) -> Result<String> { Ok(serde_json::to_string(ids)?) }

fn decode_tag<T: std::str::FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownTag { kind, value: s.to_owned() })
}

pub fn decode_profile(s: &str) -> Result<Profile> { decode_tag("profile", s) }

pub fn decode_field_type(s: &str) -> Result<FieldType> { decode_tag("field type", s) }

pub fn decode_kpi_type(s: &str) -> Result<KpiType> { decode_tag("KPI type", s) }

/// Prefix every column of a column list with a table alias.
pub fn qualify(alias: &str, columns: &str) -> String {
  columns
    .split(", ")
    .map(|c| format!("{alias}.{c}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, email, firstname, lastname, profile, password_hash, is_active, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       i64,
  pub email:         String,
  pub firstname:     String,
  pub lastname:      String,
  pub profile:       String,
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      firstname:     row.get(2)?,
      lastname:      row.get(3)?,
      profile:       row.get(4)?,
      password_hash: row.get(5)?,
      is_active:     row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.user_id,
      email:         self.email,
      firstname:     self.firstname,
      lastname:      self.lastname,
      profile:       decode_profile(&self.profile)?,
      password_hash: self.password_hash,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const TEAM_COLUMNS: &str = "team_id, code, name, is_active";

pub fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
  Ok(Team {
    id:        row.get(0)?,
    code:      row.get(1)?,
    name:      row.get(2)?,
    is_active: row.get(3)?,
  })
}

pub const FORM_COLUMNS: &str = "form_id, name, is_active, created_at";

pub struct RawForm {
  pub form_id:    i64,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: String,
}

impl RawForm {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      form_id:    row.get(0)?,
      name:       row.get(1)?,
      is_active:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_form(self) -> Result<Form> {
    Ok(Form {
      id:         self.form_id,
      name:       self.name,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const FIELD_COLUMNS: &str =
  "field_id, form_id, label, slug, field_type, optional, select_values, rank";

pub struct RawField {
  pub field_id:      i64,
  pub form_id:       i64,
  pub label:         String,
  pub slug:          String,
  pub field_type:    String,
  pub optional:      bool,
  pub select_values: String,
  pub rank:          i64,
}

impl RawField {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      field_id:      row.get(0)?,
      form_id:       row.get(1)?,
      label:         row.get(2)?,
      slug:          row.get(3)?,
      field_type:    row.get(4)?,
      optional:      row.get(5)?,
      select_values: row.get(6)?,
      rank:          row.get(7)?,
    })
  }

  pub fn into_field(self) -> Result<FieldDefinition> {
    Ok(FieldDefinition {
      id:            self.field_id,
      form_id:       self.form_id,
      label:         self.label,
      slug:          self.slug,
      field_type:    decode_field_type(&self.field_type)?,
      optional:      self.optional,
      select_values: parse_select_values(&self.select_values),
      rank:          self.rank,
    })
  }
}

pub const ACTIVITY_COLUMNS: &str =
  "activity_id, name, description, form_id, is_active, created_at";

pub struct RawActivity {
  pub activity_id: i64,
  pub name:        String,
  pub description: Option<String>,
  pub form_id:     Option<i64>,
  pub is_active:   bool,
  pub created_at:  String,
}

impl RawActivity {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      form_id:     row.get(3)?,
      is_active:   row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      id:          self.activity_id,
      name:        self.name,
      description: self.description,
      form_id:     self.form_id,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const KPI_COLUMNS: &str =
  "kpi_id, activity_id, name, slug, kpi_type, description, value, is_active";

pub struct RawKpi {
  pub kpi_id:      i64,
  pub activity_id: i64,
  pub name:        String,
  pub slug:        String,
  pub kpi_type:    String,
  pub description: Option<String>,
  pub value:       f64,
  pub is_active:   bool,
}

impl RawKpi {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      kpi_id:      row.get(0)?,
      activity_id: row.get(1)?,
      name:        row.get(2)?,
      slug:        row.get(3)?,
      kpi_type:    row.get(4)?,
      description: row.get(5)?,
      value:       row.get(6)?,
      is_active:   row.get(7)?,
    })
  }

  pub fn into_kpi(self) -> Result<Kpi> {
    Ok(Kpi {
      id:          self.kpi_id,
      activity_id: self.activity_id,
      name:        self.name,
      slug:        self.slug,
      kpi_type:    decode_kpi_type(&self.kpi_type)?,
      description: self.description,
      value:       self.value,
      is_active:   self.is_active,
    })
  }
}
