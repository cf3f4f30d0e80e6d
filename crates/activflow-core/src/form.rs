//! Forms, field definitions and submitted rows.
//!
//! A form is a list of typed fields. A submission ("session") stores one text
//! row per field, all stamped with the same session UUID.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

// ─── Field types ─────────────────────────────────────────────────────────────

/// The semantic type of a form field. The string form (`simple-text`,
/// `multi-image`, ...) is what gets stored and what the validator dispatches
/// on.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FieldType {
  SimpleText,
  LongText,
  Email,
  Uuid,
  Number,
  Integer,
  Float,
  Date,
  Time,
  Datetime,
  Boolean,
  Select,
  Checkbox,
  File,
  Location,
  Image,
  MultiImage,
}

impl FieldType {
  pub fn label(self) -> &'static str {
    match self {
      FieldType::SimpleText => "Simple Text",
      FieldType::LongText => "Long Text",
      FieldType::Email => "Email",
      FieldType::Uuid => "Uuid",
      FieldType::Number => "Number",
      FieldType::Integer => "Integer",
      FieldType::Float => "Float",
      FieldType::Date => "Date",
      FieldType::Time => "Time",
      FieldType::Datetime => "Datetime",
      FieldType::Boolean => "Boolean",
      FieldType::Select => "Select",
      FieldType::Checkbox => "Checkbox",
      FieldType::File => "File",
      FieldType::Location => "Location",
      FieldType::Image => "Image",
      FieldType::MultiImage => "Multi Image",
    }
  }

  /// Whether new fields may be created with this type.
  pub fn enabled(self) -> bool {
    !matches!(self, FieldType::Uuid | FieldType::Boolean | FieldType::Checkbox)
  }

  /// Types whose values must come from the field's `select_values`.
  pub fn has_enumeration(self) -> bool {
    matches!(self, FieldType::Select | FieldType::Checkbox)
  }
}

/// One entry of the field type catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct FieldTypeInfo {
  pub value:   FieldType,
  pub label:   &'static str,
  pub enabled: bool,
}

/// Every known field type, in declaration order.
pub fn catalogue() -> Vec<FieldTypeInfo> {
  FieldType::iter()
    .map(|t| FieldTypeInfo { value: t, label: t.label(), enabled: t.enabled() })
    .collect()
}

// ─── Forms and fields ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
  pub id:         i64,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewForm {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
  pub id:            i64,
  pub form_id:       i64,
  pub label:         String,
  /// Unique within the form among live fields.
  pub slug:          String,
  pub field_type:    FieldType,
  pub optional:      bool,
  pub select_values: Vec<String>,
  pub rank:          i64,
}

/// Request to add a field, as supplied by an administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct AddField {
  pub label:         String,
  /// A catalogue tag such as `select`; checked against [`catalogue`].
  pub field_type:    String,
  #[serde(default)]
  pub optional:      bool,
  /// Semicolon-delimited, as stored.
  pub select_values: Option<String>,
}

/// Input to [`crate::store::ActivityStore::add_field`]. The store assigns
/// `id` and `rank`.
#[derive(Debug, Clone)]
pub struct NewField {
  pub form_id:       i64,
  pub label:         String,
  pub slug:          String,
  pub field_type:    FieldType,
  pub optional:      bool,
  pub select_values: Vec<String>,
}

/// Split a stored `a;b;c` enumeration into its members.
pub fn parse_select_values(raw: &str) -> Vec<String> {
  raw
    .split(';')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
    .collect()
}

/// Join an enumeration back into its stored form.
pub fn join_select_values(values: &[String]) -> String { values.join(";") }

// ─── Submissions ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::ActivityStore::insert_submission`]. All rows are
/// written together or not at all.
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub session_id:   Uuid,
  pub user_id:      i64,
  pub submitted_at: DateTime<Utc>,
  /// `(field_id, value)` pairs.
  pub values:       Vec<(i64, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id:   Uuid,
  pub user_id:      i64,
  pub submitted_at: DateTime<Utc>,
}

/// A submission read back, values keyed by field slug.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
  pub session_id:   Uuid,
  pub user_id:      i64,
  pub submitted_at: DateTime<Utc>,
  pub values:       BTreeMap<String, String>,
}

/// Text form of a submitted value. Lists are comma-joined.
pub fn value_to_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    Value::Array(items) => items
      .iter()
      .map(value_to_text)
      .collect::<Vec<_>>()
      .join(","),
    other => other.to_string(),
  }
}
