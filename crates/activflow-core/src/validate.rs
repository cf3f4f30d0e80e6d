//! Dynamic form data validation.
//!
//! A [`FormSchema`] describes the fields a payload may carry: their type tag,
//! their enumeration (for `select`/`checkbox`) and whether they are required.
//! [`validate`] checks a JSON object against it and never fails: it returns a
//! [`Validation`] verdict carrying a single message.
//!
//! Only the last failure survives. A missing-fields error is recorded first
//! and is overwritten by any later per-field error, and field errors
//! overwrite each other in schema order.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  form::{FieldDefinition, FieldType},
};

/// Extensions accepted for `file` fields.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
  "jpg", "jpeg", "png", "gif", "bmp", "webp", "pdf", "doc", "docx", "xls",
  "xlsx", "ppt", "pptx", "txt", "csv", "zip", "rar",
];

/// Extensions accepted for `image` and `multi-image` fields.
pub const IMAGE_EXTENSIONS: &[&str] =
  &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

const SIMPLE_TEXT_MAX: usize = 255;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
  )
  .expect("valid email regex")
});

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Validation rule for one known slug.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
  pub slug:          String,
  /// Field type tag, e.g. `simple-text`. Unknown tags always fail.
  pub field_type:    String,
  pub select_values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FormSchema {
  rules:    Vec<FieldRule>,
  required: Vec<String>,
}

impl FormSchema {
  pub fn new() -> Self { Self::default() }

  /// Append a rule. Rules are checked in insertion order.
  pub fn push(&mut self, rule: FieldRule, required: bool) {
    if required {
      self.required.push(rule.slug.clone());
    }
    self.rules.push(rule);
  }

  /// Builder form of [`FormSchema::push`].
  pub fn with(
    mut self,
    slug: &str,
    field_type: &str,
    select_values: &[&str],
    required: bool,
  ) -> Self {
    self.push(
      FieldRule {
        slug:          slug.to_owned(),
        field_type:    field_type.to_owned(),
        select_values: select_values.iter().map(|s| (*s).to_owned()).collect(),
      },
      required,
    );
    self
  }

  /// Schema of a form: every live field, required unless `optional`.
  pub fn from_fields(fields: &[FieldDefinition]) -> Self {
    let mut schema = Self::new();
    for field in fields {
      schema.push(
        FieldRule {
          slug:          field.slug.clone(),
          field_type:    field.field_type.as_ref().to_owned(),
          select_values: if field.field_type.has_enumeration() {
            field.select_values.clone()
          } else {
            Vec::new()
          },
        },
        !field.optional,
      );
    }
    schema
  }

  /// Schema for a KPI fill: every slug is a required `number`.
  pub fn numeric<'a>(slugs: impl IntoIterator<Item = &'a str>) -> Self {
    let mut schema = Self::new();
    for slug in slugs {
      schema.push(
        FieldRule {
          slug:          slug.to_owned(),
          field_type:    FieldType::Number.as_ref().to_owned(),
          select_values: Vec::new(),
        },
        true,
      );
    }
    schema
  }

  pub fn rules(&self) -> &[FieldRule] { &self.rules }

  pub fn required(&self) -> &[String] { &self.required }
}

// ─── Verdict ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
  pub ok:    bool,
  pub error: Option<String>,
}

impl Validation {
  pub const VALID_MESSAGE: &'static str = "Data is valid";

  pub fn message(&self) -> &str {
    self.error.as_deref().unwrap_or(Self::VALID_MESSAGE)
  }

  /// Turn a failing verdict into [`Error::BadRequest`] carrying the message
  /// verbatim.
  pub fn into_result(self) -> Result<()> {
    match self.error {
      Some(message) => Err(Error::BadRequest(message)),
      None => Ok(()),
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check `payload` against `schema`. Keys the schema does not know are
/// ignored.
pub fn validate(schema: &FormSchema, payload: &Map<String, Value>) -> Validation {
  let mut error: Option<String> = None;

  let missing: Vec<&str> = schema
    .required
    .iter()
    .filter(|slug| !payload.contains_key(slug.as_str()))
    .map(String::as_str)
    .collect();
  if !missing.is_empty() {
    error = Some(format!("Missing required fields: {}", missing.join(", ")));
  }

  for rule in &schema.rules {
    let Some(value) = payload.get(&rule.slug) else {
      continue;
    };
    if let Err(message) =
      check_field(&rule.slug, value, &rule.field_type, &rule.select_values)
    {
      error = Some(message);
    }
  }

  Validation { ok: error.is_none(), error }
}

/// Check a single value against a field type tag.
pub fn check_field(
  slug: &str,
  value: &Value,
  field_type: &str,
  select_values: &[String],
) -> Result<(), String> {
  let Ok(field_type) = field_type.parse::<FieldType>() else {
    return Err(format!("the field {slug} has an unknown type"));
  };

  let (valid, expectation) = match field_type {
    FieldType::SimpleText => (
      non_empty_str(value).is_some_and(|s| s.chars().count() <= SIMPLE_TEXT_MAX),
      "must be a simple text and not empty".to_owned(),
    ),
    FieldType::LongText => (
      non_empty_str(value).is_some(),
      "must be a long text and not empty".to_owned(),
    ),
    FieldType::Email => (
      value.as_str().is_some_and(is_email),
      "must be an email".to_owned(),
    ),
    FieldType::Uuid => (
      value.as_str().is_some_and(is_uuid),
      "must be a uuid".to_owned(),
    ),
    FieldType::Date => (
      non_empty_str(value)
        .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
      "must be a string date".to_owned(),
    ),
    FieldType::Time => (
      non_empty_str(value)
        .is_some_and(|s| NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()),
      "must be a string time".to_owned(),
    ),
    FieldType::Datetime => (
      non_empty_str(value).is_some_and(|s| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
      }),
      "must be a string datetime".to_owned(),
    ),
    FieldType::Boolean => (value.is_boolean(), "must be a boolean".to_owned()),
    FieldType::Integer => (is_integer(value), "must be an integer".to_owned()),
    FieldType::Number => (value.is_number(), "must be a number".to_owned()),
    FieldType::Float => (value.is_number(), "must be a float".to_owned()),
    FieldType::Select => (
      non_empty_str(value).is_some_and(|s| select_values.iter().any(|v| v == s)),
      format!("must be one of: {}", select_values.join(", ")),
    ),
    FieldType::Checkbox => (
      non_empty_list(value).is_some_and(|items| {
        items.iter().all(|item| {
          item.as_str().is_some_and(|s| select_values.iter().any(|v| v == s))
        })
      }),
      format!("must be a list of values among: {}", select_values.join(", ")),
    ),
    FieldType::File => (
      non_empty_str(value)
        .is_some_and(|s| has_extension(s, DOCUMENT_EXTENSIONS)),
      format!(
        "must be a file and extensions allowed are {}",
        DOCUMENT_EXTENSIONS.join(", ")
      ),
    ),
    FieldType::Image => (
      non_empty_str(value).is_some_and(|s| has_extension(s, IMAGE_EXTENSIONS)),
      format!(
        "must be an image and extensions allowed are {}",
        IMAGE_EXTENSIONS.join(", ")
      ),
    ),
    FieldType::MultiImage => (
      non_empty_list(value).is_some_and(|items| {
        items.iter().all(|item| {
          item.as_str().is_some_and(|s| has_extension(s, IMAGE_EXTENSIONS))
        })
      }),
      format!(
        "must be a list of images and extensions allowed are {}",
        IMAGE_EXTENSIONS.join(", ")
      ),
    ),
    FieldType::Location => (
      non_empty_str(value).is_some_and(|s| s.split(',').count() == 2),
      "must be a location".to_owned(),
    ),
  };

  if valid {
    Ok(())
  } else {
    Err(format!("the field {slug} {expectation}"))
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

fn non_empty_str(value: &Value) -> Option<&str> {
  value.as_str().filter(|s| !s.is_empty())
}

fn non_empty_list(value: &Value) -> Option<&Vec<Value>> {
  value.as_array().filter(|items| !items.is_empty())
}

fn is_email(s: &str) -> bool { s.len() <= 254 && EMAIL_REGEX.is_match(s) }

/// Canonical hyphenated form only.
fn is_uuid(s: &str) -> bool {
  s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()
}

fn is_integer(value: &Value) -> bool {
  match value {
    Value::Number(n) => {
      n.is_i64()
        || n.is_u64()
        || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
    }
    _ => false,
  }
}

/// The extension is whatever follows the last `.`; a name without a dot is
/// its own extension.
fn has_extension(name: &str, allowed: &[&str]) -> bool {
  let ext = name.rsplit('.').next().unwrap_or(name);
  allowed.contains(&ext)
}
