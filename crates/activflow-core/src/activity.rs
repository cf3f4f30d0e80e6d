//! Activities and the teams assigned to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked initiative: teams, one data-collection form and KPIs hang off
/// it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
  pub form_id:     Option<i64>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
  pub name:        String,
  pub description: Option<String>,
  pub form_id:     Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
  pub id:        i64,
  /// Unique across teams; dashboards key their output by it.
  pub code:      String,
  pub name:      String,
  pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
  pub code: String,
  pub name: String,
}
