//! KPI definitions, per-team objective shares, the result log and
//! objective→result links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

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
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KpiType {
  /// A target; `value` is the activity-level goal.
  Objective,
  /// Measured contributions, logged per team over time.
  Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
  pub id:          i64,
  pub activity_id: i64,
  pub name:        String,
  /// Unique within the activity among live KPIs.
  pub slug:        String,
  pub kpi_type:    KpiType,
  pub description: Option<String>,
  /// For objectives, the activity-level target.
  pub value:       f64,
  pub is_active:   bool,
}

/// Request to create a KPI.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKpi {
  pub activity_id: i64,
  pub name:        String,
  pub kpi_type:    KpiType,
  pub description: Option<String>,
}

/// Input to [`crate::store::ActivityStore::create_kpi`].
#[derive(Debug, Clone)]
pub struct NewKpi {
  pub activity_id: i64,
  pub name:        String,
  pub slug:        String,
  pub kpi_type:    KpiType,
  pub description: Option<String>,
}

/// A team's share of an objective KPI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamObjectiveKpi {
  pub team_id: i64,
  pub kpi_id:  i64,
  pub value:   f64,
}

/// One appended result contribution. Rows are summed, never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamResultKpi {
  pub team_id:     i64,
  pub kpi_id:      i64,
  pub value:       f64,
  pub recorded_at: DateTime<Utc>,
}

/// Pairs one result KPI with the objective it realises. A result has at most
/// one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveResultLink {
  pub objective_id: i64,
  pub result_id:    i64,
}

/// Request body of a link operation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LinkKpis {
  pub objective_id: i64,
  pub result_id:    i64,
}

/// Dense per-team view of objective shares, one entry per active objective.
#[derive(Debug, Clone, Serialize)]
pub struct TeamObjectives {
  pub team_id: i64,
  pub code:    String,
  pub name:    String,
  pub kpis:    Vec<TeamObjectiveValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamObjectiveValue {
  pub kpi_id: i64,
  pub name:   String,
  pub slug:   String,
  pub value:  f64,
}

/// Body of the fill operations. For team objectives, `datas` maps each team
/// code to an object of KPI slug → value; otherwise it maps KPI slug → value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FillKpi {
  pub datas: serde_json::Map<String, serde_json::Value>,
}
