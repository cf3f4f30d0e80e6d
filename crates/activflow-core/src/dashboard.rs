//! KPI aggregation: date ranges, team scoping and the dense dashboard
//! matrices.
//!
//! Everything here is synchronous and works on rows already fetched by the
//! service layer. Every target team and every active KPI appears in the
//! output, zero-filled when no rows exist.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  activity::Team,
  kpi::{Kpi, TeamObjectiveKpi, TeamResultKpi},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest range, in days, a dashboard may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

// ─── Query ───────────────────────────────────────────────────────────────────

/// Common parameters of the dashboard operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  /// Empty means every team assigned to the activity.
  #[serde(default)]
  pub team_ids:   Vec<i64>,
}

impl DashboardQuery {
  pub fn range(&self) -> Result<DateRange> {
    DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref())
  }
}

// ─── Date range ──────────────────────────────────────────────────────────────

/// An inclusive range of whole UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  start: NaiveDate,
  end:   NaiveDate,
}

/// A half-open instant interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl TimeWindow {
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at < self.end
  }
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start > end {
      return Err(Error::BadRequest(
        "start date must not be after end date".to_owned(),
      ));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
      return Err(Error::BadRequest(format!(
        "date range must not exceed {MAX_RANGE_DAYS} days"
      )));
    }
    Ok(Self { start, end })
  }

  /// Parse `YYYY-MM-DD` bounds; both are required.
  pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
    let start = start
      .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
      .ok_or_else(|| Error::BadRequest("invalid start date".to_owned()))?;
    let end = end
      .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
      .ok_or_else(|| Error::BadRequest("invalid end date".to_owned()))?;
    Self::new(start, end)
  }

  pub fn start(&self) -> NaiveDate { self.start }

  pub fn end(&self) -> NaiveDate { self.end }

  /// Every day from `start` to `end`, both included.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
    let end = self.end;
    self.start.iter_days().take_while(move |d| *d <= end)
  }

  /// Instants covered by the range: midnight of `start` up to, but not
  /// including, midnight after `end`.
  pub fn window(&self) -> TimeWindow {
    let start = self.start.and_time(NaiveTime::MIN).and_utc();
    let end = self
      .end
      .checked_add_days(Days::new(1))
      .unwrap_or(NaiveDate::MAX)
      .and_time(NaiveTime::MIN)
      .and_utc();
    TimeWindow { start, end }
  }
}

/// Dashboard key of an instant: its UTC calendar date.
pub fn date_key(at: DateTime<Utc>) -> String {
  at.date_naive().format(DATE_FORMAT).to_string()
}

// ─── Team scoping ────────────────────────────────────────────────────────────

/// Resolve the teams a dashboard covers.
///
/// An empty filter selects every assigned team. A filter naming any team not
/// assigned to the activity is rejected as a whole.
pub fn resolve_target_teams(assigned: &[Team], filter: &[i64]) -> Result<Vec<Team>> {
  if filter.is_empty() {
    return Ok(assigned.to_vec());
  }
  if filter.iter().any(|id| !assigned.iter().any(|t| t.id == *id)) {
    return Err(Error::Forbidden(
      "some teams are not assigned to the activity".to_owned(),
    ));
  }
  Ok(
    assigned
      .iter()
      .filter(|t| filter.contains(&t.id))
      .cloned()
      .collect(),
  )
}

// ─── Objective dashboard ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveDashboard {
  /// team code → KPI slug → value
  pub total_by_team: BTreeMap<String, BTreeMap<String, f64>>,
  /// KPI slug → value
  pub total_by_kpi:  BTreeMap<String, f64>,
}

pub fn objective_matrix(
  teams: &[Team],
  kpis: &[Kpi],
  rows: &[TeamObjectiveKpi],
) -> ObjectiveDashboard {
  let mut total_by_team: BTreeMap<String, BTreeMap<String, f64>> = teams
    .iter()
    .map(|team| {
      let cells = kpis.iter().map(|k| (k.slug.clone(), 0.0)).collect();
      (team.code.clone(), cells)
    })
    .collect();
  let mut total_by_kpi: BTreeMap<String, f64> =
    kpis.iter().map(|k| (k.slug.clone(), 0.0)).collect();

  for row in rows {
    let (Some(team), Some(kpi)) = (
      teams.iter().find(|t| t.id == row.team_id),
      kpis.iter().find(|k| k.id == row.kpi_id),
    ) else {
      continue;
    };
    if let Some(cell) = total_by_team
      .get_mut(&team.code)
      .and_then(|cells| cells.get_mut(&kpi.slug))
    {
      *cell += row.value;
    }
    if let Some(total) = total_by_kpi.get_mut(&kpi.slug) {
      *total += row.value;
    }
  }

  ObjectiveDashboard { total_by_team, total_by_kpi }
}

// ─── Result dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDashboard {
  /// team code → KPI slug → `YYYY-MM-DD` → value
  pub total_by_team: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
  /// KPI slug → `YYYY-MM-DD` → value
  pub total_by_kpi:  BTreeMap<String, BTreeMap<String, f64>>,
  /// KPI slug → sum over the range
  pub totals:        BTreeMap<String, f64>,
}

/// Bucket result rows by team, KPI and UTC day. Date maps are ordered by key,
/// which for `YYYY-MM-DD` is chronological.
pub fn result_cube(
  teams: &[Team],
  kpis: &[Kpi],
  range: &DateRange,
  rows: &[TeamResultKpi],
) -> ResultDashboard {
  let empty_days: BTreeMap<String, f64> = range
    .days()
    .map(|d| (d.format(DATE_FORMAT).to_string(), 0.0))
    .collect();

  let mut total_by_team: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>> =
    teams
      .iter()
      .map(|team| {
        let cells = kpis
          .iter()
          .map(|k| (k.slug.clone(), empty_days.clone()))
          .collect();
        (team.code.clone(), cells)
      })
      .collect();
  let mut total_by_kpi: BTreeMap<String, BTreeMap<String, f64>> = kpis
    .iter()
    .map(|k| (k.slug.clone(), empty_days.clone()))
    .collect();

  let window = range.window();
  for row in rows.iter().filter(|r| window.contains(r.recorded_at)) {
    let (Some(team), Some(kpi)) = (
      teams.iter().find(|t| t.id == row.team_id),
      kpis.iter().find(|k| k.id == row.kpi_id),
    ) else {
      continue;
    };
    let day = date_key(row.recorded_at);
    if let Some(cell) = total_by_team
      .get_mut(&team.code)
      .and_then(|cells| cells.get_mut(&kpi.slug))
      .and_then(|days| days.get_mut(&day))
    {
      *cell += row.value;
    }
    if let Some(cell) = total_by_kpi
      .get_mut(&kpi.slug)
      .and_then(|days| days.get_mut(&day))
    {
      *cell += row.value;
    }
  }

  let totals = total_by_kpi
    .iter()
    .map(|(slug, days)| (slug.clone(), days.values().sum()))
    .collect();

  ResultDashboard { total_by_team, total_by_kpi, totals }
}

// ─── Realization rate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
  pub id:    i64,
  pub slug:  String,
  pub name:  String,
  pub value: f64,
}

impl From<&Kpi> for KpiSummary {
  fn from(kpi: &Kpi) -> Self {
    Self {
      id:    kpi.id,
      slug:  kpi.slug.clone(),
      name:  kpi.name.clone(),
      value: kpi.value,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizationRow {
  /// `<objective slug>_o_<result slug>`
  pub code:            String,
  pub objective:       KpiSummary,
  pub result:          KpiSummary,
  pub total_objective: f64,
  pub total_result:    f64,
  pub rate:            f64,
}

/// `result / objective × 100`, or 0 when there is no objective.
pub fn realization_rate(total_result: f64, total_objective: f64) -> f64 {
  if total_objective == 0.0 {
    0.0
  } else {
    total_result / total_objective * 100.0
  }
}

pub fn realization_row(
  objective: &Kpi,
  result: &Kpi,
  total_objective: f64,
  total_result: f64,
) -> RealizationRow {
  RealizationRow {
    code: format!("{}_o_{}", objective.slug, result.slug),
    objective: objective.into(),
    result: result.into(),
    total_objective,
    total_result,
    rate: realization_rate(total_result, total_objective),
  }
}

// ─── Report-team dashboard ───────────────────────────────────────────────────

/// Distinct submission sessions of a team and of each of its members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReport {
  pub team_id:  i64,
  pub code:     String,
  pub name:     String,
  pub sessions: u64,
  pub members:  Vec<MemberReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberReport {
  pub user_id:   i64,
  pub email:     String,
  pub firstname: String,
  pub lastname:  String,
  pub sessions:  u64,
}
