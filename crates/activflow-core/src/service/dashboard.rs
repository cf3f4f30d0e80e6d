//! The four activity dashboards.
//!
//! Each starts from the same preamble: resolve the live activity, its
//! assigned teams and the target team set (see
//! [`resolve_target_teams`]). The aggregation itself lives in
//! [`crate::dashboard`].

use futures::future::try_join_all;

use super::{active_kpis, require_activity};
use crate::{
  Error, Result,
  activity::{Activity, Team},
  dashboard::{
    DashboardQuery, MemberReport, ObjectiveDashboard, RealizationRow, ResultDashboard,
    TeamReport, TimeWindow, objective_matrix, realization_row, resolve_target_teams,
    result_cube,
  },
  kpi::KpiType,
  store::ActivityStore,
};

struct Scope {
  activity: Activity,
  assigned: Vec<Team>,
  targets:  Vec<Team>,
}

impl Scope {
  fn target_ids(&self) -> Vec<i64> { self.targets.iter().map(|t| t.id).collect() }

  fn covers_all_teams(&self) -> bool { self.targets.len() == self.assigned.len() }
}

async fn scope<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  query: &DashboardQuery,
) -> Result<Scope> {
  let activity = require_activity(store, activity_id).await?;
  let assigned = store.activity_teams(activity_id).await.map_err(Error::store)?;
  let targets = resolve_target_teams(&assigned, &query.team_ids).inspect_err(|_| {
    tracing::warn!(activity_id, filter = ?query.team_ids, "team filter outside the activity");
  })?;
  Ok(Scope { activity, assigned, targets })
}

/// Team × objective KPI matrix. Dates in `query` are ignored.
pub async fn objective_dashboard<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  query: &DashboardQuery,
) -> Result<ObjectiveDashboard> {
  let scope = scope(store, activity_id, query).await?;
  let kpis = active_kpis(store, activity_id, KpiType::Objective).await?;
  let rows = store
    .team_objectives(kpis.iter().map(|k| k.id).collect(), scope.target_ids())
    .await
    .map_err(Error::store)?;

  tracing::debug!(activity_id, teams = scope.targets.len(), kpis = kpis.len(), "objective dashboard");
  Ok(objective_matrix(&scope.targets, &kpis, &rows))
}

/// Team × result KPI × day cube over the requested range.
pub async fn result_dashboard<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  query: &DashboardQuery,
) -> Result<ResultDashboard> {
  let scope = scope(store, activity_id, query).await?;
  let range = query.range()?;
  let kpis = active_kpis(store, activity_id, KpiType::Result).await?;
  let rows = store
    .team_results(kpis.iter().map(|k| k.id).collect(), scope.target_ids(), range.window())
    .await
    .map_err(Error::store)?;

  tracing::debug!(activity_id, teams = scope.targets.len(), kpis = kpis.len(), "result dashboard");
  Ok(result_cube(&scope.targets, &kpis, &range, &rows))
}

/// One realization rate per objective → result link between active KPIs.
///
/// Results are summed over the target teams and the range. The objective is
/// the activity-level target when every assigned team is targeted, and the
/// sum of the targeted teams' shares otherwise.
pub async fn realization_dashboard<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  query: &DashboardQuery,
) -> Result<Vec<RealizationRow>> {
  let scope = scope(store, activity_id, query).await?;
  let range = query.range()?;
  let objectives = active_kpis(store, activity_id, KpiType::Objective).await?;
  let results = active_kpis(store, activity_id, KpiType::Result).await?;

  let links = store
    .links(results.iter().map(|k| k.id).collect())
    .await
    .map_err(Error::store)?;
  let result_rows = store
    .team_results(results.iter().map(|k| k.id).collect(), scope.target_ids(), range.window())
    .await
    .map_err(Error::store)?;
  let shares = if scope.covers_all_teams() {
    Vec::new()
  } else {
    store
      .team_objectives(objectives.iter().map(|k| k.id).collect(), scope.target_ids())
      .await
      .map_err(Error::store)?
  };

  let mut rows = Vec::with_capacity(links.len());
  for result in &results {
    let Some(objective) = links
      .iter()
      .find(|l| l.result_id == result.id)
      .and_then(|l| objectives.iter().find(|o| o.id == l.objective_id))
    else {
      continue;
    };
    let total_result: f64 = result_rows
      .iter()
      .filter(|r| r.kpi_id == result.id)
      .map(|r| r.value)
      .sum();
    let total_objective: f64 = if scope.covers_all_teams() {
      objective.value
    } else {
      shares.iter().filter(|s| s.kpi_id == objective.id).map(|s| s.value).sum()
    };
    rows.push(realization_row(objective, result, total_objective, total_result));
  }

  tracing::debug!(activity_id, teams = scope.targets.len(), links = rows.len(), "realization dashboard");
  Ok(rows)
}

async fn count_sessions<S: ActivityStore>(
  store: &S,
  form_id: Option<i64>,
  user_ids: Vec<i64>,
  window: TimeWindow,
) -> Result<u64> {
  match form_id {
    Some(form_id) if !user_ids.is_empty() => store
      .count_sessions(form_id, user_ids, window)
      .await
      .map_err(Error::store),
    _ => Ok(0),
  }
}

/// Distinct submission sessions on the activity's form, per target team and
/// per member, within the range.
pub async fn report_team_dashboard<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  query: &DashboardQuery,
) -> Result<Vec<TeamReport>> {
  let scope = scope(store, activity_id, query).await?;
  let window = query.range()?.window();
  let form_id = scope.activity.form_id;

  let members = try_join_all(scope.targets.iter().map(|t| store.team_members(t.id)))
    .await
    .map_err(Error::store)?;

  let team_counts = try_join_all(members.iter().map(|users| {
    count_sessions(store, form_id, users.iter().map(|u| u.id).collect(), window)
  }))
  .await?;
  let member_counts = try_join_all(
    members
      .iter()
      .flatten()
      .map(|u| count_sessions(store, form_id, vec![u.id], window)),
  )
  .await?;

  let mut member_counts = member_counts.into_iter();
  let reports = scope
    .targets
    .into_iter()
    .zip(members)
    .zip(team_counts)
    .map(|((team, users), sessions)| TeamReport {
      team_id: team.id,
      code: team.code,
      name: team.name,
      sessions,
      members: users
        .into_iter()
        .zip(member_counts.by_ref())
        .map(|(user, sessions)| MemberReport {
          user_id: user.id,
          email: user.email,
          firstname: user.firstname,
          lastname: user.lastname,
          sessions,
        })
        .collect(),
    })
    .collect::<Vec<_>>();

  tracing::debug!(activity_id, teams = reports.len(), "report team dashboard");
  Ok(reports)
}
