//! Filling KPI values and linking objectives to results.

use std::collections::BTreeMap;

use chrono::{SubsecRound as _, Utc};
use serde_json::{Map, Value};

use super::{active_kpis, require_activity};
use crate::{
  Error, Result,
  kpi::{
    FillKpi, Kpi, KpiType, LinkKpis, ObjectiveResultLink, TeamObjectiveKpi,
    TeamObjectiveValue, TeamObjectives, TeamResultKpi,
  },
  store::ActivityStore,
  user::Principal,
  validate::{FormSchema, validate},
};

fn numeric_schema(kpis: &[Kpi]) -> FormSchema {
  FormSchema::numeric(kpis.iter().map(|k| k.slug.as_str()))
}

/// Value of `kpi` in an already validated payload.
fn amount(payload: &Map<String, Value>, kpi: &Kpi) -> f64 {
  payload.get(&kpi.slug).and_then(Value::as_f64).unwrap_or_default()
}

/// Set the activity-level target of every active objective KPI.
pub async fn fill_objective_activity<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  input: FillKpi,
) -> Result<()> {
  require_activity(store, activity_id).await?;
  let kpis = active_kpis(store, activity_id, KpiType::Objective).await?;

  let verdict = validate(&numeric_schema(&kpis), &input.datas);
  if !verdict.ok {
    tracing::warn!(activity_id, message = verdict.message(), "objective fill rejected");
  }
  verdict.into_result()?;

  let values = kpis.iter().map(|k| (k.id, amount(&input.datas, k))).collect();
  store.set_kpi_values(values).await.map_err(Error::store)?;
  tracing::info!(activity_id, kpis = kpis.len(), "activity objectives filled");
  Ok(())
}

/// Split the activity objectives between its teams.
///
/// `input.datas` maps each assigned team's code to its KPI values. Every team
/// is validated and the per-KPI sums are checked against the activity targets
/// before anything is written; the shares of all teams are then replaced in
/// one transaction.
pub async fn fill_objective_team<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  input: FillKpi,
) -> Result<()> {
  require_activity(store, activity_id).await?;
  let teams = store.activity_teams(activity_id).await.map_err(Error::store)?;
  let kpis = active_kpis(store, activity_id, KpiType::Objective).await?;
  let schema = numeric_schema(&kpis);

  let empty = Map::new();
  let mut rows = Vec::with_capacity(teams.len() * kpis.len());
  for team in &teams {
    let payload = input
      .datas
      .get(&team.code)
      .and_then(Value::as_object)
      .unwrap_or(&empty);
    let verdict = validate(&schema, payload);
    if let Some(message) = verdict.error {
      tracing::warn!(activity_id, team = %team.code, %message, "team objective fill rejected");
      return Err(Error::BadRequest(format!("{}: {message}", team.code)));
    }
    rows.extend(kpis.iter().map(|kpi| TeamObjectiveKpi {
      team_id: team.id,
      kpi_id:  kpi.id,
      value:   amount(payload, kpi),
    }));
  }

  for kpi in &kpis {
    let sum: f64 = rows.iter().filter(|r| r.kpi_id == kpi.id).map(|r| r.value).sum();
    if sum > kpi.value {
      tracing::warn!(activity_id, kpi = %kpi.slug, sum, target = kpi.value, "objective ceiling exceeded");
      return Err(Error::BadRequest(format!(
        "the sum of team objectives for {} ({sum}) exceeds the activity objective of {}",
        kpi.name, kpi.value
      )));
    }
  }

  store
    .replace_team_objectives(
      teams.iter().map(|t| t.id).collect(),
      kpis.iter().map(|k| k.id).collect(),
      rows,
    )
    .await
    .map_err(Error::store)?;
  tracing::info!(activity_id, teams = teams.len(), "team objectives filled");
  Ok(())
}

/// Append one result row per active result KPI for the principal's team.
pub async fn fill_result<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  input: FillKpi,
  principal: Principal,
) -> Result<Vec<TeamResultKpi>> {
  require_activity(store, activity_id).await?;
  let kpis = active_kpis(store, activity_id, KpiType::Result).await?;

  let verdict = validate(&numeric_schema(&kpis), &input.datas);
  if !verdict.ok {
    tracing::warn!(activity_id, message = verdict.message(), "result fill rejected");
  }
  verdict.into_result()?;

  let assigned = store.activity_teams(activity_id).await.map_err(Error::store)?;
  let user_teams = store
    .teams_of_user(principal.user_id)
    .await
    .map_err(Error::store)?;
  let team = assigned
    .iter()
    .find(|t| user_teams.iter().any(|u| u.id == t.id))
    .ok_or_else(|| {
      Error::Forbidden("you are not a member of a team assigned to this activity".to_owned())
    })?;

  let recorded_at = Utc::now().trunc_subsecs(6);
  let rows: Vec<TeamResultKpi> = kpis
    .iter()
    .map(|kpi| TeamResultKpi {
      team_id: team.id,
      kpi_id: kpi.id,
      value: amount(&input.datas, kpi),
      recorded_at,
    })
    .collect();

  store.append_team_results(rows.clone()).await.map_err(Error::store)?;
  tracing::info!(activity_id, team = %team.code, rows = rows.len(), "results appended");
  Ok(rows)
}

/// Link a result KPI to an objective KPI of the same activity, replacing any
/// previous link of the result.
pub async fn link_kpis<S: ActivityStore>(
  store: &S,
  input: LinkKpis,
) -> Result<ObjectiveResultLink> {
  let objective = store
    .get_kpi(input.objective_id)
    .await
    .map_err(Error::store)?
    .filter(|k| k.kpi_type == KpiType::Objective)
    .ok_or_else(|| Error::NotFound("objective KPI not found".to_owned()))?;
  let result = store
    .get_kpi(input.result_id)
    .await
    .map_err(Error::store)?
    .filter(|k| k.kpi_type == KpiType::Result)
    .ok_or_else(|| Error::NotFound("result KPI not found".to_owned()))?;
  if objective.activity_id != result.activity_id {
    return Err(Error::BadRequest(
      "linked KPIs must belong to the same activity".to_owned(),
    ));
  }

  let link = ObjectiveResultLink { objective_id: objective.id, result_id: result.id };
  store.replace_link(link).await.map_err(Error::store)?;
  tracing::info!(objective_id = link.objective_id, result_id = link.result_id, "KPIs linked");
  Ok(link)
}

/// Objective shares of every assigned team, 0 where unset.
pub async fn team_objectives<S: ActivityStore>(
  store: &S,
  activity_id: i64,
) -> Result<Vec<TeamObjectives>> {
  require_activity(store, activity_id).await?;
  let teams = store.activity_teams(activity_id).await.map_err(Error::store)?;
  let kpis = active_kpis(store, activity_id, KpiType::Objective).await?;

  let rows = store
    .team_objectives(
      kpis.iter().map(|k| k.id).collect(),
      teams.iter().map(|t| t.id).collect(),
    )
    .await
    .map_err(Error::store)?;
  let shares: BTreeMap<(i64, i64), f64> =
    rows.into_iter().map(|r| ((r.team_id, r.kpi_id), r.value)).collect();

  Ok(
    teams
      .into_iter()
      .map(|team| TeamObjectives {
        kpis: kpis
          .iter()
          .map(|kpi| TeamObjectiveValue {
            kpi_id: kpi.id,
            name:   kpi.name.clone(),
            slug:   kpi.slug.clone(),
            value:  shares.get(&(team.id, kpi.id)).copied().unwrap_or_default(),
          })
          .collect(),
        team_id: team.id,
        code: team.code,
        name: team.name,
      })
      .collect(),
  )
}
