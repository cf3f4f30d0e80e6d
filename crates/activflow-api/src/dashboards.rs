//! Handlers for the activity dashboards and the administration overview.
//!
//! The activity dashboards take `start_date` and `end_date` (`YYYY-MM-DD`)
//! and an optional comma-separated `team_ids` filter.

use activflow_core::{
  dashboard::{DashboardQuery, ObjectiveDashboard, RealizationRow, ResultDashboard, TeamReport},
  service,
  store::{ActivityStore, Overview},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{AppState, auth::AuthUser, error::ApiError};

// ─── Query parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  /// `1,2,3`
  pub team_ids:   Option<String>,
}

impl TryFrom<DashboardParams> for DashboardQuery {
  type Error = ApiError;

  fn try_from(params: DashboardParams) -> Result<Self, Self::Error> {
    let team_ids = params
      .team_ids
      .as_deref()
      .unwrap_or_default()
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| {
        s.parse::<i64>()
          .map_err(|_| ApiError::BadRequest(format!("invalid team id: {s}")))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(DashboardQuery {
      start_date: params.start_date.filter(|s| !s.is_empty()),
      end_date: params.end_date.filter(|s| !s.is_empty()),
      team_ids,
    })
  }
}

// ─── Activity dashboards ──────────────────────────────────────────────────────

/// `GET /activities/{id}/dashboard/objectives`
pub async fn objectives<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Query(params): Query<DashboardParams>,
) -> Result<Json<ObjectiveDashboard>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_kpi_objective_dashboard")?;
  let query = DashboardQuery::try_from(params)?;
  Ok(Json(service::objective_dashboard(state.store.as_ref(), id, &query).await?))
}

/// `GET /activities/{id}/dashboard/results`
pub async fn results<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Query(params): Query<DashboardParams>,
) -> Result<Json<ResultDashboard>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_kpi_result_dashboard")?;
  let query = DashboardQuery::try_from(params)?;
  Ok(Json(service::result_dashboard(state.store.as_ref(), id, &query).await?))
}

/// `GET /activities/{id}/dashboard/rates`
pub async fn rates<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Query(params): Query<DashboardParams>,
) -> Result<Json<Vec<RealizationRow>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_dashboard")?;
  let query = DashboardQuery::try_from(params)?;
  Ok(Json(service::realization_dashboard(state.store.as_ref(), id, &query).await?))
}

/// `GET /activities/{id}/dashboard/reports`
pub async fn reports<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Query(params): Query<DashboardParams>,
) -> Result<Json<Vec<TeamReport>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_report_team_dashboard")?;
  let query = DashboardQuery::try_from(params)?;
  Ok(Json(service::report_team_dashboard(state.store.as_ref(), id, &query).await?))
}

// ─── Overview ─────────────────────────────────────────────────────────────────

/// `GET /dashboard`
pub async fn overview<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
) -> Result<Json<Overview>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "admin_dashboard")?;
  Ok(Json(service::overview(state.store.as_ref()).await?))
}
