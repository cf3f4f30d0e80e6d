//! Handlers for KPI definitions, fills and links.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/kpis` | Body: `{"activity_id", "name", "kpi_type", "description"?}` |
//! | `POST`   | `/kpis/link` | Body: `{"objective_id", "result_id"}` |
//! | `PATCH`  | `/kpis/{id}/status` | Body: `{"is_active":false}` |
//! | `DELETE` | `/kpis/{id}` | Soft delete |
//! | `GET`    | `/activities/{id}/kpis` | Optional `?type=objective\|result` |
//! | `POST`   | `/activities/{id}/objectives` | Body: `{"datas":{slug: value}}` |
//! | `GET`    | `/activities/{id}/objectives/teams` | Dense per-team shares |
//! | `POST`   | `/activities/{id}/objectives/teams` | Body: `{"datas":{code:{slug: value}}}` |
//! | `POST`   | `/activities/{id}/results` | Body: `{"datas":{slug: value}}` |

use activflow_core::{
  kpi::{
    CreateKpi, FillKpi, Kpi, KpiType, LinkKpis, ObjectiveResultLink, TeamObjectives,
    TeamResultKpi,
  },
  service,
  store::ActivityStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{AppState, StatusBody, auth::AuthUser, error::ApiError};

// ─── Definitions ──────────────────────────────────────────────────────────────

/// `POST /kpis`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<CreateKpi>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_create")?;
  let kpi = service::create_kpi(state.store.as_ref(), body).await?;
  Ok((StatusCode::CREATED, Json(kpi)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(rename = "type")]
  pub kpi_type: Option<KpiType>,
}

/// `GET /activities/{id}/kpis[?type=<type>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Kpi>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_find_all_by_activity")?;
  Ok(Json(service::list_kpis(state.store.as_ref(), id, params.kpi_type).await?))
}

/// `PATCH /kpis/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<StatusBody>,
) -> Result<Json<Kpi>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_update")?;
  Ok(Json(service::set_kpi_active(state.store.as_ref(), id, body.is_active).await?))
}

/// `DELETE /kpis/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_delete")?;
  service::delete_kpi(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /kpis/link`
pub async fn link<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<LinkKpis>,
) -> Result<Json<ObjectiveResultLink>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_link")?;
  Ok(Json(service::link_kpis(state.store.as_ref(), body).await?))
}

// ─── Fills ────────────────────────────────────────────────────────────────────

/// `POST /activities/{id}/objectives`
pub async fn fill_objective<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<FillKpi>,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_fill_objective")?;
  service::fill_objective_activity(state.store.as_ref(), id, body).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /activities/{id}/objectives/teams`
pub async fn team_objectives<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<Json<Vec<TeamObjectives>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_find_all_by_activity")?;
  Ok(Json(service::team_objectives(state.store.as_ref(), id).await?))
}

/// `POST /activities/{id}/objectives/teams`
pub async fn fill_team_objectives<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<FillKpi>,
) -> Result<Json<Vec<TeamObjectives>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "kpi_fill_objective")?;
  let store = state.store.as_ref();
  service::fill_objective_team(store, id, body).await?;
  Ok(Json(service::team_objectives(store, id).await?))
}

/// `POST /activities/{id}/results`: appends one row per active result KPI
/// for the caller's team.
pub async fn fill_result<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<FillKpi>,
) -> Result<(StatusCode, Json<Vec<TeamResultKpi>>), ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  let principal = user.authorize(&state.rbac, "kpi_fill_result")?;
  let rows = service::fill_result(state.store.as_ref(), id, body, principal).await?;
  Ok((StatusCode::CREATED, Json(rows)))
}
