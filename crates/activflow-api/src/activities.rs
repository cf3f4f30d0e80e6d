//! Handlers for `/activities` and their team assignment.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/activities` | Body: `{"name", "description"?, "form_id"?}` |
//! | `GET`    | `/activities/{id}` | Activity with its teams and form |
//! | `DELETE` | `/activities/{id}` | Soft delete |
//! | `PATCH`  | `/activities/{id}/status` | Body: `{"is_active":false}` |
//! | `PUT`    | `/activities/{id}/teams` | Body: `{"team_ids":[1,2]}`, replaces the set |

use activflow_core::{
  activity::{Activity, NewActivity, Team},
  service::{self, ActivityDetail},
  store::ActivityStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{AppState, StatusBody, auth::AuthUser, error::ApiError};

/// `POST /activities`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<NewActivity>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_create")?;
  let activity = service::create_activity(state.store.as_ref(), body).await?;
  Ok((StatusCode::CREATED, Json(activity)))
}

/// `GET /activities/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<Json<ActivityDetail>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_find_one")?;
  Ok(Json(service::get_activity(state.store.as_ref(), id).await?))
}

/// `DELETE /activities/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_delete")?;
  service::delete_activity(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /activities/{id}/status`, body: `{"is_active":false}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<StatusBody>,
) -> Result<Json<Activity>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_change_status")?;
  Ok(Json(service::set_activity_active(state.store.as_ref(), id, body.is_active).await?))
}

#[derive(Debug, Deserialize)]
pub struct TeamsBody {
  pub team_ids: Vec<i64>,
}

/// `PUT /activities/{id}/teams`
pub async fn assign_teams<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<TeamsBody>,
) -> Result<Json<Vec<Team>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "activity_add_team")?;
  let teams = service::assign_teams(state.store.as_ref(), id, body.team_ids).await?;
  Ok(Json(teams))
}
