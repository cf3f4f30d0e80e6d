//! Handlers for `/teams` endpoints.

use activflow_core::{
  activity::{NewTeam, Team},
  service,
  store::ActivityStore,
  user::User,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{AppState, StatusBody, auth::AuthUser, error::ApiError};

/// `POST /teams`, body: `{"code":"T1","name":"North"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<NewTeam>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "team_create")?;
  let team: Team = service::create_team(state.store.as_ref(), body).await?;
  Ok((StatusCode::CREATED, Json(team)))
}

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub user_id: i64,
}

/// `POST /teams/{id}/members`: returns the members after the addition.
pub async fn add_member<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<MemberBody>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "team_add_member")?;
  let members = service::add_team_member(state.store.as_ref(), id, body.user_id).await?;
  Ok(Json(members))
}

/// `PATCH /teams/{id}/status`, body: `{"is_active":false}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<StatusBody>,
) -> Result<Json<Team>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "team_change_status")?;
  Ok(Json(service::set_team_active(state.store.as_ref(), id, body.is_active).await?))
}

/// `DELETE /teams/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "team_delete")?;
  service::delete_team(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}
