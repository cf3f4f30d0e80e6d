//! Handlers for `/me` and `/users`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | The authenticated user |
//! | `POST` | `/users` | Body: `{"email", "firstname", "lastname", "profile", "password"}` |
//! | `PATCH` | `/users/{id}/status` | Inactive users can no longer authenticate |

use activflow_core::{
  service,
  store::ActivityStore,
  user::{NewUser, Profile, User},
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{
  AppState, StatusBody,
  auth::{AuthUser, hash_password},
  error::ApiError,
};

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
) -> Result<Json<User>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "user_find_me")?;
  Ok(Json(user.0))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub email:     String,
  pub firstname: String,
  pub lastname:  String,
  pub profile:   Profile,
  pub password:  String,
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "user_create")?;
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".to_owned()));
  }
  let password_hash = hash_password(&body.password)
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))?;

  let created = service::create_user(state.store.as_ref(), NewUser {
    email: body.email,
    firstname: body.firstname,
    lastname: body.lastname,
    profile: body.profile,
    password_hash,
  })
  .await?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /users/{id}/status`, body: `{"is_active":false}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<StatusBody>,
) -> Result<Json<User>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "user_change_status")?;
  Ok(Json(service::set_user_active(state.store.as_ref(), id, body.is_active).await?))
}
