//! Handlers for forms, their fields and submissions.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/field-types` | The field type catalogue |
//! | `POST`   | `/forms` | Body: `{"name":"Shop visit"}` |
//! | `GET`    | `/forms/{id}` | Form with its live fields in order |
//! | `PATCH`  | `/forms/{id}/status` | Inactive forms reject submissions |
//! | `POST`   | `/forms/{id}/fields` | Body: `{"label", "field_type", "optional"?, "select_values"?}` |
//! | `DELETE` | `/fields/{id}` | Soft delete |
//! | `POST`   | `/forms/{id}/submissions` | Body: field slug → value |
//! | `GET`    | `/forms/{id}/sessions` | Newest first |
//! | `GET`    | `/forms/{id}/sessions/{session_id}` | Values keyed by slug |

use activflow_core::{
  form::{AddField, FieldTypeInfo, Form, NewForm, SessionSummary, SessionView, catalogue},
  service::{self, FormDetail},
  store::ActivityStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{AppState, StatusBody, auth::AuthUser, error::ApiError};

// ─── Field types ──────────────────────────────────────────────────────────────

/// `GET /field-types`
pub async fn field_types<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
) -> Result<Json<Vec<FieldTypeInfo>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "field_type_find_all")?;
  Ok(Json(catalogue()))
}

// ─── Forms and fields ─────────────────────────────────────────────────────────

/// `POST /forms`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<NewForm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "form_create")?;
  let form = service::create_form(state.store.as_ref(), body).await?;
  Ok((StatusCode::CREATED, Json(form)))
}

/// `GET /forms/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<Json<FormDetail>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "form_find_one")?;
  Ok(Json(service::get_form(state.store.as_ref(), id).await?))
}

/// `PATCH /forms/{id}/status`, body: `{"is_active":false}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<StatusBody>,
) -> Result<Json<Form>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "form_change_status")?;
  Ok(Json(service::set_form_active(state.store.as_ref(), id, body.is_active).await?))
}

/// `POST /forms/{id}/fields`
pub async fn add_field<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<AddField>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "form_add_field")?;
  let field = service::add_field(state.store.as_ref(), id, body).await?;
  Ok((StatusCode::CREATED, Json(field)))
}

/// `DELETE /fields/{id}`
pub async fn remove_field<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  user.authorize(&state.rbac, "form_update_fields")?;
  service::delete_field(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Submissions ──────────────────────────────────────────────────────────────

/// `POST /forms/{id}/submissions`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
  Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  let principal = user.authorize(&state.rbac, "store_save")?;
  let summary = service::save_submission(state.store.as_ref(), id, body, principal).await?;
  Ok((StatusCode::CREATED, Json(summary)))
}

/// `GET /forms/{id}/sessions`
pub async fn sessions<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  user: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  let principal = user.authorize(&state.rbac, "store_list_session")?;
  Ok(Json(service::list_sessions(state.store.as_ref(), id, principal).await?))
}

/// `GET /forms/{id}/sessions/{session_id}`
pub async fn session<S>(
  State(state): State<AppState<S>>,
  Path((id, session_id)): Path<(i64, Uuid)>,
  user: AuthUser,
) -> Result<Json<SessionView>, ApiError>
where
  S: ActivityStore + Clone + 'static,
{
  let principal = user.authorize(&state.rbac, "store_show_session")?;
  let view = service::get_session(state.store.as_ref(), id, session_id, principal).await?;
  Ok(Json(view))
}
