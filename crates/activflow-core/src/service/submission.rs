//! Form submissions ("store" sessions).

use chrono::{SubsecRound as _, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  form::{NewSubmission, SessionSummary, SessionView, value_to_text},
  store::ActivityStore,
  user::Principal,
  validate::{FormSchema, validate},
};

/// Validate `payload` against the form's live fields and persist it as one
/// session.
///
/// The principal must belong to an active team assigned to an activity that
/// collects data with this form.
pub async fn save_submission<S: ActivityStore>(
  store: &S,
  form_id: i64,
  payload: Map<String, Value>,
  principal: Principal,
) -> Result<SessionSummary> {
  let form = store
    .get_form(form_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("form not found".to_owned()))?;
  if !form.is_active {
    return Err(Error::Forbidden("form is not active".to_owned()));
  }

  let user_teams = store
    .teams_of_user(principal.user_id)
    .await
    .map_err(Error::store)?;
  let activities = store
    .activities_using_form(form_id)
    .await
    .map_err(Error::store)?;
  let mut allowed = false;
  for activity in &activities {
    let assigned = store.activity_teams(activity.id).await.map_err(Error::store)?;
    if assigned.iter().any(|t| user_teams.iter().any(|u| u.id == t.id)) {
      allowed = true;
      break;
    }
  }
  if !allowed {
    tracing::warn!(form_id, user_id = principal.user_id, "submission outside assigned activities");
    return Err(Error::Forbidden(
      "you are not assigned to an activity using this form".to_owned(),
    ));
  }

  let fields = store.list_fields(form_id).await.map_err(Error::store)?;
  let verdict = validate(&FormSchema::from_fields(&fields), &payload);
  if !verdict.ok {
    tracing::warn!(form_id, message = verdict.message(), "submission rejected");
  }
  verdict.into_result()?;

  let values = fields
    .iter()
    .filter_map(|f| payload.get(&f.slug).map(|v| (f.id, value_to_text(v))))
    .collect();
  let submission = NewSubmission {
    session_id: Uuid::new_v4(),
    user_id: principal.user_id,
    submitted_at: Utc::now().trunc_subsecs(6),
    values,
  };
  let summary = SessionSummary {
    session_id:   submission.session_id,
    user_id:      submission.user_id,
    submitted_at: submission.submitted_at,
  };

  store.insert_submission(submission).await.map_err(Error::store)?;
  tracing::info!(form_id, session_id = %summary.session_id, "submission saved");
  Ok(summary)
}

/// Sessions of the form, newest first. Admins and viewers see every session;
/// other profiles only their own.
pub async fn list_sessions<S: ActivityStore>(
  store: &S,
  form_id: i64,
  principal: Principal,
) -> Result<Vec<SessionSummary>> {
  store
    .get_form(form_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("form not found".to_owned()))?;

  let author = (!principal.profile.sees_all_submissions()).then_some(principal.user_id);
  store.list_sessions(form_id, author).await.map_err(Error::store)
}

pub async fn get_session<S: ActivityStore>(
  store: &S,
  form_id: i64,
  session_id: Uuid,
  principal: Principal,
) -> Result<SessionView> {
  let not_found = || Error::NotFound("session not found".to_owned());
  let view = store
    .get_session(form_id, session_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)?;
  if !principal.profile.sees_all_submissions() && view.user_id != principal.user_id {
    return Err(not_found());
  }
  Ok(view)
}
