//! Administration: users, teams, activities, forms, fields and KPI
//! definitions.

use serde::Serialize;
use serde_json::Value;

use super::require_activity;
use crate::{
  Error, Result,
  activity::{Activity, NewActivity, NewTeam, Team},
  form::{AddField, FieldDefinition, FieldType, Form, NewField, NewForm, parse_select_values},
  kpi::{CreateKpi, Kpi, KpiType, NewKpi},
  slug::slugify,
  store::{ActivityStore, Overview},
  user::{NewUser, User},
  validate::check_field,
};

/// An activity with its assigned teams and form.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityDetail {
  #[serde(flatten)]
  pub activity: Activity,
  pub teams:    Vec<Team>,
  pub form:     Option<Form>,
}

/// A form with its live fields in rank order.
#[derive(Debug, Clone, Serialize)]
pub struct FormDetail {
  #[serde(flatten)]
  pub form:   Form,
  pub fields: Vec<FieldDefinition>,
}

// ─── Users and teams ─────────────────────────────────────────────────────────

pub async fn create_user<S: ActivityStore>(store: &S, mut input: NewUser) -> Result<User> {
  input.email = input.email.trim().to_lowercase();
  check_field("email", &Value::String(input.email.clone()), "email", &[])
    .map_err(Error::BadRequest)?;
  if store
    .find_user_by_email(input.email.clone())
    .await
    .map_err(Error::store)?
    .is_some()
  {
    return Err(Error::Conflict(format!("email {} is already used", input.email)));
  }

  let user = store.create_user(input).await.map_err(Error::store)?;
  tracing::info!(user_id = user.id, profile = %user.profile, "user created");
  Ok(user)
}

pub async fn set_user_active<S: ActivityStore>(store: &S, id: i64, active: bool) -> Result<User> {
  if !store.set_user_active(id, active).await.map_err(Error::store)? {
    return Err(Error::NotFound("user not found".to_owned()));
  }
  tracing::info!(user_id = id, active, "user status changed");
  store
    .get_user(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("user not found".to_owned()))
}

pub async fn create_team<S: ActivityStore>(store: &S, input: NewTeam) -> Result<Team> {
  if input.code.trim().is_empty() {
    return Err(Error::BadRequest("team code must not be empty".to_owned()));
  }
  if store
    .find_team_by_code(input.code.clone())
    .await
    .map_err(Error::store)?
    .is_some()
  {
    return Err(Error::Conflict(format!("team code {} is already used", input.code)));
  }

  let team = store.create_team(input).await.map_err(Error::store)?;
  tracing::info!(team_id = team.id, code = %team.code, "team created");
  Ok(team)
}

pub async fn add_team_member<S: ActivityStore>(
  store: &S,
  team_id: i64,
  user_id: i64,
) -> Result<Vec<User>> {
  store
    .get_team(team_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("team not found".to_owned()))?;
  store
    .get_user(user_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("user not found".to_owned()))?;

  store.add_team_member(team_id, user_id).await.map_err(Error::store)?;
  tracing::info!(team_id, user_id, "team member added");
  store.team_members(team_id).await.map_err(Error::store)
}

/// An inactive team keeps its assignments, but its members can no longer
/// submit or fill results through it.
pub async fn set_team_active<S: ActivityStore>(store: &S, id: i64, active: bool) -> Result<Team> {
  if !store.set_team_active(id, active).await.map_err(Error::store)? {
    return Err(Error::NotFound("team not found".to_owned()));
  }
  tracing::info!(team_id = id, active, "team status changed");
  store
    .get_team(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("team not found".to_owned()))
}

pub async fn delete_team<S: ActivityStore>(store: &S, id: i64) -> Result<()> {
  if !store.delete_team(id).await.map_err(Error::store)? {
    return Err(Error::NotFound("team not found".to_owned()));
  }
  tracing::info!(team_id = id, "team deleted");
  Ok(())
}

// ─── Activities ──────────────────────────────────────────────────────────────

pub async fn create_activity<S: ActivityStore>(
  store: &S,
  input: NewActivity,
) -> Result<Activity> {
  if let Some(form_id) = input.form_id {
    store
      .get_form(form_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("form not found".to_owned()))?;
  }

  let activity = store.create_activity(input).await.map_err(Error::store)?;
  tracing::info!(activity_id = activity.id, "activity created");
  Ok(activity)
}

/// Replace the set of teams assigned to the activity. Duplicate ids are
/// collapsed, keeping the first occurrence.
pub async fn assign_teams<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  team_ids: Vec<i64>,
) -> Result<Vec<Team>> {
  require_activity(store, activity_id).await?;

  let mut unique = Vec::with_capacity(team_ids.len());
  for id in team_ids {
    if unique.contains(&id) {
      continue;
    }
    store
      .get_team(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("team {id} not found")))?;
    unique.push(id);
  }

  store
    .replace_activity_teams(activity_id, unique)
    .await
    .map_err(Error::store)?;
  tracing::info!(activity_id, "activity teams replaced");
  store.activity_teams(activity_id).await.map_err(Error::store)
}

pub async fn get_activity<S: ActivityStore>(store: &S, id: i64) -> Result<ActivityDetail> {
  let activity = require_activity(store, id).await?;
  let teams = store.activity_teams(id).await.map_err(Error::store)?;
  let form = match activity.form_id {
    Some(form_id) => store.get_form(form_id).await.map_err(Error::store)?,
    None => None,
  };
  Ok(ActivityDetail { activity, teams, form })
}

pub async fn set_activity_active<S: ActivityStore>(
  store: &S,
  id: i64,
  active: bool,
) -> Result<Activity> {
  if !store.set_activity_active(id, active).await.map_err(Error::store)? {
    return Err(Error::NotFound("activity not found".to_owned()));
  }
  tracing::info!(activity_id = id, active, "activity status changed");
  require_activity(store, id).await
}

pub async fn delete_activity<S: ActivityStore>(store: &S, id: i64) -> Result<()> {
  if !store.delete_activity(id).await.map_err(Error::store)? {
    return Err(Error::NotFound("activity not found".to_owned()));
  }
  tracing::info!(activity_id = id, "activity deleted");
  Ok(())
}

// ─── Forms and fields ────────────────────────────────────────────────────────

pub async fn create_form<S: ActivityStore>(store: &S, input: NewForm) -> Result<Form> {
  if input.name.trim().is_empty() {
    return Err(Error::BadRequest("form name must not be empty".to_owned()));
  }
  let form = store.create_form(input.name).await.map_err(Error::store)?;
  tracing::info!(form_id = form.id, "form created");
  Ok(form)
}

pub async fn get_form<S: ActivityStore>(store: &S, id: i64) -> Result<FormDetail> {
  let form = store
    .get_form(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("form not found".to_owned()))?;
  let fields = store.list_fields(id).await.map_err(Error::store)?;
  Ok(FormDetail { form, fields })
}

/// Inactive forms reject submissions.
pub async fn set_form_active<S: ActivityStore>(store: &S, id: i64, active: bool) -> Result<Form> {
  if !store.set_form_active(id, active).await.map_err(Error::store)? {
    return Err(Error::NotFound("form not found".to_owned()));
  }
  tracing::info!(form_id = id, active, "form status changed");
  store
    .get_form(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("form not found".to_owned()))
}

pub async fn add_field<S: ActivityStore>(
  store: &S,
  form_id: i64,
  input: AddField,
) -> Result<FieldDefinition> {
  store
    .get_form(form_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("form not found".to_owned()))?;

  let field_type = input
    .field_type
    .parse::<FieldType>()
    .map_err(|_| Error::NotFound(format!("field type {} not found", input.field_type)))?;
  if !field_type.enabled() {
    return Err(Error::BadRequest(format!(
      "field type {field_type} is not available"
    )));
  }

  let select_values = input
    .select_values
    .as_deref()
    .map(parse_select_values)
    .unwrap_or_default();
  if field_type.has_enumeration() && select_values.is_empty() {
    return Err(Error::BadRequest(format!(
      "a {field_type} field requires select values"
    )));
  }

  let slug = slugify(&input.label);
  if slug.is_empty() {
    return Err(Error::BadRequest("field label must not be empty".to_owned()));
  }
  let fields = store.list_fields(form_id).await.map_err(Error::store)?;
  if fields.iter().any(|f| f.slug == slug) {
    return Err(Error::Conflict(format!("the form already has a field {slug}")));
  }

  let field = store
    .add_field(NewField {
      form_id,
      label: input.label,
      slug,
      field_type,
      optional: input.optional,
      select_values: if field_type.has_enumeration() {
        select_values
      } else {
        Vec::new()
      },
    })
    .await
    .map_err(Error::store)?;
  tracing::info!(form_id, field_id = field.id, slug = %field.slug, "field added");
  Ok(field)
}

pub async fn delete_field<S: ActivityStore>(store: &S, id: i64) -> Result<()> {
  if !store.delete_field(id).await.map_err(Error::store)? {
    return Err(Error::NotFound("field not found".to_owned()));
  }
  tracing::info!(field_id = id, "field deleted");
  Ok(())
}

// ─── KPI definitions ─────────────────────────────────────────────────────────

pub async fn create_kpi<S: ActivityStore>(store: &S, input: CreateKpi) -> Result<Kpi> {
  require_activity(store, input.activity_id).await?;

  let slug = slugify(&input.name);
  if slug.is_empty() {
    return Err(Error::BadRequest("KPI name must not be empty".to_owned()));
  }
  if store
    .find_kpi_by_slug(input.activity_id, slug.clone())
    .await
    .map_err(Error::store)?
    .is_some()
  {
    return Err(Error::Conflict(format!("the activity already has a KPI {slug}")));
  }

  let kpi = store
    .create_kpi(NewKpi {
      activity_id: input.activity_id,
      name: input.name,
      slug,
      kpi_type: input.kpi_type,
      description: input.description,
    })
    .await
    .map_err(Error::store)?;
  tracing::info!(kpi_id = kpi.id, activity_id = kpi.activity_id, kpi_type = %kpi.kpi_type, "KPI created");
  Ok(kpi)
}

pub async fn delete_kpi<S: ActivityStore>(store: &S, id: i64) -> Result<()> {
  if !store.delete_kpi(id).await.map_err(Error::store)? {
    return Err(Error::NotFound("KPI not found".to_owned()));
  }
  tracing::info!(kpi_id = id, "KPI deleted");
  Ok(())
}

pub async fn set_kpi_active<S: ActivityStore>(store: &S, id: i64, active: bool) -> Result<Kpi> {
  if !store.set_kpi_active(id, active).await.map_err(Error::store)? {
    return Err(Error::NotFound("KPI not found".to_owned()));
  }
  tracing::info!(kpi_id = id, active, "KPI status changed");
  store
    .get_kpi(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("KPI not found".to_owned()))
}

/// Live KPIs of the activity, active or not.
pub async fn list_kpis<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  kpi_type: Option<KpiType>,
) -> Result<Vec<Kpi>> {
  require_activity(store, activity_id).await?;
  store.list_kpis(activity_id, kpi_type).await.map_err(Error::store)
}

pub async fn overview<S: ActivityStore>(store: &S) -> Result<Overview> {
  store.overview().await.map_err(Error::store)
}
