//! Integration tests for `SqliteStore` and the service operations against an
//! in-memory database.

use activflow_core::{
  Error,
  activity::{Activity, NewActivity, NewTeam, Team},
  dashboard::DashboardQuery,
  form::{AddField, Form, NewForm},
  kpi::{CreateKpi, FillKpi, Kpi, KpiType, LinkKpis, TeamResultKpi},
  service,
  store::ActivityStore,
  user::{NewUser, Principal, Profile, User},
};
use chrono::{Days, TimeZone, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_user(email: &str, profile: Profile) -> NewUser {
  NewUser {
    email: email.into(),
    firstname: "Test".into(),
    lastname: email.split('@').next().unwrap_or_default().into(),
    profile,
    password_hash: "not-a-real-hash".into(),
  }
}

fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected an object, got {other}"),
  }
}

fn fill(value: Value) -> FillKpi { FillKpi { datas: object(value) } }

fn query(start: &str, end: &str, team_ids: Vec<i64>) -> DashboardQuery {
  DashboardQuery {
    start_date: Some(start.into()),
    end_date: Some(end.into()),
    team_ids,
  }
}

/// A range of three days centred on today.
fn around_today(team_ids: Vec<i64>) -> DashboardQuery {
  let today = Utc::now().date_naive();
  let fmt = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
  query(
    &fmt(today - Days::new(1)),
    &fmt(today + Days::new(1)),
    team_ids,
  )
}

/// One activity with a three-field form, two assigned teams and a user of
/// each profile. The supervisor belongs to T1, the sampler to T2.
struct Fixture {
  s:          SqliteStore,
  form:       Form,
  activity:   Activity,
  t1:         Team,
  t2:         Team,
  admin:      User,
  supervisor: User,
  sampler:    User,
  viewer:     User,
}

async fn fixture() -> Fixture {
  let s = store().await;

  let form = service::create_form(&s, NewForm { name: "Shop visit".into() })
    .await
    .unwrap();
  for (label, field_type, optional, select_values) in [
    ("Shop name", "simple-text", false, None),
    ("Visited", "select", false, Some("yes;no")),
    ("Comment", "long-text", true, None),
  ] {
    service::add_field(&s, form.id, AddField {
      label: label.into(),
      field_type: field_type.into(),
      optional,
      select_values: select_values.map(str::to_owned),
    })
    .await
    .unwrap();
  }

  let activity = service::create_activity(&s, NewActivity {
    name:        "Spring campaign".into(),
    description: None,
    form_id:     Some(form.id),
  })
  .await
  .unwrap();

  let t1 = service::create_team(&s, NewTeam { code: "T1".into(), name: "North".into() })
    .await
    .unwrap();
  let t2 = service::create_team(&s, NewTeam { code: "T2".into(), name: "South".into() })
    .await
    .unwrap();
  service::assign_teams(&s, activity.id, vec![t1.id, t2.id])
    .await
    .unwrap();

  let admin = service::create_user(&s, new_user("admin@example.com", Profile::Admin))
    .await
    .unwrap();
  let supervisor = service::create_user(&s, new_user("sup@example.com", Profile::Supervisor))
    .await
    .unwrap();
  let sampler = service::create_user(&s, new_user("sam@example.com", Profile::Sampler))
    .await
    .unwrap();
  let viewer = service::create_user(&s, new_user("view@example.com", Profile::Viewer))
    .await
    .unwrap();
  service::add_team_member(&s, t1.id, supervisor.id).await.unwrap();
  service::add_team_member(&s, t2.id, sampler.id).await.unwrap();

  Fixture { s, form, activity, t1, t2, admin, supervisor, sampler, viewer }
}

async fn kpi(f: &Fixture, name: &str, kpi_type: KpiType) -> Kpi {
  service::create_kpi(&f.s, CreateKpi {
    activity_id: f.activity.id,
    name: name.into(),
    kpi_type,
    description: None,
  })
  .await
  .unwrap()
}

fn valid_visit() -> Map<String, Value> {
  object(json!({ "shop-name": "Corner store", "visited": "yes" }))
}

// ─── Users and teams ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_user() {
  let s = store().await;
  let user = service::create_user(&s, new_user("Ann@Example.com", Profile::Sampler))
    .await
    .unwrap();
  assert_eq!(user.email, "ann@example.com");

  let found = s
    .find_user_by_email("ann@example.com".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.id, user.id);
  assert_eq!(found.profile, Profile::Sampler);
  assert_eq!(found.created_at, user.created_at);
  assert!(found.is_active);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
  let s = store().await;
  service::create_user(&s, new_user("ann@example.com", Profile::Sampler))
    .await
    .unwrap();
  let err = service::create_user(&s, new_user("ann@example.com", Profile::Viewer))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn invalid_email_is_rejected() {
  let s = store().await;
  let err = service::create_user(&s, new_user("not-an-email", Profile::Sampler))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn team_membership_is_idempotent() {
  let f = fixture().await;
  service::add_team_member(&f.s, f.t1.id, f.supervisor.id).await.unwrap();
  let members = service::add_team_member(&f.s, f.t1.id, f.sampler.id)
    .await
    .unwrap();
  let ids: Vec<i64> = members.iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![f.supervisor.id, f.sampler.id]);
}

#[tokio::test]
async fn deleted_team_disappears_from_activity() {
  let f = fixture().await;
  service::delete_team(&f.s, f.t2.id).await.unwrap();

  assert!(f.s.get_team(f.t2.id).await.unwrap().is_none());
  let teams = f.s.activity_teams(f.activity.id).await.unwrap();
  assert_eq!(teams, vec![f.t1.clone()]);

  let err = service::delete_team(&f.s, f.t2.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn assign_teams_replaces_the_set() {
  let f = fixture().await;
  let teams = service::assign_teams(&f.s, f.activity.id, vec![f.t2.id, f.t2.id])
    .await
    .unwrap();
  assert_eq!(teams, vec![f.t2.clone()]);

  let err = service::assign_teams(&f.s, f.activity.id, vec![f.t1.id, 999])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
  // The failed call left the previous set in place.
  assert_eq!(f.s.activity_teams(f.activity.id).await.unwrap(), vec![f.t2.clone()]);
}

// ─── Activities and forms ────────────────────────────────────────────────────

#[tokio::test]
async fn activity_detail_includes_teams_and_form() {
  let f = fixture().await;
  let detail = service::get_activity(&f.s, f.activity.id).await.unwrap();
  assert_eq!(detail.teams.len(), 2);
  assert_eq!(detail.form.map(|form| form.id), Some(f.form.id));

  service::delete_activity(&f.s, f.activity.id).await.unwrap();
  let err = service::get_activity(&f.s, f.activity.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn activity_requires_existing_form() {
  let s = store().await;
  let err = service::create_activity(&s, NewActivity {
    name:        "Orphan".into(),
    description: None,
    form_id:     Some(42),
  })
  .await
  .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn fields_are_ranked_and_slugged() {
  let f = fixture().await;
  let detail = service::get_form(&f.s, f.form.id).await.unwrap();
  let slugs: Vec<&str> = detail.fields.iter().map(|f| f.slug.as_str()).collect();
  assert_eq!(slugs, vec!["shop-name", "visited", "comment"]);
  assert_eq!(detail.fields[1].select_values, vec!["yes", "no"]);
  let ranks: Vec<i64> = detail.fields.iter().map(|f| f.rank).collect();
  assert_eq!(ranks, vec![1, 2, 3]);
}

#[tokio::test]
async fn field_slug_is_unique_among_live_fields() {
  let f = fixture().await;
  let add = |label: &str| AddField {
    label: label.into(),
    field_type: "simple-text".into(),
    optional: true,
    select_values: None,
  };

  let err = service::add_field(&f.s, f.form.id, add("Shop  Name"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));

  let existing = service::get_form(&f.s, f.form.id).await.unwrap().fields;
  service::delete_field(&f.s, existing[0].id).await.unwrap();
  let readded = service::add_field(&f.s, f.form.id, add("Shop name"))
    .await
    .unwrap();
  assert_eq!(readded.slug, "shop-name");
  assert_eq!(readded.rank, 4);
}

#[tokio::test]
async fn field_type_must_be_known_and_enabled() {
  let f = fixture().await;
  let add = |field_type: &str, select_values: Option<&str>| AddField {
    label: format!("Extra {field_type}"),
    field_type: field_type.into(),
    optional: true,
    select_values: select_values.map(str::to_owned),
  };

  let err = service::add_field(&f.s, f.form.id, add("rich-text", None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let err = service::add_field(&f.s, f.form.id, add("boolean", None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));

  let err = service::add_field(&f.s, f.form.id, add("select", Some(" ; ")))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_read_back_a_submission() {
  let f = fixture().await;
  let mut payload = valid_visit();
  payload.insert("unknown".into(), json!("ignored"));

  let summary = service::save_submission(
    &f.s,
    f.form.id,
    payload,
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap();

  let view = service::get_session(
    &f.s,
    f.form.id,
    summary.session_id,
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap();
  assert_eq!(view.user_id, f.supervisor.id);
  assert_eq!(view.submitted_at, summary.submitted_at);
  assert_eq!(view.values.len(), 2);
  assert_eq!(view.values["shop-name"], "Corner store");
  assert_eq!(view.values["visited"], "yes");
}

#[tokio::test]
async fn invalid_submission_writes_nothing() {
  let f = fixture().await;
  let err = service::save_submission(
    &f.s,
    f.form.id,
    object(json!({ "visited": "yes" })),
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap_err();
  assert!(matches!(&err, Error::BadRequest(m) if m == "Missing required fields: shop-name"));

  let err = service::save_submission(
    &f.s,
    f.form.id,
    object(json!({ "shop-name": "Corner store", "visited": "maybe" })),
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap_err();
  assert!(matches!(&err, Error::BadRequest(m) if m == "the field visited must be one of: yes, no"));

  let sessions = service::list_sessions(&f.s, f.form.id, Principal::from(&f.admin))
    .await
    .unwrap();
  assert!(sessions.is_empty());
}

#[tokio::test]
async fn submission_requires_assigned_team() {
  let f = fixture().await;
  let err = service::save_submission(
    &f.s,
    f.form.id,
    valid_visit(),
    Principal::from(&f.viewer),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let err = service::save_submission(&f.s, 999, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn inactive_form_rejects_submissions() {
  let f = fixture().await;
  let form = service::set_form_active(&f.s, f.form.id, false).await.unwrap();
  assert!(!form.is_active);

  let err = service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap_err();
  assert!(matches!(&err, Error::Forbidden(m) if m == "form is not active"));

  service::set_form_active(&f.s, f.form.id, true).await.unwrap();
  service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap();
}

#[tokio::test]
async fn inactive_team_cannot_submit() {
  let f = fixture().await;
  let team = service::set_team_active(&f.s, f.t2.id, false).await.unwrap();
  assert!(!team.is_active);

  let err = service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  // The supervisor's team is still active.
  service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.supervisor))
    .await
    .unwrap();
}

#[tokio::test]
async fn inactive_activity_stops_collecting() {
  let f = fixture().await;
  let activity = service::set_activity_active(&f.s, f.activity.id, false).await.unwrap();
  assert!(!activity.is_active);

  let err = service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn status_changes_need_a_live_target() {
  let f = fixture().await;
  let user = service::set_user_active(&f.s, f.viewer.id, false).await.unwrap();
  assert!(!user.is_active);
  let user = service::set_user_active(&f.s, f.viewer.id, true).await.unwrap();
  assert!(user.is_active);

  assert!(matches!(
    service::set_user_active(&f.s, 999, false).await.unwrap_err(),
    Error::NotFound(_)
  ));
  assert!(matches!(
    service::set_form_active(&f.s, 999, false).await.unwrap_err(),
    Error::NotFound(_)
  ));
  service::delete_team(&f.s, f.t1.id).await.unwrap();
  assert!(matches!(
    service::set_team_active(&f.s, f.t1.id, true).await.unwrap_err(),
    Error::NotFound(_)
  ));
  service::delete_activity(&f.s, f.activity.id).await.unwrap();
  assert!(matches!(
    service::set_activity_active(&f.s, f.activity.id, true).await.unwrap_err(),
    Error::NotFound(_)
  ));
}

#[tokio::test]
async fn session_visibility_follows_profile() {
  let f = fixture().await;
  let mine = service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let theirs =
    service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.supervisor))
      .await
      .unwrap();

  let all = service::list_sessions(&f.s, f.form.id, Principal::from(&f.viewer))
    .await
    .unwrap();
  assert_eq!(all.len(), 2);
  // Newest first.
  assert_eq!(all[0].session_id, theirs.session_id);

  let own = service::list_sessions(&f.s, f.form.id, Principal::from(&f.sampler))
    .await
    .unwrap();
  assert_eq!(own, vec![mine.clone()]);

  let err = service::get_session(&f.s, f.form.id, theirs.session_id, Principal::from(&f.sampler))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let err = service::get_session(&f.s, f.form.id, Uuid::new_v4(), Principal::from(&f.admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── KPI definitions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn kpi_lifecycle() {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  let done = kpi(&f, "Visits done", KpiType::Result).await;
  assert_eq!(visits.slug, "visits");
  assert_eq!(done.slug, "visits-done");

  let err = service::create_kpi(&f.s, CreateKpi {
    activity_id: f.activity.id,
    name:        "VISITS".into(),
    kpi_type:    KpiType::Result,
    description: None,
  })
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));

  let objectives = service::list_kpis(&f.s, f.activity.id, Some(KpiType::Objective))
    .await
    .unwrap();
  assert_eq!(objectives, vec![visits.clone()]);

  let disabled = service::set_kpi_active(&f.s, visits.id, false).await.unwrap();
  assert!(!disabled.is_active);

  service::delete_kpi(&f.s, done.id).await.unwrap();
  let all = service::list_kpis(&f.s, f.activity.id, None).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(matches!(
    service::delete_kpi(&f.s, done.id).await,
    Err(Error::NotFound(_))
  ));
}

// ─── Objective and result fills ──────────────────────────────────────────────

#[tokio::test]
async fn fill_activity_objectives() {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  kpi(&f, "Sales", KpiType::Objective).await;

  let err = service::fill_objective_activity(&f.s, f.activity.id, fill(json!({ "visits": 100 })))
    .await
    .unwrap_err();
  assert!(matches!(&err, Error::BadRequest(m) if m == "Missing required fields: sales"));

  service::fill_objective_activity(
    &f.s,
    f.activity.id,
    fill(json!({ "visits": 100, "sales": 20.5 })),
  )
  .await
  .unwrap();
  let visits = f.s.get_kpi(visits.id).await.unwrap().unwrap();
  assert_eq!(visits.value, 100.0);
}

async fn objectives_fixture() -> (Fixture, Kpi) {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  service::fill_objective_activity(&f.s, f.activity.id, fill(json!({ "visits": 100 })))
    .await
    .unwrap();
  (f, visits)
}

#[tokio::test]
async fn team_objective_refill_is_idempotent() {
  let (f, visits) = objectives_fixture().await;
  let payload = json!({ "T1": { "visits": 60 }, "T2": { "visits": 40 } });

  service::fill_objective_team(&f.s, f.activity.id, fill(payload.clone()))
    .await
    .unwrap();
  let first = f
    .s
    .team_objectives(vec![visits.id], vec![f.t1.id, f.t2.id])
    .await
    .unwrap();

  service::fill_objective_team(&f.s, f.activity.id, fill(payload))
    .await
    .unwrap();
  let second = f
    .s
    .team_objectives(vec![visits.id], vec![f.t1.id, f.t2.id])
    .await
    .unwrap();

  assert_eq!(first.len(), 2);
  assert_eq!(first, second);
}

#[tokio::test]
async fn objective_ceiling_rejects_before_writing() {
  let (f, visits) = objectives_fixture().await;
  service::fill_objective_team(
    &f.s,
    f.activity.id,
    fill(json!({ "T1": { "visits": 50 }, "T2": { "visits": 50 } })),
  )
  .await
  .unwrap();

  let err = service::fill_objective_team(
    &f.s,
    f.activity.id,
    fill(json!({ "T1": { "visits": 70 }, "T2": { "visits": 40 } })),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));

  let rows = f
    .s
    .team_objectives(vec![visits.id], vec![f.t1.id, f.t2.id])
    .await
    .unwrap();
  let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
  assert_eq!(values, vec![50.0, 50.0]);
}

#[tokio::test]
async fn team_objective_errors_name_the_team() {
  let (f, _) = objectives_fixture().await;
  let err = service::fill_objective_team(&f.s, f.activity.id, fill(json!({ "T1": { "visits": 10 } })))
    .await
    .unwrap_err();
  assert!(matches!(&err, Error::BadRequest(m) if m == "T2: Missing required fields: visits"));
}

#[tokio::test]
async fn team_objectives_are_dense() {
  let (f, visits) = objectives_fixture().await;
  service::fill_objective_team(
    &f.s,
    f.activity.id,
    fill(json!({ "T1": { "visits": 30 }, "T2": { "visits": 0 } })),
  )
  .await
  .unwrap();
  kpi(&f, "Sales", KpiType::Objective).await;

  let teams = service::team_objectives(&f.s, f.activity.id).await.unwrap();
  assert_eq!(teams.len(), 2);
  assert_eq!(teams[0].code, "T1");
  assert_eq!(teams[0].kpis.len(), 2);
  assert_eq!(teams[0].kpis[0].kpi_id, visits.id);
  assert_eq!(teams[0].kpis[0].value, 30.0);
  assert_eq!(teams[0].kpis[1].value, 0.0);
}

#[tokio::test]
async fn fill_result_appends_for_the_callers_team() {
  let f = fixture().await;
  let done = kpi(&f, "Visits done", KpiType::Result).await;

  let rows = service::fill_result(
    &f.s,
    f.activity.id,
    fill(json!({ "visits-done": 4 })),
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].team_id, f.t1.id);
  assert_eq!(rows[0].kpi_id, done.id);

  service::fill_result(
    &f.s,
    f.activity.id,
    fill(json!({ "visits-done": 6 })),
    Principal::from(&f.supervisor),
  )
  .await
  .unwrap();
  let dashboard = service::result_dashboard(&f.s, f.activity.id, &around_today(vec![]))
    .await
    .unwrap();
  assert_eq!(dashboard.totals["visits-done"], 10.0);

  let err = service::fill_result(
    &f.s,
    f.activity.id,
    fill(json!({ "visits-done": 1 })),
    Principal::from(&f.viewer),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relinking_replaces_the_previous_link() {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  let sales = kpi(&f, "Sales", KpiType::Objective).await;
  let done = kpi(&f, "Visits done", KpiType::Result).await;

  service::link_kpis(&f.s, LinkKpis { objective_id: visits.id, result_id: done.id })
    .await
    .unwrap();
  service::link_kpis(&f.s, LinkKpis { objective_id: sales.id, result_id: done.id })
    .await
    .unwrap();

  let links = f.s.links(vec![done.id]).await.unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0].objective_id, sales.id);
}

#[tokio::test]
async fn link_checks_types_and_activity() {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  let done = kpi(&f, "Visits done", KpiType::Result).await;

  let err = service::link_kpis(&f.s, LinkKpis { objective_id: done.id, result_id: visits.id })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let other = service::create_activity(&f.s, NewActivity {
    name:        "Other".into(),
    description: None,
    form_id:     None,
  })
  .await
  .unwrap();
  let foreign = service::create_kpi(&f.s, CreateKpi {
    activity_id: other.id,
    name:        "Elsewhere".into(),
    kpi_type:    KpiType::Result,
    description: None,
  })
  .await
  .unwrap();
  let err = service::link_kpis(&f.s, LinkKpis { objective_id: visits.id, result_id: foreign.id })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

// ─── Dashboards ──────────────────────────────────────────────────────────────

fn result_row(team: &Team, kpi: &Kpi, value: f64, day: u32, hour: u32) -> TeamResultKpi {
  TeamResultKpi {
    team_id: team.id,
    kpi_id: kpi.id,
    value,
    recorded_at: Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
  }
}

#[tokio::test]
async fn result_dashboard_is_dense_without_rows() {
  let f = fixture().await;
  kpi(&f, "Sales", KpiType::Result).await;

  let dashboard =
    service::result_dashboard(&f.s, f.activity.id, &query("2024-01-01", "2024-01-02", vec![]))
      .await
      .unwrap();
  for code in ["T1", "T2"] {
    let days = &dashboard.total_by_team[code]["sales"];
    assert_eq!(days.len(), 2);
    assert_eq!(days["2024-01-01"], 0.0);
    assert_eq!(days["2024-01-02"], 0.0);
  }
}

#[tokio::test]
async fn result_dashboard_sums_rows() {
  let f = fixture().await;
  let sales = kpi(&f, "Sales", KpiType::Result).await;
  f.s
    .append_team_results(vec![
      result_row(&f.t1, &sales, 5.0, 1, 8),
      result_row(&f.t1, &sales, 3.0, 1, 23),
      result_row(&f.t2, &sales, 2.0, 2, 12),
      result_row(&f.t2, &sales, 9.0, 3, 0),
    ])
    .await
    .unwrap();

  let dashboard =
    service::result_dashboard(&f.s, f.activity.id, &query("2024-01-01", "2024-01-02", vec![]))
      .await
      .unwrap();
  assert_eq!(dashboard.total_by_team["T1"]["sales"]["2024-01-01"], 8.0);
  assert_eq!(dashboard.total_by_team["T2"]["sales"]["2024-01-02"], 2.0);
  assert_eq!(dashboard.totals["sales"], 10.0);

  let only_t2 = service::result_dashboard(
    &f.s,
    f.activity.id,
    &query("2024-01-01", "2024-01-02", vec![f.t2.id]),
  )
  .await
  .unwrap();
  assert!(!only_t2.total_by_team.contains_key("T1"));
  assert_eq!(only_t2.totals["sales"], 2.0);
}

#[tokio::test]
async fn result_dashboard_rejects_bad_ranges() {
  let f = fixture().await;
  let err =
    service::result_dashboard(&f.s, f.activity.id, &query("2024-02-01", "2024-01-01", vec![]))
      .await
      .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));

  let err = service::result_dashboard(&f.s, f.activity.id, &DashboardQuery::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn unassigned_team_filter_is_forbidden_everywhere() {
  let f = fixture().await;
  let stranger = service::create_team(&f.s, NewTeam { code: "T9".into(), name: "Far".into() })
    .await
    .unwrap();
  let q = query("2024-01-01", "2024-01-02", vec![f.t1.id, stranger.id]);

  assert!(matches!(
    service::objective_dashboard(&f.s, f.activity.id, &q).await,
    Err(Error::Forbidden(_))
  ));
  assert!(matches!(
    service::result_dashboard(&f.s, f.activity.id, &q).await,
    Err(Error::Forbidden(_))
  ));
  assert!(matches!(
    service::realization_dashboard(&f.s, f.activity.id, &q).await,
    Err(Error::Forbidden(_))
  ));
  assert!(matches!(
    service::report_team_dashboard(&f.s, f.activity.id, &q).await,
    Err(Error::Forbidden(_))
  ));
}

#[tokio::test]
async fn dashboards_of_missing_activity_are_not_found() {
  let f = fixture().await;
  service::delete_activity(&f.s, f.activity.id).await.unwrap();
  assert!(matches!(
    service::objective_dashboard(&f.s, f.activity.id, &DashboardQuery::default()).await,
    Err(Error::NotFound(_))
  ));
}

#[tokio::test]
async fn objective_dashboard_is_dense() {
  let (f, _) = objectives_fixture().await;
  service::fill_objective_team(
    &f.s,
    f.activity.id,
    fill(json!({ "T1": { "visits": 60 }, "T2": { "visits": 40 } })),
  )
  .await
  .unwrap();
  kpi(&f, "Calls", KpiType::Objective).await;

  let dashboard = service::objective_dashboard(&f.s, f.activity.id, &DashboardQuery::default())
    .await
    .unwrap();
  assert_eq!(dashboard.total_by_team["T1"]["visits"], 60.0);
  assert_eq!(dashboard.total_by_team["T2"]["calls"], 0.0);
  assert_eq!(dashboard.total_by_kpi["visits"], 100.0);
  assert_eq!(dashboard.total_by_kpi["calls"], 0.0);
}

#[tokio::test]
async fn realization_rates() {
  let f = fixture().await;
  let visits = kpi(&f, "Visits", KpiType::Objective).await;
  let calls = kpi(&f, "Calls", KpiType::Objective).await;
  let visits_done = kpi(&f, "Visits done", KpiType::Result).await;
  let calls_done = kpi(&f, "Calls done", KpiType::Result).await;

  service::fill_objective_activity(
    &f.s,
    f.activity.id,
    fill(json!({ "visits": 100, "calls": 0 })),
  )
  .await
  .unwrap();
  service::fill_objective_team(
    &f.s,
    f.activity.id,
    fill(json!({
      "T1": { "visits": 60, "calls": 0 },
      "T2": { "visits": 40, "calls": 0 },
    })),
  )
  .await
  .unwrap();
  for (objective, result) in [(&visits, &visits_done), (&calls, &calls_done)] {
    service::link_kpis(&f.s, LinkKpis { objective_id: objective.id, result_id: result.id })
      .await
      .unwrap();
  }
  f.s
    .append_team_results(vec![
      result_row(&f.t1, &visits_done, 5.0, 1, 9),
      result_row(&f.t2, &visits_done, 20.0, 2, 9),
      result_row(&f.t2, &calls_done, 7.0, 2, 10),
    ])
    .await
    .unwrap();

  let all = service::realization_dashboard(
    &f.s,
    f.activity.id,
    &query("2024-01-01", "2024-01-02", vec![]),
  )
  .await
  .unwrap();
  assert_eq!(all.len(), 2);
  let visit_row = all.iter().find(|r| r.code == "visits_o_visits-done").unwrap();
  assert_eq!(visit_row.total_objective, 100.0);
  assert_eq!(visit_row.total_result, 25.0);
  assert_eq!(visit_row.rate, 25.0);
  let call_row = all.iter().find(|r| r.code == "calls_o_calls-done").unwrap();
  assert_eq!(call_row.total_result, 7.0);
  assert_eq!(call_row.rate, 0.0);

  let t1 = service::realization_dashboard(
    &f.s,
    f.activity.id,
    &query("2024-01-01", "2024-01-02", vec![f.t1.id]),
  )
  .await
  .unwrap();
  let visit_row = t1.iter().find(|r| r.code == "visits_o_visits-done").unwrap();
  assert_eq!(visit_row.total_objective, 60.0);
  assert_eq!(visit_row.total_result, 5.0);
  assert!((visit_row.rate - 5.0 / 60.0 * 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn report_counts_distinct_sessions() {
  let f = fixture().await;
  for user in [&f.supervisor, &f.supervisor, &f.sampler] {
    service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(user))
      .await
      .unwrap();
  }
  service::add_team_member(&f.s, f.t1.id, f.viewer.id).await.unwrap();

  let reports = service::report_team_dashboard(&f.s, f.activity.id, &around_today(vec![]))
    .await
    .unwrap();
  assert_eq!(reports.len(), 2);

  assert_eq!(reports[0].code, "T1");
  assert_eq!(reports[0].sessions, 2);
  let members: Vec<(i64, u64)> = reports[0]
    .members
    .iter()
    .map(|m| (m.user_id, m.sessions))
    .collect();
  assert_eq!(members, vec![(f.supervisor.id, 2), (f.viewer.id, 0)]);

  assert_eq!(reports[1].code, "T2");
  assert_eq!(reports[1].sessions, 1);
  assert_eq!(reports[1].members[0].sessions, 1);

  let past = service::report_team_dashboard(
    &f.s,
    f.activity.id,
    &query("2020-01-01", "2020-01-31", vec![f.t2.id]),
  )
  .await
  .unwrap();
  assert_eq!(past.len(), 1);
  assert_eq!(past[0].sessions, 0);
}

// ─── Administration ──────────────────────────────────────────────────────────

#[tokio::test]
async fn overview_counts_live_entities() {
  let f = fixture().await;
  kpi(&f, "Visits", KpiType::Objective).await;
  service::save_submission(&f.s, f.form.id, valid_visit(), Principal::from(&f.sampler))
    .await
    .unwrap();
  service::delete_team(&f.s, f.t2.id).await.unwrap();

  let overview = service::overview(&f.s).await.unwrap();
  assert_eq!(overview.activities, 1);
  assert_eq!(overview.kpis, 1);
  assert_eq!(overview.forms, 1);
  assert_eq!(overview.teams, 1);
  assert_eq!(overview.users, 3);
  assert_eq!(overview.sessions, 1);
}
