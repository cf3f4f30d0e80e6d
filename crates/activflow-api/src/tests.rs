//! Router tests against an in-memory store with real Basic credentials.

use activflow_core::{
  activity::{NewActivity, NewTeam},
  form::{AddField, NewForm},
  rbac::{MSG_UNAUTHORIZED, Rbac},
  service,
  user::{NewUser, Profile},
};
use activflow_store_sqlite::SqliteStore;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString};
use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::{AppState, error::MSG_INTERNAL, router};

const PASSWORD: &str = "correct horse";

/// A deliberately weak hash so each request verifies quickly.
fn cheap_hash(password: &str) -> String {
  let params = Params::new(1024, 1, 1, None).unwrap();
  let salt = SaltString::generate(&mut OsRng);
  Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    .hash_password(password.as_bytes(), &salt)
    .unwrap()
    .to_string()
}

struct Fixture {
  app:         Router,
  store:       SqliteStore,
  form_id:     i64,
  activity_id: i64,
}

/// An admin, a sampler in team T1, a sampler in no team, and an activity
/// whose form has one required text field.
async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.unwrap();

  let mut users = Vec::new();
  for (email, profile) in [
    ("admin@example.com", Profile::Admin),
    ("sam@example.com", Profile::Sampler),
    ("other@example.com", Profile::Sampler),
  ] {
    let user = service::create_user(&store, NewUser {
      email: email.into(),
      firstname: "Test".into(),
      lastname: "User".into(),
      profile,
      password_hash: cheap_hash(PASSWORD),
    })
    .await
    .unwrap();
    users.push(user);
  }

  let form = service::create_form(&store, NewForm { name: "Visit".into() })
    .await
    .unwrap();
  service::add_field(&store, form.id, AddField {
    label: "Shop name".into(),
    field_type: "simple-text".into(),
    optional: false,
    select_values: None,
  })
  .await
  .unwrap();
  let activity = service::create_activity(&store, NewActivity {
    name:        "Campaign".into(),
    description: None,
    form_id:     Some(form.id),
  })
  .await
  .unwrap();
  let team = service::create_team(&store, NewTeam { code: "T1".into(), name: "North".into() })
    .await
    .unwrap();
  service::assign_teams(&store, activity.id, vec![team.id]).await.unwrap();
  service::add_team_member(&store, team.id, users[1].id).await.unwrap();

  let app = router(AppState::new(store.clone(), Rbac::default()));
  Fixture { app, store, form_id: form.id, activity_id: activity.id }
}

fn basic(email: &str, password: &str) -> String {
  format!("Basic {}", B64.encode(format!("{email}:{password}")))
}

fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn admin() -> String { basic("admin@example.com", PASSWORD) }

fn sampler() -> String { basic("sam@example.com", PASSWORD) }

// ─── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_are_401() {
  let f = fixture().await;
  let resp = f
    .app
    .clone()
    .oneshot(request(Method::GET, "/me", None, None))
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_401() {
  let f = fixture().await;
  let wrong = basic("admin@example.com", "nope");
  let (status, _) = send(&f.app, request(Method::GET, "/me", Some(&wrong), None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let ghost = basic("ghost@example.com", PASSWORD);
  let (status, body) = send(&f.app, request(Method::GET, "/me", Some(&ghost), None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn me_returns_the_caller_without_its_hash() {
  let f = fixture().await;
  let auth = basic("SAM@example.com", PASSWORD);
  let (status, body) = send(&f.app, request(Method::GET, "/me", Some(&auth), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["email"], "sam@example.com");
  assert_eq!(body["profile"], "sampler");
  assert!(body.get("password_hash").is_none());
}

// ─── Authorization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_without_permission_is_403() {
  let f = fixture().await;
  let (status, body) = send(
    &f.app,
    request(Method::POST, "/teams", Some(&sampler()), Some(json!({ "code": "T9", "name": "X" }))),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], MSG_UNAUTHORIZED);

  let (status, _) = send(&f.app, request(Method::GET, "/dashboard", Some(&sampler()), None)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_users_cannot_authenticate() {
  let f = fixture().await;
  let (_, me) = send(&f.app, request(Method::GET, "/me", Some(&sampler()), None)).await;
  let uri = format!("/users/{}/status", me["id"]);

  let (status, _) = send(
    &f.app,
    request(Method::PATCH, &uri, Some(&sampler()), Some(json!({ "is_active": false }))),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(
    &f.app,
    request(Method::PATCH, &uri, Some(&admin()), Some(json!({ "is_active": false }))),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["is_active"], false);

  let (status, _) = send(&f.app, request(Method::GET, "/me", Some(&sampler()), None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  send(
    &f.app,
    request(Method::PATCH, &uri, Some(&admin()), Some(json!({ "is_active": true }))),
  )
  .await;
  let (status, _) = send(&f.app, request(Method::GET, "/me", Some(&sampler()), None)).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_forms_reject_submissions() {
  let f = fixture().await;
  let uri = format!("/forms/{}/status", f.form_id);
  let (status, body) = send(
    &f.app,
    request(Method::PATCH, &uri, Some(&admin()), Some(json!({ "is_active": false }))),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["is_active"], false);

  let uri = format!("/forms/{}/submissions", f.form_id);
  let (status, body) = send(
    &f.app,
    request(Method::POST, &uri, Some(&sampler()), Some(json!({ "shop-name": "Corner" }))),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "form is not active");
}

// ─── Administration ───────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_creates_users_that_can_log_in() {
  let f = fixture().await;
  let (status, body) = send(
    &f.app,
    request(
      Method::POST,
      "/users",
      Some(&admin()),
      Some(json!({
        "email": "New@Example.com",
        "firstname": "New",
        "lastname": "Person",
        "profile": "viewer",
        "password": "pw",
      })),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["email"], "new@example.com");

  let auth = basic("new@example.com", "pw");
  let (status, body) = send(&f.app, request(Method::GET, "/me", Some(&auth), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["profile"], "viewer");
}

#[tokio::test]
async fn core_errors_map_to_statuses() {
  let f = fixture().await;

  let (status, body) = send(&f.app, request(Method::GET, "/activities/999", Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "activity not found");

  let (status, _) = send(
    &f.app,
    request(Method::POST, "/teams", Some(&admin()), Some(json!({ "code": "T1", "name": "Dup" }))),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let uri = format!("/activities/{}/dashboard/results?start_date=2024-02-01&end_date=2024-01-01", f.activity_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "start date must not be after end date");

  let uri = format!("/activities/{}/dashboard/results?start_date=0001-01-01&end_date=9999-12-31", f.activity_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "date range must not exceed 366 days");

  let uri = format!("/activities/{}/dashboard/results?start_date=2024-01-01&end_date=2024-01-02&team_ids=1,abc", f.activity_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "invalid team id: abc");
}

#[tokio::test]
async fn activity_detail_and_overview() {
  let f = fixture().await;
  let uri = format!("/activities/{}", f.activity_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Campaign");
  assert_eq!(body["teams"][0]["code"], "T1");
  assert_eq!(body["form"]["id"], f.form_id);

  let (status, body) = send(&f.app, request(Method::GET, "/dashboard", Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["activities"], 1);
  assert_eq!(body["teams"], 1);
  assert_eq!(body["sessions"], 0);
}

// ─── Submissions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn sampler_submits_and_reads_back() {
  let f = fixture().await;
  let uri = format!("/forms/{}/submissions", f.form_id);

  let (status, body) = send(&f.app, request(Method::POST, &uri, Some(&sampler()), Some(json!({})))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Missing required fields: shop-name");

  let (status, body) = send(
    &f.app,
    request(Method::POST, &uri, Some(&sampler()), Some(json!({ "shop-name": "Corner" }))),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let session_id = body["session_id"].as_str().unwrap().to_owned();

  let uri = format!("/forms/{}/sessions", f.form_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&sampler()), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let uri = format!("/forms/{}/sessions/{session_id}", f.form_id);
  let (status, body) = send(&f.app, request(Method::GET, &uri, Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["values"]["shop-name"], "Corner");

  assert_eq!(service::overview(&f.store).await.unwrap().sessions, 1);
}

#[tokio::test]
async fn sampler_outside_assigned_teams_is_403() {
  let f = fixture().await;
  let uri = format!("/forms/{}/submissions", f.form_id);
  let auth = basic("other@example.com", PASSWORD);
  let (status, _) = send(
    &f.app,
    request(Method::POST, &uri, Some(&auth), Some(json!({ "shop-name": "Corner" }))),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Internal failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn store_failures_do_not_leak_details() {
  let path = std::env::temp_dir().join(format!("activflow-{}.db", uuid::Uuid::new_v4()));
  let store = SqliteStore::open(&path).await.unwrap();
  service::create_user(&store, NewUser {
    email: "admin@example.com".into(),
    firstname: "Test".into(),
    lastname: "User".into(),
    profile: Profile::Admin,
    password_hash: cheap_hash(PASSWORD),
  })
  .await
  .unwrap();

  // Break the schema behind the store's back.
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute_batch("DROP VIEW live_activities;")
    .unwrap();

  let app = router(AppState::new(store, Rbac::default()));
  let (status, body) = send(&app, request(Method::GET, "/activities/1", Some(&admin()), None)).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": MSG_INTERNAL }));

  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}
