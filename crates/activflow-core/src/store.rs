//! The `ActivityStore` trait.
//!
//! Implemented by storage backends (e.g. `activflow-store-sqlite`). The
//! service layer in [`crate::service`] is written against this abstraction.
//!
//! Every read excludes soft-deleted rows unless stated otherwise. Methods
//! that replace a set of rows do so in a single transaction.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  activity::{Activity, NewActivity, NewTeam, Team},
  dashboard::TimeWindow,
  form::{FieldDefinition, Form, NewField, NewSubmission, SessionSummary, SessionView},
  kpi::{Kpi, KpiType, NewKpi, ObjectiveResultLink, TeamObjectiveKpi, TeamResultKpi},
  user::{NewUser, User},
};

/// Live entity counts for the administration dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
  pub activities: u64,
  pub kpis:       u64,
  pub forms:      u64,
  pub teams:      u64,
  /// Users other than viewers.
  pub users:      u64,
  pub sessions:   u64,
}

/// Abstraction over an activity store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ActivityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `false` if the user was not found.
  fn set_user_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Teams ─────────────────────────────────────────────────────────────

  fn create_team(
    &self,
    input: NewTeam,
  ) -> impl Future<Output = Result<Team, Self::Error>> + Send + '_;

  fn get_team(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + '_;

  fn find_team_by_code(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + '_;

  /// Idempotent: adding an existing member is a no-op.
  fn add_team_member(
    &self,
    team_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Live members of a team, in the order they joined.
  fn team_members(
    &self,
    team_id: i64,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Live, active teams the user belongs to.
  fn teams_of_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Team>, Self::Error>> + Send + '_;

  /// Returns `false` if the team was not found.
  fn set_team_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if the team was not found.
  fn delete_team(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  fn create_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  fn get_activity(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Live teams assigned to the activity, in assignment order.
  fn activity_teams(
    &self,
    activity_id: i64,
  ) -> impl Future<Output = Result<Vec<Team>, Self::Error>> + Send + '_;

  /// Replace the whole set of teams assigned to the activity.
  fn replace_activity_teams(
    &self,
    activity_id: i64,
    team_ids: Vec<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Live, active activities collecting data with the form.
  fn activities_using_form(
    &self,
    form_id: i64,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// Returns `false` if the activity was not found.
  fn set_activity_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if the activity was not found.
  fn delete_activity(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Forms ─────────────────────────────────────────────────────────────

  fn create_form(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Form, Self::Error>> + Send + '_;

  fn get_form(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Form>, Self::Error>> + Send + '_;

  /// Returns `false` if the form was not found.
  fn set_form_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append a field; its rank follows the form's last field.
  fn add_field(
    &self,
    input: NewField,
  ) -> impl Future<Output = Result<FieldDefinition, Self::Error>> + Send + '_;

  /// Live fields of the form in rank order.
  fn list_fields(
    &self,
    form_id: i64,
  ) -> impl Future<Output = Result<Vec<FieldDefinition>, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if the field was not found.
  fn delete_field(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  /// Write every row of one session, or none.
  fn insert_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Distinct sessions of the form, newest first, optionally restricted to
  /// one author.
  fn list_sessions(
    &self,
    form_id: i64,
    user_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<SessionSummary>, Self::Error>> + Send + '_;

  /// The rows of one session keyed by field slug. Rows of soft-deleted
  /// fields are kept. Returns `None` when the session has no rows.
  fn get_session(
    &self,
    form_id: i64,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<SessionView>, Self::Error>> + Send + '_;

  /// Number of distinct sessions on the form authored by any of `user_ids`
  /// within the window.
  fn count_sessions(
    &self,
    form_id: i64,
    user_ids: Vec<i64>,
    window: TimeWindow,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── KPIs ──────────────────────────────────────────────────────────────

  fn create_kpi(
    &self,
    input: NewKpi,
  ) -> impl Future<Output = Result<Kpi, Self::Error>> + Send + '_;

  fn get_kpi(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Kpi>, Self::Error>> + Send + '_;

  fn find_kpi_by_slug(
    &self,
    activity_id: i64,
    slug: String,
  ) -> impl Future<Output = Result<Option<Kpi>, Self::Error>> + Send + '_;

  /// Live KPIs of the activity (active or not), in creation order.
  fn list_kpis(
    &self,
    activity_id: i64,
    kpi_type: Option<KpiType>,
  ) -> impl Future<Output = Result<Vec<Kpi>, Self::Error>> + Send + '_;

  /// Set the activity-level value of several KPIs at once.
  fn set_kpi_values(
    &self,
    values: Vec<(i64, f64)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the KPI was not found.
  fn set_kpi_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if the KPI was not found.
  fn delete_kpi(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Objective shares and results ──────────────────────────────────────

  /// Delete every share of `team_ids` on `kpi_ids`, then insert `rows`.
  fn replace_team_objectives(
    &self,
    team_ids: Vec<i64>,
    kpi_ids: Vec<i64>,
    rows: Vec<TeamObjectiveKpi>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn team_objectives(
    &self,
    kpi_ids: Vec<i64>,
    team_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<TeamObjectiveKpi>, Self::Error>> + Send + '_;

  fn append_team_results(
    &self,
    rows: Vec<TeamResultKpi>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Result rows of `kpi_ids` by `team_ids` recorded within the window,
  /// oldest first.
  fn team_results(
    &self,
    kpi_ids: Vec<i64>,
    team_ids: Vec<i64>,
    window: TimeWindow,
  ) -> impl Future<Output = Result<Vec<TeamResultKpi>, Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Drop any link of `link.result_id`, then store `link`.
  fn replace_link(
    &self,
    link: ObjectiveResultLink,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Links whose result is one of `result_ids`.
  fn links(
    &self,
    result_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<ObjectiveResultLink>, Self::Error>> + Send + '_;

  // ── Administration ────────────────────────────────────────────────────

  fn overview(&self) -> impl Future<Output = Result<Overview, Self::Error>> + Send + '_;
}
