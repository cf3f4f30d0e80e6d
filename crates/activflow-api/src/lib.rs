//! JSON REST API for ActivFlow.
//!
//! Exposes an axum [`Router`] backed by any [`ActivityStore`]. Every route
//! authenticates the caller with HTTP Basic credentials and gates the
//! operation by one permission name of the [`Rbac`] table.

pub mod activities;
pub mod auth;
pub mod dashboards;
pub mod error;
pub mod forms;
pub mod kpis;
pub mod teams;
pub mod users;

use std::sync::Arc;

use activflow_core::{rbac::Rbac, store::ActivityStore};
use axum::{
  Router,
  routing::{delete, get, patch, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
  pub rbac:  Arc<Rbac>,
}

impl<S> AppState<S> {
  pub fn new(store: S, rbac: Rbac) -> Self {
    Self { store: Arc::new(store), rbac: Arc::new(rbac) }
  }
}

/// Body of every `PATCH …/status` route.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub is_active: bool,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API [`Router`] for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ActivityStore + Clone + 'static,
{
  Router::new()
    // Users
    .route("/me",                                       get(users::me::<S>))
    .route("/users",                                    post(users::create::<S>))
    .route("/users/{id}/status",                        patch(users::set_status::<S>))
    .route("/dashboard",                                get(dashboards::overview::<S>))
    // Teams
    .route("/teams",                                    post(teams::create::<S>))
    .route("/teams/{id}",                               delete(teams::remove::<S>))
    .route("/teams/{id}/members",                       post(teams::add_member::<S>))
    .route("/teams/{id}/status",                        patch(teams::set_status::<S>))
    // Activities
    .route("/activities",                               post(activities::create::<S>))
    .route(
      "/activities/{id}",
      get(activities::get_one::<S>).delete(activities::remove::<S>),
    )
    .route("/activities/{id}/status",                   patch(activities::set_status::<S>))
    .route("/activities/{id}/teams",                    put(activities::assign_teams::<S>))
    .route("/activities/{id}/kpis",                     get(kpis::list::<S>))
    .route("/activities/{id}/objectives",               post(kpis::fill_objective::<S>))
    .route(
      "/activities/{id}/objectives/teams",
      get(kpis::team_objectives::<S>).post(kpis::fill_team_objectives::<S>),
    )
    .route("/activities/{id}/results",                  post(kpis::fill_result::<S>))
    .route("/activities/{id}/dashboard/objectives",     get(dashboards::objectives::<S>))
    .route("/activities/{id}/dashboard/results",        get(dashboards::results::<S>))
    .route("/activities/{id}/dashboard/rates",          get(dashboards::rates::<S>))
    .route("/activities/{id}/dashboard/reports",        get(dashboards::reports::<S>))
    // Forms
    .route("/field-types",                              get(forms::field_types::<S>))
    .route("/forms",                                    post(forms::create::<S>))
    .route("/forms/{id}",                               get(forms::get_one::<S>))
    .route("/forms/{id}/status",                        patch(forms::set_status::<S>))
    .route("/forms/{id}/fields",                        post(forms::add_field::<S>))
    .route("/fields/{id}",                              delete(forms::remove_field::<S>))
    .route("/forms/{id}/submissions",                   post(forms::submit::<S>))
    .route("/forms/{id}/sessions",                      get(forms::sessions::<S>))
    .route("/forms/{id}/sessions/{session_id}",         get(forms::session::<S>))
    // KPIs
    .route("/kpis",                                     post(kpis::create::<S>))
    .route("/kpis/link",                                post(kpis::link::<S>))
    .route("/kpis/{id}/status",                         patch(kpis::set_status::<S>))
    .route("/kpis/{id}",                                delete(kpis::remove::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
