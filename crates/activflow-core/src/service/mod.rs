//! Operations of the service, written against any [`ActivityStore`].
//!
//! Each function resolves what it needs through the store, applies the
//! business rules and maps store failures to [`Error::Store`]. Authorization
//! by role is the caller's job; scope checks that depend on data (team
//! membership, team filters) happen here.

pub mod admin;
pub mod dashboard;
pub mod kpi;
pub mod submission;

pub use admin::*;
pub use dashboard::*;
pub use kpi::*;
pub use submission::*;

use crate::{
  Error, Result,
  activity::Activity,
  kpi::{Kpi, KpiType},
  store::ActivityStore,
};

/// Fetch a live activity or fail with [`Error::NotFound`].
async fn require_activity<S: ActivityStore>(store: &S, id: i64) -> Result<Activity> {
  store
    .get_activity(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("activity not found".to_owned()))
}

/// Live, active KPIs of one kind.
async fn active_kpis<S: ActivityStore>(
  store: &S,
  activity_id: i64,
  kpi_type: KpiType,
) -> Result<Vec<Kpi>> {
  let kpis = store
    .list_kpis(activity_id, Some(kpi_type))
    .await
    .map_err(Error::store)?;
  Ok(kpis.into_iter().filter(|k| k.is_active).collect())
}
