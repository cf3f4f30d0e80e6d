//! Role-based access control.
//!
//! [`Rbac`] maps each [`Profile`] to the set of operation names it may
//! perform. It is built once at startup and handed to whoever gates requests.

use std::collections::{HashMap, HashSet};

use crate::{Error, Result, user::Profile};

pub const MSG_UNAUTHORIZED: &str =
  "You do not have permission to perform this operation";

const ADMIN: &[&str] = &[
  "change_password",
  "profile_find_all",
  "field_type_find_all",
  "field_type_find_one",
  "user_create",
  "user_find_all",
  "user_find_one",
  "user_find_me",
  "user_update",
  "user_change_status",
  "user_delete",
  "kpi_link",
  "kpi_create",
  "kpi_find_all",
  "kpi_find_all_by_activity",
  "kpi_find_one",
  "kpi_update",
  "kpi_delete",
  "kpi_fill_objective",
  "activity_dashboard",
  "activity_kpi_objective_dashboard",
  "activity_kpi_result_dashboard",
  "activity_report_team_dashboard",
  "activity_create",
  "activity_find_all",
  "activity_find_one",
  "activity_update",
  "activity_change_status",
  "activity_delete",
  "activity_add_team",
  "activity_add_form",
  "team_create",
  "team_find_all",
  "team_find_one",
  "team_update",
  "team_change_status",
  "team_delete",
  "team_add_member",
  "form_create",
  "form_find_all",
  "form_find_one",
  "form_update",
  "form_change_status",
  "form_delete",
  "form_add_field",
  "form_update_fields",
  "store_show",
  "store_list_session",
  "store_show_session",
  "admin_dashboard",
];

const SUPERVISOR: &[&str] = &[
  "change_password",
  "user_find_me",
  "field_type_find_all",
  "field_type_find_one",
  "store_save",
  "store_show",
  "store_list_session",
  "store_show_session",
  "kpi_find_all",
  "kpi_find_all_by_activity",
  "kpi_fill_result",
  "activity_find_one",
  "activity_fill_kpi",
  "form_find_one",
];

const SAMPLER: &[&str] = &[
  "change_password",
  "user_find_me",
  "field_type_find_all",
  "field_type_find_one",
  "store_save",
  "store_show",
  "store_list_session",
  "store_show_session",
  "form_find_one",
];

const VIEWER: &[&str] = &["change_password", "user_find_me"];

/// Immutable role → permission table.
#[derive(Debug, Clone)]
pub struct Rbac {
  roles: HashMap<Profile, HashSet<&'static str>>,
}

impl Rbac {
  pub fn new(roles: HashMap<Profile, HashSet<&'static str>>) -> Self {
    Self { roles }
  }

  pub fn allows(&self, profile: Profile, permission: &str) -> bool {
    self
      .roles
      .get(&profile)
      .is_some_and(|perms| perms.contains(permission))
  }

  /// Fails with [`Error::Forbidden`] when `profile` lacks `permission`.
  pub fn authorize(&self, profile: Profile, permission: &str) -> Result<()> {
    if self.allows(profile, permission) {
      Ok(())
    } else {
      tracing::warn!(%profile, permission, "permission denied");
      Err(Error::Forbidden(MSG_UNAUTHORIZED.to_owned()))
    }
  }
}

impl Default for Rbac {
  fn default() -> Self {
    let table = [
      (Profile::Admin, ADMIN),
      (Profile::Supervisor, SUPERVISOR),
      (Profile::Sampler, SAMPLER),
      (Profile::Viewer, VIEWER),
    ];
    Self::new(
      table
        .into_iter()
        .map(|(profile, perms)| (profile, perms.iter().copied().collect()))
        .collect(),
    )
  }
}
