//! Users, their profile (role) and the authenticated principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The role attached to a user. Permissions are looked up per profile in
/// [`crate::rbac::Rbac`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Profile {
  Admin,
  Supervisor,
  Sampler,
  Viewer,
}

impl Profile {
  /// Admins and viewers read every submission of a form; other profiles only
  /// their own.
  pub fn sees_all_submissions(self) -> bool {
    matches!(self, Profile::Admin | Profile::Viewer)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub email:         String,
  pub firstname:     String,
  pub lastname:      String,
  pub profile:       Profile,
  /// argon2 PHC string; never leaves the process.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ActivityStore::create_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub email:         String,
  pub firstname:     String,
  pub lastname:      String,
  pub profile:       Profile,
  pub password_hash: String,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
  pub user_id: i64,
  pub profile: Profile,
}

impl From<&User> for Principal {
  fn from(user: &User) -> Self {
    Self { user_id: user.id, profile: user.profile }
  }
}
