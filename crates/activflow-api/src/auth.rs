//! HTTP Basic-auth extractor backed by the user table.
//!
//! Credentials are `email:password`; the password is checked against the
//! user's argon2 PHC hash. Deleted and inactive users are rejected.

use activflow_core::{
  rbac::Rbac,
  store::ActivityStore,
  user::{Principal, User},
};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
  /// Check the caller's profile grants `permission`.
  pub fn authorize(&self, rbac: &Rbac, permission: &str) -> Result<Principal, ApiError> {
    rbac.authorize(self.0.profile, permission)?;
    Ok(Principal::from(&self.0))
  }
}

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Decode `Authorization: Basic …` into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.trim().to_lowercase(), password.to_owned()))
}

fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
  let parsed_hash = PasswordHash::new(hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: ActivityStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let user = state
      .store
      .find_user_by_email(email)
      .await
      .map_err(ApiError::store)?
      .filter(|u| u.is_active)
      .ok_or(ApiError::Unauthorized)?;
    verify_password(&password, &user.password_hash)?;

    Ok(AuthUser(user))
  }
}
