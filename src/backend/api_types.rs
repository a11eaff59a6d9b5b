//! Serde types matching the auth and REST endpoints of the hosted backend.
//!
//! Kept apart from the domain types so wire quirks stay here.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::session::{Session, User};
use super::types::NewEntry;

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: String,
  #[serde(default)]
  pub email: Option<String>,
}

/// Token grant response (`/auth/v1/token`, and `/auth/v1/signup` when the
/// project auto-confirms).
#[derive(Debug, Deserialize)]
pub struct ApiSession {
  pub access_token: String,
  pub refresh_token: String,
  #[serde(default)]
  pub expires_in: Option<i64>,
  #[serde(default)]
  pub expires_at: Option<i64>,
  pub user: ApiUser,
}

impl ApiSession {
  pub fn into_session(self) -> Session {
    let expires_at = self
      .expires_at
      .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
      .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)));

    Session {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at,
      user: User {
        id: self.user.id,
        email: self.user.email,
      },
    }
  }
}

/// `/auth/v1/signup` answers with a session when no email confirmation is
/// required, otherwise with the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiSignUpResponse {
  Session(ApiSession),
  User(ApiUser),
}

#[derive(Debug, Serialize)]
pub struct ApiCredentials<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ApiSignUp<'a> {
  pub email: &'a str,
  pub password: &'a str,
  pub data: ApiSignUpData<'a>,
}

#[derive(Debug, Serialize)]
pub struct ApiSignUpData<'a> {
  pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ApiRefresh<'a> {
  pub refresh_token: &'a str,
}

/// Insert body: the entry plus its owner.
#[derive(Debug, Serialize)]
pub struct ApiInsertRow<'a> {
  #[serde(flatten)]
  pub entry: &'a NewEntry,
  pub user_id: &'a str,
}

/// Error body shapes used by the REST and auth services.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  pub error_description: Option<String>,
  pub msg: Option<String>,
  pub error: Option<String>,
}

/// Pull the most descriptive message out of an error body, falling back to
/// the raw text.
pub fn error_message(body: &str) -> String {
  let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
  parsed
    .message
    .or(parsed.error_description)
    .or(parsed.msg)
    .or(parsed.error)
    .unwrap_or_else(|| body.trim().to_string())
}
