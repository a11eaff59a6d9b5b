use color_eyre::{eyre::eyre, Result};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::api_types::{
  error_message, ApiCredentials, ApiInsertRow, ApiRefresh, ApiSession, ApiSignUp, ApiSignUpData,
  ApiSignUpResponse,
};
use super::error::BackendError;
use super::session::{Session, SessionStore};
use super::types::{EntryPatch, NewEntry, PasswordEntry};
use super::PasswordBackend;
use crate::config::BackendConfig;

/// Outcome of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
  /// The project auto-confirms; the user is signed in.
  SignedIn(Session),
  /// A confirmation email was sent; sign in after confirming.
  ConfirmationRequired,
}

/// Client for the hosted auth service and the password table.
#[derive(Clone)]
pub struct BackendClient {
  http: reqwest::Client,
  base_url: Url,
  anon_key: String,
  table: String,
  session: SessionStore,
}

impl BackendClient {
  pub fn new(config: &BackendConfig, anon_key: &str, session: SessionStore) -> Result<Self> {
    let mut base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid backend URL {}: {}", config.url, e))?;
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    Ok(Self {
      http: reqwest::Client::new(),
      base_url,
      anon_key: anon_key.to_string(),
      table: config.table.clone(),
      session,
    })
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  fn url(&self, path: &str) -> Result<Url, BackendError> {
    self
      .base_url
      .join(path)
      .map_err(|e| BackendError::Decode(format!("failed to build URL for {}: {}", path, e)))
  }

  fn table_url(&self) -> Result<Url, BackendError> {
    self.url(&format!("rest/v1/{}", self.table))
  }

  /// Token for calls that rely on server-side row scoping.
  fn bearer(&self) -> String {
    self
      .session
      .get()
      .map(|s| s.access_token)
      .unwrap_or_else(|| self.anon_key.clone())
  }

  async fn send_text(&self, req: RequestBuilder, token: &str) -> Result<String, BackendError> {
    let response = req
      .header("apikey", &self.anon_key)
      .bearer_auth(token)
      .send()
      .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      return Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body),
      });
    }
    Ok(body)
  }

  async fn send_json<T: DeserializeOwned>(
    &self,
    req: RequestBuilder,
    token: &str,
  ) -> Result<T, BackendError> {
    let body = self.send_text(req, token).await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
  }

  /// Representation requests return an array; take its single row.
  async fn send_row(&self, req: RequestBuilder, token: &str) -> Result<PasswordEntry, BackendError> {
    let rows: Vec<PasswordEntry> = self.send_json(req, token).await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| BackendError::Decode("no row returned".to_string()))
  }

  /// Current session, refreshed if it has expired.
  async fn require_session(&self) -> Result<Session, BackendError> {
    match self.session.get() {
      None => Err(BackendError::NotAuthenticated),
      Some(session) if session.is_expired() => self.refresh(&session).await,
      Some(session) => Ok(session),
    }
  }

  async fn refresh(&self, session: &Session) -> Result<Session, BackendError> {
    tracing::debug!("refreshing expired session");
    let url = self.url("auth/v1/token")?;
    let req = self
      .http
      .post(url)
      .query(&[("grant_type", "refresh_token")])
      .json(&ApiRefresh {
        refresh_token: &session.refresh_token,
      });

    match self.send_json::<ApiSession>(req, &self.anon_key).await {
      Ok(api) => {
        let fresh = api.into_session();
        self.session.set(fresh.clone());
        Ok(fresh)
      }
      Err(BackendError::Api { message, .. }) => {
        tracing::warn!("session refresh rejected: {}", message);
        self.session.clear();
        Err(BackendError::NotAuthenticated)
      }
      Err(e) => Err(e),
    }
  }

  /// Sign in with email and password and store the session.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
    let url = self.url("auth/v1/token")?;
    let req = self
      .http
      .post(url)
      .query(&[("grant_type", "password")])
      .json(&ApiCredentials { email, password });

    let session = self
      .send_json::<ApiSession>(req, &self.anon_key)
      .await?
      .into_session();
    tracing::info!(user = %session.user.id, "signed in");
    self.session.set(session.clone());
    Ok(session)
  }

  /// Register a new account. `name` is stored as user metadata.
  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    name: &str,
  ) -> Result<SignUpOutcome, BackendError> {
    let url = self.url("auth/v1/signup")?;
    let req = self.http.post(url).json(&ApiSignUp {
      email,
      password,
      data: ApiSignUpData { name },
    });

    match self.send_json::<ApiSignUpResponse>(req, &self.anon_key).await? {
      ApiSignUpResponse::Session(api) => {
        let session = api.into_session();
        self.session.set(session.clone());
        Ok(SignUpOutcome::SignedIn(session))
      }
      ApiSignUpResponse::User(user) => {
        tracing::info!(user = %user.id, "sign-up requires confirmation");
        Ok(SignUpOutcome::ConfirmationRequired)
      }
    }
  }

  /// End the session. The local session is dropped even if the call fails.
  pub async fn sign_out(&self) -> Result<(), BackendError> {
    let Some(session) = self.session.get() else {
      return Ok(());
    };
    self.session.clear();

    let url = self.url("auth/v1/logout")?;
    self
      .send_text(self.http.post(url), &session.access_token)
      .await
      .map(|_| ())
  }
}

impl PasswordBackend for BackendClient {
  async fn fetch_passwords(&self) -> Result<Vec<PasswordEntry>, BackendError> {
    let session = self.require_session().await?;
    let url = self.table_url()?;
    let owner = format!("eq.{}", session.user.id);
    let req = self
      .http
      .get(url)
      .query(&[("select", "*"), ("user_id", owner.as_str())]);

    self.send_json(req, &session.access_token).await
  }

  async fn create_password(&self, entry: NewEntry) -> Result<PasswordEntry, BackendError> {
    let session = self.require_session().await?;
    let url = self.table_url()?;
    let body = ApiInsertRow {
      entry: &entry,
      user_id: &session.user.id,
    };

    let mut req = self.http.post(url).json(&body);
    req = if entry.id.is_some() {
      req
        .query(&[("on_conflict", "id")])
        .header("Prefer", "return=representation,resolution=merge-duplicates")
    } else {
      req.header("Prefer", "return=representation")
    };

    self.send_row(req, &session.access_token).await
  }

  async fn update_password(&self, id: String, patch: EntryPatch) -> Result<PasswordEntry, BackendError> {
    let url = self.table_url()?;
    let filter = format!("eq.{}", id);
    let req = self
      .http
      .patch(url)
      .query(&[("id", filter.as_str())])
      .header("Prefer", "return=representation")
      .json(&patch);

    self.send_row(req, &self.bearer()).await
  }

  async fn delete_password(&self, id: String) -> Result<(), BackendError> {
    let url = self.table_url()?;
    let filter = format!("eq.{}", id);
    let req = self.http.delete(url).query(&[("id", filter.as_str())]);

    self.send_text(req, &self.bearer()).await.map(|_| ())
  }
}
