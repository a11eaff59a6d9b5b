use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: Option<String>,
}

/// Proof of authenticated identity issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  pub user: User,
}

impl Session {
  /// Expired, or close enough that a request might race the expiry.
  pub fn is_expired(&self) -> bool {
    Utc::now() + Duration::seconds(30) >= self.expires_at
  }
}

/// Shared slot for the current session.
///
/// Cloned into the backend client and the views; all clones see the same
/// session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
  inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self) -> Option<Session> {
    match self.inner.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn set(&self, session: Session) {
    match self.inner.write() {
      Ok(mut guard) => *guard = Some(session),
      Err(poisoned) => *poisoned.into_inner() = Some(session),
    }
  }

  pub fn clear(&self) {
    match self.inner.write() {
      Ok(mut guard) => *guard = None,
      Err(poisoned) => *poisoned.into_inner() = None,
    }
  }

  pub fn user(&self) -> Option<User> {
    self.get().map(|s| s.user)
  }

  pub fn is_signed_in(&self) -> bool {
    self.get().is_some()
  }
}
