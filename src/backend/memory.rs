//! In-memory backend with the same scoping rules as the hosted one.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use super::{
  BackendError, EntryPatch, NewEntry, PasswordBackend, PasswordEntry, Session, SessionStore, User,
};

#[derive(Debug, Default)]
struct State {
  rows: Vec<PasswordEntry>,
  next_id: u64,
  offline: bool,
  reject: Option<String>,
  /// Writes land but the response never arrives
  lose_responses: bool,
  calls: usize,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
  state: Arc<Mutex<State>>,
  session: SessionStore,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Backend with a live session for `user_id`.
  pub fn signed_in(user_id: &str) -> Self {
    let backend = Self::new();
    backend.session.set(Session {
      access_token: format!("token-{}", user_id),
      refresh_token: "refresh".to_string(),
      expires_at: Utc::now() + Duration::hours(1),
      user: User {
        id: user_id.to_string(),
        email: None,
      },
    });
    backend
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  pub fn set_offline(&self, offline: bool) {
    self.state.lock().unwrap().offline = offline;
  }

  pub fn reject_with(&self, message: Option<&str>) {
    self.state.lock().unwrap().reject = message.map(String::from);
  }

  pub fn lose_responses(&self, lose: bool) {
    self.state.lock().unwrap().lose_responses = lose;
  }

  pub fn rows(&self) -> Vec<PasswordEntry> {
    self.state.lock().unwrap().rows.clone()
  }

  pub fn calls(&self) -> usize {
    self.state.lock().unwrap().calls
  }

  pub fn insert_row(&self, owner: &str, title: &str, username: &str, url: Option<&str>) -> String {
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let id = state.next_id.to_string();
    state.rows.push(PasswordEntry {
      id: id.clone(),
      user_id: owner.to_string(),
      title: title.to_string(),
      username: username.to_string(),
      password: "secret".to_string(),
      url: url.map(String::from),
      notes: None,
      favorite: None,
      created_at: None,
      updated_at: None,
    });
    id
  }

  fn gate(&self) -> Result<(), BackendError> {
    let mut state = self.state.lock().unwrap();
    state.calls += 1;
    if state.offline {
      return Err(BackendError::Transport("connection refused".to_string()));
    }
    if let Some(message) = &state.reject {
      return Err(BackendError::Api {
        status: 400,
        message: message.clone(),
      });
    }
    Ok(())
  }

  fn owner(&self) -> Result<String, BackendError> {
    self
      .session
      .user()
      .map(|u| u.id)
      .ok_or(BackendError::NotAuthenticated)
  }
}

impl PasswordBackend for MemoryBackend {
  async fn fetch_passwords(&self) -> Result<Vec<PasswordEntry>, BackendError> {
    let owner = self.owner()?;
    self.gate()?;
    let state = self.state.lock().unwrap();
    Ok(state.rows.iter().filter(|r| r.user_id == owner).cloned().collect())
  }

  async fn create_password(&self, entry: NewEntry) -> Result<PasswordEntry, BackendError> {
    let owner = self.owner()?;
    self.gate()?;
    let mut state = self.state.lock().unwrap();
    let id = match entry.id.clone() {
      Some(id) => id,
      None => {
        state.next_id += 1;
        state.next_id.to_string()
      }
    };
    let row = PasswordEntry {
      id: id.clone(),
      user_id: owner,
      title: entry.title,
      username: entry.username,
      password: entry.password,
      url: entry.url,
      notes: entry.notes,
      favorite: entry.favorite,
      created_at: None,
      updated_at: None,
    };
    state.rows.retain(|r| r.id != id);
    state.rows.push(row.clone());
    if state.lose_responses {
      return Err(BackendError::Transport("connection reset".to_string()));
    }
    Ok(row)
  }

  async fn update_password(&self, id: String, patch: EntryPatch) -> Result<PasswordEntry, BackendError> {
    self.gate()?;
    let mut state = self.state.lock().unwrap();
    let row = state
      .rows
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| BackendError::Decode("no row returned".to_string()))?;
    if let Some(title) = patch.title {
      row.title = title;
    }
    if let Some(username) = patch.username {
      row.username = username;
    }
    if let Some(password) = patch.password {
      row.password = password;
    }
    if let Some(url) = patch.url {
      row.url = url;
    }
    if let Some(notes) = patch.notes {
      row.notes = notes;
    }
    if patch.favorite.is_some() {
      row.favorite = patch.favorite;
    }
    Ok(row.clone())
  }

  async fn delete_password(&self, id: String) -> Result<(), BackendError> {
    self.gate()?;
    self.state.lock().unwrap().rows.retain(|r| r.id != id);
    Ok(())
  }
}
