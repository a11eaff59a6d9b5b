use color_eyre::{eyre::eyre, Result};
use std::sync::{Mutex, MutexGuard};

/// A window attached to the worker's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
  pub id: String,
  pub url: String,
  pub focused: bool,
  /// Worker version controlling this client, if any
  pub controller: Option<String>,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  Focused(String),
  Opened(String),
}

/// Windows known to the worker.
#[derive(Debug, Default)]
pub struct Clients {
  inner: Mutex<Vec<Client>>,
}

impl Clients {
  fn lock(&self) -> Result<MutexGuard<'_, Vec<Client>>> {
    self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Attach a client that loaded under `controller`. Returns its id.
  pub fn attach_controlled(&self, url: &str, controller: Option<&str>) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    self.lock()?.push(Client {
      id: id.clone(),
      url: url.to_string(),
      focused: false,
      controller: controller.map(String::from),
    });
    Ok(id)
  }

  #[cfg(test)]
  pub fn match_all(&self) -> Result<Vec<Client>> {
    Ok(self.lock()?.clone())
  }

  /// Make `version` the controller of every client. Returns how many
  /// changed hands.
  pub fn claim(&self, version: &str) -> Result<usize> {
    let mut clients = self.lock()?;
    let mut claimed = 0;
    for client in clients.iter_mut() {
      if client.controller.as_deref() != Some(version) {
        client.controller = Some(version.to_string());
        claimed += 1;
      }
    }
    Ok(claimed)
  }

  /// Drop control of every client.
  pub fn release(&self) -> Result<()> {
    for client in self.lock()?.iter_mut() {
      client.controller = None;
    }
    Ok(())
  }

  /// Focus a client showing `url`, or open a new one there.
  pub fn focus_or_open(&self, url: &str) -> Result<ClickOutcome> {
    let mut clients = self.lock()?;

    if let Some(index) = clients.iter().position(|c| c.url == url) {
      for (i, client) in clients.iter_mut().enumerate() {
        client.focused = i == index;
      }
      return Ok(ClickOutcome::Focused(clients[index].id.clone()));
    }

    for client in clients.iter_mut() {
      client.focused = false;
    }
    let id = uuid::Uuid::new_v4().to_string();
    clients.push(Client {
      id: id.clone(),
      url: url.to_string(),
      focused: true,
      controller: None,
    });
    Ok(ClickOutcome::Opened(id))
  }
}
