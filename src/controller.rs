//! Registers the offline worker at startup and reports what happened.

use std::io::{BufRead, Write};

use tracing::{error, info, warn};

use crate::config::Capabilities;
use crate::sync::SYNC_TAG;
use crate::worker::{ActivationReport, CacheStorage, Network, OfflineWorker};

pub const UPDATE_PROMPT: &str = "New version available! Reload to update?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  Granted,
  Denied,
  /// The user dismissed the request without answering
  Default,
}

/// Asks the user things while the worker registers.
pub trait Prompter {
  /// Blocking yes/no question.
  fn confirm(&mut self, message: &str) -> bool;

  fn request_notification_permission(&mut self) -> Permission;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// No offline cache capability; nothing was registered
  Unsupported,
  /// This version was already active
  UpToDate,
  /// First install; the shell is now available offline
  CachedForOffline,
  /// A new version replaced an old one and the user asked to reload
  ReloadAccepted,
  ReloadDeclined,
  /// Install or activation failed; the app runs without the worker
  Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
  Unsupported,
  Denied,
  /// Permission granted. No remote subscription is made; messages arrive
  /// through the local push inbox.
  Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
  pub update: UpdateOutcome,
  pub activation: Option<ActivationReport>,
  pub push: PushStatus,
  pub sync_registered: bool,
}

impl RegistrationReport {
  pub fn reload_requested(&self) -> bool {
    self.update == UpdateOutcome::ReloadAccepted
  }
}

/// Register `worker` according to what the host supports.
///
/// Never fails: problems are logged and reflected in the report.
pub async fn register<S, N, P>(
  worker: &mut OfflineWorker<S, N>,
  capabilities: Capabilities,
  prompter: &mut P,
) -> RegistrationReport
where
  S: CacheStorage,
  N: Network,
  P: Prompter + ?Sized,
{
  if !capabilities.offline_cache {
    info!("Offline cache is not supported; skipping worker registration");
    return RegistrationReport {
      update: UpdateOutcome::Unsupported,
      activation: None,
      push: PushStatus::Unsupported,
      sync_registered: false,
    };
  }

  let (update, activation) = install_and_activate(worker, prompter).await;

  let push = if capabilities.push {
    match prompter.request_notification_permission() {
      Permission::Granted => {
        info!("Notification permission granted; ready to receive push notifications");
        PushStatus::Ready
      }
      other => {
        info!("Notification permission {:?}", other);
        PushStatus::Denied
      }
    }
  } else {
    PushStatus::Unsupported
  };

  let sync_registered = capabilities.background_sync
    && match worker.register_sync(SYNC_TAG) {
      Ok(()) => {
        info!("Background sync registered: {}", SYNC_TAG);
        true
      }
      Err(e) => {
        error!("Error registering background sync: {}", e);
        false
      }
    };

  RegistrationReport {
    update,
    activation,
    push,
    sync_registered,
  }
}

async fn install_and_activate<S, N, P>(
  worker: &mut OfflineWorker<S, N>,
  prompter: &mut P,
) -> (UpdateOutcome, Option<ActivationReport>)
where
  S: CacheStorage,
  N: Network,
  P: Prompter + ?Sized,
{
  if let Err(e) = worker.restore() {
    error!("Error during worker registration: {}", e);
    return (UpdateOutcome::Failed(e.to_string()), None);
  }
  if !worker.needs_install() {
    return (UpdateOutcome::UpToDate, None);
  }

  let had_controller = worker.controller().is_some();
  if let Err(e) = worker.install().await {
    return (UpdateOutcome::Failed(e.to_string()), None);
  }

  let update = if had_controller {
    info!("New content is available");
    if prompter.confirm(UPDATE_PROMPT) {
      info!("User confirmed reload");
      UpdateOutcome::ReloadAccepted
    } else {
      info!("User declined reload");
      UpdateOutcome::ReloadDeclined
    }
  } else {
    info!("Content is cached for offline use");
    UpdateOutcome::CachedForOffline
  };

  if !worker.skip_waiting_requested() {
    info!("New version is waiting for old clients to close");
    return (update, None);
  }
  match worker.activate() {
    Ok(report) => (update, Some(report)),
    Err(e) => {
      error!("Error activating worker: {}", e);
      (UpdateOutcome::Failed(e.to_string()), None)
    }
  }
}

/// Prompts on the terminal before the UI takes it over.
pub struct TerminalPrompter<R, W> {
  input: R,
  output: W,
  /// Whether notifications may be shown at all
  notifications: bool,
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stderr> {
  pub fn stdio(notifications: bool) -> Self {
    Self::new(std::io::stdin().lock(), std::io::stderr(), notifications)
  }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
  pub fn new(input: R, output: W, notifications: bool) -> Self {
    Self {
      input,
      output,
      notifications,
    }
  }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
  fn confirm(&mut self, message: &str) -> bool {
    if let Err(e) = write!(self.output, "{} [y/N] ", message).and_then(|_| self.output.flush()) {
      warn!("Could not show prompt: {}", e);
      return false;
    }

    let mut answer = String::new();
    match self.input.read_line(&mut answer) {
      Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
      Err(e) => {
        warn!("Could not read answer: {}", e);
        false
      }
    }
  }

  fn request_notification_permission(&mut self) -> Permission {
    // Notifications surface as in-app toasts, which need no consent.
    if self.notifications {
      Permission::Granted
    } else {
      Permission::Denied
    }
  }
}
