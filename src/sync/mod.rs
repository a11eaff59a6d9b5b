//! Deferred replay of vault mutations made while the backend was unreachable.

mod queue;

pub use queue::{MutationQueue, PendingMutation, SyncReport};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, EntryPatch, NewEntry, PasswordBackend};

/// Tag the background sync handler answers to.
pub const SYNC_TAG: &str = "sync-passwords";

/// A change to one entry, as sent to the backend or held for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EntryMutation {
  Create { entry: NewEntry },
  Update { id: String, patch: EntryPatch },
  Delete { id: String },
}

impl EntryMutation {
  /// Entry the mutation targets. `None` for a create that has no id yet.
  pub fn entry_id(&self) -> Option<&str> {
    match self {
      EntryMutation::Create { entry } => entry.id.as_deref(),
      EntryMutation::Update { id, .. } | EntryMutation::Delete { id } => Some(id),
    }
  }

  /// Send the mutation to the backend.
  pub async fn apply<B: PasswordBackend>(self, backend: &B) -> Result<(), BackendError> {
    match self {
      EntryMutation::Create { entry } => backend.create_password(entry).await.map(|_| ()),
      EntryMutation::Update { id, patch } => backend.update_password(id, patch).await.map(|_| ()),
      EntryMutation::Delete { id } => backend.delete_password(id).await,
    }
  }
}
