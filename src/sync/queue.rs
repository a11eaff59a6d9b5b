use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};

use super::EntryMutation;
use crate::backend::PasswordBackend;
use crate::db::{lock, SharedConnection};

/// A mutation waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
  pub seq: i64,
  pub entry_id: String,
  pub mutation: EntryMutation,
  pub queued_at: String,
}

/// Result of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub replayed: usize,
  /// Rejected by the backend and discarded
  pub dropped: usize,
  pub remaining: usize,
  /// Failure that stopped the flush early
  pub error: Option<String>,
}

/// How a new mutation combines with the one already queued for its entry.
#[derive(Debug, PartialEq, Eq)]
enum Coalesced {
  Insert(EntryMutation),
  Replace(EntryMutation),
  Remove,
  Keep,
}

fn coalesce(existing: Option<EntryMutation>, incoming: EntryMutation) -> Coalesced {
  use EntryMutation::*;

  match (existing, incoming) {
    (None, incoming) => Coalesced::Insert(incoming),
    (Some(Create { mut entry }), Update { patch, .. }) => {
      patch.apply_to(&mut entry);
      Coalesced::Replace(Create { entry })
    }
    // never reached the server
    (Some(Create { .. }), Delete { .. }) => Coalesced::Remove,
    (Some(Update { id, mut patch }), Update { patch: later, .. }) => {
      patch.merge(later);
      Coalesced::Replace(Update { id, patch })
    }
    (Some(Update { .. }), Delete { id }) => Coalesced::Replace(Delete { id }),
    (Some(Delete { .. }), Update { .. } | Delete { .. }) => Coalesced::Keep,
    (Some(_), Create { entry }) => Coalesced::Replace(Create { entry }),
  }
}

fn encode(mutation: &EntryMutation) -> Result<String> {
  serde_json::to_string(mutation).map_err(|e| eyre!("Failed to serialize mutation: {}", e))
}

fn decode(op: &str) -> Result<EntryMutation> {
  serde_json::from_str(op).map_err(|e| eyre!("Failed to deserialize queued mutation: {}", e))
}

/// Persistent log of vault mutations awaiting replay, at most one per entry.
#[derive(Clone)]
pub struct MutationQueue {
  conn: SharedConnection,
}

impl MutationQueue {
  pub fn new(conn: SharedConnection) -> Self {
    Self { conn }
  }

  /// Queue a mutation, folding it into any pending one for the same entry.
  ///
  /// Creates without an id get a fresh one so that replay is an upsert.
  /// Returns the id of the affected entry.
  pub fn enqueue(&self, mutation: EntryMutation) -> Result<String> {
    let mutation = match mutation {
      EntryMutation::Create { mut entry } => {
        if entry.id.is_none() {
          entry.id = Some(uuid::Uuid::new_v4().to_string());
        }
        EntryMutation::Create { entry }
      }
      other => other,
    };
    let entry_id = mutation
      .entry_id()
      .map(String::from)
      .ok_or_else(|| eyre!("Mutation has no entry id"))?;

    let conn = lock(&self.conn)?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let existing = tx
      .query_row(
        "SELECT op FROM pending_mutations WHERE entry_id = ?",
        params![entry_id],
        |row| row.get::<_, String>(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read pending mutation: {}", e))?
      .map(|op| decode(&op))
      .transpose()?;

    match coalesce(existing, mutation) {
      Coalesced::Insert(m) => {
        tx.execute(
          "INSERT INTO pending_mutations (entry_id, op, queued_at) VALUES (?, ?, datetime('now'))",
          params![entry_id, encode(&m)?],
        )
        .map_err(|e| eyre!("Failed to queue mutation: {}", e))?;
      }
      Coalesced::Replace(m) => {
        tx.execute(
          "UPDATE pending_mutations SET op = ? WHERE entry_id = ?",
          params![encode(&m)?, entry_id],
        )
        .map_err(|e| eyre!("Failed to update queued mutation: {}", e))?;
      }
      Coalesced::Remove => {
        tx.execute(
          "DELETE FROM pending_mutations WHERE entry_id = ?",
          params![entry_id],
        )
        .map_err(|e| eyre!("Failed to remove queued mutation: {}", e))?;
      }
      Coalesced::Keep => {}
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(entry_id)
  }

  /// Pending mutations in replay order.
  pub fn pending(&self) -> Result<Vec<PendingMutation>> {
    let conn = lock(&self.conn)?;
    let mut stmt = conn
      .prepare("SELECT seq, entry_id, op, queued_at FROM pending_mutations ORDER BY seq")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
        ))
      })
      .map_err(|e| eyre!("Failed to read pending mutations: {}", e))?
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| eyre!("Failed to read pending mutation: {}", e))?;

    rows
      .into_iter()
      .map(|(seq, entry_id, op, queued_at)| {
        Ok(PendingMutation {
          seq,
          entry_id,
          mutation: decode(&op)?,
          queued_at,
        })
      })
      .collect()
  }

  pub fn len(&self) -> Result<usize> {
    let count: i64 = lock(&self.conn)?
      .query_row("SELECT COUNT(*) FROM pending_mutations", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count pending mutations: {}", e))?;
    Ok(count as usize)
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  /// Remove a replayed mutation, unless it was coalesced with a newer one
  /// while the replay was in flight.
  fn complete(&self, item: &PendingMutation) -> Result<()> {
    lock(&self.conn)?
      .execute(
        "DELETE FROM pending_mutations WHERE seq = ? AND op = ?",
        params![item.seq, encode(&item.mutation)?],
      )
      .map_err(|e| eyre!("Failed to remove replayed mutation: {}", e))?;
    Ok(())
  }

  /// Replay pending mutations in order.
  ///
  /// A failure that may succeed later stops the flush and keeps the rest of
  /// the queue. A mutation the backend rejects outright is dropped.
  pub async fn flush<B: PasswordBackend>(&self, backend: &B) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for item in self.pending()? {
      match item.mutation.clone().apply(backend).await {
        Ok(()) => {
          self.complete(&item)?;
          report.replayed += 1;
        }
        Err(e) if e.is_retryable() => {
          warn!("Replay of {} stopped: {}", item.entry_id, e);
          report.error = Some(e.to_string());
          break;
        }
        Err(e) => {
          warn!("Dropping rejected mutation for {}: {}", item.entry_id, e);
          self.complete(&item)?;
          report.dropped += 1;
        }
      }
    }

    report.remaining = self.len()?;
    info!(
      "Sync flushed: {} replayed, {} dropped, {} remaining",
      report.replayed, report.dropped, report.remaining
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::memory::MemoryBackend;
  use crate::backend::{EntryPatch, NewEntry};
  use crate::db::Database;

  fn queue() -> MutationQueue {
    MutationQueue::new(Database::open_in_memory().unwrap().conn())
  }

  fn new_entry(title: &str) -> NewEntry {
    NewEntry {
      title: title.to_string(),
      username: "me".to_string(),
      password: "pw".to_string(),
      ..NewEntry::default()
    }
  }

  fn patch_title(title: &str) -> EntryPatch {
    EntryPatch {
      title: Some(title.to_string()),
      ..EntryPatch::default()
    }
  }

  fn update(id: &str, patch: EntryPatch) -> EntryMutation {
    EntryMutation::Update {
      id: id.to_string(),
      patch,
    }
  }

  fn delete(id: &str) -> EntryMutation {
    EntryMutation::Delete { id: id.to_string() }
  }

  #[test]
  fn test_create_gets_client_id() {
    let queue = queue();
    let id = queue
      .enqueue(EntryMutation::Create {
        entry: new_entry("GitHub"),
      })
      .unwrap();

    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entry_id, id);
    assert_eq!(pending[0].mutation.entry_id(), Some(id.as_str()));
  }

  #[test]
  fn test_updates_merge() {
    let queue = queue();
    queue.enqueue(update("1", patch_title("a"))).unwrap();
    queue
      .enqueue(update(
        "1",
        EntryPatch {
          password: Some("new".to_string()),
          ..EntryPatch::default()
        },
      ))
      .unwrap();

    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
      pending[0].mutation,
      update(
        "1",
        EntryPatch {
          title: Some("a".to_string()),
          password: Some("new".to_string()),
          ..EntryPatch::default()
        }
      )
    );
  }

  #[test]
  fn test_delete_replaces_update() {
    let queue = queue();
    queue.enqueue(update("1", patch_title("a"))).unwrap();
    queue.enqueue(delete("1")).unwrap();

    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].mutation, delete("1"));
  }

  #[test]
  fn test_delete_cancels_queued_create() {
    let queue = queue();
    let id = queue
      .enqueue(EntryMutation::Create {
        entry: new_entry("GitHub"),
      })
      .unwrap();
    queue.enqueue(delete(&id)).unwrap();
    assert!(queue.is_empty().unwrap());
  }

  #[test]
  fn test_update_folds_into_create() {
    let queue = queue();
    let id = queue
      .enqueue(EntryMutation::Create {
        entry: new_entry("GitHub"),
      })
      .unwrap();
    queue.enqueue(update(&id, patch_title("GitLab"))).unwrap();

    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    let EntryMutation::Create { entry } = &pending[0].mutation else {
      panic!("expected a create");
    };
    assert_eq!(entry.title, "GitLab");
    assert_eq!(entry.id.as_deref(), Some(id.as_str()));
  }

  #[test]
  fn test_update_after_delete_is_ignored() {
    let queue = queue();
    queue.enqueue(delete("1")).unwrap();
    queue.enqueue(update("1", patch_title("a"))).unwrap();
    assert_eq!(queue.pending().unwrap()[0].mutation, delete("1"));
  }

  #[test]
  fn test_queue_survives_reopen() {
    let db = Database::open_in_memory().unwrap();
    MutationQueue::new(db.conn()).enqueue(delete("1")).unwrap();
    assert_eq!(MutationQueue::new(db.conn()).len().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_flush_replays_in_order() {
    let backend = MemoryBackend::signed_in("u1");
    let existing = backend.insert_row("u1", "Old", "me", None);
    let doomed = backend.insert_row("u1", "Doomed", "me", None);

    let queue = queue();
    queue.enqueue(update(&existing, patch_title("Renamed"))).unwrap();
    let created = queue
      .enqueue(EntryMutation::Create {
        entry: new_entry("GitHub"),
      })
      .unwrap();
    queue.enqueue(delete(&doomed)).unwrap();

    let report = queue.flush(&backend).await.unwrap();
    assert_eq!(report.replayed, 3);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.error, None);

    let rows = backend.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.id == existing && r.title == "Renamed"));
    assert!(rows.iter().any(|r| r.id == created && r.user_id == "u1"));
    assert!(!rows.iter().any(|r| r.id == doomed));
  }

  #[tokio::test]
  async fn test_flush_stops_on_transport_failure() {
    let backend = MemoryBackend::signed_in("u1");
    backend.set_offline(true);

    let queue = queue();
    queue.enqueue(delete("1")).unwrap();
    queue.enqueue(delete("2")).unwrap();

    let report = queue.flush(&backend).await.unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(report.remaining, 2);
    assert!(report.error.is_some());
    assert_eq!(backend.calls(), 1);

    backend.set_offline(false);
    let report = queue.flush(&backend).await.unwrap();
    assert_eq!(report.replayed, 2);
    assert!(queue.is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_flush_drops_update_of_missing_row() {
    let backend = MemoryBackend::signed_in("u1");
    let queue = queue();
    queue.enqueue(update("ghost", patch_title("x"))).unwrap();
    queue
      .enqueue(EntryMutation::Create {
        entry: new_entry("GitHub"),
      })
      .unwrap();

    let report = queue.flush(&backend).await.unwrap();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.replayed, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(backend.rows().len(), 1);
  }

  #[tokio::test]
  async fn test_replayed_create_is_idempotent() {
    let backend = MemoryBackend::signed_in("u1");
    let queue = queue();
    let mut entry = new_entry("GitHub");
    entry.id = Some("fixed-id".to_string());

    for _ in 0..2 {
      queue
        .enqueue(EntryMutation::Create {
          entry: entry.clone(),
        })
        .unwrap();
      queue.flush(&backend).await.unwrap();
    }

    assert_eq!(backend.rows().len(), 1);
  }

  #[test]
  fn test_mutation_json_shape() {
    let value = serde_json::to_value(delete("7")).unwrap();
    assert_eq!(value, serde_json::json!({ "op": "delete", "id": "7" }));
  }
}
