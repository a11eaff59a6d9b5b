use color_eyre::{eyre::eyre, Result};
use rusqlite::params;
use tracing::debug;

use crate::db::{lock, SharedConnection};

/// Push messages waiting to be handled, oldest first.
///
/// `pocket-secrets push` delivers into it; a running session drains it on
/// every tick.
#[derive(Clone)]
pub struct PushInbox {
  conn: SharedConnection,
}

impl PushInbox {
  pub fn new(conn: SharedConnection) -> Self {
    Self { conn }
  }

  pub fn deliver(&self, payload: Option<&[u8]>) -> Result<()> {
    lock(&self.conn)?
      .execute("INSERT INTO push_inbox (payload) VALUES (?)", params![payload])
      .map_err(|e| eyre!("Failed to deliver push message: {}", e))?;
    Ok(())
  }

  /// Remove and return every waiting payload.
  pub fn drain(&self) -> Result<Vec<Option<Vec<u8>>>> {
    let conn = lock(&self.conn)?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let messages = {
      let mut stmt = tx
        .prepare("SELECT payload FROM push_inbox ORDER BY seq")
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;
      let rows = stmt
        .query_map([], |row| row.get::<_, Option<Vec<u8>>>(0))
        .map_err(|e| eyre!("Failed to read push inbox: {}", e))?;
      let messages = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| eyre!("Failed to read push message: {}", e))?;
      messages
    };
    if messages.is_empty() {
      return Ok(messages);
    }

    tx.execute("DELETE FROM push_inbox", [])
      .map_err(|e| eyre!("Failed to clear push inbox: {}", e))?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    debug!("[push] drained {} message(s)", messages.len());
    Ok(messages)
  }
}
