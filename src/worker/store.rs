//! Persistent storage for asset caches and the worker registration.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::request::{Request, Response, ResponseKind};
use crate::db::{lock, SharedConnection};

/// Named caches of request/response pairs, plus the record of which worker
/// version is active.
pub trait CacheStorage: Send + Sync {
  /// Create the cache if it does not exist.
  fn open(&self, name: &str) -> Result<()>;

  /// Names of all caches.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a cache and everything in it. Returns whether it existed.
  fn delete(&self, name: &str) -> Result<bool>;

  /// Look up a stored response for `request` in the named cache.
  fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>>;

  /// Store one response, replacing any previous one for the same request.
  fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()>;

  /// Store every pair or none of them. Creates the cache if needed.
  fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()>;

  /// Number of responses in the named cache.
  fn len(&self, name: &str) -> Result<usize>;

  /// Version recorded as active for `scope`.
  fn active_version(&self, scope: &str) -> Result<Option<String>>;

  fn set_active_version(&self, scope: &str, version: &str) -> Result<()>;

  /// Remove the registration for `scope`. Returns whether one existed.
  fn clear_registration(&self, scope: &str) -> Result<bool>;
}

/// SQLite-backed cache storage sharing the state database.
#[derive(Clone)]
pub struct SqliteCacheStore {
  conn: SharedConnection,
}

impl SqliteCacheStore {
  pub fn new(conn: SharedConnection) -> Self {
    Self { conn }
  }
}

const INSERT_ENTRY: &str = "INSERT OR REPLACE INTO cache_entries
  (cache_name, request_key, url, status, kind, content_type, body, cached_at)
  VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))";

impl CacheStorage for SqliteCacheStore {
  fn open(&self, name: &str) -> Result<()> {
    lock(&self.conn)?
      .execute("INSERT OR IGNORE INTO caches (name) VALUES (?)", params![name])
      .map_err(|e| eyre!("Failed to open cache {}: {}", name, e))?;
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = lock(&self.conn)?;
    let mut stmt = conn
      .prepare("SELECT name FROM caches ORDER BY created_at, name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .collect::<Result<Vec<String>, _>>()
      .map_err(|e| eyre!("Failed to read cache name: {}", e))?;
    Ok(names)
  }

  fn delete(&self, name: &str) -> Result<bool> {
    let conn = lock(&self.conn)?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE cache_name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;
    let removed = tx
      .execute("DELETE FROM caches WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete cache {}: {}", name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(removed > 0)
  }

  fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>> {
    let conn = lock(&self.conn)?;
    let row: Option<(String, u16, String, Option<String>, Vec<u8>)> = conn
      .query_row(
        "SELECT url, status, kind, content_type, body FROM cache_entries
         WHERE cache_name = ? AND request_key = ?",
        params![name, request.cache_key()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", request.url, e))?;

    let Some((url, status, kind, content_type, body)) = row else {
      return Ok(None);
    };
    let kind = ResponseKind::parse(&kind).ok_or_else(|| eyre!("Unknown response kind: {}", kind))?;

    Ok(Some(Response {
      url,
      status,
      kind,
      content_type,
      body,
    }))
  }

  fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()> {
    self.put_all(name, &[(request.clone(), response.clone())])
  }

  fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()> {
    let conn = lock(&self.conn)?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("INSERT OR IGNORE INTO caches (name) VALUES (?)", params![name])
      .map_err(|e| eyre!("Failed to open cache {}: {}", name, e))?;

    for (request, response) in entries {
      tx.execute(
        INSERT_ENTRY,
        params![
          name,
          request.cache_key(),
          request.url.as_str(),
          response.status,
          response.kind.as_str(),
          response.content_type,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", request.url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  fn len(&self, name: &str) -> Result<usize> {
    let count: i64 = lock(&self.conn)?
      .query_row(
        "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?",
        params![name],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count entries of {}: {}", name, e))?;
    Ok(count as usize)
  }

  fn active_version(&self, scope: &str) -> Result<Option<String>> {
    lock(&self.conn)?
      .query_row(
        "SELECT active_version FROM worker_registration WHERE scope = ?",
        params![scope],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read worker registration: {}", e))
  }

  fn set_active_version(&self, scope: &str, version: &str) -> Result<()> {
    lock(&self.conn)?
      .execute(
        "INSERT OR REPLACE INTO worker_registration (scope, active_version, activated_at)
         VALUES (?, ?, datetime('now'))",
        params![scope, version],
      )
      .map_err(|e| eyre!("Failed to record worker registration: {}", e))?;
    Ok(())
  }

  fn clear_registration(&self, scope: &str) -> Result<bool> {
    let removed = lock(&self.conn)?
      .execute("DELETE FROM worker_registration WHERE scope = ?", params![scope])
      .map_err(|e| eyre!("Failed to clear worker registration: {}", e))?;
    Ok(removed > 0)
  }
}
