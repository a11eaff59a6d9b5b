/// Schema for the local state database.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Named, versioned asset caches
CREATE TABLE IF NOT EXISTS caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cached responses, keyed by a hash of the request URL
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key),
    FOREIGN KEY (cache_name) REFERENCES caches(name) ON DELETE CASCADE
);

-- Which worker version controls clients in a scope
CREATE TABLE IF NOT EXISTS worker_registration (
    scope TEXT PRIMARY KEY,
    active_version TEXT NOT NULL,
    activated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Mutations waiting for background sync, one row per entry
CREATE TABLE IF NOT EXISTS pending_mutations (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL UNIQUE,
    op TEXT NOT NULL,
    queued_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Push messages delivered while waiting for a running client
CREATE TABLE IF NOT EXISTS push_inbox (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    payload BLOB,
    received_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
