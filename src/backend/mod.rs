//! Adapter for the hosted auth service and the password table.
//!
//! Data operations go through [`PasswordBackend`] so the vault and the
//! offline replay queue can run against something other than the network.

mod api_types;
mod client;
mod error;
#[cfg(test)]
pub mod memory;
mod session;
mod types;

use std::future::Future;

pub use client::{BackendClient, SignUpOutcome};
pub use error::BackendError;
pub use session::{Session, SessionStore, User};
pub use types::{EntryPatch, NewEntry, PasswordEntry};

/// The four owner-scoped operations on password records.
pub trait PasswordBackend: Clone + Send + Sync + 'static {
  /// All entries owned by the signed-in user.
  fn fetch_passwords(&self) -> impl Future<Output = Result<Vec<PasswordEntry>, BackendError>> + Send;

  /// Insert an entry for the signed-in user; returns the stored row.
  fn create_password(
    &self,
    entry: NewEntry,
  ) -> impl Future<Output = Result<PasswordEntry, BackendError>> + Send;

  /// Apply a partial update to the entry with `id`.
  fn update_password(
    &self,
    id: String,
    patch: EntryPatch,
  ) -> impl Future<Output = Result<PasswordEntry, BackendError>> + Send;

  /// Delete the entry with `id`. Deleting a missing row succeeds.
  fn delete_password(&self, id: String) -> impl Future<Output = Result<(), BackendError>> + Send;
}
