//! Offline cache worker: a versioned asset cache with an explicit
//! install/activate lifecycle, cache-first fetch handling, background sync
//! and push notifications.

mod clients;
mod inbox;
mod lifecycle;
mod network;
mod push;
mod request;
mod store;

pub use clients::ClickOutcome;
pub use inbox::PushInbox;
pub use lifecycle::{ActivationReport, OfflineWorker, SyncOutcome, WorkerOptions};
pub use network::{HttpNetwork, Network};
pub use push::{Notification, NotificationSink};
pub use request::Request;
pub use store::{CacheStorage, SqliteCacheStore};

#[cfg(test)]
pub use lifecycle::WorkerState;
#[cfg(test)]
pub use request::ResponseKind;
#[cfg(test)]
pub(crate) use lifecycle::tests as test_support;
