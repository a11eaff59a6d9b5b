//! Background work whose results are picked up on the UI tick.
//!
//! A [`Task`] runs one future on the tokio runtime. A [`Query`] remembers how
//! to build its future so it can be refetched, e.g. after a mutation.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::oneshot;

/// Result of polling a task.
#[derive(Debug, PartialEq, Eq)]
pub enum TaskStatus<T> {
  Pending,
  Ready(T),
  /// The task panicked or was dropped before finishing
  Lost,
}

/// A spawned future.
pub struct Task<T> {
  receiver: oneshot::Receiver<T>,
}

impl<T: Send + 'static> Task<T> {
  pub fn spawn<F>(future: F) -> Self
  where
    F: Future<Output = T> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      // receiver may be gone if the view was closed
      let _ = tx.send(future.await);
    });
    Self { receiver: rx }
  }

  /// Check for the result without blocking.
  pub fn poll(&mut self) -> TaskStatus<T> {
    match self.receiver.try_recv() {
      Ok(value) => TaskStatus::Ready(value),
      Err(oneshot::error::TryRecvError::Empty) => TaskStatus::Pending,
      Err(oneshot::error::TryRecvError::Closed) => TaskStatus::Lost,
    }
  }
}

/// Poll an optional task slot, clearing it once the task is finished.
pub fn take_ready<T: Send + 'static>(slot: &mut Option<Task<T>>) -> Option<T> {
  let status = slot.as_mut()?.poll();
  match status {
    TaskStatus::Pending => None,
    TaskStatus::Ready(value) => {
      *slot = None;
      Some(value)
    }
    TaskStatus::Lost => {
      *slot = None;
      None
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// A refetchable task.
pub struct Query<T> {
  fetcher: FetcherFn<T>,
  task: Option<Task<T>>,
  fetched_at: Option<Instant>,
}

impl<T: Send + 'static> Query<T> {
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
  {
    Self {
      fetcher: Box::new(move || Box::pin(fetcher())),
      task: None,
      fetched_at: None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.task.is_some()
  }

  /// When the last result arrived.
  pub fn fetched_at(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Start fetching unless a fetch is already running.
  pub fn fetch(&mut self) {
    if self.task.is_none() {
      self.task = Some(Task::spawn((self.fetcher)()));
    }
  }

  /// Start a new fetch; the result of any running one is discarded.
  pub fn refetch(&mut self) {
    self.task = Some(Task::spawn((self.fetcher)()));
  }

  /// Result of the running fetch, once it has finished.
  pub fn poll(&mut self) -> Option<T> {
    let value = take_ready(&mut self.task)?;
    self.fetched_at = Some(Instant::now());
    Some(value)
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("loading", &self.task.is_some())
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
