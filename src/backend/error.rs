use thiserror::Error;

/// Errors returned by the backend adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
  /// A data operation required a session and none was available.
  #[error("No authenticated user found")]
  NotAuthenticated,

  /// The backend answered with a non-success status.
  #[error("{message}")]
  Api { status: u16, message: String },

  /// The request never produced a response (offline, DNS, TLS, reset).
  #[error("network error: {0}")]
  Transport(String),

  /// The backend answered but the body did not have the expected shape.
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl BackendError {
  /// Whether the failure happened before the backend could answer.
  pub fn is_transport(&self) -> bool {
    matches!(self, BackendError::Transport(_))
  }

  /// Whether replaying the same request later could succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      BackendError::Transport(_) | BackendError::NotAuthenticated => true,
      BackendError::Api { status, .. } => matches!(status, 401 | 403 | 408 | 429 | 500..=599),
      BackendError::Decode(_) => false,
    }
  }
}

impl From<reqwest::Error> for BackendError {
  fn from(e: reqwest::Error) -> Self {
    BackendError::Transport(e.to_string())
  }
}
