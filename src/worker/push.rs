use color_eyre::Result;
use serde::Deserialize;

pub const DEFAULT_TITLE: &str = "Pocket Secrets";
pub const DEFAULT_BODY: &str = "New notification from Pocket Secrets";
pub const ICON: &str = "/icons/icon-192x192.png";
pub const BADGE: &str = "/icons/icon-72x72.png";

/// Optional fields a push message may carry.
#[derive(Debug, Default, Deserialize)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  pub url: Option<String>,
}

impl PushPayload {
  /// Parse a raw push body. Missing or malformed data yields an empty payload.
  pub fn parse(data: Option<&[u8]>) -> Self {
    data
      .and_then(|bytes| serde_json::from_slice(bytes).ok())
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  /// Opened or focused when the notification is clicked
  pub url: String,
}

impl From<PushPayload> for Notification {
  fn from(payload: PushPayload) -> Self {
    Self {
      title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
      icon: ICON.to_string(),
      badge: BADGE.to_string(),
      url: payload.url.unwrap_or_else(|| "/".to_string()),
    }
  }
}

/// Something that can display a notification to the user.
pub trait NotificationSink: Send + Sync {
  fn show(&self, notification: &Notification) -> Result<()>;
}
