use serde::{Deserialize, Deserializer, Serialize};

/// A stored credential as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
  pub id: String,
  pub user_id: String,
  pub title: String,
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub favorite: Option<bool>,
  #[serde(default, alias = "createdAt")]
  pub created_at: Option<String>,
  #[serde(default, alias = "updatedAt")]
  pub updated_at: Option<String>,
}

/// Insert payload for a new entry.
///
/// With an `id` the insert is an upsert on that id, so sending the same
/// create twice leaves one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub title: String,
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub favorite: Option<bool>,
}

/// Partial update. Fields left as `None` are not sent.
///
/// `url` and `notes` distinguish "leave alone" (`None`) from "clear"
/// (`Some(None)`, sent as `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "present_or_null"
  )]
  pub url: Option<Option<String>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "present_or_null"
  )]
  pub notes: Option<Option<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub favorite: Option<bool>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

impl EntryPatch {
  pub fn is_empty(&self) -> bool {
    *self == EntryPatch::default()
  }

  /// Fold a later patch into this one; fields set in `later` win.
  pub fn merge(&mut self, later: EntryPatch) {
    if later.title.is_some() {
      self.title = later.title;
    }
    if later.username.is_some() {
      self.username = later.username;
    }
    if later.password.is_some() {
      self.password = later.password;
    }
    if later.url.is_some() {
      self.url = later.url;
    }
    if later.notes.is_some() {
      self.notes = later.notes;
    }
    if later.favorite.is_some() {
      self.favorite = later.favorite;
    }
  }

  /// Apply this patch to a not-yet-sent insert.
  pub fn apply_to(self, entry: &mut NewEntry) {
    if let Some(title) = self.title {
      entry.title = title;
    }
    if let Some(username) = self.username {
      entry.username = username;
    }
    if let Some(password) = self.password {
      entry.password = password;
    }
    if let Some(url) = self.url {
      entry.url = url;
    }
    if let Some(notes) = self.notes {
      entry.notes = notes;
    }
    if self.favorite.is_some() {
      entry.favorite = self.favorite;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_patch_skips_unset_and_keeps_null() {
    let patch = EntryPatch {
      title: Some("GitHub".to_string()),
      url: Some(None),
      ..EntryPatch::default()
    };
    let value = serde_json::to_value(&patch).unwrap();
    assert_eq!(value, json!({ "title": "GitHub", "url": null }));

    let back: EntryPatch = serde_json::from_value(value).unwrap();
    assert_eq!(back, patch);
  }

  #[test]
  fn test_patch_merge_later_wins() {
    let mut first = EntryPatch {
      title: Some("a".to_string()),
      password: Some("old".to_string()),
      ..EntryPatch::default()
    };
    first.merge(EntryPatch {
      password: Some("new".to_string()),
      notes: Some(Some("n".to_string())),
      ..EntryPatch::default()
    });
    assert_eq!(first.title.as_deref(), Some("a"));
    assert_eq!(first.password.as_deref(), Some("new"));
    assert_eq!(first.notes, Some(Some("n".to_string())));
  }

  #[test]
  fn test_new_entry_sends_null_url() {
    let entry = NewEntry {
      title: "Gmail".to_string(),
      username: "a@b.com".to_string(),
      password: "X".to_string(),
      ..NewEntry::default()
    };
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(
      value,
      json!({ "title": "Gmail", "username": "a@b.com", "password": "X", "url": null })
    );
  }

  #[test]
  fn test_entry_accepts_camel_case_timestamps() {
    let entry: PasswordEntry = serde_json::from_value(json!({
      "id": "1",
      "user_id": "u",
      "title": "t",
      "username": "n",
      "password": "p",
      "createdAt": "2024-01-01T00:00:00Z"
    }))
    .unwrap();
    assert_eq!(entry.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(entry.url, None);
  }
}
