//! State behind the vault screen: the fetched entry list, search, dialogs and
//! the mutation flow.

use tracing::{info, warn};

use crate::backend::{BackendError, EntryPatch, NewEntry, PasswordBackend, PasswordEntry};
use crate::sync::{EntryMutation, MutationQueue};

/// Entries whose title, username or URL contain `query`, ignoring case.
/// A blank query matches everything; otherwise spaces in it are significant.
pub fn filter_entries<'a>(entries: &'a [PasswordEntry], query: &str) -> Vec<&'a PasswordEntry> {
  if query.trim().is_empty() {
    return entries.iter().collect();
  }
  let query = query.to_lowercase();

  entries
    .iter()
    .filter(|entry| {
      entry.title.to_lowercase().contains(&query)
        || entry.username.to_lowercase().contains(&query)
        || entry
          .url
          .as_deref()
          .is_some_and(|url| url.to_lowercase().contains(&query))
    })
    .collect()
}

/// Contents of the entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
  pub title: String,
  pub username: String,
  pub password: String,
  pub url: String,
  pub notes: String,
}

impl From<&PasswordEntry> for EntryDraft {
  fn from(entry: &PasswordEntry) -> Self {
    Self {
      title: entry.title.clone(),
      username: entry.username.clone(),
      password: entry.password.clone(),
      url: entry.url.clone().unwrap_or_default(),
      notes: entry.notes.clone().unwrap_or_default(),
    }
  }
}

fn non_empty(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_string())
}

impl EntryDraft {
  /// Name of the first required field left blank.
  pub fn missing_field(&self) -> Option<&'static str> {
    [
      ("Title", &self.title),
      ("Username", &self.username),
      ("Password", &self.password),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
  }

  /// The draft as a new row. The id is chosen here so that a retry after a
  /// lost response upserts the same row.
  fn into_new_entry(self) -> NewEntry {
    NewEntry {
      id: Some(uuid::Uuid::new_v4().to_string()),
      url: non_empty(&self.url),
      notes: non_empty(&self.notes),
      title: self.title,
      username: self.username,
      password: self.password,
      favorite: None,
    }
  }

  /// The whole form as a patch; blank URL and notes are cleared.
  fn into_patch(self) -> EntryPatch {
    EntryPatch {
      url: Some(non_empty(&self.url)),
      notes: Some(non_empty(&self.notes)),
      title: Some(self.title),
      username: Some(self.username),
      password: Some(self.password),
      favorite: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  Add,
  Edit { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
  None,
  Form { mode: FormMode, initial: EntryDraft },
  ConfirmDelete { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Add,
  Update,
  Delete,
}

impl From<&EntryMutation> for MutationKind {
  fn from(mutation: &EntryMutation) -> Self {
    match mutation {
      EntryMutation::Create { .. } => MutationKind::Add,
      EntryMutation::Update { .. } => MutationKind::Update,
      EntryMutation::Delete { .. } => MutationKind::Delete,
    }
  }
}

/// How a mutation was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
  /// The backend accepted it
  Applied,
  /// The backend was unreachable; held for background sync
  Queued,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub title: String,
  pub description: String,
  pub destructive: bool,
}

impl Notice {
  pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      description: description.into(),
      destructive: false,
    }
  }

  pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      description: description.into(),
      destructive: true,
    }
  }

  /// Toast for the result of a vault mutation.
  pub fn for_mutation(kind: MutationKind, result: &Result<MutationOutcome, BackendError>) -> Self {
    match (kind, result) {
      (_, Ok(MutationOutcome::Queued)) => Notice::info(
        "Saved offline",
        "Your change will sync when the connection returns.",
      ),
      (MutationKind::Add, Ok(_)) => {
        Notice::info("Password added", "Your new password has been saved securely.")
      }
      (MutationKind::Update, Ok(_)) => Notice::info(
        "Password updated",
        "Your password entry has been updated successfully.",
      ),
      (MutationKind::Delete, Ok(_)) => {
        Notice::info("Password deleted", "The password entry has been removed.")
      }
      (kind, Err(e)) => {
        let (title, fallback) = match kind {
          MutationKind::Add => (
            "Error adding password",
            "An error occurred while adding the password.",
          ),
          MutationKind::Update => (
            "Error updating password",
            "An error occurred while updating the password.",
          ),
          MutationKind::Delete => (
            "Error deleting password",
            "An error occurred while deleting the password.",
          ),
        };
        let message = e.to_string();
        Notice::error(title, if message.is_empty() { fallback.to_string() } else { message })
      }
    }
  }
}

/// Send a mutation to the backend. When `queue` is given and the backend
/// cannot be reached, the mutation is queued for background sync instead.
pub async fn apply_mutation<B: PasswordBackend>(
  backend: &B,
  queue: Option<&MutationQueue>,
  mutation: EntryMutation,
) -> Result<MutationOutcome, BackendError> {
  match mutation.clone().apply(backend).await {
    Ok(()) => Ok(MutationOutcome::Applied),
    Err(e) if e.is_transport() => {
      let Some(queue) = queue else {
        return Err(e);
      };
      warn!("Backend unreachable, queueing mutation: {}", e);
      queue
        .enqueue(mutation)
        .map_err(|qe| BackendError::Transport(format!("{}; could not queue change: {}", e, qe)))?;
      Ok(MutationOutcome::Queued)
    }
    Err(e) => Err(e),
  }
}

#[derive(Debug)]
pub struct VaultState {
  entries: Vec<PasswordEntry>,
  query: String,
  /// Index into the filtered list
  selected: usize,
  dialog: Dialog,
  in_flight: bool,
  loading: bool,
  load_error: Option<String>,
}

impl Default for VaultState {
  fn default() -> Self {
    Self {
      entries: Vec::new(),
      query: String::new(),
      selected: 0,
      dialog: Dialog::None,
      in_flight: false,
      loading: true,
      load_error: None,
    }
  }
}

impl VaultState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_loading(&mut self) {
    self.loading = true;
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn load_error(&self) -> Option<&str> {
    self.load_error.as_deref()
  }

  /// Store the result of a fetch. On error the previous list is kept.
  pub fn set_entries(&mut self, result: Result<Vec<PasswordEntry>, BackendError>) {
    self.loading = false;
    match result {
      Ok(entries) => {
        info!("Loaded {} entries", entries.len());
        self.entries = entries;
        self.load_error = None;
        self.clamp_selection();
      }
      Err(e) => {
        warn!("Failed to load entries: {}", e);
        self.load_error = Some(e.to_string());
      }
    }
  }

  pub fn entries(&self) -> &[PasswordEntry] {
    &self.entries
  }

  pub fn filtered(&self) -> Vec<&PasswordEntry> {
    filter_entries(&self.entries, &self.query)
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn set_query(&mut self, query: &str) {
    self.query = query.to_string();
    self.selected = 0;
  }

  pub fn selected_index(&self) -> usize {
    self.selected
  }

  pub fn selected(&self) -> Option<&PasswordEntry> {
    self.filtered().get(self.selected).copied()
  }

  pub fn select_next(&mut self) {
    let len = self.filtered().len();
    if len > 0 {
      self.selected = (self.selected + 1).min(len - 1);
    }
  }

  pub fn select_previous(&mut self) {
    self.selected = self.selected.saturating_sub(1);
  }

  fn clamp_selection(&mut self) {
    let len = self.filtered().len();
    self.selected = self.selected.min(len.saturating_sub(1));
  }

  pub fn dialog(&self) -> &Dialog {
    &self.dialog
  }

  pub fn is_busy(&self) -> bool {
    self.in_flight
  }

  /// Open an empty form. Returns false while a mutation is in flight.
  pub fn open_add(&mut self) -> bool {
    if self.in_flight {
      return false;
    }
    self.dialog = Dialog::Form {
      mode: FormMode::Add,
      initial: EntryDraft::default(),
    };
    true
  }

  /// Open the form prefilled with the entry `id`.
  pub fn open_edit(&mut self, id: &str) -> bool {
    if self.in_flight {
      return false;
    }
    let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
      return false;
    };
    self.dialog = Dialog::Form {
      mode: FormMode::Edit { id: entry.id.clone() },
      initial: EntryDraft::from(entry),
    };
    true
  }

  pub fn request_delete(&mut self, id: &str) -> bool {
    if self.in_flight {
      return false;
    }
    self.dialog = Dialog::ConfirmDelete { id: id.to_string() };
    true
  }

  pub fn close_dialog(&mut self) {
    self.dialog = Dialog::None;
  }

  /// Turn the open form into a mutation and close it.
  ///
  /// Returns the missing field's name if validation fails; the form then
  /// stays open.
  pub fn submit_form(&mut self, draft: EntryDraft) -> Result<EntryMutation, &'static str> {
    let Dialog::Form { mode, .. } = &self.dialog else {
      return Err("No form is open");
    };
    if let Some(field) = draft.missing_field() {
      return Err(field);
    }

    let mutation = match mode {
      FormMode::Add => EntryMutation::Create {
        entry: draft.into_new_entry(),
      },
      FormMode::Edit { id } => EntryMutation::Update {
        id: id.clone(),
        patch: draft.into_patch(),
      },
    };
    self.dialog = Dialog::None;
    Ok(mutation)
  }

  /// Close the delete confirmation and return the delete to run.
  pub fn confirm_delete(&mut self) -> Option<EntryMutation> {
    let Dialog::ConfirmDelete { id } = std::mem::replace(&mut self.dialog, Dialog::None) else {
      return None;
    };
    Some(EntryMutation::Delete { id })
  }

  /// Mark a mutation as started. Returns false if one is already running.
  pub fn begin_mutation(&mut self) -> bool {
    if self.in_flight {
      return false;
    }
    self.in_flight = true;
    true
  }

  /// Record a finished mutation and produce its toast.
  pub fn finish_mutation(
    &mut self,
    kind: MutationKind,
    result: &Result<MutationOutcome, BackendError>,
  ) -> Notice {
    self.in_flight = false;
    Notice::for_mutation(kind, result)
  }
}
