use crate::app::AppContext;
use crate::backend::{BackendError, PasswordBackend, PasswordEntry};
use crate::clipboard::{Clipboard, SystemClipboard};
use crate::generator::GeneratorOptions;
use crate::query::{Query, Task, TaskStatus};
use crate::sync::EntryMutation;
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, EntryForm, FormEvent, KeyResult, SearchEvent, SearchInput,
};
use crate::ui::renderfns::{mask, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::vault::{apply_mutation, Dialog, FormMode, MutationKind, MutationOutcome, Notice, VaultState};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

type MutationTask = Task<Result<MutationOutcome, BackendError>>;

/// The password list with search, detail panel and add/edit/delete dialogs.
pub struct VaultView {
  ctx: AppContext,
  state: VaultState,
  query: Query<Result<Vec<PasswordEntry>, BackendError>>,
  list_state: ListState,
  search: SearchInput,
  form: Option<EntryForm>,
  confirm: Option<ConfirmDialog>,
  mutation: Option<(MutationKind, MutationTask)>,
  reveal: bool,
  clipboard: Box<dyn Clipboard>,
}

impl VaultView {
  pub fn new(ctx: AppContext) -> Self {
    let backend = ctx.backend.clone();
    let mut query = Query::new(move || {
      let backend = backend.clone();
      async move { backend.fetch_passwords().await }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      ctx,
      state: VaultState::new(),
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      form: None,
      confirm: None,
      mutation: None,
      reveal: false,
      clipboard: Box::new(SystemClipboard::default()),
    }
  }

  #[cfg(test)]
  fn with_clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
    self.clipboard = Box::new(clipboard);
    self
  }

  fn generator_options(&self) -> GeneratorOptions {
    GeneratorOptions::from(&self.ctx.config.generator)
  }

  fn selected_id(&self) -> Option<String> {
    self.state.selected().map(|e| e.id.clone())
  }

  fn open_add(&mut self) -> ViewAction {
    if !self.state.open_add() {
      return ViewAction::None;
    }
    self.form = Some(self.form_for_dialog());
    ViewAction::None
  }

  fn open_edit(&mut self) -> ViewAction {
    let Some(id) = self.selected_id() else {
      return ViewAction::None;
    };
    if self.state.open_edit(&id) {
      self.form = Some(self.form_for_dialog());
    }
    ViewAction::None
  }

  fn form_for_dialog(&self) -> EntryForm {
    let (heading, initial) = match self.state.dialog() {
      Dialog::Form { mode: FormMode::Add, initial } => ("Add password", initial.clone()),
      Dialog::Form { initial, .. } => ("Edit password", initial.clone()),
      _ => ("Add password", Default::default()),
    };
    EntryForm::new(heading, &initial, self.generator_options())
  }

  fn request_delete(&mut self) {
    let Some(id) = self.selected_id() else {
      return;
    };
    if self.state.request_delete(&id) {
      self.confirm = Some(ConfirmDialog::delete_entry());
    }
  }

  fn start_mutation(&mut self, mutation: EntryMutation) {
    if !self.state.begin_mutation() {
      return;
    }
    let kind = MutationKind::from(&mutation);
    let backend = self.ctx.backend.clone();
    let queue = self.ctx.queue.clone();
    let task = Task::spawn(async move { apply_mutation(&backend, queue.as_ref(), mutation).await });
    self.mutation = Some((kind, task));
  }

  /// Settle the running mutation once it is done. A task that died without
  /// answering counts as failed so the in-flight guard is released.
  fn poll_mutation(&mut self) -> Option<Notice> {
    let (kind, task) = self.mutation.as_mut()?;
    let kind = *kind;
    let result = match task.poll() {
      TaskStatus::Pending => return None,
      TaskStatus::Ready(result) => result,
      TaskStatus::Lost => Err(BackendError::Transport(
        "the request was interrupted".to_string(),
      )),
    };
    self.mutation = None;

    let notice = self.state.finish_mutation(kind, &result);
    if let Ok(MutationOutcome::Applied) = result {
      self.refresh();
    }
    Some(notice)
  }

  fn copy_password(&mut self) -> ViewAction {
    let Some(password) = self.state.selected().map(|e| e.password.clone()) else {
      return ViewAction::None;
    };
    let notice = match self.clipboard.set_text(&password) {
      Ok(()) => Notice::info("Password copied", "Password copied to clipboard"),
      Err(e) => {
        tracing::warn!("Copy failed: {}", e);
        Notice::error("Copy failed", e.to_string())
      }
    };
    ViewAction::Notify(notice)
  }

  fn handle_form_key(&mut self, key: KeyEvent) -> ViewAction {
    let Some(form) = self.form.as_mut() else {
      return ViewAction::None;
    };
    match form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(draft)) => match self.state.submit_form(draft) {
        Ok(mutation) => {
          self.form = None;
          self.start_mutation(mutation);
        }
        Err(field) => form.set_error(format!("{} is required", field)),
      },
      KeyResult::Event(FormEvent::Cancelled) => {
        self.form = None;
        self.state.close_dialog();
      }
      _ => {}
    }
    ViewAction::None
  }

  fn handle_confirm_key(&mut self, key: KeyEvent) -> ViewAction {
    let Some(dialog) = self.confirm.as_mut() else {
      return ViewAction::None;
    };
    match dialog.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.confirm = None;
        if let Some(mutation) = self.state.confirm_delete() {
          self.start_mutation(mutation);
        }
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.confirm = None;
        self.state.close_dialog();
      }
      _ => {}
    }
    ViewAction::None
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let filtered = self.state.filtered();
    let total = self.state.entries().len();

    let title = if self.state.is_loading() {
      " Passwords (loading...) ".to_string()
    } else if self.state.is_busy() {
      format!(" Passwords ({}, saving...) ", total)
    } else if let Some(e) = self.state.load_error() {
      format!(" Passwords (error: {}) ", truncate(e, 40))
    } else if self.state.query().trim().is_empty() {
      format!(" Passwords ({}) ", total)
    } else {
      format!(" Passwords ({}/{}) /{} ", filtered.len(), total, self.state.query())
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if filtered.is_empty() {
      let content = if self.state.is_loading() {
        ""
      } else if self.state.load_error().is_some() {
        "Failed to load passwords. Press 'r' to retry."
      } else if total == 0 {
        "No passwords yet. Press 'a' to add one."
      } else {
        "No passwords match your search."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = filtered
      .iter()
      .map(|entry| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<24}", truncate(&entry.title, 24)), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::raw(truncate(&entry.username, 28)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    self.list_state.select(Some(self.state.selected_index()));
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Details ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));

    let Some(entry) = self.state.selected() else {
      frame.render_widget(block, area);
      return;
    };

    let label = |text: &'static str| Span::styled(format!("{:<10}", text), Style::default().fg(Color::DarkGray));
    let password = if self.reveal {
      entry.password.clone()
    } else {
      mask(&entry.password)
    };

    let mut lines = vec![
      Line::from(Span::styled(entry.title.as_str(), Style::default().fg(Color::Cyan).bold())),
      Line::raw(""),
      Line::from(vec![label("Username"), Span::raw(entry.username.as_str())]),
      Line::from(vec![label("Password"), Span::raw(password)]),
    ];
    if let Some(url) = entry.url.as_deref() {
      lines.push(Line::from(vec![label("URL"), Span::styled(url, Style::default().fg(Color::Blue))]));
    }
    if let Some(notes) = entry.notes.as_deref() {
      lines.push(Line::raw(""));
      lines.push(Line::from(label("Notes")));
      lines.extend(notes.lines().map(|l| Line::raw(l.to_string())));
    }
    if let Some(updated) = entry.updated_at.as_deref().or(entry.created_at.as_deref()) {
      lines.push(Line::raw(""));
      lines.push(Line::from(vec![
        label("Updated"),
        Span::styled(updated, Style::default().fg(Color::DarkGray)),
      ]));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }
}

impl View for VaultView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.confirm.is_some() {
      return self.handle_confirm_key(key);
    }
    if self.form.is_some() {
      return self.handle_form_key(key);
    }

    // Let search component try to handle first
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.state.set_query(&query);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.state.select_previous(),
      KeyCode::Char('a') => return self.open_add(),
      KeyCode::Char('e') | KeyCode::Enter => return self.open_edit(),
      KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
      KeyCode::Char('v') => self.reveal = !self.reveal,
      KeyCode::Char('c') | KeyCode::Char('y') => return self.copy_password(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Esc if !self.state.query().is_empty() => {
        self.search = SearchInput::new();
        self.state.set_query("");
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(area);

    self.render_list(frame, columns[0]);
    self.render_detail(frame, columns[1]);
    self.search.render_overlay(frame, area);

    if let Some(form) = &self.form {
      form.render(frame, area);
    }
    if let Some(dialog) = &self.confirm {
      dialog.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Vault".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.query.poll() {
      self.state.set_entries(result);
    }

    match self.poll_mutation() {
      Some(notice) => ViewAction::Notify(notice),
      None => ViewAction::None,
    }
  }

  fn refresh(&mut self) {
    self.state.set_loading();
    self.query.refetch();
  }

  fn is_capturing_input(&self) -> bool {
    self.form.is_some() || self.confirm.is_some() || self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("a", "add").with_priority(30),
      ShortcutInfo::new("e", "edit").with_priority(40),
      ShortcutInfo::new("d", "delete").with_priority(50),
      ShortcutInfo::new("v", "reveal").with_priority(60),
      ShortcutInfo::new("c", "copy").with_priority(65),
      ShortcutInfo::new("r", "refresh").with_priority(70),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
