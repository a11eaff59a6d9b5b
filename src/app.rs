use crate::backend::BackendClient;
use crate::commands::AppCommand;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::generator::GeneratorOptions;
use crate::query::{take_ready, Task};
use crate::sync::{MutationQueue, SYNC_TAG};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::renderfns::{draw_footer, draw_header, HeaderInfo};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{AuthView, GeneratorView, VaultView};
use crate::vault::Notice;
use crate::worker::{
  ClickOutcome, HttpNetwork, Notification, NotificationSink, OfflineWorker, PushInbox,
  SqliteCacheStore, SyncOutcome,
};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type AppWorker = OfflineWorker<SqliteCacheStore, HttpNetwork>;

/// Everything views need to talk to the outside world.
#[derive(Clone)]
pub struct AppContext {
  pub config: Arc<Config>,
  pub backend: BackendClient,
  /// Present only when background sync is registered
  pub queue: Option<MutationQueue>,
  pub worker: Option<Arc<AppWorker>>,
  /// Present only when notifications are allowed
  pub inbox: Option<PushInbox>,
  /// This session as a client of the worker
  pub client_id: Option<String>,
}

impl AppContext {
  fn sync_target(&self) -> Option<(Arc<AppWorker>, MutationQueue)> {
    let worker = self.worker.clone()?;
    let queue = self.queue.clone()?;
    worker.has_sync(SYNC_TAG).then_some((worker, queue))
  }
}

/// Shows pushed notifications as toasts on the next tick.
struct ToastSink {
  tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSink for ToastSink {
  fn show(&self, notification: &Notification) -> Result<()> {
    self
      .tx
      .send(notification.clone())
      .map_err(|e| eyre!("Failed to queue notification: {}", e))
  }
}

/// Main application state
pub struct App {
  ctx: AppContext,
  title: String,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  command_input: CommandInput,
  toasts: Toasts,

  sync: Option<Task<Result<SyncOutcome>>>,
  /// Whether the running sync was requested with `:sync`
  sync_manual: bool,
  last_sync: Instant,
  /// Queue length as of the last tick
  pending: usize,

  sink: ToastSink,
  notifications: mpsc::UnboundedReceiver<Notification>,
  /// Target of `:open`
  last_notification: Option<Notification>,

  should_quit: bool,
}

impl App {
  pub fn new(ctx: AppContext, title: String) -> Self {
    let root: Box<dyn View> = if ctx.backend.session().is_signed_in() {
      Box::new(VaultView::new(ctx.clone()))
    } else {
      Box::new(AuthView::new(ctx.clone()))
    };
    let (tx, notifications) = mpsc::unbounded_channel();

    Self {
      ctx,
      title,
      view_stack: vec![root],
      command_input: CommandInput::new(),
      toasts: Toasts::new(),
      sync: None,
      sync_manual: false,
      last_sync: Instant::now(),
      pending: 0,
      sink: ToastSink { tx },
      notifications,
      last_notification: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Resize) | Some(Event::Tick) => {}
        None => break,
      }
      self.tick();
    }
    Ok(())
  }

  fn current_view(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self.view_stack.last().is_some_and(|v| v.is_capturing_input());
    if self.command_input.is_active() || !capturing {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(command)) => return self.execute(command),
        KeyResult::Event(CommandEvent::Unknown(text)) => {
          self.toasts.push(Notice::error("Unknown command", format!(":{}", text)));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.current_view() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => self.view_stack = vec![view],
      ViewAction::Notify(notice) => self.toasts.push(notice),
    }
  }

  fn execute(&mut self, command: AppCommand) {
    debug!(?command, "running command");
    match command {
      AppCommand::Vault => {
        if self.ctx.backend.session().is_signed_in() {
          self.apply(ViewAction::Replace(Box::new(VaultView::new(self.ctx.clone()))));
        } else {
          self.toasts.push(Notice::error("Not signed in", "Sign in to see your passwords."));
        }
      }
      AppCommand::Generate => {
        let options = GeneratorOptions::from(&self.ctx.config.generator);
        self.apply(ViewAction::Push(Box::new(GeneratorView::new(options))));
      }
      AppCommand::Sync => self.start_sync(true),
      AppCommand::Logout => {
        let backend = self.ctx.backend.clone();
        tokio::spawn(async move {
          if let Err(e) = backend.sign_out().await {
            warn!("Sign-out request failed: {}", e);
          }
        });
        info!("signed out");
        self.apply(ViewAction::Replace(Box::new(AuthView::new(self.ctx.clone()))));
        self.toasts.push(Notice::info("Signed out", "See you soon."));
      }
      AppCommand::Open => self.open_notification(),
      AppCommand::Quit => self.should_quit = true,
    }
  }

  /// Hand waiting push messages to the worker and turn the notifications it
  /// shows into toasts.
  fn deliver_pushes(&mut self) {
    if let (Some(worker), Some(inbox)) = (&self.ctx.worker, &self.ctx.inbox) {
      match inbox.drain() {
        Ok(messages) => {
          for data in messages {
            worker.handle_push(data.as_deref(), &self.sink);
          }
        }
        Err(e) => warn!("Failed to read push inbox: {}", e),
      }
    }

    while let Ok(notification) = self.notifications.try_recv() {
      self
        .toasts
        .push(Notice::info(notification.title.clone(), notification.body.clone()));
      self.last_notification = Some(notification);
    }
  }

  /// Act on the latest notification as if it had been clicked.
  fn open_notification(&mut self) {
    let (Some(worker), Some(notification)) = (self.ctx.worker.clone(), self.last_notification.take())
    else {
      self.toasts.push(Notice::info("No notifications", "Nothing has been pushed to this session."));
      return;
    };

    match worker.handle_notification_click(&notification) {
      Ok(ClickOutcome::Focused(id)) if self.ctx.client_id.as_deref() == Some(id.as_str()) => {
        info!(url = %notification.url, "notification focused this session");
        self.execute(AppCommand::Vault);
      }
      Ok(_) => {
        let url = worker
          .options()
          .request(&notification.url)
          .map(|r| r.url.to_string())
          .unwrap_or(notification.url);
        self.toasts.push(Notice::info("Open in your browser", url));
      }
      Err(e) => {
        warn!("Failed to open notification: {}", e);
        self.toasts.push(Notice::error("Could not open notification", e.to_string()));
      }
    }
  }

  /// Replay the offline queue through the worker's sync handler.
  fn start_sync(&mut self, manual: bool) {
    let Some((worker, queue)) = self.ctx.sync_target() else {
      if manual {
        self.toasts.push(Notice::error(
          "Background sync not supported",
          "Changes made offline are not queued in this session.",
        ));
      }
      return;
    };
    if self.sync.is_some() {
      return;
    }
    if manual && self.pending == 0 {
      self.toasts.push(Notice::info("Nothing to sync", "All changes are saved."));
      return;
    }

    let backend = self.ctx.backend.clone();
    self.last_sync = Instant::now();
    self.sync_manual = manual;
    self.sync = Some(Task::spawn(async move {
      worker.handle_sync(SYNC_TAG, &queue, &backend).await
    }));
  }

  fn finish_sync(&mut self) {
    if self.sync.is_none() {
      return;
    }
    let outcome = take_ready(&mut self.sync);
    if self.sync.is_some() {
      // still running
      return;
    }
    let manual = self.sync_manual;

    match outcome {
      Some(Ok(SyncOutcome::Flushed(report))) => {
        if report.replayed > 0 {
          self.toasts.push(Notice::info(
            "Changes synced",
            format!("{} offline change(s) saved.", report.replayed),
          ));
          for view in &mut self.view_stack {
            view.refresh();
          }
        }
        if report.dropped > 0 {
          self.toasts.push(Notice::error(
            "Some changes were rejected",
            format!("{} offline change(s) could not be saved.", report.dropped),
          ));
        }
        if let Some(e) = report.error {
          debug!(remaining = report.remaining, "sync stopped: {}", e);
          if manual {
            self.toasts.push(Notice::error("Sync failed", e));
          }
        }
      }
      Some(Ok(SyncOutcome::Ignored)) => debug!("sync ignored"),
      Some(Err(e)) => {
        warn!("Background sync failed: {}", e);
        if manual {
          self.toasts.push(Notice::error("Sync failed", e.to_string()));
        }
      }
      None => warn!("Background sync task was lost"),
    }
  }

  fn tick(&mut self) {
    self.toasts.prune(Instant::now());
    self.deliver_pushes();

    if let Some(view) = self.current_view() {
      let action = view.tick();
      self.apply(action);
    }

    if let Some(queue) = &self.ctx.queue {
      self.pending = queue.len().unwrap_or_else(|e| {
        warn!("Failed to read offline queue: {}", e);
        0
      });
    }

    self.finish_sync();
    let interval = Duration::from_secs(self.ctx.config.sync.interval_secs);
    if self.pending > 0
      && self.sync.is_none()
      && self.last_sync.elapsed() >= interval
      && self.ctx.backend.session().is_signed_in()
    {
      self.start_sync(false);
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let user = self.ctx.backend.session().user();
    let info = HeaderInfo {
      title: &self.title,
      backend_url: &self.ctx.config.backend.url,
      user_email: user.as_ref().and_then(|u| u.email.as_deref()),
      pending: self.pending,
    };
    let shortcuts = self.view_stack.last().map(|v| v.shortcuts()).unwrap_or_default();
    draw_header(frame, chunks[0], &info, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }
    self.command_input.render_overlay(frame, chunks[1]);
    self.toasts.render(frame, chunks[1]);

    let breadcrumb: Vec<String> = self.view_stack.iter().map(|v| v.breadcrumb_label()).collect();
    draw_footer(frame, chunks[2], &breadcrumb);
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::backend::SessionStore;
  use crate::db::Database;
  use crate::worker::WorkerOptions;

  pub fn context() -> AppContext {
    let config = Config::parse(
      "backend:\n  url: https://abc.supabase.co\norigin: https://vault.example.com\n",
    )
    .unwrap();
    let backend = BackendClient::new(&config.backend, "anon", SessionStore::new()).unwrap();
    AppContext {
      config: Arc::new(config),
      backend,
      queue: None,
      worker: None,
      inbox: None,
      client_id: None,
    }
  }

  /// Context with a worker, this session attached as its client, and a push
  /// inbox on a shared database.
  fn context_with_worker(db: &Database) -> AppContext {
    let mut ctx = context();
    let options = WorkerOptions::from_config(&ctx.config).unwrap();
    let network = HttpNetwork::new(options.origin.clone());
    let worker = OfflineWorker::new(SqliteCacheStore::new(db.conn()), network, options);
    ctx.client_id = Some(worker.attach_client("/").unwrap());
    ctx.worker = Some(Arc::new(worker));
    ctx.inbox = Some(PushInbox::new(db.conn()));
    ctx
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn run_command(app: &mut App, name: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in name.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  fn toast_titles(app: &App) -> Vec<String> {
    app.toasts.notices().map(|n| n.title.clone()).collect()
  }

  #[tokio::test]
  async fn test_starts_on_sign_in() {
    let app = App::new(context(), "Pocket Secrets".to_string());
    assert_eq!(app.view_stack.len(), 1);
    assert_eq!(app.view_stack[0].breadcrumb_label(), "Sign in");
  }

  #[tokio::test]
  async fn test_colon_types_into_auth_form() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command_input.is_active());
  }

  #[tokio::test]
  async fn test_generate_pushes_and_pops() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.execute(AppCommand::Generate);
    assert_eq!(app.view_stack.len(), 2);

    // the generator does not capture input, so the palette opens
    run_command(&mut app, "quit");
    assert!(app.should_quit);

    app.should_quit = false;
    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.view_stack.len(), 1);
    assert!(!app.should_quit);
  }

  #[tokio::test]
  async fn test_sync_without_worker() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.execute(AppCommand::Sync);
    assert_eq!(toast_titles(&app), vec!["Background sync not supported"]);
    assert!(app.sync.is_none());
  }

  #[tokio::test]
  async fn test_vault_requires_session() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.execute(AppCommand::Vault);
    assert_eq!(toast_titles(&app), vec!["Not signed in"]);
    assert_eq!(app.view_stack[0].breadcrumb_label(), "Sign in");
  }

  #[tokio::test]
  async fn test_pushed_message_becomes_toast() {
    let db = Database::open_in_memory().unwrap();
    let mut app = App::new(context_with_worker(&db), "Pocket Secrets".to_string());

    PushInbox::new(db.conn())
      .deliver(Some(br#"{"title":"Heads up","body":"A password was shared"}"#))
      .unwrap();
    app.tick();

    let notice = app.toasts.notices().next().unwrap();
    assert_eq!(notice.title, "Heads up");
    assert_eq!(notice.description, "A password was shared");
    assert!(!notice.destructive);

    // drained once
    app.tick();
    assert_eq!(app.toasts.notices().count(), 1);
  }

  #[tokio::test]
  async fn test_open_focuses_this_session() {
    let db = Database::open_in_memory().unwrap();
    let mut app = App::new(context_with_worker(&db), "Pocket Secrets".to_string());
    PushInbox::new(db.conn()).deliver(None).unwrap();
    app.tick();
    assert_eq!(toast_titles(&app), vec!["Pocket Secrets"]);

    // the session shows "/", so the click lands here and asks for the vault
    app.execute(AppCommand::Open);
    assert_eq!(toast_titles(&app), vec!["Pocket Secrets", "Not signed in"]);
    assert!(app.last_notification.is_none());
  }

  #[tokio::test]
  async fn test_open_other_url_points_to_browser() {
    let db = Database::open_in_memory().unwrap();
    let mut app = App::new(context_with_worker(&db), "Pocket Secrets".to_string());
    PushInbox::new(db.conn())
      .deliver(Some(br#"{"url":"/settings"}"#))
      .unwrap();
    app.tick();

    app.execute(AppCommand::Open);
    let notice = app.toasts.notices().last().unwrap();
    assert_eq!(notice.title, "Open in your browser");
    assert_eq!(notice.description, "https://vault.example.com/settings");
  }

  #[tokio::test]
  async fn test_open_without_notifications() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.execute(AppCommand::Open);
    assert_eq!(toast_titles(&app), vec!["No notifications"]);
  }

  #[tokio::test]
  async fn test_inbox_ignored_without_permission() {
    let db = Database::open_in_memory().unwrap();
    let mut ctx = context_with_worker(&db);
    ctx.inbox = None;
    let mut app = App::new(ctx, "Pocket Secrets".to_string());
    PushInbox::new(db.conn()).deliver(None).unwrap();
    app.tick();
    assert!(app.toasts.is_empty());
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = App::new(context(), "Pocket Secrets".to_string());
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }
}
