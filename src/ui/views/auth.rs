use crate::app::AppContext;
use crate::backend::{BackendError, SignUpOutcome};
use crate::config::Config;
use crate::query::{take_ready, Task};
use crate::ui::components::{InputEvent, KeyResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::VaultView;
use crate::vault::Notice;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
  SignIn,
  SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Name,
  Email,
  Password,
  Confirm,
}

impl Field {
  fn label(self) -> &'static str {
    match self {
      Field::Name => "Name",
      Field::Email => "Email",
      Field::Password => "Password",
      Field::Confirm => "Confirm Password",
    }
  }
}

/// What a valid form submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
  SignIn {
    email: String,
    password: String,
  },
  SignUp {
    name: String,
    email: String,
    password: String,
  },
}

/// Sign-in / sign-up fields and validation, independent of the backend.
#[derive(Debug, Clone)]
pub struct AuthForm {
  mode: AuthMode,
  name: TextInput,
  email: TextInput,
  password: TextInput,
  confirm: TextInput,
  focus: usize,
}

impl AuthForm {
  pub fn new(email: Option<&str>) -> Self {
    let mut form = Self {
      mode: AuthMode::SignIn,
      name: TextInput::new(),
      email: TextInput::with_value(email.unwrap_or_default()),
      password: TextInput::masked(),
      confirm: TextInput::masked(),
      focus: 0,
    };
    // jump straight to the password when the email is known
    if !form.email.is_empty() {
      form.focus = 1;
    }
    form
  }

  pub fn mode(&self) -> AuthMode {
    self.mode
  }

  fn fields(&self) -> &'static [Field] {
    match self.mode {
      AuthMode::SignIn => &[Field::Email, Field::Password],
      AuthMode::SignUp => &[Field::Name, Field::Email, Field::Password, Field::Confirm],
    }
  }

  fn input(&self, field: Field) -> &TextInput {
    match field {
      Field::Name => &self.name,
      Field::Email => &self.email,
      Field::Password => &self.password,
      Field::Confirm => &self.confirm,
    }
  }

  fn input_mut(&mut self, field: Field) -> &mut TextInput {
    match field {
      Field::Name => &mut self.name,
      Field::Email => &mut self.email,
      Field::Password => &mut self.password,
      Field::Confirm => &mut self.confirm,
    }
  }

  fn focused(&self) -> Field {
    let fields = self.fields();
    fields[self.focus.min(fields.len() - 1)]
  }

  pub fn toggle_mode(&mut self) {
    self.mode = match self.mode {
      AuthMode::SignIn => AuthMode::SignUp,
      AuthMode::SignUp => AuthMode::SignIn,
    };
    self.password.clear();
    self.confirm.clear();
    self.focus = 0;
  }

  pub fn focus_next(&mut self) {
    self.focus = (self.focus + 1) % self.fields().len();
  }

  pub fn focus_previous(&mut self) {
    let len = self.fields().len();
    self.focus = (self.focus + len - 1) % len;
  }

  /// Validated request, or the notice explaining what is wrong.
  pub fn submit(&self) -> Result<AuthRequest, Notice> {
    let email = self.email.value().trim().to_string();
    let password = self.password.value();
    if email.is_empty() || password.is_empty() {
      return Err(Notice::error(
        "Missing details",
        "Please enter your email and password.",
      ));
    }

    match self.mode {
      AuthMode::SignIn => Ok(AuthRequest::SignIn { email, password }),
      AuthMode::SignUp => {
        if password != self.confirm.value() {
          return Err(Notice::error(
            "Passwords don't match",
            "Please make sure your passwords match.",
          ));
        }
        Ok(AuthRequest::SignUp {
          name: self.name.value().trim().to_string(),
          email,
          password,
        })
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<InputEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_previous();
        KeyResult::Handled
      }
      _ => {
        let field = self.focused();
        self.input_mut(field).handle_key(key)
      }
    }
  }
}

enum AuthResult {
  SignedIn,
  ConfirmationRequired,
}

/// Sign in or create an account.
pub struct AuthView {
  ctx: AppContext,
  form: AuthForm,
  task: Option<Task<Result<AuthResult, BackendError>>>,
  error: Option<String>,
}

impl AuthView {
  pub fn new(ctx: AppContext) -> Self {
    let form = AuthForm::new(ctx.config.backend.email.as_deref());
    let mut view = Self {
      ctx,
      form,
      task: None,
      error: None,
    };

    // POCKET_SECRETS_PASSWORD together with a configured email signs in
    // without prompting
    if let (Some(email), Some(password)) = (view.ctx.config.backend.email.clone(), Config::get_password()) {
      info!(%email, "signing in from environment");
      view.start(AuthRequest::SignIn { email, password });
    }
    view
  }

  fn start(&mut self, request: AuthRequest) {
    let backend = self.ctx.backend.clone();
    self.error = None;
    self.task = Some(Task::spawn(async move {
      match request {
        AuthRequest::SignIn { email, password } => {
          backend.sign_in(&email, &password).await.map(|_| AuthResult::SignedIn)
        }
        AuthRequest::SignUp {
          name,
          email,
          password,
        } => match backend.sign_up(&email, &password, &name).await? {
          SignUpOutcome::SignedIn(_) => Ok(AuthResult::SignedIn),
          SignUpOutcome::ConfirmationRequired => Ok(AuthResult::ConfirmationRequired),
        },
      }
    }));
  }

  fn render_form(&self, frame: &mut Frame, area: Rect) {
    let fields = self.form.fields();
    let height = 6 + fields.len() as u16 * 2;
    let dialog = crate::ui::centered_rect(area, 50, height);

    let heading = match self.form.mode() {
      AuthMode::SignIn => " Sign in ",
      AuthMode::SignUp => " Create account ",
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan))
      .title(heading)
      .title_alignment(Alignment::Center);

    let mut lines = vec![
      Line::from(Span::styled("Your secure password manager", Style::default().fg(Color::DarkGray))),
      Line::raw(""),
    ];
    let focused = self.form.focused();
    for field in fields {
      let style = if *field == focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      lines.push(Line::from(Span::styled(field.label(), style)));
      let (before, after) = self.form.input(*field).split_at_cursor();
      let mut value = vec![Span::raw(before)];
      if *field == focused {
        value.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      value.push(Span::raw(after));
      lines.push(Line::from(value));
    }
    lines.push(Line::raw(""));

    if self.task.is_some() {
      lines.push(Line::from(Span::styled("Working...", Style::default().fg(Color::Yellow))));
    } else if let Some(error) = &self.error {
      lines.push(Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red))));
    }

    frame.render_widget(Paragraph::new(lines).block(block), dialog);
  }
}

impl View for AuthView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.task.is_some() {
      return ViewAction::None;
    }
    if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.form.toggle_mode();
      self.error = None;
      return ViewAction::None;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(_)) => match self.form.submit() {
        Ok(request) => {
          self.start(request);
          ViewAction::None
        }
        Err(notice) => ViewAction::Notify(notice),
      },
      KeyResult::Event(InputEvent::Changed) => {
        self.error = None;
        ViewAction::None
      }
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_form(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.form.mode() {
      AuthMode::SignIn => "Sign in".to_string(),
      AuthMode::SignUp => "Sign up".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    match take_ready(&mut self.task) {
      Some(Ok(AuthResult::SignedIn)) => {
        info!("signed in");
        ViewAction::Replace(Box::new(VaultView::new(self.ctx.clone())))
      }
      Some(Ok(AuthResult::ConfirmationRequired)) => {
        self.form.toggle_mode();
        ViewAction::Notify(Notice::info(
          "Check your email",
          "Confirm your account, then sign in.",
        ))
      }
      Some(Err(e)) => {
        self.error = Some(e.to_string());
        ViewAction::Notify(Notice::error("Authentication failed", e.to_string()))
      }
      None => ViewAction::None,
    }
  }

  fn is_capturing_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "submit").with_priority(20),
      ShortcutInfo::new("^T", "sign in/up").with_priority(30),
      ShortcutInfo::new("^C", "quit").with_priority(90),
    ]
  }
}
