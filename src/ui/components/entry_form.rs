use super::input::{InputEvent, TextInput};
use super::KeyResult;
use crate::generator::{check_strength, generate_password, GeneratorOptions, Strength, MAX_STRENGTH};
use crate::ui::renderfns::strength_color;
use crate::vault::EntryDraft;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submitted(EntryDraft),
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Title,
  Username,
  Password,
  Url,
  Notes,
}

const FIELDS: [Field; 5] = [Field::Title, Field::Username, Field::Password, Field::Url, Field::Notes];

impl Field {
  fn label(self) -> &'static str {
    match self {
      Field::Title => "Title",
      Field::Username => "Username",
      Field::Password => "Password",
      Field::Url => "URL",
      Field::Notes => "Notes",
    }
  }

  fn index(self) -> usize {
    self as usize
  }
}

/// Add/edit dialog for one password entry.
///
/// Tab and the arrow keys move between fields, Ctrl-G fills the password
/// from the generator and Ctrl-R shows or hides it.
#[derive(Debug, Clone)]
pub struct EntryForm {
  heading: String,
  inputs: [TextInput; 5],
  focus: usize,
  generator: GeneratorOptions,
  error: Option<String>,
}

impl EntryForm {
  pub fn new(heading: impl Into<String>, initial: &EntryDraft, generator: GeneratorOptions) -> Self {
    let mut password = TextInput::masked();
    password.set_value(&initial.password);
    Self {
      heading: heading.into(),
      inputs: [
        TextInput::with_value(&initial.title),
        TextInput::with_value(&initial.username),
        password,
        TextInput::with_value(&initial.url),
        TextInput::with_value(&initial.notes),
      ],
      focus: 0,
      generator,
      error: None,
    }
  }

  pub fn draft(&self) -> EntryDraft {
    let value = |field: Field| self.inputs[field.index()].value();
    EntryDraft {
      title: value(Field::Title),
      username: value(Field::Username),
      password: value(Field::Password),
      url: value(Field::Url),
      notes: value(Field::Notes),
    }
  }

  /// Strength of the password as currently typed
  pub fn strength(&self) -> Strength {
    check_strength(&self.inputs[Field::Password.index()].value())
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Shown under the fields until the next edit
  pub fn set_error(&mut self, message: impl Into<String>) {
    self.error = Some(message.into());
  }

  pub fn is_password_revealed(&self) -> bool {
    !self.inputs[Field::Password.index()].is_masked()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % FIELDS.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len();
        return KeyResult::Handled;
      }
      KeyCode::Char('g') if ctrl => {
        let password = generate_password(self.generator);
        self.inputs[Field::Password.index()].set_value(&password);
        self.error = None;
        return KeyResult::Handled;
      }
      KeyCode::Char('r') if ctrl => {
        let input = &mut self.inputs[Field::Password.index()];
        input.set_masked(!input.is_masked());
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.inputs[self.focus].handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(_)) => KeyResult::Event(FormEvent::Submitted(self.draft())),
      KeyResult::Event(InputEvent::Cancelled) => KeyResult::Event(FormEvent::Cancelled),
      KeyResult::Event(InputEvent::Changed) => {
        self.error = None;
        KeyResult::Handled
      }
      // modal: nothing leaks to the list underneath
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let dialog = crate::ui::centered_rect(area, 64, 18);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan))
      .title(format!(" {} ", self.heading))
      .title_bottom(Line::from(format!(
        " Tab next · ^G generate · ^R {} · Esc cancel ",
        if self.is_password_revealed() { "hide" } else { "reveal" }
      ))
      .centered());
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let mut constraints = vec![Constraint::Length(2); FIELDS.len()];
    constraints.push(Constraint::Length(1)); // strength meter
    constraints.push(Constraint::Length(1)); // error
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints(constraints)
      .split(inner);

    for (i, field) in FIELDS.iter().enumerate() {
      let input = &self.inputs[i];
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let (before, after) = input.split_at_cursor();
      let mut value = vec![Span::raw(before)];
      if focused {
        value.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      value.push(Span::raw(after));
      let lines = vec![
        Line::from(Span::styled(field.label(), label_style)),
        Line::from(value),
      ];
      frame.render_widget(Paragraph::new(lines), rows[i]);
    }

    let strength = self.strength();
    let ratio = f64::from(strength.score) / f64::from(MAX_STRENGTH);
    let gauge = Gauge::default()
      .gauge_style(Style::default().fg(strength_color(strength.score)))
      .ratio(ratio.clamp(0.0, 1.0))
      .label(format!("Strength: {}", strength.label));
    frame.render_widget(gauge, rows[FIELDS.len()]);

    if let Some(error) = &self.error {
      frame.render_widget(
        Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        rows[FIELDS.len() + 1],
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
  }

  fn type_text(form: &mut EntryForm, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn empty_form() -> EntryForm {
    EntryForm::new("Add password", &EntryDraft::default(), GeneratorOptions::default())
  }

  #[test]
  fn test_fill_and_submit() {
    let mut form = empty_form();
    type_text(&mut form, "GitHub");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "me");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "hunter2");

    let event = form.handle_key(key(KeyCode::Enter));
    let KeyResult::Event(FormEvent::Submitted(draft)) = event else {
      panic!("expected submit, got {:?}", event);
    };
    assert_eq!(draft.title, "GitHub");
    assert_eq!(draft.username, "me");
    assert_eq!(draft.password, "hunter2");
    assert_eq!(draft.url, "");
  }

  #[test]
  fn test_prefilled_from_draft() {
    let initial = EntryDraft {
      title: "Mail".to_string(),
      username: "me".to_string(),
      password: "pw".to_string(),
      url: "https://mail.example.com".to_string(),
      notes: String::new(),
    };
    let form = EntryForm::new("Edit password", &initial, GeneratorOptions::default());
    assert_eq!(form.draft(), initial);
    assert!(!form.is_password_revealed());
  }

  #[test]
  fn test_generate_fills_password() {
    let mut form = empty_form();
    form.handle_key(ctrl('g'));
    let password = form.draft().password;
    assert_eq!(password.chars().count(), GeneratorOptions::default().length);
    assert!(form.strength().score > 0);
  }

  #[test]
  fn test_reveal_toggle() {
    let mut form = empty_form();
    form.handle_key(ctrl('r'));
    assert!(form.is_password_revealed());
    form.handle_key(ctrl('r'));
    assert!(!form.is_password_revealed());
  }

  #[test]
  fn test_backtab_wraps_to_notes() {
    let mut form = empty_form();
    form.handle_key(key(KeyCode::BackTab));
    type_text(&mut form, "n");
    assert_eq!(form.draft().notes, "n");
  }

  #[test]
  fn test_edit_clears_error_and_escape_cancels() {
    let mut form = empty_form();
    form.set_error("Title is required");
    type_text(&mut form, "x");
    assert_eq!(form.error(), None);
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Event(FormEvent::Cancelled));
  }
}
