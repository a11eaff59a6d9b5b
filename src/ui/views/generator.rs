use crate::generator::{check_strength, generate_password, GeneratorOptions, MAX_STRENGTH};
use crate::ui::renderfns::strength_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

const MIN_LENGTH: usize = 4;
const MAX_LENGTH: usize = 64;

/// Standalone password generator.
pub struct GeneratorView {
  options: GeneratorOptions,
  password: String,
}

impl GeneratorView {
  pub fn new(options: GeneratorOptions) -> Self {
    let mut view = Self {
      options,
      password: String::new(),
    };
    view.regenerate();
    view
  }

  pub fn options(&self) -> GeneratorOptions {
    self.options
  }

  pub fn password(&self) -> &str {
    &self.password
  }

  fn regenerate(&mut self) {
    self.password = generate_password(self.options);
  }
}

impl View for GeneratorView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('g') | KeyCode::Char(' ') | KeyCode::Enter => {}
      KeyCode::Char('u') => self.options.uppercase = !self.options.uppercase,
      KeyCode::Char('n') => self.options.digits = !self.options.digits,
      KeyCode::Char('s') => self.options.symbols = !self.options.symbols,
      KeyCode::Char('+') | KeyCode::Right => {
        self.options.length = (self.options.length + 1).min(MAX_LENGTH);
      }
      KeyCode::Char('-') | KeyCode::Left => {
        self.options.length = self.options.length.saturating_sub(1).max(MIN_LENGTH);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => return ViewAction::None,
    }
    self.regenerate();
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let dialog = crate::ui::centered_rect(area, 60, 12);
    let block = Block::default()
      .title(" Password generator ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
      ])
      .split(inner);

    frame.render_widget(
      Paragraph::new(self.password.as_str())
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center),
      rows[0],
    );

    let strength = check_strength(&self.password);
    let gauge = Gauge::default()
      .gauge_style(Style::default().fg(strength_color(strength.score)))
      .ratio(f64::from(strength.score) / f64::from(MAX_STRENGTH))
      .label(format!("Strength: {}", strength.label));
    frame.render_widget(gauge, rows[1]);

    let toggle = |on: bool| if on { "[x]" } else { "[ ]" };
    let options = vec![
      Line::raw(""),
      Line::from(format!("Length {}", self.options.length)),
      Line::from(format!(
        "{} uppercase   {} numbers   {} symbols",
        toggle(self.options.uppercase),
        toggle(self.options.digits),
        toggle(self.options.symbols),
      )),
    ];
    frame.render_widget(Paragraph::new(options), rows[3]);
  }

  fn breadcrumb_label(&self) -> String {
    "Generator".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("g", "generate").with_priority(10),
      ShortcutInfo::new("+/-", "length").with_priority(20),
      ShortcutInfo::new("u/n/s", "toggle").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::generator::{DIGITS, SYMBOLS};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_toggles_regenerate() {
    let mut view = GeneratorView::new(GeneratorOptions::default());
    assert_eq!(view.password().chars().count(), 12);

    view.handle_key(key(KeyCode::Char('s')));
    view.handle_key(key(KeyCode::Char('n')));
    assert!(!view.options().symbols);
    assert!(!view.password().chars().any(|c| SYMBOLS.contains(c) || DIGITS.contains(c)));
  }

  #[test]
  fn test_length_bounds() {
    let mut view = GeneratorView::new(GeneratorOptions {
      length: MIN_LENGTH,
      ..GeneratorOptions::default()
    });
    view.handle_key(key(KeyCode::Char('-')));
    assert_eq!(view.options().length, MIN_LENGTH);
    view.handle_key(key(KeyCode::Char('+')));
    assert_eq!(view.password().chars().count(), MIN_LENGTH + 1);
  }

  #[test]
  fn test_back() {
    let mut view = GeneratorView::new(GeneratorOptions::default());
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
