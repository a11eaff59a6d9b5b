use super::input::{InputEvent, TextInput};
use super::KeyResult;
use crate::commands::{self, AppCommand, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// What the palette reports when it closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  Run(AppCommand),
  /// Enter on text that names no command
  Unknown(String),
  Cancelled,
}

/// Command palette opened with `:`, with autocomplete.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.input.value())
  }

  /// Handles `:` when closed and every key while open.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    let count = self.suggestions().len();
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(text)) => {
        // an exact name or alias wins over the highlighted suggestion
        let event = match commands::parse(&text) {
          Some(action) => CommandEvent::Run(action),
          None => match self.suggestions().get(self.selected_suggestion) {
            Some(cmd) => CommandEvent::Run(cmd.action),
            None => CommandEvent::Unknown(text.trim().to_string()),
          },
        };
        self.close();
        KeyResult::Event(event)
      }
      KeyResult::Event(InputEvent::Cancelled) => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyResult::Event(InputEvent::Changed) => {
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = 3 + suggestions.len().min(8) as u16;
    let overlay_area = Rect::new(
      area.x + 1,
      area.y + 1,
      width.saturating_sub(1),
      height.min(area.height.saturating_sub(1)),
    );
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);
    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::COMMANDS;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(palette: &mut CommandInput, text: &str) {
    for c in text.chars() {
      palette.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_colon_opens_and_enter_runs_top_suggestion() {
    let mut palette = CommandInput::new();
    assert_eq!(palette.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    type_text(&mut palette, "gen");
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(AppCommand::Generate))
    );
    assert!(!palette.is_active());
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut palette = CommandInput::new();
    palette.activate();
    palette.handle_key(key(KeyCode::Tab));
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(COMMANDS[1].action))
    );

    palette.activate();
    palette.handle_key(key(KeyCode::BackTab));
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(AppCommand::Quit))
    );
  }

  #[test]
  fn test_exact_alias_beats_highlight() {
    let mut palette = CommandInput::new();
    palette.activate();
    type_text(&mut palette, "s");
    palette.handle_key(key(KeyCode::Down));
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(AppCommand::Sync))
    );
  }

  #[test]
  fn test_unknown_command() {
    let mut palette = CommandInput::new();
    palette.activate();
    type_text(&mut palette, "xyz");
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Unknown("xyz".to_string()))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut palette = CommandInput::new();
    palette.activate();
    type_text(&mut palette, "sy");
    assert_eq!(palette.handle_key(key(KeyCode::Esc)), KeyResult::Event(CommandEvent::Cancelled));
    assert!(!palette.is_active());
  }
}
