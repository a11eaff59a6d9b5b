use super::input::{InputEvent, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events the search bar reports to its view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Query edited; the view refilters on every keystroke
  Changed(String),
  /// Enter pressed: the bar closes and the filter stays
  Submitted,
}

/// Search bar opened with `/`.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn query(&self) -> String {
    self.input.value()
  }

  /// Open the bar, keeping the current query for refinement
  pub fn activate(&mut self) {
    self.active = true;
  }

  /// Handles `/` when closed and every key while open.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(_)) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      KeyResult::Event(InputEvent::Cancelled) => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      KeyResult::Event(InputEvent::Changed) => KeyResult::Event(SearchEvent::Changed(self.query())),
      KeyResult::Handled => KeyResult::Handled,
      // swallow everything else so list bindings don't fire mid-search
      KeyResult::NotHandled => KeyResult::Handled,
    }
  }

  /// One-line search bar at the top of `area`
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width.saturating_sub(1), 3);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search passwords ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}
