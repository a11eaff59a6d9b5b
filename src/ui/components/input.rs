use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a text input reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
  /// Enter pressed, here's the value
  Submitted(String),
  /// Escape pressed
  Cancelled,
  /// The value was edited
  Changed,
}

/// Single-line text input. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  chars: Vec<char>,
  cursor: usize,
  masked: bool,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Input that displays bullets instead of its contents
  pub fn masked() -> Self {
    Self {
      masked: true,
      ..Self::default()
    }
  }

  pub fn with_value(value: &str) -> Self {
    let mut input = Self::new();
    input.set_value(value);
    input
  }

  pub fn value(&self) -> String {
    self.chars.iter().collect()
  }

  pub fn set_value(&mut self, value: &str) {
    self.chars = value.chars().collect();
    self.cursor = self.chars.len();
  }

  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  pub fn clear(&mut self) {
    self.chars.clear();
    self.cursor = 0;
  }

  pub fn is_masked(&self) -> bool {
    self.masked
  }

  pub fn set_masked(&mut self, masked: bool) {
    self.masked = masked;
  }

  /// Text to draw: the value, or one bullet per character when masked
  pub fn display(&self) -> String {
    if self.masked {
      "•".repeat(self.chars.len())
    } else {
      self.value()
    }
  }

  /// Cursor position in characters
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  /// The drawn text split at the cursor.
  pub fn split_at_cursor(&self) -> (String, String) {
    let shown: Vec<char> = self.display().chars().collect();
    let at = self.cursor_position().min(shown.len());
    (shown[..at].iter().collect(), shown[at..].iter().collect())
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<InputEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
      KeyCode::Esc => KeyResult::Event(InputEvent::Cancelled),
      KeyCode::Enter => KeyResult::Event(InputEvent::Submitted(self.value())),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          self.chars.remove(self.cursor);
        }
        KeyResult::Event(InputEvent::Changed)
      }
      KeyCode::Delete => {
        if self.cursor < self.chars.len() {
          self.chars.remove(self.cursor);
        }
        KeyResult::Event(InputEvent::Changed)
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        KeyResult::Handled
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.chars.len());
        KeyResult::Handled
      }
      KeyCode::Home => {
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::End => {
        self.cursor = self.chars.len();
        KeyResult::Handled
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.chars.len();
        KeyResult::Handled
      }
      KeyCode::Char('u') if ctrl => {
        self.chars.drain(..self.cursor);
        self.cursor = 0;
        KeyResult::Event(InputEvent::Changed)
      }
      KeyCode::Char('w') if ctrl => {
        let before = &self.chars[..self.cursor];
        let trimmed = before.iter().rposition(|c| !c.is_whitespace()).map_or(0, |i| i + 1);
        let start = before[..trimmed]
          .iter()
          .rposition(|c| c.is_whitespace())
          .map_or(0, |i| i + 1);
        self.chars.drain(start..self.cursor);
        self.cursor = start;
        KeyResult::Event(InputEvent::Changed)
      }
      // other control chords belong to the owner
      KeyCode::Char(_) if ctrl => KeyResult::NotHandled,
      KeyCode::Char(c) => {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
        KeyResult::Event(InputEvent::Changed)
      }
      _ => KeyResult::NotHandled,
    }
  }
}
