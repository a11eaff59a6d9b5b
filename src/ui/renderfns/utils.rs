use crate::generator::MAX_STRENGTH;
use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Color for a strength score out of [`MAX_STRENGTH`]
pub fn strength_color(score: u8) -> Color {
  match score {
    0..=2 => Color::Red,
    3..=4 => Color::Yellow,
    s if s < MAX_STRENGTH - 1 => Color::LightGreen,
    _ => Color::Green,
  }
}

/// Hidden form of a secret, one bullet per character
pub fn mask(secret: &str) -> String {
  "•".repeat(secret.chars().count())
}
