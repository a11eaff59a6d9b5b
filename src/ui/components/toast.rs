use crate::vault::Notice;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;
const TOAST_WIDTH: u16 = 44;
const TOAST_HEIGHT: u16 = 4;

#[derive(Debug, Clone)]
struct Toast {
  notice: Notice,
  expires_at: Instant,
}

/// Stack of transient notices in the bottom-right corner.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
  items: VecDeque<Toast>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, notice: Notice) {
    self.push_at(notice, Instant::now());
  }

  fn push_at(&mut self, notice: Notice, now: Instant) {
    tracing::debug!(title = %notice.title, destructive = notice.destructive, "toast");
    self.items.push_back(Toast {
      notice,
      expires_at: now + TOAST_TTL,
    });
    while self.items.len() > MAX_TOASTS {
      self.items.pop_front();
    }
  }

  /// Drop expired toasts
  pub fn prune(&mut self, now: Instant) {
    self.items.retain(|t| t.expires_at > now);
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn notices(&self) -> impl Iterator<Item = &Notice> {
    self.items.iter().map(|t| &t.notice)
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut bottom = area.y + area.height;

    // newest at the bottom
    for toast in self.items.iter().rev() {
      if bottom < area.y + TOAST_HEIGHT {
        break;
      }
      let rect = Rect::new(area.x + area.width - width, bottom - TOAST_HEIGHT, width, TOAST_HEIGHT);
      bottom -= TOAST_HEIGHT;

      let color = if toast.notice.destructive { Color::Red } else { Color::Green };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(format!(" {} ", toast.notice.title), Style::default().fg(color).bold()));
      let paragraph = Paragraph::new(toast.notice.description.as_str())
        .block(block)
        .wrap(Wrap { trim: true });
      frame.render_widget(Clear, rect);
      frame.render_widget(paragraph, rect);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_toasts_expire() {
    let mut toasts = Toasts::new();
    let now = Instant::now();
    toasts.push_at(Notice::info("Password added", "saved"), now);
    toasts.prune(now + Duration::from_secs(1));
    assert!(!toasts.is_empty());
    toasts.prune(now + TOAST_TTL);
    assert!(toasts.is_empty());
  }

  #[test]
  fn test_oldest_dropped_when_full() {
    let mut toasts = Toasts::new();
    let now = Instant::now();
    for i in 0..5 {
      toasts.push_at(Notice::info(format!("n{}", i), ""), now);
    }
    let titles: Vec<&str> = toasts.notices().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["n2", "n3", "n4"]);
  }
}
