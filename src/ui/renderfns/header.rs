use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides the shortcuts
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub backend_url: &'a str,
  pub user_email: Option<&'a str>,
  /// Mutations waiting in the offline queue
  pub pending: usize,
}

/// Draw the header bar with title, context, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let separator = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::Cyan).bold()),
    separator(),
    Span::styled(
      format!(" {} ", extract_domain(info.backend_url)),
      Style::default().fg(Color::White),
    ),
  ];

  if let Some(email) = info.user_email {
    spans.push(separator());
    spans.push(Span::styled(format!(" {} ", email), Style::default().fg(Color::Yellow).bold()));
  }

  if info.pending > 0 {
    spans.push(separator());
    spans.push(Span::styled(
      format!(" {} pending sync ", info.pending),
      Style::default().fg(Color::Magenta),
    ));
  }

  spans.push(Span::raw(" "));
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}", shortcut.label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host part of the backend URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://abc.supabase.co"), "abc.supabase.co");
    assert_eq!(extract_domain("https://abc.supabase.co/rest/v1"), "abc.supabase.co");
    assert_eq!(extract_domain("http://localhost:54321"), "localhost:54321");
  }
}
