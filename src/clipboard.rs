use color_eyre::{eyre::eyre, Result};

/// Where copied secrets go.
pub trait Clipboard {
  fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
///
/// The context is opened on first use and kept open; on X11 copied text is
/// lost once it drops.
#[derive(Default)]
pub struct SystemClipboard {
  board: Option<arboard::Clipboard>,
}

impl Clipboard for SystemClipboard {
  fn set_text(&mut self, text: &str) -> Result<()> {
    let mut board = match self.board.take() {
      Some(board) => board,
      None => arboard::Clipboard::new().map_err(|e| eyre!("Clipboard context error: {}", e))?,
    };
    let result = board
      .set_text(text.to_string())
      .map_err(|e| eyre!("Clipboard error: {}", e));
    self.board = Some(board);
    result
  }
}
