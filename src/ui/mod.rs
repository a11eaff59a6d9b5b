pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;

/// A `width` x `height` rectangle centered in `area`, clipped to fit
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
