use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Draw a centered dialog with a bordered title and a one-line key-hint
/// footer, returning the body rect the caller should render into.
pub fn draw_dialog(
    frame: &mut Frame,
    screen: Rect,
    title: &str,
    width: u16,
    height: u16,
    footer_hint: &str,
    border_style: Style,
) -> Rect {
    let dialog = centered_area(screen, width, height);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let [body, footer] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);
    frame.render_widget(
        Paragraph::new(footer_hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        footer,
    );
    body
}

/// Center a `width` x `height` rect inside `area`, shrinking to fit.
pub fn centered_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = area.width.min(width);
    let height = area.height.min(height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_area_is_centered_and_clamped() {
        let outer = Rect::new(0, 0, 80, 24);
        let dialog = centered_area(outer, 40, 10);
        assert_eq!(dialog, Rect::new(20, 7, 40, 10));

        let clamped = centered_area(outer, 200, 100);
        assert_eq!(clamped, outer);
    }
}
