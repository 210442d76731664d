use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Render `Label: value` with the focused field highlighted and empty fields
/// replaced by a greyed placeholder.
pub(crate) fn field_line(
    label: &str,
    value: &str,
    is_active: bool,
    placeholder: &str,
) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// Cursor column for a field rendered with [`field_line`].
pub(crate) fn cursor_column(area: Rect, label: &str, value: &str) -> u16 {
    let offset = label.chars().count() + 2 + value.chars().count();
    area.x + (offset as u16).min(area.width.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 10);
    }

    #[test]
    fn empty_fields_show_placeholder() {
        let line = field_line("Age", "", false, "<number>");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Age: <number>");
    }

    #[test]
    fn cursor_is_clamped_to_the_area() {
        let area = Rect::new(2, 0, 10, 1);
        assert_eq!(cursor_column(area, "Name", "Ana"), 2 + 9);
        assert_eq!(cursor_column(area, "Name", "A very long name"), 2 + 9);
    }
}
