use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub header: Rect,
    pub body: Rect,
    pub status: Rect,
    pub input: Rect,
}

/// Header on top, then the scrolling body, a status row and the input area.
/// `input_rows` of zero hides the input (chat list and settings screens).
pub fn split_chat_layout(area: Rect, input_rows: u16) -> ChatLayout {
    let max_input = area.height.saturating_sub(4).max(1);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows.min(max_input)),
        ])
        .split(area);

    ChatLayout {
        header: chunks[0],
        body: chunks[1],
        status: chunks[2],
        input: chunks[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_splits_into_four_rows() {
        let area = Rect::new(0, 0, 80, 20);
        let panes = split_chat_layout(area, 3);

        assert_eq!(panes.header.height, 1);
        assert_eq!(panes.body.height, 15);
        assert_eq!(panes.status.height, 1);
        assert_eq!(panes.input.height, 3);
        assert_eq!(panes.body.y, 1);
        assert_eq!(panes.status.y, 16);
        assert_eq!(panes.input.y, 17);
    }

    #[test]
    fn layout_without_input_gives_body_the_space() {
        let area = Rect::new(0, 0, 80, 12);
        let panes = split_chat_layout(area, 0);

        assert_eq!(panes.input.height, 0);
        assert_eq!(panes.body.height, 10);
    }

    #[test]
    fn layout_caps_tall_input() {
        let area = Rect::new(0, 0, 80, 10);
        let panes = split_chat_layout(area, 40);

        assert_eq!(panes.input.height, 6);
        assert_eq!(panes.body.height, 2);
    }
}
