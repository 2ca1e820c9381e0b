use super::markdown::markdown_lines;
use super::segments::{split_segments, SegmentKind};
use super::text_metrics::{cursor_row_col, truncate_to_width, wrap_lines};
use crate::types::{Conversation, Message, Role};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const INPUT_PROMPT: &str = "> ";

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    let text_width = width.saturating_sub(INPUT_PROMPT.len()).max(1);
    wrap_lines(input, text_width).len().max(1)
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, title: &str, hint: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let title = truncate_to_width(title, width.saturating_sub(hint.len() + 1).max(1));
    frame.render_widget(
        Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])),
        area,
    );
    if hint.len() + 1 < width {
        frame.render_widget(
            Paragraph::new(hint.to_string())
                .alignment(Alignment::Right)
                .style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = (area.width as usize).saturating_sub(INPUT_PROMPT.len()).max(1);
    let lines = wrap_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let rendered: Vec<Line> = (0..visible_rows)
        .map(|offset| {
            let row_index = window_start + offset;
            let prefix = if row_index == 0 { INPUT_PROMPT } else { "  " };
            let line = lines.get(row_index).cloned().unwrap_or_default();
            Line::from(format!("{prefix}{line}"))
        })
        .collect();

    frame.render_widget(
        Paragraph::new(rendered).style(Style::default().fg(Color::Gray).bg(Color::Rgb(24, 24, 24))),
        area,
    );

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add((INPUT_PROMPT.len() + cursor_col) as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_to_width(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// Draws pre-wrapped `lines` starting at row `top`.
pub fn render_lines(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>, top: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let top = top.min(u16::MAX as usize) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), area);
}

/// Top row to show so that the view sits `scroll_from_bottom` rows above the end.
pub fn scroll_offset(total_rows: usize, visible_rows: usize, scroll_from_bottom: usize) -> usize {
    total_rows
        .saturating_sub(visible_rows)
        .saturating_sub(scroll_from_bottom)
}

pub fn chat_list_lines(
    conversations: &[Conversation],
    selected: usize,
    width: usize,
) -> Vec<Line<'static>> {
    if conversations.is_empty() {
        return vec![Line::styled(
            "No chats yet. Press n to start one.",
            Style::default().fg(Color::DarkGray),
        )];
    }

    let mut lines = Vec::with_capacity(conversations.len() * 3);
    for (index, conversation) in conversations.iter().enumerate() {
        let is_selected = index == selected;
        let marker = if is_selected { "▶ " } else { "  " };
        let title_style = if is_selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let detail_style = Style::default().fg(Color::DarkGray);

        lines.push(Line::styled(
            truncate_to_width(&format!("{marker}{}", conversation.title), width),
            title_style,
        ));
        lines.push(Line::styled(
            truncate_to_width(
                &format!(
                    "  {} · {} messages",
                    format_timestamp(&conversation.created_at),
                    conversation.messages.len()
                ),
                width,
            ),
            detail_style,
        ));
        lines.push(Line::from(""));
    }
    lines
}

/// Wrapped, styled rows for every message of a conversation. Message text
/// renders as Markdown. Assistant and error messages go through the segment
/// splitter first; reasoning segments fold to one row unless `show_reasoning`
/// is set.
pub fn conversation_lines(
    messages: &[Message],
    show_reasoning: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for message in messages {
        let label_style = match message.role {
            Role::User => Style::default().fg(Color::Cyan),
            Role::Assistant => Style::default().fg(Color::Green),
            Role::Error => Style::default().fg(Color::Red),
        };
        lines.push(Line::from(vec![
            Span::styled(message.role.as_str(), label_style.add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", format_timestamp(&message.created_at)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        match message.role {
            Role::User => lines.extend(markdown_lines(&message.content, width, Style::default())),
            Role::Assistant | Role::Error => {
                let body_style = if message.role == Role::Error {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                push_segments(&mut lines, &message.content, show_reasoning, width, body_style);
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

fn push_segments(
    lines: &mut Vec<Line<'static>>,
    content: &str,
    show_reasoning: bool,
    width: usize,
    answer_style: Style,
) {
    let reasoning_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC);

    for segment in split_segments(content) {
        let text = segment.display_text();
        if text.is_empty() {
            continue;
        }
        match segment.kind {
            SegmentKind::Answer => lines.extend(markdown_lines(text, width, answer_style)),
            SegmentKind::Reasoning if show_reasoning => {
                lines.push(Line::styled("▾ Thoughts", reasoning_style));
                for row in wrap_lines(text, width) {
                    lines.push(Line::styled(row, reasoning_style));
                }
            }
            SegmentKind::Reasoning => {
                lines.push(Line::styled("▸ Thoughts", reasoning_style));
            }
        }
    }
}

pub struct SettingsView<'a> {
    pub api_url: &'a str,
    pub url_focused: bool,
    pub models: &'a [String],
    pub selected_model: Option<usize>,
    pub current_model: &'a str,
    pub loading_models: bool,
}

pub fn settings_lines(view: &SettingsView<'_>, width: usize) -> Vec<Line<'static>> {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let focus = |focused: bool| {
        if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::styled("API URL", heading),
        Line::styled("Your OpenAI-compatible API URL", dim),
        Line::styled(
            truncate_to_width(&format!("  {}", view.api_url), width),
            focus(view.url_focused),
        ),
        Line::from(""),
        Line::styled("Model", heading),
        Line::styled(
            truncate_to_width(
                &format!(
                    "Current: {}",
                    if view.current_model.is_empty() {
                        "(none)"
                    } else {
                        view.current_model
                    }
                ),
                width,
            ),
            dim,
        ),
    ];

    if view.loading_models {
        lines.push(Line::styled("  loading models...", dim));
    } else if view.models.is_empty() {
        lines.push(Line::styled("  no models available", dim));
    }

    for (index, model) in view.models.iter().enumerate() {
        let chosen = view.selected_model == Some(index);
        let marker = if chosen { "(•) " } else { "( ) " };
        lines.push(Line::styled(
            truncate_to_width(&format!("  {marker}{model}"), width),
            focus(chosen && !view.url_focused),
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn text_of(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    fn assistant(content: &str) -> Message {
        Message::new(Role::Assistant, content)
    }

    #[test]
    fn test_reasoning_collapsed_by_default() {
        let rows = text_of(&conversation_lines(
            &[assistant("hello <think>pondering</think> world")],
            false,
            80,
        ));
        assert_eq!(rows[1], "hello");
        assert_eq!(rows[2], "▸ Thoughts");
        assert_eq!(rows[3], "world");
        assert!(!rows.iter().any(|row| row.contains("pondering")));
    }

    #[test]
    fn test_reasoning_expanded_when_requested() {
        let rows = text_of(&conversation_lines(
            &[assistant("<think>still going")],
            true,
            80,
        ));
        assert_eq!(rows[1], "▾ Thoughts");
        assert_eq!(rows[2], "still going");
    }

    #[test]
    fn test_user_messages_keep_markers_verbatim() {
        let rows = text_of(&conversation_lines(
            &[Message::user("what is <think>?")],
            false,
            80,
        ));
        assert_eq!(rows[1], "what is <think>?");
    }

    #[test]
    fn test_blank_placeholder_renders_header_only() {
        let rows = text_of(&conversation_lines(&[assistant("")], false, 80));
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("assistant"));
    }

    #[test]
    fn test_answer_and_user_text_render_as_markdown() {
        let rows = text_of(&conversation_lines(
            &[
                Message::user("- first\n- second"),
                assistant("<think>plan</think>## Result\n\n```sh\nls -la\n```"),
            ],
            false,
            80,
        ));
        assert!(rows[0].starts_with("user"));
        assert_eq!(rows[1], "• first");
        assert_eq!(rows[2], "• second");
        assert!(rows[4].starts_with("assistant"));
        assert_eq!(rows[5], "▸ Thoughts");
        assert_eq!(rows[6], "Result");
        assert_eq!(rows[7], "");
        assert_eq!(rows[8], "sh");
        assert_eq!(rows[9], "  ls -la");
    }

    #[test]
    fn test_chat_list_shows_count_and_marker() {
        let mut conversation = Conversation::new(1, Utc::now());
        conversation.messages.push(Message::user("hi"));
        let rows = text_of(&chat_list_lines(&[conversation], 0, 80));
        assert_eq!(rows[0], "▶ New chat");
        assert!(rows[1].ends_with("1 messages"));
    }

    #[test]
    fn test_scroll_offset_sticks_to_bottom() {
        assert_eq!(scroll_offset(50, 10, 0), 40);
        assert_eq!(scroll_offset(50, 10, 5), 35);
        assert_eq!(scroll_offset(50, 10, 100), 0);
        assert_eq!(scroll_offset(5, 10, 0), 0);
    }

    #[test]
    fn test_settings_lines_mark_selected_model() {
        let models = vec!["a".to_string(), "b".to_string()];
        let view = SettingsView {
            api_url: "http://localhost:1234",
            url_focused: false,
            models: &models,
            selected_model: Some(1),
            current_model: "b",
            loading_models: false,
        };
        let rows = text_of(&settings_lines(&view, 80));
        assert!(rows.contains(&"  ( ) a".to_string()));
        assert!(rows.contains(&"  (•) b".to_string()));
    }
}
