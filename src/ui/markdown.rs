//! Markdown to styled, pre-wrapped ratatui lines.
//!
//! Block structure (headings, lists, quotes, fenced code, rules) becomes
//! prefixes and blank separator rows; inline emphasis becomes span styles.
//! Raw HTML, including stray `<think>` markers, is shown as typed.

use super::text_metrics::{char_display_width, display_width};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const QUOTE_PREFIX: &str = "│ ";
const CODE_INDENT: &str = "  ";
const BULLET: &str = "• ";

pub fn markdown_lines(text: &str, width: usize, base: Style) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut writer = LineWriter::new(width, base);
    for event in Parser::new_ext(text, options) {
        writer.event(event);
    }
    writer.finish()
}

struct ListFrame {
    next_number: Option<u64>,
}

struct LineWriter {
    width: usize,
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<ListFrame>,
    /// Content indent of each open list item.
    item_indents: Vec<usize>,
    /// Marker still to be printed on the first row of the current item.
    item_marker: Option<String>,
    quote_depth: usize,
    code_block: bool,
}

impl LineWriter {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width: width.max(1),
            base,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            item_indents: Vec::new(),
            item_marker: None,
            quote_depth: 0,
            code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.code_block => {
                self.raw_rows(&text, CODE_INDENT, self.base.fg(Color::Yellow))
            }
            Event::Text(text) => self.push_text(&text, self.style()),
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.push_text(&code, style);
            }
            Event::Html(html) => self.raw_rows(&html, "", self.style()),
            Event::InlineHtml(html) => self.push_text(&html, self.style()),
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.start_block();
                let rule = "─".repeat(self.width.min(40));
                self.current
                    .push(Span::styled(rule, self.base.fg(Color::DarkGray)));
                self.flush();
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.push_text(marker, self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.start_block(),
            Tag::Heading { level, .. } => {
                self.start_block();
                let underline = level == pulldown_cmark::HeadingLevel::H1;
                self.push_style(|style| {
                    let style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                    if underline {
                        style.add_modifier(Modifier::UNDERLINED)
                    } else {
                        style
                    }
                });
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.current
                            .push(Span::styled(lang.to_string(), self.base.fg(Color::DarkGray)));
                        self.flush();
                    }
                }
            }
            Tag::HtmlBlock => self.start_block(),
            Tag::List(start) => {
                if self.item_indents.is_empty() {
                    self.start_block();
                } else {
                    self.flush();
                }
                self.lists.push(ListFrame { next_number: start });
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(ListFrame {
                        next_number: Some(number),
                    }) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => BULLET.to_string(),
                };
                let parent = self.item_indents.last().copied().unwrap_or(0);
                self.item_indents.push(parent + display_width(&marker));
                self.item_marker = Some(marker);
            }
            Tag::Emphasis => self.push_style(|style| style.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|style| style.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(|style| style.add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { .. } => self.push_style(|style| {
                style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.styles.pop();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.code_block = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Item => {
                self.flush();
                self.item_indents.pop();
                self.item_marker = None;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.styles.pop();
            }
            _ => {}
        }
    }

    /// Blank row between top-level blocks; list items stay tight.
    fn start_block(&mut self) {
        self.flush();
        let at_top_level = self.item_indents.is_empty();
        let after_text = self.lines.last().is_some_and(|line| line.width() > 0);
        if at_top_level && after_text {
            self.lines.push(Line::from(""));
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    /// One output row per source line, whitespace kept.
    fn raw_rows(&mut self, text: &str, indent: &str, style: Style) {
        for row in text.split_terminator('\n') {
            self.current.push(Span::styled(format!("{indent}{row}"), style));
            self.flush_row(true);
        }
    }

    fn flush(&mut self) {
        self.flush_row(false);
    }

    fn flush_row(&mut self, keep_empty: bool) {
        if self.current.is_empty() && !keep_empty {
            return;
        }
        let spans = std::mem::take(&mut self.current);
        let quote = QUOTE_PREFIX.repeat(self.quote_depth);
        let indent = self.item_indents.last().copied().unwrap_or(0);
        let first = match self.item_marker.take() {
            Some(marker) => {
                let parent = indent.saturating_sub(display_width(&marker));
                format!("{quote}{}{marker}", " ".repeat(parent))
            }
            None => format!("{quote}{}", " ".repeat(indent)),
        };
        let rest = format!("{quote}{}", " ".repeat(indent));
        let prefix_style = self.base.fg(Color::DarkGray);
        let rows = wrap_spans(&spans, self.width.saturating_sub(display_width(&rest)).max(1));

        for (index, row) in rows.into_iter().enumerate() {
            let prefix = if index == 0 { &first } else { &rest };
            let mut line = Vec::with_capacity(row.len() + 1);
            if !prefix.is_empty() {
                line.push(Span::styled(prefix.clone(), prefix_style));
            }
            line.extend(row);
            self.lines.push(Line::from(line));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Hard-wraps styled spans at `width` columns, keeping each span's style.
fn wrap_spans(spans: &[Span<'static>], width: usize) -> Vec<Vec<Span<'static>>> {
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    let mut used = 0usize;

    for span in spans {
        let mut chunk = String::new();
        for ch in span.content.chars() {
            let ch_width = char_display_width(ch);
            if used + ch_width > width && used > 0 {
                if !chunk.is_empty() {
                    if let Some(row) = rows.last_mut() {
                        row.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                }
                rows.push(Vec::new());
                used = 0;
            }
            chunk.push(ch);
            used += ch_width;
        }
        if !chunk.is_empty() {
            if let Some(row) = rows.last_mut() {
                row.push(Span::styled(chunk, span.style));
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(text: &str, width: usize) -> Vec<String> {
        markdown_lines(text, width, Style::default())
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_heading_is_bold_and_separated() {
        let lines = markdown_lines("# Title\nbody text", 40, Style::default());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans[0].content, "Title");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[1].width(), 0);
        assert_eq!(lines[2].spans[0].content, "body text");
    }

    #[test]
    fn test_fenced_code_keeps_rows_verbatim() {
        assert_eq!(
            rows("```rust\nfn main() {\n    *x = 1;\n}\n```", 40),
            vec!["rust", "  fn main() {", "      *x = 1;", "  }"]
        );
    }

    #[test]
    fn test_lists_get_markers_and_nesting() {
        assert_eq!(
            rows("- one\n- two\n  - inner\n\n3. three\n4. four", 40),
            vec!["• one", "• two", "  • inner", "", "3. three", "4. four"]
        );
    }

    #[test]
    fn test_inline_styles_and_code() {
        let lines = markdown_lines("plain **bold** `code` *it*", 40, Style::default());
        let spans = &lines[0].spans;
        assert_eq!(spans[1].content, "bold");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[3].content, "code");
        assert_eq!(spans[3].style.fg, Some(Color::Yellow));
        assert!(spans[5].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_list_item_wraps_under_its_text() {
        assert_eq!(rows("- abcdefgh", 6), vec!["• abcd", "  efgh"]);
    }

    #[test]
    fn test_quote_and_inline_html_pass_through() {
        assert_eq!(rows("> quoted", 40), vec!["│ quoted"]);
        assert_eq!(rows("what is <think>?", 40), vec!["what is <think>?"]);
    }
}
