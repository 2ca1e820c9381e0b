use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Hard-wraps `input` at `width` display columns, also breaking on `\n`.
pub fn wrap_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut used = 0usize;
    for ch in input.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                lines.push(String::new());
                used = 0;
                continue;
            }
            _ => {}
        }
        let ch_width = char_display_width(ch);
        if used + ch_width > width && used > 0 {
            lines.push(String::new());
            used = 0;
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        used += ch_width;
    }
    lines
}

/// Row and column of the cursor once `input` is wrapped with `wrap_lines`.
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);
    let mut row = 0usize;
    let mut col = 0usize;

    for (idx, ch) in input.char_indices() {
        if idx >= cursor_byte {
            break;
        }
        match ch {
            '\r' => continue,
            '\n' => {
                row += 1;
                col = 0;
                continue;
            }
            _ => {}
        }
        let ch_width = char_display_width(ch);
        if col + ch_width > width && col > 0 {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }

    if col >= width {
        row += 1;
        col = 0;
    }

    (row, col)
}

/// Fits `input` into `width` columns, ending with "..." when cut.
pub fn truncate_to_width(input: &str, width: usize) -> String {
    let width = width.max(1);
    if display_width(input) <= width {
        return input.to_string();
    }

    let budget = if width >= 4 { width - 3 } else { width };
    let mut out = String::new();
    let mut used = 0usize;
    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > budget {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    if width >= 4 {
        out.push_str("...");
    }
    out
}

fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_lines_breaks_on_width_and_newline() {
        assert_eq!(wrap_lines("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_lines("ab\ncd", 10), vec!["ab", "cd"]);
        assert_eq!(wrap_lines("", 10), vec![""]);
    }

    #[test]
    fn test_wide_chars_count_double() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(wrap_lines("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn test_cursor_row_col_follows_wrapping() {
        assert_eq!(cursor_row_col("abcdef", 6, 4), (1, 2));
        assert_eq!(cursor_row_col("ab\ncd", 3, 10), (1, 0));
        assert_eq!(cursor_row_col("abcd", 4, 4), (1, 0));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a long conversation title", 10), "a long ...");
        assert_eq!(truncate_to_width("abcdef", 3), "abc");
    }
}
