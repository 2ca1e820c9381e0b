//! Splits assistant text into answer and reasoning runs.
//!
//! Reasoning is wrapped inline as `<think>…</think>`. Content keeps changing
//! while a reply streams in, so callers re-split on every render.

pub const REASONING_OPEN: &str = "<think>";
pub const REASONING_CLOSE: &str = "</think>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Answer,
    Reasoning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    /// Raw text between markers, whitespace untouched.
    pub text: &'a str,
}

impl<'a> Segment<'a> {
    /// Text as shown to the user: surrounding whitespace trimmed.
    pub fn display_text(&self) -> &'a str {
        self.text.trim()
    }
}

/// An opener with no closer yet yields a trailing reasoning segment, which is
/// what a reply looks like while its reasoning is still streaming.
pub fn split_segments(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut kind = SegmentKind::Answer;

    while cursor < content.len() {
        let rest = &content[cursor..];
        let (marker, next_kind) = match kind {
            SegmentKind::Answer => (REASONING_OPEN, SegmentKind::Reasoning),
            SegmentKind::Reasoning => (REASONING_CLOSE, SegmentKind::Answer),
        };

        let Some(found) = rest.find(marker) else {
            push_segment(&mut segments, kind, rest);
            break;
        };

        push_segment(&mut segments, kind, &rest[..found]);
        kind = next_kind;
        cursor += found + marker.len();
    }

    segments
}

fn push_segment<'a>(segments: &mut Vec<Segment<'a>>, kind: SegmentKind, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment { kind, text });
    }
}
