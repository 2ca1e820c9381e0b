use super::client::ByteStream;
use super::logging::{emit_sse_discarded_tail, emit_sse_parse_error};
use crate::types::ChatCompletionChunk;
use anyhow::Result;
use futures::{stream, Stream, StreamExt};
use std::collections::VecDeque;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token(String),
    Done,
}

/// Line-oriented parser for `data:` frames of a streamed chat completion.
///
/// Bytes are buffered until a `\n` arrives, so a multi-byte character split
/// across two chunks is decoded once both halves are present.
#[derive(Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
    done: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buffer.extend_from_slice(chunk);
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let line_end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..line_end]).into_owned();
            start = line_end + 1;

            match parse_line(&line) {
                Some(StreamEvent::Done) => {
                    self.done = true;
                    events.push(StreamEvent::Done);
                    self.buffer.clear();
                    return events;
                }
                Some(event) => events.push(event),
                None => {}
            }
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }

    /// Returns whatever unterminated text is still buffered.
    pub fn flush(&mut self) -> String {
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim_start();
    // Tolerate CRLF framing.
    let payload = payload.strip_suffix('\r').unwrap_or(payload);

    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => chunk
            .delta_text()
            .map(|text| StreamEvent::Token(text.to_string())),
        Err(error) => {
            emit_sse_parse_error(payload, &error);
            None
        }
    }
}

struct TokenState {
    body: ByteStream,
    parser: StreamParser,
    pending: VecDeque<String>,
    finished: bool,
}

/// Lazily turns a response body into the sequence of text deltas it carries.
///
/// The sequence ends at `[DONE]` or when the body ends, whichever comes
/// first. A transport error is yielded once and ends the sequence.
pub fn token_stream(body: ByteStream) -> impl Stream<Item = Result<String>> + Send {
    let state = TokenState {
        body,
        parser: StreamParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.pending.pop_front() {
                return Some((Ok(token), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for event in state.parser.process(&chunk) {
                        match event {
                            StreamEvent::Token(token) => state.pending.push_back(token),
                            StreamEvent::Done => state.finished = true,
                        }
                    }
                }
                Some(Err(error)) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    let tail = state.parser.flush();
                    if !tail.trim().is_empty() {
                        emit_sse_discarded_tail(&tail);
                    }
                }
            }
        }
    })
}
