use crate::util::{parse_bool_flag, truncate_chars};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/llm-chat.log";
const DEBUG_ENV: &str = "LLM_CHAT_DEBUG";
const LOG_PATH_ENV: &str = "LLM_CHAT_LOG_PATH";
const MAX_LOGGED_FRAME_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Error => "ERROR",
        }
    }
}

pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    if !debug_enabled() {
        return;
    }
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    emit(
        Level::Debug,
        &format!("request url={request_url}\npayload:\n{formatted_payload}"),
    );
}

/// Malformed `data:` frames are skipped by the parser; this leaves a trace of them.
pub fn emit_sse_parse_error(payload: &str, parse_error: &serde_json::Error) {
    if !debug_enabled() {
        return;
    }
    emit(
        Level::Debug,
        &format!(
            "sse_frame_skipped error={parse_error}\ndata:\n{}",
            truncate_chars(payload, MAX_LOGGED_FRAME_CHARS)
        ),
    );
}

/// The body ended in the middle of a line; that partial line is dropped.
pub fn emit_sse_discarded_tail(tail: &str) {
    if !debug_enabled() {
        return;
    }
    emit(
        Level::Debug,
        &format!(
            "sse_tail_discarded\ndata:\n{}",
            truncate_chars(tail, MAX_LOGGED_FRAME_CHARS)
        ),
    );
}

pub fn emit_error(context: &str, error: &anyhow::Error) {
    emit(Level::Error, &format!("{context}: {error:#}"));
}

fn emit(level: Level, body: &str) {
    let message = format_record(level, body);
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, &message).is_ok() {
            return;
        }
    }

    eprint!("{message}");
}

fn format_record(level: Level, body: &str) -> String {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    format!("{timestamp} LLM_CHAT {} {body}\n", level.label())
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            // The TUI owns the terminal; writing to it would corrupt the frame.
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
