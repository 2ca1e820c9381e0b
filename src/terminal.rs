//! Full-screen terminal session for the chat UI.
//!
//! A `TerminalSession` owns raw mode, the alternate screen, bracketed paste
//! and the window title. Whichever of `restore`, `Drop` or the panic hook
//! runs first puts the terminal back; the others are no-ops.

use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::{backend::CrosstermBackend, layout::Size, Frame, Terminal};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

const APP_TITLE: &str = "llm-chat";

static PANIC_HOOK_INSTALLED: Once = Once::new();
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn window_title(screen_title: &str) -> String {
    let screen_title = screen_title.trim();
    if screen_title.is_empty() {
        APP_TITLE.to_string()
    } else {
        format!("{screen_title} · {APP_TITLE}")
    }
}

fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            restore_if_active();
            original_hook(panic_info);
        }));
    });
}

fn write_enter_sequence<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, EnterAlternateScreen, EnableBracketedPaste)
}

fn write_leave_sequence<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, DisableBracketedPaste, LeaveAlternateScreen, Show)
}

/// Leaves raw mode and the alternate screen if a session is still active.
/// Every step runs even if an earlier one fails.
pub fn restore_if_active() -> bool {
    if !SESSION_ACTIVE.swap(false, Ordering::SeqCst) {
        return false;
    }
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, SetTitle(""));
    let _ = write_leave_sequence(&mut stdout);
    true
}

pub struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: Option<String>,
}

impl TerminalSession {
    pub fn enter() -> anyhow::Result<Self> {
        install_panic_hook_once();

        enable_raw_mode()?;
        SESSION_ACTIVE.store(true, Ordering::SeqCst);
        // From here on a failed step still leaves the terminal usable.
        let session = (|| -> anyhow::Result<Self> {
            write_enter_sequence(&mut io::stdout())?;
            let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
            terminal.clear()?;
            Ok(Self {
                terminal,
                title: None,
            })
        })();
        if session.is_err() {
            restore_if_active();
        }
        session
    }

    pub fn size(&self) -> anyhow::Result<Size> {
        Ok(self.terminal.size()?)
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame<'_>)) -> anyhow::Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Updates the window title; writes only when it changed.
    pub fn set_title(&mut self, title: &str) -> anyhow::Result<()> {
        if self.title.as_deref() == Some(title) {
            return Ok(());
        }
        execute!(self.terminal.backend_mut(), SetTitle(title))?;
        self.title = Some(title.to_string());
        Ok(())
    }

    pub fn restore(&mut self) {
        if restore_if_active() {
            self.title = None;
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_title_names_the_screen() {
        assert_eq!(window_title("Chats"), "Chats · llm-chat");
        assert_eq!(window_title("  "), "llm-chat");
    }

    #[test]
    fn test_leave_sequence_undoes_enter_sequence() {
        let mut enter = Vec::new();
        write_enter_sequence(&mut enter).expect("enter");
        let enter = String::from_utf8(enter).expect("utf8");
        assert!(enter.contains("\x1b[?1049h"));
        assert!(enter.contains("\x1b[?2004h"));

        let mut leave = Vec::new();
        write_leave_sequence(&mut leave).expect("leave");
        let leave = String::from_utf8(leave).expect("utf8");
        assert!(leave.contains("\x1b[?2004l"));
        assert!(leave.contains("\x1b[?1049l"));
        assert!(leave.contains("\x1b[?25h"));
    }

    #[test]
    fn test_restore_without_session_is_a_no_op() {
        install_panic_hook_once();
        assert!(PANIC_HOOK_INSTALLED.is_completed());
        assert!(!restore_if_active());
        assert!(!restore_if_active());
    }
}
