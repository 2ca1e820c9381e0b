use crate::api::logging::emit_error;
use crate::api::ApiClient;
use crate::config::{Config, Settings};
use crate::state::{ChatController, ConversationStore, SendOutcome, SendUpdate};
use crate::storage::FileStorage;
use crate::terminal::{window_title, TerminalSession};
use crate::types::ConversationId;
use crate::ui::editor::{EditorAction, InputEditor};
use crate::ui::layout::{split_chat_layout, ChatLayout};
use crate::ui::render::{
    chat_list_lines, conversation_lines, input_visual_rows, render_header, render_input,
    render_lines, render_status_line, scroll_offset, settings_lines, SettingsView,
};
use crate::ui::segments::{split_segments, SegmentKind};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::text::Line;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TUI_TICK_INTERVAL: Duration = Duration::from_millis(50);
const MAX_INPUT_ROWS: usize = 6;
const ROWS_PER_LIST_ENTRY: usize = 3;
const MODELS_UNAVAILABLE: &str = "Unable to get available models. Check API URL.";
const BUSY_NOTICE: &str = "Wait for the reply to finish first.";

/// Results of background work, delivered back to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Send(SendUpdate),
    Models {
        api_url: String,
        result: std::result::Result<Vec<String>, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    ChatList,
    ChatWindow,
    Settings,
}

struct SettingsForm {
    url: InputEditor,
    url_focused: bool,
    models: Vec<String>,
    selected: Option<usize>,
    loading: bool,
}

impl SettingsForm {
    fn new(settings: &Settings) -> Self {
        Self {
            url: InputEditor::with_text(&settings.api_url),
            url_focused: true,
            models: Vec::new(),
            selected: None,
            loading: false,
        }
    }
}

/// Everything one frame needs, computed before the terminal is borrowed.
struct FrameView {
    layout: ChatLayout,
    title: String,
    hint: String,
    body: Vec<Line<'static>>,
    body_top: usize,
    status: String,
    input: Option<(String, usize)>,
}

pub struct App {
    controller: ChatController<Arc<FileStorage>>,
    storage: Arc<FileStorage>,
    session: Option<TerminalSession>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    screen: Screen,
    selected: usize,
    input: InputEditor,
    title_edit: Option<InputEditor>,
    settings_form: SettingsForm,
    show_reasoning: bool,
    scroll_from_bottom: usize,
    body_rows: usize,
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let session = if io::stdin().is_terminal() && io::stdout().is_terminal() {
            Some(TerminalSession::enter()?)
        } else {
            None
        };
        Ok(Self::with_session(config, session))
    }

    fn with_session(config: Config, session: Option<TerminalSession>) -> Self {
        let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
        let store = ConversationStore::load(Arc::clone(&storage));
        let backend = Arc::new(ApiClient::new(&config.settings));
        let settings_form = SettingsForm::new(&config.settings);
        let controller = ChatController::new(store, backend, config.settings);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            controller,
            storage,
            session,
            events_tx,
            events_rx,
            screen: Screen::ChatList,
            selected: 0,
            input: InputEditor::multiline(),
            title_edit: None,
            settings_form,
            show_reasoning: false,
            scroll_from_bottom: 0,
            body_rows: 0,
            notice: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        if self.session.is_none() {
            return self.run_piped().await;
        }
        let result = self.run_tui().await;
        // Leave the alternate screen before the caller prints any error.
        if let Some(session) = self.session.as_mut() {
            session.restore();
        }
        result
    }

    /// Without a terminal every stdin line is sent to one new chat and the
    /// answer text is printed once the reply finishes.
    async fn run_piped(&mut self) -> Result<()> {
        let lines = io::stdin().lines().collect::<io::Result<Vec<String>>>()?;
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Ok(());
        }

        let id = self.controller.create_conversation()?;
        let mut stdout = io::stdout();
        for line in lines {
            match self.controller.send_message(id, &line).await? {
                SendOutcome::Skipped => continue,
                SendOutcome::Completed => {
                    writeln!(stdout, "{}", self.last_answer(id))?;
                }
                SendOutcome::Failed(error) => {
                    eprintln!("error: {error}");
                }
            }
            stdout.flush()?;
        }
        Ok(())
    }

    fn last_answer(&self, id: ConversationId) -> String {
        let Some(message) = self
            .controller
            .store()
            .get(id)
            .and_then(|conversation| conversation.messages.last())
        else {
            return String::new();
        };
        split_segments(&message.content)
            .into_iter()
            .filter(|segment| segment.kind == SegmentKind::Answer)
            .map(|segment| segment.display_text())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn run_tui(&mut self) -> Result<()> {
        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame()?;
            self.process_terminal_events()?;

            tokio::select! {
                _ = tick.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
                event = self.events_rx.recv() => {
                    if let Some(event) = event {
                        self.handle_app_event(event);
                    }
                }
            }
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_app_event(event);
            }
        }
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let Some(size) = self.session.as_ref().map(TerminalSession::size).transpose()? else {
            return Ok(());
        };
        let view = self.frame_view(Rect::new(0, 0, size.width, size.height));
        self.body_rows = view.layout.body.height as usize;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.set_title(&window_title(&view.title))?;
        session.draw(|frame| {
            render_header(frame, view.layout.header, &view.title, &view.hint);
            render_lines(frame, view.layout.body, view.body.clone(), view.body_top);
            render_status_line(frame, view.layout.status, &view.status);
            if let Some((text, cursor)) = &view.input {
                render_input(frame, view.layout.input, text, *cursor);
            }
        })?;
        Ok(())
    }

    fn frame_view(&self, area: Rect) -> FrameView {
        let width = area.width as usize;
        let active_editor = self.active_editor();
        let input_rows = active_editor
            .map(|editor| input_visual_rows(editor.buffer(), width).clamp(1, MAX_INPUT_ROWS))
            .unwrap_or(0);
        let layout = split_chat_layout(area, input_rows as u16);
        let body_width = layout.body.width as usize;
        let visible = layout.body.height as usize;

        let (title, hint, body, body_top) = match self.screen {
            Screen::ChatList => {
                let conversations = self.controller.conversations();
                let body = chat_list_lines(conversations, self.selected, body_width);
                let selected_end = (self.selected + 1) * ROWS_PER_LIST_ENTRY;
                (
                    format!("Chats • {}", conversations.len()),
                    "n new · s settings · q quit".to_string(),
                    body,
                    selected_end.saturating_sub(visible),
                )
            }
            Screen::ChatWindow => {
                let (title, messages) = match self.controller.open_conversation() {
                    Some(conversation) => (conversation.title.clone(), &conversation.messages[..]),
                    None => (String::new(), &[][..]),
                };
                let body = conversation_lines(messages, self.show_reasoning, body_width);
                let top = scroll_offset(body.len(), visible, self.scroll_from_bottom);
                let title = if self.title_edit.is_some() {
                    "Rename chat".to_string()
                } else {
                    title
                };
                (title, "Esc back".to_string(), body, top)
            }
            Screen::Settings => {
                let form = &self.settings_form;
                let view = SettingsView {
                    api_url: form.url.buffer(),
                    url_focused: form.url_focused,
                    models: &form.models,
                    selected_model: form.selected,
                    current_model: &self.controller.settings().model_name,
                    loading_models: form.loading,
                };
                (
                    "Settings".to_string(),
                    "Esc back".to_string(),
                    settings_lines(&view, body_width),
                    0,
                )
            }
        };

        FrameView {
            layout,
            title,
            hint,
            body,
            body_top,
            status: self.status_text(),
            input: active_editor.map(|editor| (editor.buffer().to_string(), editor.cursor())),
        }
    }

    fn open_chat_busy(&self) -> bool {
        self.controller
            .open_conversation_id()
            .is_some_and(|id| self.controller.is_in_flight(id))
    }

    fn active_editor(&self) -> Option<&InputEditor> {
        match self.screen {
            Screen::ChatList => None,
            Screen::ChatWindow => Some(self.title_edit.as_ref().unwrap_or(&self.input)),
            Screen::Settings => self
                .settings_form
                .url_focused
                .then_some(&self.settings_form.url),
        }
    }

    fn status_text(&self) -> String {
        if let Some(notice) = &self.notice {
            return notice.clone();
        }
        if self.screen == Screen::ChatWindow && self.open_chat_busy() {
            return "Streaming...".to_string();
        }
        match self.screen {
            Screen::ChatList => "↑/↓ select · Enter open · d delete".to_string(),
            Screen::ChatWindow if self.title_edit.is_some() => {
                "Enter save · Esc cancel".to_string()
            }
            Screen::ChatWindow => {
                "Enter send · Shift+Enter newline · Ctrl+T rename · Ctrl+D delete · Ctrl+O thoughts"
                    .to_string()
            }
            Screen::Settings => {
                "Tab switch field · Enter save · r reload models".to_string()
            }
        }
    }

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Paste(text) => self.process_paste(&text),
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    self.handle_key(key);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_paste(&mut self, text: &str) {
        if let Some(editor) = self.active_editor_mut() {
            editor.insert_str(text);
        }
    }

    fn active_editor_mut(&mut self) -> Option<&mut InputEditor> {
        match self.screen {
            Screen::ChatList => None,
            Screen::ChatWindow if self.title_edit.is_none() && self.open_chat_busy() => None,
            Screen::ChatWindow => Some(self.title_edit.as_mut().unwrap_or(&mut self.input)),
            Screen::Settings if self.settings_form.url_focused => Some(&mut self.settings_form.url),
            Screen::Settings => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        self.notice = None;
        match self.screen {
            Screen::ChatList => self.handle_list_key(key),
            Screen::ChatWindow if self.title_edit.is_some() => self.handle_title_key(key),
            Screen::ChatWindow => self.handle_chat_key(key),
            Screen::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let count = self.controller.conversations().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyCode::Char('n') => match self.controller.create_conversation() {
                Ok(_) => self.selected = 0,
                Err(error) => self.report("saving chats failed", &error),
            },
            KeyCode::Enter | KeyCode::Char('o') => {
                if let Some(id) = self.selected_id() {
                    self.open_chat(id);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    if let Err(error) = self.controller.delete_conversation(id) {
                        self.report("saving chats failed", &error);
                    }
                    self.clamp_selection();
                }
            }
            KeyCode::Char('s') => self.open_settings(),
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        let Some(id) = self.controller.open_conversation_id() else {
            self.screen = Screen::ChatList;
            return;
        };
        let busy = self.controller.is_in_flight(id);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let page = self.body_rows.saturating_sub(1).max(1);

        match key.code {
            KeyCode::Esc if busy => self.notice = Some(BUSY_NOTICE.to_string()),
            KeyCode::Esc => {
                self.controller.close_conversation();
                self.screen = Screen::ChatList;
            }
            KeyCode::Char('d') if ctrl => {
                if busy {
                    self.notice = Some(BUSY_NOTICE.to_string());
                    return;
                }
                if let Err(error) = self.controller.delete_conversation(id) {
                    self.report("saving chats failed", &error);
                }
                self.screen = Screen::ChatList;
                self.clamp_selection();
            }
            KeyCode::Char('t') if ctrl => {
                if busy {
                    self.notice = Some(BUSY_NOTICE.to_string());
                    return;
                }
                let title = self
                    .controller
                    .open_conversation()
                    .map(|conversation| conversation.title.clone())
                    .unwrap_or_default();
                self.title_edit = Some(InputEditor::with_text(&title));
            }
            KeyCode::Char('o') if ctrl => self.show_reasoning = !self.show_reasoning,
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(page);
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(page);
            }
            KeyCode::Enter if busy => self.notice = Some(BUSY_NOTICE.to_string()),
            _ if busy => {}
            _ => {
                if let EditorAction::Submit(text) = self.input.apply_key(key) {
                    self.start_send(id, &text);
                }
            }
        }
    }

    fn handle_title_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.title_edit.as_mut() else {
            return;
        };
        match editor.apply_key(key) {
            EditorAction::Submit(title) => {
                self.title_edit = None;
                if let Some(id) = self.controller.open_conversation_id() {
                    if let Err(error) = self.controller.update_title(id, &title) {
                        self.report("saving chats failed", &error);
                    }
                }
            }
            EditorAction::Cancel => self.title_edit = None,
            EditorAction::None | EditorAction::Changed => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Tab || key.code == KeyCode::BackTab {
            self.settings_form.url_focused = !self.settings_form.url_focused;
            return;
        }

        if self.settings_form.url_focused {
            match self.settings_form.url.apply_key(key) {
                EditorAction::Submit(url) => {
                    let url = url.trim();
                    self.settings_form.url.set_text(url);
                    self.save_api_url(url);
                }
                EditorAction::Cancel => self.screen = Screen::ChatList,
                EditorAction::None | EditorAction::Changed => {}
            }
            return;
        }

        let count = self.settings_form.models.len();
        match key.code {
            KeyCode::Esc => self.screen = Screen::ChatList,
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_form.selected = match self.settings_form.selected {
                    Some(index) => Some(index.saturating_sub(1)),
                    None if count > 0 => Some(0),
                    None => None,
                };
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_form.selected = match self.settings_form.selected {
                    Some(index) if index + 1 < count => Some(index + 1),
                    Some(index) => Some(index),
                    None if count > 0 => Some(0),
                    None => None,
                };
            }
            KeyCode::Enter => {
                let Some(model) = self
                    .settings_form
                    .selected
                    .and_then(|index| self.settings_form.models.get(index))
                    .cloned()
                else {
                    return;
                };
                let mut settings = self.controller.settings().clone();
                settings.model_name = model;
                self.apply_settings(settings);
            }
            KeyCode::Char('r') => self.fetch_models(),
            _ => {}
        }
    }

    fn open_chat(&mut self, id: ConversationId) {
        if self.controller.open(id) {
            self.screen = Screen::ChatWindow;
            self.input.clear();
            self.title_edit = None;
            self.scroll_from_bottom = 0;
        }
    }

    fn open_settings(&mut self) {
        self.settings_form.url.set_text(&self.controller.settings().api_url);
        self.settings_form.url_focused = true;
        self.screen = Screen::Settings;
        if self.settings_form.models.is_empty() && !self.settings_form.loading {
            self.fetch_models();
        }
    }

    fn save_api_url(&mut self, url: &str) {
        if url == self.controller.settings().api_url {
            return;
        }
        let mut settings = self.controller.settings().clone();
        settings.api_url = url.to_string();
        if let Err(error) = settings.validate() {
            self.notice = Some(format!("{error:#}"));
            return;
        }
        self.apply_settings(settings);
        self.settings_form.models.clear();
        self.settings_form.selected = None;
        self.fetch_models();
    }

    fn apply_settings(&mut self, settings: Settings) {
        if let Err(error) = settings.save(self.storage.as_ref()) {
            self.report("saving settings failed", &error);
        }
        let backend = Arc::new(ApiClient::new(&settings));
        self.controller.reconfigure(settings, backend);
    }

    fn fetch_models(&mut self) {
        self.settings_form.loading = true;
        let client = ApiClient::new(self.controller.settings());
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let api_url = client.api_url().to_string();
            let result = client.list_models().await.map_err(|error| {
                emit_error("listing models failed", &error);
                format!("{error:#}")
            });
            let _ = events_tx.send(AppEvent::Models { api_url, result });
        });
    }

    fn start_send(&mut self, id: ConversationId, text: &str) {
        let Some(mut pending) = self.controller.begin_send(id, text) else {
            return;
        };
        if let Some(error) = pending.take_persist_error() {
            self.report("saving chats failed", &error);
        }
        self.scroll_from_bottom = 0;

        let backend = self.controller.backend();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            pending
                .drive(backend.as_ref(), |update| {
                    let _ = events_tx.send(AppEvent::Send(update));
                })
                .await;
        });
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Send(update) => {
                if let SendUpdate::Finished {
                    error: Some(error), ..
                } = &update
                {
                    self.notice = Some(format!("Request failed: {error}"));
                }
                if let Err(error) = self.controller.apply(update) {
                    self.report("saving chats failed", &error);
                }
            }
            AppEvent::Models { api_url, result } => {
                if api_url != self.controller.settings().api_url {
                    return;
                }
                self.settings_form.loading = false;
                match result {
                    Ok(models) => {
                        let current = &self.controller.settings().model_name;
                        self.settings_form.selected =
                            models.iter().position(|model| model == current);
                        self.settings_form.models = models;
                    }
                    Err(_) => {
                        self.settings_form.models.clear();
                        self.settings_form.selected = None;
                        self.notice = Some(MODELS_UNAVAILABLE.to_string());
                    }
                }
            }
        }
    }

    fn selected_id(&self) -> Option<ConversationId> {
        self.controller
            .conversations()
            .get(self.selected)
            .map(|conversation| conversation.id)
    }

    fn clamp_selection(&mut self) {
        let count = self.controller.conversations().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn report(&mut self, context: &str, error: &anyhow::Error) {
        emit_error(context, error);
        self.notice = Some(format!("{context}: {error:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn app(temp: &TempDir) -> App {
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            settings: Settings {
                api_url: "http://127.0.0.1:9".to_string(),
                model_name: "m".to_string(),
            },
        };
        App::with_session(config, None)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn test_new_chat_opens_and_renames() {
        let temp = TempDir::new().expect("temp dir");
        let mut app = app(&temp);

        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.controller.conversations().len(), 1);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::ChatWindow);

        app.handle_key(ctrl('t'));
        assert_eq!(app.active_editor().map(InputEditor::buffer), Some("New chat"));
        app.handle_key(ctrl('u'));
        type_text(&mut app, "Recipes");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.title_edit.is_none());
        assert_eq!(app.controller.conversations()[0].title, "Recipes");

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::ChatList);
        assert!(app.controller.open_conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_close_is_blocked_until_send_finishes() {
        let temp = TempDir::new().expect("temp dir");
        let mut app = app(&temp);
        app.handle_key(key(KeyCode::Char('n')));
        app.handle_key(key(KeyCode::Enter));

        type_text(&mut app, "hello");
        app.handle_key(key(KeyCode::Enter));
        let id = app.controller.open_conversation_id().expect("open chat");
        assert!(app.controller.is_in_flight(id));
        assert_eq!(app.status_text(), "Streaming...");

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::ChatWindow);
        assert_eq!(app.status_text(), BUSY_NOTICE);

        type_text(&mut app, "typed while busy");
        app.process_paste("pasted");
        assert!(app.input.is_empty());
        assert_eq!(app.status_text(), "Streaming...");

        app.handle_key(ctrl('o'));
        assert!(app.show_reasoning);

        while app.controller.is_in_flight(id) {
            let event = app.events_rx.recv().await.expect("send event");
            app.handle_app_event(event);
        }
        assert!(app
            .notice
            .as_deref()
            .is_some_and(|notice| notice.starts_with("Request failed")));

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::ChatList);
        let messages = &app.controller.conversations()[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn test_model_listing_failure_shows_notice() {
        let temp = TempDir::new().expect("temp dir");
        let mut app = app(&temp);
        app.settings_form.loading = true;

        app.handle_app_event(AppEvent::Models {
            api_url: "http://127.0.0.1:9".to_string(),
            result: Err("refused".to_string()),
        });

        assert!(!app.settings_form.loading);
        assert!(app.settings_form.models.is_empty());
        assert_eq!(app.notice.as_deref(), Some(MODELS_UNAVAILABLE));
    }

    #[test]
    fn test_model_listing_selects_current_model() {
        let temp = TempDir::new().expect("temp dir");
        let mut app = app(&temp);

        app.handle_app_event(AppEvent::Models {
            api_url: "http://127.0.0.1:9".to_string(),
            result: Ok(vec!["a".to_string(), "m".to_string()]),
        });
        assert_eq!(app.settings_form.selected, Some(1));

        app.handle_app_event(AppEvent::Models {
            api_url: "http://elsewhere:1234".to_string(),
            result: Ok(Vec::new()),
        });
        assert_eq!(app.settings_form.models.len(), 2);
    }

    #[test]
    fn test_choosing_model_persists_settings() {
        let temp = TempDir::new().expect("temp dir");
        let mut app = app(&temp);
        app.screen = Screen::Settings;
        app.settings_form.url_focused = false;
        app.settings_form.models = vec!["a".to_string(), "b".to_string()];
        app.settings_form.selected = Some(0);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.controller.settings().model_name, "b");
        let stored = Settings::load(&FileStorage::new(temp.path()));
        assert_eq!(stored.model_name, "b");
    }
}
