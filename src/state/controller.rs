use super::store::ConversationStore;
use crate::api::logging::emit_error;
use crate::api::stream::token_stream;
use crate::api::CompletionBackend;
use crate::config::Settings;
use crate::storage::LocalStorage;
use crate::types::{ChatCompletionRequest, Conversation, ConversationId, Message, PromptMessage};
use anyhow::Result;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;

/// Progress of a running send, reported in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SendUpdate {
    /// The assistant message with everything streamed so far.
    Message {
        conversation_id: ConversationId,
        message: Message,
    },
    /// The stream ended. `error` is set when the request or the body failed.
    Finished {
        conversation_id: ConversationId,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, a send already running, or no such conversation.
    Skipped,
    Completed,
    Failed(String),
}

/// A send whose user message and assistant placeholder are already
/// committed; driving it streams the reply.
#[derive(Debug)]
pub struct PendingSend {
    conversation_id: ConversationId,
    assistant: Message,
    request: ChatCompletionRequest,
    persist_error: Option<anyhow::Error>,
}

impl PendingSend {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// First storage write that failed while the send was being started.
    /// Both messages are in memory either way.
    pub fn take_persist_error(&mut self) -> Option<anyhow::Error> {
        self.persist_error.take()
    }

    pub fn request(&self) -> &ChatCompletionRequest {
        &self.request
    }

    /// Opens the stream and reports each token as a full message update.
    /// Always ends with exactly one `Finished`.
    pub async fn drive<F>(self, backend: &dyn CompletionBackend, mut sink: F)
    where
        F: FnMut(SendUpdate),
    {
        let PendingSend {
            conversation_id,
            mut assistant,
            request,
            ..
        } = self;

        let outcome: Result<()> = async {
            let body = backend.open_stream(&request).await?;
            let mut tokens = Box::pin(token_stream(body));
            while let Some(token) = tokens.next().await {
                assistant.content.push_str(&token?);
                sink(SendUpdate::Message {
                    conversation_id,
                    message: assistant.clone(),
                });
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        let error = outcome.err().map(|error| {
            emit_error("chat completion failed", &error);
            format!("{error:#}")
        });
        sink(SendUpdate::Finished {
            conversation_id,
            error,
        });
    }
}

/// Owns the conversation store and the open/in-flight state of the chat
/// window. Storage and the completion backend are injected.
pub struct ChatController<S: LocalStorage> {
    store: ConversationStore<S>,
    backend: Arc<dyn CompletionBackend>,
    settings: Settings,
    open: Option<ConversationId>,
    in_flight: HashSet<ConversationId>,
}

impl<S: LocalStorage> ChatController<S> {
    pub fn new(
        store: ConversationStore<S>,
        backend: Arc<dyn CompletionBackend>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
            open: None,
            in_flight: HashSet::new(),
        }
    }

    pub fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        Arc::clone(&self.backend)
    }

    /// Swaps in new settings and the backend built from them. Sends already
    /// running keep the backend they started with.
    pub fn reconfigure(&mut self, settings: Settings, backend: Arc<dyn CompletionBackend>) {
        self.settings = settings;
        self.backend = backend;
    }

    pub fn open_conversation_id(&self) -> Option<ConversationId> {
        self.open
    }

    pub fn open_conversation(&self) -> Option<&Conversation> {
        self.open.and_then(|id| self.store.get(id))
    }

    pub fn open(&mut self, id: ConversationId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.open = Some(id);
        true
    }

    pub fn close_conversation(&mut self) {
        self.open = None;
    }

    pub fn create_conversation(&mut self) -> Result<ConversationId> {
        self.store.create(Utc::now())
    }

    /// Deleting the open conversation closes it first.
    pub fn delete_conversation(&mut self, id: ConversationId) -> Result<()> {
        if self.open == Some(id) {
            self.close_conversation();
        }
        self.store.delete(id)
    }

    pub fn update_title(&mut self, id: ConversationId, title: &str) -> Result<()> {
        self.store.rename(id, title)
    }

    pub fn is_in_flight(&self, id: ConversationId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Commits the user message and the empty assistant placeholder and
    /// returns the send to drive. `None` means the send was rejected and
    /// nothing changed. A failed write does not stop the send; it is carried
    /// on the returned `PendingSend`.
    pub fn begin_send(&mut self, id: ConversationId, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() || self.is_in_flight(id) || !self.store.contains(id) {
            return None;
        }

        let mut persist_error = self.store.commit_message(id, Message::user(text)).err();
        let prompt: Vec<PromptMessage> = self
            .store
            .get(id)
            .map(|conversation| conversation.messages.iter().map(PromptMessage::from).collect())
            .unwrap_or_default();

        let assistant = Message::assistant_placeholder();
        if let Err(error) = self.store.commit_message(id, assistant.clone()) {
            persist_error.get_or_insert(error);
        }
        self.in_flight.insert(id);

        Some(PendingSend {
            conversation_id: id,
            assistant,
            request: ChatCompletionRequest::streaming(self.settings.model_name.clone(), prompt),
            persist_error,
        })
    }

    /// Commits one update. Messages for deleted conversations are dropped.
    pub fn apply(&mut self, update: SendUpdate) -> Result<()> {
        match update {
            SendUpdate::Message {
                conversation_id,
                message,
            } => {
                if !self.store.contains(conversation_id) {
                    return Ok(());
                }
                self.store.commit_message(conversation_id, message)
            }
            SendUpdate::Finished {
                conversation_id, ..
            } => {
                self.in_flight.remove(&conversation_id);
                Ok(())
            }
        }
    }

    /// Runs a whole send inline: begin, stream, commit each token, finish.
    pub async fn send_message(&mut self, id: ConversationId, text: &str) -> Result<SendOutcome> {
        let Some(mut pending) = self.begin_send(id, text) else {
            return Ok(SendOutcome::Skipped);
        };

        let backend = Arc::clone(&self.backend);
        let mut commit_error = pending.take_persist_error();
        let mut failure = None;
        pending
            .drive(backend.as_ref(), |update| {
                if let SendUpdate::Finished {
                    error: Some(error), ..
                } = &update
                {
                    failure = Some(error.clone());
                }
                if let Err(error) = self.apply(update) {
                    commit_error.get_or_insert(error);
                }
            })
            .await;

        if let Some(error) = commit_error {
            return Err(error);
        }
        Ok(match failure {
            Some(error) => SendOutcome::Failed(error),
            None => SendOutcome::Completed,
        })
    }
}
