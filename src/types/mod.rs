mod api;
mod chat;

pub use api::{ChatCompletionChunk, ChatCompletionRequest, ChunkChoice, ChunkDelta, PromptMessage};
pub use chat::{Conversation, ConversationId, Message, Role};
