use super::reducer;
use crate::storage::LocalStorage;
use crate::types::{Conversation, ConversationId, Message};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub const CHATS_KEY: &str = "chats";

/// Ordered conversation list mirrored to local storage after every mutation.
pub struct ConversationStore<S: LocalStorage> {
    storage: S,
    conversations: Vec<Conversation>,
}

impl<S: LocalStorage> ConversationStore<S> {
    /// Missing or unreadable stored data starts an empty list.
    pub fn load(storage: S) -> Self {
        let conversations = storage
            .load(CHATS_KEY)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        Self {
            storage,
            conversations,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ConversationId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Applies `f` to the current list and persists the result. The in-memory
    /// list is updated even if the write fails.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(Vec<Conversation>) -> Vec<Conversation>,
    {
        let previous = std::mem::take(&mut self.conversations);
        self.conversations = f(previous);
        self.persist()
    }

    /// Creates a conversation stamped with `now` and prepends it.
    pub fn create(&mut self, now: DateTime<Utc>) -> Result<ConversationId> {
        let mut id = now.timestamp_millis();
        while self.contains(id) {
            id += 1;
        }
        let conversation = Conversation::new(id, now);
        self.update(|list| reducer::prepend_conversation(list, conversation))?;
        Ok(id)
    }

    pub fn delete(&mut self, id: ConversationId) -> Result<()> {
        self.update(|list| reducer::remove_conversation(list, id))
    }

    pub fn rename(&mut self, id: ConversationId, title: &str) -> Result<()> {
        self.update(|list| reducer::rename_conversation(list, id, title))
    }

    pub fn commit_message(&mut self, id: ConversationId, message: Message) -> Result<()> {
        self.update(|list| reducer::upsert_message(list, id, message))
    }

    fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.conversations)?;
        self.storage
            .save(CHATS_KEY, &value)
            .context("saving conversations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_load_with_garbage_starts_empty() {
        let storage = MemoryStorage::with_value(CHATS_KEY, json!({ "chats": "nope" }));
        let store = ConversationStore::load(storage);
        assert!(store.is_empty());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = MemoryStorage::new();
        let mut store = ConversationStore::load(&storage);

        let id = store.create(Utc::now()).expect("create");
        assert_eq!(storage.load(CHATS_KEY).expect("saved")[0]["id"], json!(id));

        store.rename(id, "Renamed").expect("rename");
        assert_eq!(
            storage.load(CHATS_KEY).expect("saved")[0]["title"],
            json!("Renamed")
        );

        store.delete(id).expect("delete");
        assert_eq!(storage.load(CHATS_KEY), Some(json!([])));
    }

    #[test]
    fn test_create_avoids_id_collision() {
        let mut store = ConversationStore::load(MemoryStorage::new());
        let now = Utc::now();
        let first = store.create(now).expect("first");
        let second = store.create(now).expect("second");

        assert_ne!(first, second);
        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.conversations()[0].title, "New chat");
    }
}
