//! Pure transitions over the conversation list.
//!
//! Every function takes the previous list by value and returns the next one,
//! so back-to-back commits in the same tick compose without lost updates.

use crate::types::{Conversation, ConversationId, Message};

pub fn prepend_conversation(
    conversations: Vec<Conversation>,
    conversation: Conversation,
) -> Vec<Conversation> {
    let mut next = Vec::with_capacity(conversations.len() + 1);
    next.push(conversation);
    next.extend(conversations);
    next
}

pub fn remove_conversation(
    conversations: Vec<Conversation>,
    id: ConversationId,
) -> Vec<Conversation> {
    conversations.into_iter().filter(|c| c.id != id).collect()
}

pub fn rename_conversation(
    conversations: Vec<Conversation>,
    id: ConversationId,
    title: &str,
) -> Vec<Conversation> {
    conversations
        .into_iter()
        .map(|mut c| {
            if c.id == id {
                c.title = title.to_string();
            }
            c
        })
        .collect()
}

/// Replaces the message with the same id in place, or appends it.
/// Unknown conversation ids leave the list untouched.
pub fn upsert_message(
    conversations: Vec<Conversation>,
    id: ConversationId,
    message: Message,
) -> Vec<Conversation> {
    let mut message = Some(message);
    conversations
        .into_iter()
        .map(|mut c| {
            if c.id != id {
                return c;
            }
            let Some(message) = message.take() else {
                return c;
            };
            match c.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message,
                None => c.messages.push(message),
            }
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::Utc;

    fn conversation(id: ConversationId) -> Conversation {
        Conversation::new(id, Utc::now())
    }

    #[test]
    fn test_upsert_same_id_replaces_in_place() {
        let first = Message::user("first");
        let mut placeholder = Message::assistant_placeholder();
        let last = Message::user("last");

        let mut list = vec![conversation(1)];
        list = upsert_message(list, 1, first.clone());
        list = upsert_message(list, 1, placeholder.clone());
        list = upsert_message(list, 1, last.clone());

        placeholder.content = "streamed".into();
        list = upsert_message(list, 1, placeholder.clone());

        let messages = &list[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], first);
        assert_eq!(messages[1].id, placeholder.id);
        assert_eq!(messages[1].content, "streamed");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2], last);
    }

    #[test]
    fn test_upsert_for_missing_conversation_is_noop() {
        let list = vec![conversation(1)];
        let next = upsert_message(list.clone(), 2, Message::user("lost"));
        assert_eq!(next, list);
    }

    #[test]
    fn test_upsert_only_touches_target_conversation() {
        let list = vec![conversation(1), conversation(2)];
        let next = upsert_message(list, 2, Message::user("hi"));
        assert!(next[0].messages.is_empty());
        assert_eq!(next[1].messages.len(), 1);
    }

    #[test]
    fn test_prepend_puts_newest_first() {
        let list = prepend_conversation(vec![conversation(1)], conversation(2));
        let ids: Vec<_> = list.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_remove_and_rename() {
        let list = vec![conversation(1), conversation(2), conversation(3)];
        let list = remove_conversation(list, 2);
        let list = rename_conversation(list, 3, "Trip planning");

        let ids: Vec<_> = list.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(list[0].title, Conversation::DEFAULT_TITLE);
        assert_eq!(list[1].title, "Trip planning");
    }
}
