pub mod controller;
pub mod reducer;
pub mod store;

pub use controller::{ChatController, PendingSend, SendOutcome, SendUpdate};
pub use store::{ConversationStore, CHATS_KEY};
