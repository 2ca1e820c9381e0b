use tokio::sync::Mutex as AsyncMutex;

/// Serializes tests that set or clear `LLM_CHAT_*` environment variables.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
