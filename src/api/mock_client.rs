use super::client::{ByteStream, CompletionBackend};
use crate::types::ChatCompletionRequest;
use anyhow::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Scripted response for one `open_stream` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Body chunks, delivered as-is.
    Chunks(Vec<String>),
    /// Body chunks followed by a transport error.
    ChunksThenError(Vec<String>, String),
    /// The request itself fails (bad status, refused connection).
    Fail(String),
}

/// In-memory `CompletionBackend` that replays scripted responses and records
/// every request it receives.
#[derive(Clone, Default)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builds one streamed reply from token texts, framed as `data:` lines and
    /// closed with `[DONE]`.
    pub fn tokens(tokens: &[&str]) -> MockResponse {
        let mut chunks: Vec<String> = tokens.iter().map(|token| data_frame(token)).collect();
        chunks.push("data: [DONE]\n".to_string());
        MockResponse::Chunks(chunks)
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub fn data_frame(token: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": token } }] })
    )
}

fn into_body(chunks: Vec<String>, trailing_error: Option<String>) -> ByteStream {
    let mut items: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
    if let Some(message) = trailing_error {
        items.push(Err(anyhow::anyhow!(message)));
    }
    Box::pin(stream::iter(items))
}

impl CompletionBackend for MockApiClient {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
    ) -> BoxFuture<'a, Result<ByteStream>> {
        Box::pin(async move {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }

            let next = {
                let mut responses = self
                    .responses
                    .lock()
                    .map_err(|_| anyhow::anyhow!("MockApiClient: response queue poisoned"))?;
                if responses.is_empty() {
                    None
                } else {
                    Some(responses.remove(0))
                }
            };

            match next {
                Some(MockResponse::Chunks(chunks)) => Ok(into_body(chunks, None)),
                Some(MockResponse::ChunksThenError(chunks, message)) => {
                    Ok(into_body(chunks, Some(message)))
                }
                Some(MockResponse::Fail(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!(
                    "MockApiClient: No more responses configured"
                )),
            }
        })
    }
}
