use super::logging::emit_debug_payload;
use crate::config::Settings;
use crate::types::ChatCompletionRequest;
use crate::util::{is_local_endpoint_url, join_endpoint};
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";
const MODELS_PATH: &str = "v1/models";

/// Opens streamed chat completions. The controller only talks to this seam,
/// so tests can swap the network for canned frames.
pub trait CompletionBackend: Send + Sync {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
    ) -> BoxFuture<'a, Result<ByteStream>>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ByteStream> {
        let request_url = join_endpoint(&self.api_url, CHAT_COMPLETIONS_PATH);
        let payload = serde_json::to_value(request).context("serializing chat request")?;
        emit_debug_payload(&request_url, &payload);

        let response = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    /// Model ids advertised by `GET {api_url}/v1/models`.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let request_url = join_endpoint(&self.api_url, MODELS_PATH);
        let body: Value = self
            .http
            .get(&request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;

        Ok(model_ids(&body))
    }
}

impl CompletionBackend for ApiClient {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
    ) -> BoxFuture<'a, Result<ByteStream>> {
        Box::pin(self.create_stream(request))
    }
}

fn model_ids(body: &Value) -> Vec<String> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local API endpoint '{}': {}. Start your local server or update the API URL in settings.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach API endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("API request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "API endpoint '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    if error.is_decode() {
        return anyhow!(
            "API endpoint '{}' returned an unreadable body: {}",
            request_url,
            error
        );
    }
    anyhow!("API request to '{}' failed: {}", request_url, error)
}
