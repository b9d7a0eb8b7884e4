//! Streaming completion client.
//!
//! One invocation issues one HTTP POST to an OpenAI-compatible
//! `/v1/chat/completions` endpoint and yields an ordered, finite,
//! non-restartable sequence of text deltas. Any forwarder between this
//! client and the real inference engine is transparent as long as it speaks
//! the same protocol.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;

use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::observability;
use crate::sse::decode_deltas;
use crate::types::{ChatMessage, CompletionRequest};

/// An ordered, asynchronous sequence of assistant text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Issues one streaming completion request per invocation.
///
/// The trait seam lets the controller run against scripted delta sequences
/// in tests, without HTTP.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the outbound message list and returns the delta stream.
    ///
    /// A non-2xx response or a response without a readable streaming body
    /// fails before any delta is produced.
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream>;
}

/// HTTP implementation of [`CompletionClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: ReqwestClient,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl HttpCompletionClient {
    /// Creates a client from the resolved configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
        })
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers
    }

    /// Process a non-2xx response into our error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        parse_error_body(status_code, &body)
    }
}

/// A 2xx response that advertises an empty body can never produce a delta.
fn ensure_streaming_body(content_length: Option<u64>) -> Result<()> {
    if content_length == Some(0) {
        return Err(Error::protocol("response had no streaming body"));
    }
    Ok(())
}

/// Build an API error from a non-2xx response body.
///
/// The endpoint may answer with the OpenAI error shape
/// `{"error": {"message": ...}}`; anything else is carried verbatim.
fn parse_error_body(status_code: u16, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                "completion request failed".to_string()
            } else {
                body.to_string()
            }
        });
    Error::api(status_code, message)
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream> {
        let mut request = CompletionRequest::new(self.model.clone(), messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        observability::CLIENT_REQUESTS.click();

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                observability::CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            observability::CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        if let Err(err) = ensure_streaming_body(response.content_length()) {
            observability::CLIENT_REQUEST_ERRORS.click();
            return Err(err);
        }

        Ok(Box::pin(decode_deltas(response.bytes_stream())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_with_openai_shape() {
        let err = parse_error_body(400, r#"{"error":{"message":"model not loaded"}}"#);
        assert_eq!(err.status_code(), Some(400));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn error_body_with_plain_text() {
        let err = parse_error_body(502, "bad gateway");
        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn empty_error_body_gets_a_message() {
        let err = parse_error_body(500, "");
        assert!(err.to_string().contains("completion request failed"));
    }

    #[test]
    fn empty_advertised_body_is_a_protocol_error() {
        assert!(ensure_streaming_body(None).is_ok());
        assert!(ensure_streaming_body(Some(128)).is_ok());
        let err = ensure_streaming_body(Some(0)).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.is_request_failure());
    }

    #[tokio::test]
    async fn non_2xx_response_becomes_api_error() {
        let response = http::Response::builder()
            .status(429)
            .body(r#"{"error":{"message":"rate limited"}}"#)
            .unwrap();
        let err =
            HttpCompletionClient::process_error_response(reqwest::Response::from(response)).await;
        assert_eq!(err.status_code(), Some(429));
        assert!(err.to_string().contains("rate limited"));
        assert!(err.is_request_failure());
    }

    #[test]
    fn client_builds_from_config() {
        let config = ChatConfig::new();
        let client = HttpCompletionClient::new(&config).unwrap();
        assert_eq!(client.model, config.model);
        assert_eq!(client.endpoint, config.endpoint);
    }
}
