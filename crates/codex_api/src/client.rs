use std::collections::VecDeque;
use std::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::CodexApiConfig;
use crate::error::{parse_error_message, CodexApiError};
use crate::events::ResponsesEvent;
use crate::headers::build_headers;
use crate::payload::ResponsesRequest;
use crate::sse::SseDecoder;
use crate::url::responses_endpoint;

#[derive(Debug)]
pub struct CodexApiClient {
    http: Client,
    config: CodexApiConfig,
    endpoint: String,
}

impl CodexApiClient {
    pub fn new(config: CodexApiConfig) -> Result<Self, CodexApiError> {
        let endpoint = responses_endpoint(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CodexApiError::from)?;
        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &CodexApiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_headers(&self) -> Result<HeaderMap, CodexApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| CodexApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    CodexApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ResponsesRequest,
    ) -> Result<reqwest::RequestBuilder, CodexApiError> {
        let headers = self.build_headers()?;
        Ok(self.http.post(&self.endpoint).headers(headers).json(request))
    }

    /// Sends `request` and returns the decoded event stream of a successful response.
    ///
    /// Non-success statuses become [`CodexApiError::Status`] with the parsed
    /// error message; an explicitly empty body becomes [`CodexApiError::MissingBody`].
    pub async fn open_stream(
        &self,
        request: &ResponsesRequest,
        cancellation: Option<&CancellationToken>,
    ) -> Result<ResponseEventStream, CodexApiError> {
        if is_cancelled(cancellation) {
            return Err(CodexApiError::Cancelled);
        }

        tracing::debug!(endpoint = %self.endpoint, entries = request.input.len(), "sending responses request");
        let response = await_or_cancel(self.build_request(request)?.send(), cancellation)
            .await?
            .map_err(CodexApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            return Err(CodexApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        if response.content_length() == Some(0) {
            return Err(CodexApiError::MissingBody);
        }

        Ok(ResponseEventStream::new(response.bytes_stream().boxed()))
    }
}

/// Pull-based decoder over a streaming response body.
pub struct ResponseEventStream {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Value>,
}

impl ResponseEventStream {
    pub fn new(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            bytes,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
        }
    }

    /// Next normalized event, or `None` once the body is exhausted.
    ///
    /// Reads more bytes only when no decoded record is pending.
    pub async fn next_event(
        &mut self,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<ResponsesEvent>, CodexApiError> {
        loop {
            if let Some(value) = self.pending.pop_front() {
                if let Some(event) = ResponsesEvent::from_value(value) {
                    return Ok(Some(event));
                }
                continue;
            }

            let Some(chunk) = await_or_cancel(self.bytes.next(), cancellation).await? else {
                return Ok(None);
            };
            let chunk = chunk.map_err(CodexApiError::from)?;
            self.pending.extend(self.decoder.feed(&chunk));
        }
    }
}

fn is_cancelled(cancellation: Option<&CancellationToken>) -> bool {
    cancellation.is_some_and(CancellationToken::is_cancelled)
}

/// Races `future` against the cancellation token; cancellation wins ties.
async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationToken>,
) -> Result<F::Output, CodexApiError>
where
    F: Future,
{
    let Some(token) = cancellation else {
        return Ok(future.await);
    };
    if token.is_cancelled() {
        return Err(CodexApiError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CodexApiError::Cancelled),
        output = future => Ok(output),
    }
}
