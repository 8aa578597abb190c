//! Transport-only client primitives for a streaming `responses` endpoint.
//!
//! This crate owns request building, SSE decoding, and event normalization.
//! It knows nothing about threads, history, or the bridge's event vocabulary;
//! the HTTP transport layers those on top.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CodexApiClient, ResponseEventStream};
pub use config::{CodexApiConfig, DEFAULT_ORIGINATOR, ORIGINATOR_OVERRIDE_ENV};
pub use error::CodexApiError;
pub use events::{OutputItem, ResponseUsage, ResponsesEvent};
pub use payload::{ContentPart, InputEntry, OutputFormat, ResponsesRequest};
pub use sse::SseDecoder;
pub use reqwest::StatusCode;
pub use url::responses_endpoint;
