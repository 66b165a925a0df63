//! 传输层模块：对单个上游目标执行一次物理请求。
//!
//! # Transport
//!
//! The batching core never talks to the network directly. Each encoded call is
//! handed to an [`UpstreamTransport`] together with the forwarded headers and
//! the timeout derived from the callers' deadlines. [`HttpTransport`] is the
//! reqwest-backed implementation; tests substitute their own.

pub mod http;

pub use http::HttpTransport;

use crate::config::UpstreamConfig;
use crate::types::ForwardHeaders;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Correlation header attached to every physical call.
pub const CALL_ID_HEADER: &str = "x-batch-call-id";

/// One physical request against one upstream target.
#[derive(Debug, Clone)]
pub struct PhysicalCall<'a> {
    pub target: &'a UpstreamConfig,
    pub body: &'a Value,
    pub headers: &'a ForwardHeaders,
    /// `None` leaves the transport's own default in place.
    pub timeout: Option<Duration>,
    pub call_id: Uuid,
    /// Number of caller items answered by this call.
    pub item_count: usize,
}

#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Sends the call and returns the decoded JSON body of a successful response.
    async fn execute(&self, call: PhysicalCall<'_>) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("upstream responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream call timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Other(String),
}
