//! 批处理策略模块：决定哪些上游请求可以共享同一个批次。
//!
//! # Batching Strategies
//!
//! A strategy supplies the partitioner's key, series and equality functions
//! from request context. Every strategy except [`BatchingStrategy::Indiscriminate`]
//! uses the operation kind as its series so a mutation between two queries
//! cannot pull the later query backwards into an earlier batch.
//!
//! | Strategy | Key | Equality | Effect |
//! |----------|-----|----------|--------|
//! | `ByInboundRequest` | request token | - | only sub-requests of the same inbound call batch together |
//! | `ByUpstreamHeaders` | header digest | exact header-list comparison | distinct calls with identical forwardable headers batch together |
//! | `Indiscriminate` | none | - | the whole window is one batch |
//!
//! ## Operator note
//!
//! `Indiscriminate` ignores caller identity and headers entirely. If the
//! upstream relies on forwarded headers for access control, callers can end up
//! sharing another caller's authorization context. Only enable it for
//! upstreams that do not authorize per request.
//!
//! It also has no series, so a caller's mutation and a later query can travel
//! in the same upstream call; causal ordering between them is not preserved.

pub mod headers;
mod state;

pub use headers::{comparable_headers, is_comparable_header, HeaderDigest};
pub use state::{RequestBatchingState, RequestToken};

use crate::batch::{Batch, BatchByKey};
use crate::types::UpstreamRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchingStrategy {
    #[serde(alias = "byInboundRequest", alias = "by_inbound_request")]
    ByInboundRequest,
    #[serde(alias = "byUpstreamHeaders", alias = "by_upstream_headers")]
    ByUpstreamHeaders,
    Indiscriminate,
}

impl BatchingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchingStrategy::ByInboundRequest => "by-inbound-request",
            BatchingStrategy::ByUpstreamHeaders => "by-upstream-headers",
            BatchingStrategy::Indiscriminate => "indiscriminate",
        }
    }

    /// Strategies that may mix callers' authorization context.
    pub fn requires_opt_in(&self) -> bool {
        matches!(self, BatchingStrategy::Indiscriminate)
    }

    /// Partitions a flushed window into sub-batches of at most `max_size`.
    ///
    /// `request_of` projects a window item onto the upstream request it carries.
    pub fn partition<T, F>(&self, items: Vec<T>, max_size: usize, request_of: F) -> Vec<Batch<T>>
    where
        F: Fn(&T) -> &UpstreamRequest,
    {
        let request_of = &request_of;
        match self {
            BatchingStrategy::ByInboundRequest => {
                BatchByKey::new(move |t: &T| request_of(t).batching_state().token())
                    .with_series(move |t: &T| request_of(t).operation_kind)
                    .with_max_size(Some(max_size))
                    .partition(items)
            }
            BatchingStrategy::ByUpstreamHeaders => {
                BatchByKey::new(move |t: &T| request_of(t).batching_state().digest())
                    .with_equality(move |a: &T, b: &T| {
                        request_of(a)
                            .batching_state()
                            .same_headers(request_of(b).batching_state())
                    })
                    .with_series(move |t: &T| request_of(t).operation_kind)
                    .with_max_size(Some(max_size))
                    .partition(items)
            }
            BatchingStrategy::Indiscriminate => BatchByKey::new(|_: &T| ())
                .with_max_size(Some(max_size))
                .partition(items),
        }
    }
}

impl std::fmt::Display for BatchingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
