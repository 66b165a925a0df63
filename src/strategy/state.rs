//! Per-request batching state, memoized on the request context.

use super::headers::{comparable_headers, HeaderDigest};
use crate::types::ForwardHeaders;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of one inbound request; never equal across requests within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct RequestBatchingState {
    token: RequestToken,
    headers: Vec<(String, Vec<String>)>,
    digest: HeaderDigest,
}

impl RequestBatchingState {
    pub(crate) fn compute(forward_headers: &ForwardHeaders) -> Self {
        let headers = comparable_headers(forward_headers);
        let digest = HeaderDigest::of(&headers);
        Self {
            token: RequestToken::next(),
            headers,
            digest,
        }
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn comparable_headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    pub fn digest(&self) -> HeaderDigest {
        self.digest
    }

    /// Exact ordered comparison of the comparison sets.
    pub fn same_headers(&self, other: &RequestBatchingState) -> bool {
        std::ptr::eq(self, other) || (self.digest == other.digest && self.headers == other.headers)
    }
}
