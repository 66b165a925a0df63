//! Header comparison set used by the by-upstream-headers strategy.

use crate::types::ForwardHeaders;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Unique per request by construction; comparing them would defeat batching.
const PER_REQUEST_HEADERS: &[&str] = &[
    "x-request-id",
    "request-id",
    "x-correlation-id",
    "correlation-id",
    "x-transaction-id",
    "x-unique-id",
    "x-amzn-trace-id",
    "x-cloud-trace-context",
    "content-length",
];

const TRACE_HEADERS: &[&str] = &[
    "traceparent",
    "tracestate",
    "baggage",
    "b3",
    "uber-trace-id",
    "sentry-trace",
    "grpc-trace-bin",
    "x-datadog-trace-id",
    "x-datadog-parent-id",
    "x-datadog-sampling-priority",
    "x-datadog-origin",
];

const TRACE_PREFIXES: &[&str] = &["x-b3-", "uberctx-", "ot-baggage-", "ot-tracer-"];

/// Whether a header takes part in the batching comparison. Case-insensitive.
pub fn is_comparable_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    !(PER_REQUEST_HEADERS.contains(&name.as_str())
        || TRACE_HEADERS.contains(&name.as_str())
        || TRACE_PREFIXES.iter().any(|p| name.starts_with(p)))
}

/// Filtered, name-lowercased, name-sorted header list.
///
/// Values of repeated names are concatenated in arrival order.
pub fn comparable_headers(headers: &ForwardHeaders) -> Vec<(String, Vec<String>)> {
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, values) in headers {
        if !is_comparable_header(name) {
            continue;
        }
        merged
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values.iter().cloned());
    }
    merged.into_iter().collect()
}

/// SHA-256 over a length-prefixed encoding of the comparison set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderDigest([u8; 32]);

impl HeaderDigest {
    pub fn of(headers: &[(String, Vec<String>)]) -> Self {
        let mut hasher = Sha256::new();
        for (name, values) in headers {
            hasher.update((name.len() as u64).to_be_bytes());
            hasher.update(name.as_bytes());
            hasher.update((values.len() as u64).to_be_bytes());
            for value in values {
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for HeaderDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HeaderDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeaderDigest({})", self)
    }
}
