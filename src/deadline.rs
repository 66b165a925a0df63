//! Deadline aggregation for merged upstream calls.
//!
//! A merged call must answer by the most restrictive deadline of the requests
//! it carries. "No deadline" never tightens anything.

use crate::types::UpstreamRequest;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Absolute point in time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deadline(i64);

impl Deadline {
    pub fn at_millis(epoch_ms: i64) -> Self {
        Self(epoch_ms)
    }

    /// `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let budget_ms = i64::try_from(budget.as_millis()).unwrap_or(i64::MAX);
        Self(now_millis().saturating_add(budget_ms))
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Deadline of one item: merged-request metadata first, then the request context.
pub fn get_deadline(request: &UpstreamRequest) -> Option<Deadline> {
    request
        .deadline_override
        .or_else(|| request.context.deadline())
}

/// The smaller of two deadlines; `None` is the absorbing element.
pub fn reduce_deadlines(a: Option<Deadline>, b: Option<Deadline>) -> Option<Deadline> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(d), None) | (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}

/// Effective deadline of a merged call.
pub fn aggregate_deadline<'a, I>(requests: I) -> Option<Deadline>
where
    I: IntoIterator<Item = &'a UpstreamRequest>,
{
    requests
        .into_iter()
        .map(get_deadline)
        .fold(None, reduce_deadlines)
}

/// Timeout for one physical call: `min(max_timeout, deadline - now - padding)`.
///
/// Fails without a call when the remaining budget is negative.
pub fn compute_timeout(
    max_timeout: Option<Duration>,
    deadline: Option<Deadline>,
    now_ms: i64,
    padding_ms: i64,
) -> Result<Option<Duration>> {
    let Some(deadline) = deadline else {
        return Ok(max_timeout);
    };
    let remaining = deadline.0.saturating_sub(now_ms).saturating_sub(padding_ms);
    if remaining < 0 {
        return Err(Error::Timeout {
            deadline_ms: deadline.0,
            remaining_ms: remaining,
        });
    }
    let budget = Duration::from_millis(remaining.unsigned_abs());
    Ok(Some(max_timeout.map_or(budget, |max| max.min(budget))))
}
