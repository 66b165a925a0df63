//! Turns one sub-batch into physical calls and hands results back to callers.

use super::Pending;
use crate::batch::BatchLayout;
use crate::config::UpstreamConfig;
use crate::deadline::{aggregate_deadline, compute_timeout, now_millis};
use crate::style::{Codec, EncodedCall};
use crate::transport::{PhysicalCall, UpstreamTransport};
use crate::types::{ForwardHeaders, GraphQLRequest, UpstreamRequest};
use crate::{Error, ErrorContext, Result};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Deadline → encode → send → decode pipeline for one upstream target.
pub struct Dispatcher {
    upstream: UpstreamConfig,
    codec: Codec,
    transport: Arc<dyn UpstreamTransport>,
    deadline_padding_ms: i64,
}

impl Dispatcher {
    pub fn new(
        upstream: UpstreamConfig,
        codec: Codec,
        transport: Arc<dyn UpstreamTransport>,
        deadline_padding_ms: i64,
    ) -> Self {
        Self {
            upstream,
            codec,
            transport,
            deadline_padding_ms,
        }
    }

    pub fn upstream(&self) -> &UpstreamConfig {
        &self.upstream
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn deadline_padding_ms(&self) -> i64 {
        self.deadline_padding_ms
    }

    /// Executes `requests` as one sub-batch; results come back in input order.
    ///
    /// Any failure applies to the whole sub-batch.
    pub async fn execute(&self, requests: &[UpstreamRequest]) -> Result<Vec<Value>> {
        let Some(first) = requests.first() else {
            return Ok(Vec::new());
        };

        let deadline = aggregate_deadline(requests);
        let timeout = compute_timeout(
            self.upstream.timeout(),
            deadline,
            now_millis(),
            self.deadline_padding_ms,
        )?;

        let bodies: Vec<&GraphQLRequest> = requests.iter().map(|r| &r.request).collect();
        let calls = self.codec.encode(&bodies)?;
        let headers = first.forward_headers();

        let results = try_join_all(
            calls
                .iter()
                .map(|call| self.send(call, headers, timeout)),
        )
        .await?;

        BatchLayout::from_groups(calls.into_iter().map(|c| c.members).collect()).restore(results)
    }

    /// Unbatched path, used for subscriptions and single-request windows.
    pub async fn execute_one(&self, request: UpstreamRequest) -> Result<Value> {
        self.execute(std::slice::from_ref(&request))
            .await?
            .pop()
            .ok_or_else(|| {
                Error::runtime_with_context(
                    "no result for single request",
                    ErrorContext::new().with_source("dispatcher"),
                )
            })
    }

    async fn send(
        &self,
        call: &EncodedCall,
        headers: &ForwardHeaders,
        timeout: Option<Duration>,
    ) -> Result<Vec<Value>> {
        let call_id = Uuid::new_v4();
        debug!(
            upstream = %self.upstream.name,
            style = self.codec.name(),
            %call_id,
            items = call.members.len(),
            timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            "sending upstream call"
        );
        let response = self
            .transport
            .execute(PhysicalCall {
                target: &self.upstream,
                body: &call.body,
                headers,
                timeout,
                call_id,
                item_count: call.members.len(),
            })
            .await?;
        self.codec.decode(call, response)
    }

    /// Runs a flushed sub-batch and resolves every caller's reply.
    pub(crate) async fn deliver(&self, batch: Vec<Pending>) {
        let (requests, replies): (Vec<UpstreamRequest>, Vec<_>) =
            batch.into_iter().map(|p| (p.request, p.reply)).unzip();

        match self.execute(&requests).await {
            Ok(results) => {
                for (reply, result) in replies.into_iter().zip(results) {
                    let _ = reply.send(Ok(result));
                }
            }
            Err(e) => {
                warn!(
                    upstream = %self.upstream.name,
                    items = replies.len(),
                    error = %e,
                    "sub-batch failed"
                );
                for reply in replies {
                    let _ = reply.send(Err(e.clone()));
                }
            }
        }
    }
}
