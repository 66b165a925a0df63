//! End-to-end batching scenarios against an in-memory upstream
//!
//! Time is paused: window timers advance instantly once every task is idle.

mod common;

use common::*;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use subgraph_batching::config::{BatchingOptions, GatewayConfig, UpstreamConfig};
use subgraph_batching::deadline::{now_millis, Deadline};
use subgraph_batching::strategy::BatchingStrategy;
use subgraph_batching::style::{BatchStyle, MergedDocument, QueryMerger};
use subgraph_batching::transport::TransportError;
use subgraph_batching::types::{GraphQLRequest, RequestContext};
use subgraph_batching::{BatchingGateway, Error};

fn echoed(query: &str) -> Value {
    json!({"data": {"echo": query}})
}

#[tokio::test(start_paused = true)]
async fn test_same_inbound_request_shares_one_call() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let ctx = Arc::new(RequestContext::new());

    let results = join_all(
        ["{ a }", "{ b }", "{ c }"]
            .iter()
            .map(|q| gateway.execute("products", query(&ctx, q))),
    )
    .await;

    let results: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(results, vec![echoed("{ a }"), echoed("{ b }"), echoed("{ c }")]);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].item_count, 3);
    assert_eq!(
        calls[0].body,
        json!([{"query": "{ a }"}, {"query": "{ b }"}, {"query": "{ c }"}])
    );
}

#[tokio::test(start_paused = true)]
async fn test_distinct_inbound_requests_are_not_mixed() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let first = Arc::new(RequestContext::new());
    let second = Arc::new(RequestContext::new());

    let (a, b, c) = tokio::join!(
        gateway.execute("products", query(&first, "{ a }")),
        gateway.execute("products", query(&second, "{ b }")),
        gateway.execute("products", query(&first, "{ c }")),
    );
    assert_eq!(a.unwrap(), echoed("{ a }"));
    assert_eq!(b.unwrap(), echoed("{ b }"));
    assert_eq!(c.unwrap(), echoed("{ c }"));

    let mut counts: Vec<usize> = transport.calls().iter().map(|c| c.item_count).collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_header_mismatch_splits_calls() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("reviews", BatchingOptions::new(BatchingStrategy::ByUpstreamHeaders)),
    );
    let alice = Arc::new(RequestContext::new().with_header("Authorization", "Bearer alice"));
    let bob = Arc::new(RequestContext::new().with_header("authorization", "Bearer bob"));

    let (a, b) = tokio::join!(
        gateway.execute("reviews", query(&alice, "{ a }")),
        gateway.execute("reviews", query(&bob, "{ b }")),
    );
    assert_eq!(a.unwrap(), echoed("{ a }"));
    assert_eq!(b.unwrap(), echoed("{ b }"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    let auth_of = |c: &RecordedCall| {
        c.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v.clone())
    };
    let mut seen: Vec<_> = calls.iter().filter_map(auth_of).collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![vec!["Bearer alice".to_string()], vec!["Bearer bob".to_string()]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_trace_headers_do_not_prevent_batching() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("reviews", BatchingOptions::new(BatchingStrategy::ByUpstreamHeaders)),
    );
    let first = Arc::new(
        RequestContext::new()
            .with_header("authorization", "Bearer shared")
            .with_header("x-request-id", "r-1")
            .with_header("traceparent", "00-aaa-01"),
    );
    let second = Arc::new(
        RequestContext::new()
            .with_header("Authorization", "Bearer shared")
            .with_header("x-request-id", "r-2"),
    );

    let (a, b) = tokio::join!(
        gateway.execute("reviews", query(&first, "{ a }")),
        gateway.execute("reviews", query(&second, "{ b }")),
    );
    assert!(a.is_ok() && b.is_ok());

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].item_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_mutation_between_queries_freezes_batches() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("accounts", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let ctx = Arc::new(RequestContext::new());

    let (a, b, c) = tokio::join!(
        gateway.execute("accounts", query(&ctx, "{ a }")),
        gateway.execute("accounts", mutation(&ctx, "mutation { b }")),
        gateway.execute("accounts", query(&ctx, "{ c }")),
    );
    assert_eq!(a.unwrap(), echoed("{ a }"));
    assert_eq!(b.unwrap(), echoed("mutation { b }"));
    assert_eq!(c.unwrap(), echoed("{ c }"));

    // the query after the mutation may not join the query before it
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.item_count == 1));
}

#[tokio::test(start_paused = true)]
async fn test_subscription_bypasses_window() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched(
            "inventory",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_style(BatchStyle::Legacy),
        ),
    );
    let ctx = Arc::new(RequestContext::new());

    let scheduler = gateway.scheduler("inventory").unwrap().clone();
    let pending_query = tokio::spawn({
        let request = query(&ctx, "{ stock }");
        let scheduler = scheduler.clone();
        async move { scheduler.schedule(request).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(scheduler.pending(), 1);

    let sub = gateway
        .execute("inventory", subscription(&ctx, "subscription { updates }"))
        .await
        .unwrap();
    assert_eq!(sub, echoed("subscription { updates }"));
    // the subscription went out while the query was still buffered
    assert_eq!(scheduler.pending(), 1);
    assert_eq!(
        transport.calls()[0].body,
        json!({"requests": [{"query": "subscription { updates }"}]})
    );

    assert_eq!(pending_query.await.unwrap().unwrap(), echoed("{ stock }"));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_result_count_mismatch_fails_whole_batch() {
    let transport = RecordingTransport::new(|_| Ok(json!([{"data": 1}, {"data": 2}])));
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let ctx = Arc::new(RequestContext::new());

    let results = join_all(
        ["{ a }", "{ b }", "{ c }"]
            .iter()
            .map(|q| gateway.execute("products", query(&ctx, q))),
    )
    .await;

    assert_eq!(transport.calls().len(), 1);
    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_protocol(), "unexpected error: {}", err);
        assert!(matches!(
            err,
            Error::Protocol {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_reaches_every_caller() {
    let transport = RecordingTransport::new(|_| {
        Err(TransportError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        }
        .into())
    });
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let ctx = Arc::new(RequestContext::new());

    let results = join_all(
        ["{ a }", "{ b }", "{ c }"]
            .iter()
            .map(|q| gateway.execute("products", query(&ctx, q))),
    )
    .await;

    let messages: Vec<String> = results
        .into_iter()
        .map(|r| {
            let err = r.unwrap_err();
            assert!(err.is_transport());
            err.to_string()
        })
        .collect();
    assert!(messages.iter().all(|m| m == &messages[0]));
    assert!(messages[0].contains("502"));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_size_threshold_flushes_without_waiting() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched(
            "products",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest)
                .with_wait_queries(3)
                .with_wait_millis(100),
        ),
    );
    let ctx = Arc::new(RequestContext::new());

    let start = tokio::time::Instant::now();
    let results = join_all(
        ["{ a }", "{ b }", "{ c }"]
            .iter()
            .map(|q| gateway.execute("products", query(&ctx, q))),
    )
    .await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_flushes_partial_window() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched(
            "products",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_wait_millis(30),
        ),
    );
    let ctx = Arc::new(RequestContext::new());

    let start = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        gateway.execute("products", query(&ctx, "{ a }")),
        gateway.execute("products", query(&ctx, "{ b }")),
    );
    assert!(a.is_ok() && b.is_ok());
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_max_size_splits_window() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched(
            "products",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_max_size(2),
        ),
    );
    let ctx = Arc::new(RequestContext::new());
    let queries = ["{ a }", "{ b }", "{ c }", "{ d }", "{ e }"];

    let results = join_all(queries.iter().map(|q| gateway.execute("products", query(&ctx, q)))).await;
    let results: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(results, queries.iter().map(|q| echoed(q)).collect::<Vec<_>>());

    let mut counts: Vec<usize> = transport.calls().iter().map(|c| c.item_count).collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_split_window_calls_start_in_arrival_order() {
    let queries: Vec<String> = (0..20).map(|i| format!("{{ f{} }}", i)).collect();

    for _ in 0..20 {
        let transport = RecordingTransport::echo();
        let gateway = gateway_with(
            transport.clone(),
            batched(
                "products",
                BatchingOptions::new(BatchingStrategy::ByInboundRequest)
                    .with_max_size(2)
                    .with_wait_queries(20)
                    .with_wait_millis(100),
            ),
        );
        let ctx = Arc::new(RequestContext::new());

        let results = join_all(queries.iter().map(|q| gateway.execute("products", query(&ctx, q)))).await;
        let results: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results, queries.iter().map(|q| echoed(q)).collect::<Vec<_>>());

        let calls = transport.calls();
        assert_eq!(calls.len(), 10);
        let bodies: Vec<Value> = calls.iter().map(|c| c.body.clone()).collect();
        let expected: Vec<Value> = queries
            .chunks(2)
            .map(|pair| json!([{"query": pair[0]}, {"query": pair[1]}]))
            .collect();
        assert_eq!(bodies, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_indiscriminate_flushes_at_max_size() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched(
            "catalog",
            BatchingOptions::new(BatchingStrategy::Indiscriminate)
                .with_max_size(2)
                .with_wait_millis(100),
        ),
    );
    assert_eq!(gateway.batching_config("catalog").unwrap().wait.queries, 2);

    let first = Arc::new(RequestContext::new().with_header("authorization", "Bearer a"));
    let second = Arc::new(RequestContext::new().with_header("authorization", "Bearer b"));
    let start = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        gateway.execute("catalog", query(&first, "{ a }")),
        gateway.execute("catalog", query(&second, "{ b }")),
    );
    assert!(a.is_ok() && b.is_ok());
    assert!(start.elapsed() < Duration::from_millis(100));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].item_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_deadline_fails_without_call() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::Indiscriminate)),
    );
    let expired = Arc::new(RequestContext::new().with_deadline(Deadline::at_millis(now_millis() - 1_000)));

    let err = gateway
        .execute("products", query(&expired, "{ a }"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_expired_item_does_not_sink_its_batch() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::Indiscriminate)),
    );
    let expired = Arc::new(RequestContext::new().with_deadline(Deadline::at_millis(now_millis() - 1_000)));
    let live = Arc::new(RequestContext::new());

    let (a, b) = tokio::join!(
        gateway.execute("products", query(&expired, "{ a }")),
        gateway.execute("products", query(&live, "{ b }")),
    );
    assert!(a.unwrap_err().is_timeout());
    assert_eq!(b.unwrap(), echoed("{ b }"));
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].item_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_tracks_earliest_deadline() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::Indiscriminate))
            .with_timeout(Duration::from_secs(30)),
    );
    let now = now_millis();
    let tight = Arc::new(RequestContext::new().with_deadline(Deadline::at_millis(now + 2_000)));
    let loose = Arc::new(RequestContext::new().with_deadline(Deadline::at_millis(now + 10_000)));

    let (a, b) = tokio::join!(
        gateway.execute("products", query(&loose, "{ a }")),
        gateway.execute("products", query(&tight, "{ b }")),
    );
    assert!(a.is_ok() && b.is_ok());

    let timeout = transport.calls()[0].timeout.unwrap();
    assert!(timeout <= Duration::from_millis(1_995));
    assert!(timeout > Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_upstream_timeout_caps_call_without_deadlines() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest))
            .with_timeout(Duration::from_millis(750)),
    );
    let ctx = Arc::new(RequestContext::new());
    gateway.execute("products", query(&ctx, "{ a }")).await.unwrap();
    assert_eq!(transport.calls()[0].timeout, Some(Duration::from_millis(750)));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_caller_is_dropped_from_window() {
    let transport = RecordingTransport::echo();
    let gateway = Arc::new(gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::Indiscriminate)),
    ));
    let ctx = Arc::new(RequestContext::new());

    let abandoned = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        let request = query(&ctx, "{ abandoned }");
        async move { gateway.execute("products", request).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(gateway.scheduler("products").unwrap().pending(), 1);
    abandoned.abort();
    assert!(abandoned.await.unwrap_err().is_cancelled());

    let kept = gateway.execute("products", query(&ctx, "{ kept }")).await.unwrap();
    assert_eq!(kept, echoed("{ kept }"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].item_count, 1);
    assert_eq!(calls[0].body, json!([{"query": "{ kept }"}]));
}

#[tokio::test(start_paused = true)]
async fn test_flush_now_dispatches_immediately() {
    let transport = RecordingTransport::echo();
    let gateway = Arc::new(gateway_with(
        transport.clone(),
        batched(
            "products",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_wait_millis(100),
        ),
    ));
    let ctx = Arc::new(RequestContext::new());

    let waiting = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        let request = query(&ctx, "{ a }");
        async move { gateway.execute("products", request).await }
    });
    tokio::task::yield_now().await;

    let start = tokio::time::Instant::now();
    gateway.scheduler("products").unwrap().flush_now().unwrap();
    assert_eq!(waiting.await.unwrap().unwrap(), echoed("{ a }"));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_every_call_carries_distinct_call_id() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let first = Arc::new(RequestContext::new());
    let second = Arc::new(RequestContext::new());

    let (a, b) = tokio::join!(
        gateway.execute("products", query(&first, "{ a }")),
        gateway.execute("products", query(&second, "{ b }")),
    );
    assert!(a.is_ok() && b.is_ok());
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].call_id, calls[1].call_id);
}

/// Aliases every member's selection set under `_<index>`.
struct AliasMerger;

impl QueryMerger for AliasMerger {
    fn merge(&self, requests: &[&GraphQLRequest]) -> subgraph_batching::Result<Vec<MergedDocument>> {
        let selections = requests
            .iter()
            .enumerate()
            .map(|(i, r)| format!("_{}: {}", i, r.query.trim_matches(|c| c == '{' || c == '}' || c == ' ')))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(vec![MergedDocument {
            request: GraphQLRequest::new(format!("{{ {} }}", selections)),
            members: (0..requests.len()).collect(),
            metadata: Value::Null,
        }])
    }

    fn split(&self, document: &MergedDocument, response: Value) -> subgraph_batching::Result<Vec<Value>> {
        Ok(document
            .members
            .iter()
            .map(|i| json!({"data": response["data"][format!("_{}", i)].clone()}))
            .collect())
    }
}

/// Forgets the last member when merging.
struct LossyMerger;

impl QueryMerger for LossyMerger {
    fn merge(&self, requests: &[&GraphQLRequest]) -> subgraph_batching::Result<Vec<MergedDocument>> {
        Ok(vec![MergedDocument {
            request: GraphQLRequest::new("{ merged }"),
            members: (0..requests.len().saturating_sub(1)).collect(),
            metadata: Value::Null,
        }])
    }

    fn split(&self, document: &MergedDocument, _response: Value) -> subgraph_batching::Result<Vec<Value>> {
        Ok(document.members.iter().map(|_| Value::Null).collect())
    }
}

fn single_style_gateway(transport: Arc<RecordingTransport>, merger: Arc<dyn QueryMerger>) -> BatchingGateway {
    BatchingGateway::builder()
        .with_upstream(batched(
            "users",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_style(BatchStyle::Single),
        ))
        .with_transport(transport)
        .with_query_merger_for("users", merger)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_single_style_merges_into_one_document() {
    let transport = RecordingTransport::new(|_| Ok(json!({"data": {"_0": {"id": 1}, "_1": {"id": 2}}})));
    let gateway = single_style_gateway(transport.clone(), Arc::new(AliasMerger));
    let ctx = Arc::new(RequestContext::new());

    let (a, b) = tokio::join!(
        gateway.execute("users", query(&ctx, "{ me }")),
        gateway.execute("users", query(&ctx, "{ friend }")),
    );
    assert_eq!(a.unwrap(), json!({"data": {"id": 1}}));
    assert_eq!(b.unwrap(), json!({"data": {"id": 2}}));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body, json!({"query": "{ _0: me _1: friend }"}));
    assert_eq!(calls[0].item_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_style_rejects_incomplete_merge() {
    let transport = RecordingTransport::echo();
    let gateway = single_style_gateway(transport.clone(), Arc::new(LossyMerger));
    let ctx = Arc::new(RequestContext::new());

    let (a, b) = tokio::join!(
        gateway.execute("users", query(&ctx, "{ me }")),
        gateway.execute("users", query(&ctx, "{ friend }")),
    );
    assert!(a.is_err() && b.is_err());
    assert!(transport.calls().is_empty());
}

#[test]
fn test_single_style_without_merger_fails_to_build() {
    let result = BatchingGateway::builder()
        .with_upstream(batched(
            "users",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_style(BatchStyle::Single),
        ))
        .with_transport(RecordingTransport::echo())
        .build();
    assert!(result.err().unwrap().is_configuration());
}

#[tokio::test(start_paused = true)]
async fn test_unbatched_target_sends_plain_requests() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        UpstreamConfig::new("legacy", "http://legacy.internal/graphql"),
    );
    assert!(gateway.batching_config("legacy").is_none());
    let ctx = Arc::new(RequestContext::new());

    let (a, b) = tokio::join!(
        gateway.execute("legacy", query(&ctx, "{ a }")),
        gateway.execute("legacy", query(&ctx, "{ b }")),
    );
    assert_eq!(a.unwrap(), echoed("{ a }"));
    assert_eq!(b.unwrap(), echoed("{ b }"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.body.is_object() && c.item_count == 1));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_target_is_an_error() {
    let transport = RecordingTransport::echo();
    let gateway = gateway_with(
        transport.clone(),
        batched("products", BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
    );
    let ctx = Arc::new(RequestContext::new());
    let err = gateway.execute("nowhere", query(&ctx, "{ a }")).await.unwrap_err();
    assert!(err.to_string().contains("nowhere"));
    assert!(transport.calls().is_empty());
}

#[test]
fn test_strict_gateway_rejects_out_of_range_options() {
    let result = BatchingGateway::builder()
        .with_config(
            GatewayConfig::new()
                .with_strict_batching(true)
                .with_upstream(batched(
                    "products",
                    BatchingOptions::new(BatchingStrategy::ByInboundRequest).with_max_size(1_000),
                )),
        )
        .with_transport(RecordingTransport::echo())
        .build();
    assert!(result.err().unwrap().is_configuration());
}

#[test]
fn test_lenient_gateway_clamps_options() {
    let gateway = BatchingGateway::builder()
        .with_upstream(batched(
            "products",
            BatchingOptions::new(BatchingStrategy::ByInboundRequest)
                .with_max_size(1_000)
                .with_wait_millis(0),
        ))
        .with_transport(RecordingTransport::echo())
        .build()
        .unwrap();
    let config = gateway.batching_config("products").unwrap();
    assert_eq!(config.max_size, 100);
    assert_eq!(config.wait.millis, 0);
}
