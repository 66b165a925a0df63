//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subgraph_batching::config::{BatchingOptions, GatewayConfig, UpstreamConfig};
use subgraph_batching::transport::{PhysicalCall, UpstreamTransport};
use subgraph_batching::types::{ForwardHeaders, GraphQLRequest, OperationKind, RequestContext, UpstreamRequest};
use subgraph_batching::BatchingGateway;
use uuid::Uuid;

/// What the fake upstream saw for one physical call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: String,
    pub body: Value,
    pub headers: ForwardHeaders,
    pub timeout: Option<Duration>,
    pub call_id: Uuid,
    pub item_count: usize,
}

type Responder = dyn Fn(&Value) -> subgraph_batching::Result<Value> + Send + Sync;

/// In-memory upstream that records every call and answers with `responder`.
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Box<Responder>,
}

impl RecordingTransport {
    pub fn new(responder: impl Fn(&Value) -> subgraph_batching::Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Echoes each query back as `{"data":{"echo":<query>}}` in whatever style it arrived.
    pub fn echo() -> Arc<Self> {
        Self::new(|body| Ok(echo_response(body)))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamTransport for RecordingTransport {
    async fn execute(&self, call: PhysicalCall<'_>) -> subgraph_batching::Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            target: call.target.name.clone(),
            body: call.body.clone(),
            headers: call.headers.clone(),
            timeout: call.timeout,
            call_id: call.call_id,
            item_count: call.item_count,
        });
        (self.responder)(call.body)
    }
}

pub fn echo_of(request: &Value) -> Value {
    json!({"data": {"echo": request["query"].clone()}})
}

pub fn echo_response(body: &Value) -> Value {
    match body {
        Value::Array(requests) => Value::Array(requests.iter().map(echo_of).collect()),
        Value::Object(map) if map.contains_key("requests") => json!({
            "results": body["requests"]
                .as_array()
                .map(|reqs| reqs.iter().map(|r| json!({"result": echo_of(r)})).collect::<Vec<_>>())
                .unwrap_or_default()
        }),
        other => echo_of(other),
    }
}

pub fn gateway_with(
    transport: Arc<RecordingTransport>,
    upstream: UpstreamConfig,
) -> BatchingGateway {
    BatchingGateway::builder()
        .with_config(GatewayConfig::new().with_upstream(upstream))
        .with_transport(transport)
        .build()
        .expect("gateway builds")
}

pub fn batched(name: &str, options: BatchingOptions) -> UpstreamConfig {
    UpstreamConfig::new(name, format!("http://{}.internal/graphql", name)).with_batching(options)
}

pub fn query(ctx: &Arc<RequestContext>, text: &str) -> UpstreamRequest {
    UpstreamRequest::new(GraphQLRequest::new(text), OperationKind::Query, Arc::clone(ctx))
}

pub fn mutation(ctx: &Arc<RequestContext>, text: &str) -> UpstreamRequest {
    UpstreamRequest::new(GraphQLRequest::new(text), OperationKind::Mutation, Arc::clone(ctx))
}

pub fn subscription(ctx: &Arc<RequestContext>, text: &str) -> UpstreamRequest {
    UpstreamRequest::new(GraphQLRequest::new(text), OperationKind::Subscription, Arc::clone(ctx))
}
