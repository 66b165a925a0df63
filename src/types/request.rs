//! Upstream request and request-scoped context.

use crate::deadline::Deadline;
use crate::strategy::RequestBatchingState;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Forwardable headers in the order the request-context layer produced them.
/// Each name maps to all of its values.
pub type ForwardHeaders = Vec<(String, Vec<String>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

/// GraphQL-over-HTTP request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
            extensions: None,
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables
            .get_or_insert_with(Map::new)
            .insert(name.into(), value);
        self
    }

    pub fn with_extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

/// State owned by one inbound request for its whole lifetime.
///
/// Populated at ingress and shared by reference (`Arc`) with every upstream
/// request it spawns. The batching state is computed on first access and
/// dropped together with the context.
#[derive(Debug, Default)]
pub struct RequestContext {
    deadline: Option<Deadline>,
    forward_headers: ForwardHeaders,
    batching: OnceCell<RequestBatchingState>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_headers(mut self, headers: ForwardHeaders) -> Self {
        self.forward_headers = headers;
        self
    }

    /// Appends a value, grouping it with earlier values of the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        match self
            .forward_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value.into()),
            None => self.forward_headers.push((name, vec![value.into()])),
        }
        self
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn forward_headers(&self) -> &ForwardHeaders {
        &self.forward_headers
    }

    pub fn batching_state(&self) -> &RequestBatchingState {
        self.batching
            .get_or_init(|| RequestBatchingState::compute(&self.forward_headers))
    }
}

/// One candidate for batching against a single upstream target.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub request: GraphQLRequest,
    pub operation_kind: OperationKind,
    pub context: Arc<RequestContext>,
    /// Deadline carried on merged-request metadata, used when an external
    /// merging step could not keep the per-item context. Wins over the
    /// context deadline.
    pub deadline_override: Option<Deadline>,
}

impl UpstreamRequest {
    pub fn new(request: GraphQLRequest, operation_kind: OperationKind, context: Arc<RequestContext>) -> Self {
        Self {
            request,
            operation_kind,
            context,
            deadline_override: None,
        }
    }

    pub fn with_deadline_override(mut self, deadline: Deadline) -> Self {
        self.deadline_override = Some(deadline);
        self
    }

    pub fn is_subscription(&self) -> bool {
        self.operation_kind == OperationKind::Subscription
    }

    pub fn forward_headers(&self) -> &ForwardHeaders {
        self.context.forward_headers()
    }

    pub fn batching_state(&self) -> &RequestBatchingState {
        self.context.batching_state()
    }
}
