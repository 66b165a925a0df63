//! 网关模块：按上游目标名称路由请求到对应的窗口调度器。
//!
//! # Batching Gateway
//!
//! [`BatchingGateway`] owns one scheduler per upstream target. Targets with a
//! `batching` block go through a [`WindowedScheduler`]; targets without one are
//! called once per request.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subgraph_batching::config::{BatchingOptions, GatewayConfig, UpstreamConfig};
//! use subgraph_batching::strategy::BatchingStrategy;
//! use subgraph_batching::types::{GraphQLRequest, OperationKind, RequestContext, UpstreamRequest};
//! use subgraph_batching::BatchingGateway;
//!
//! #[tokio::main]
//! async fn main() -> subgraph_batching::Result<()> {
//!     let config = GatewayConfig::new().with_upstream(
//!         UpstreamConfig::new("products", "http://products.internal/graphql")
//!             .with_batching(BatchingOptions::new(BatchingStrategy::ByInboundRequest)),
//!     );
//!     let gateway = BatchingGateway::builder().with_config(config).build()?;
//!
//!     let context = Arc::new(RequestContext::new());
//!     let result = gateway
//!         .execute(
//!             "products",
//!             UpstreamRequest::new(GraphQLRequest::new("{ topProducts { id } }"), OperationKind::Query, context),
//!         )
//!         .await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

use crate::config::{BatchingConfig, GatewayConfig, UpstreamConfig};
use crate::scheduler::{Dispatcher, WindowedScheduler};
use crate::style::{Codec, QueryMerger};
use crate::transport::{HttpTransport, UpstreamTransport};
use crate::types::UpstreamRequest;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

enum Target {
    Batched(WindowedScheduler),
    Unbatched(Arc<Dispatcher>),
}

pub struct BatchingGateway {
    targets: HashMap<String, Target>,
}

impl BatchingGateway {
    pub fn builder() -> BatchingGatewayBuilder {
        BatchingGatewayBuilder::new()
    }

    /// Sends `request` to the named upstream, batching it when configured.
    pub async fn execute(&self, target: &str, request: UpstreamRequest) -> Result<Value> {
        match self.targets.get(target) {
            Some(Target::Batched(scheduler)) => scheduler.schedule(request).await,
            Some(Target::Unbatched(dispatcher)) => dispatcher.execute_one(request).await,
            None => Err(Error::runtime_with_context(
                format!("unknown upstream target '{}'", target),
                ErrorContext::new().with_source("batching_gateway"),
            )),
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Resolved batching configuration, `None` for unbatched or unknown targets.
    pub fn batching_config(&self, target: &str) -> Option<&BatchingConfig> {
        match self.targets.get(target)? {
            Target::Batched(scheduler) => Some(scheduler.config()),
            Target::Unbatched(_) => None,
        }
    }

    pub fn scheduler(&self, target: &str) -> Option<&WindowedScheduler> {
        match self.targets.get(target)? {
            Target::Batched(scheduler) => Some(scheduler),
            Target::Unbatched(_) => None,
        }
    }
}

#[derive(Default)]
pub struct BatchingGatewayBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn UpstreamTransport>>,
    merger: Option<Arc<dyn QueryMerger>>,
    mergers: HashMap<String, Arc<dyn QueryMerger>>,
}

impl BatchingGatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.config.upstreams.push(upstream);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn UpstreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Merger used by every single-style upstream without its own.
    pub fn with_query_merger(mut self, merger: Arc<dyn QueryMerger>) -> Self {
        self.merger = Some(merger);
        self
    }

    pub fn with_query_merger_for(mut self, upstream: impl Into<String>, merger: Arc<dyn QueryMerger>) -> Self {
        self.mergers.insert(upstream.into(), merger);
        self
    }

    pub fn build(self) -> Result<BatchingGateway> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::from_env()?),
        };

        let mut targets = HashMap::with_capacity(self.config.upstreams.len());
        for upstream in &self.config.upstreams {
            let target = match self.config.resolve_batching(upstream)? {
                Some(batching) => {
                    let merger = self
                        .mergers
                        .get(&upstream.name)
                        .or(self.merger.as_ref())
                        .cloned();
                    let codec = Codec::for_style(batching.style, merger).map_err(|e| {
                        Error::configuration_with_context(
                            format!("cannot build codec for upstream '{}'", upstream.name),
                            ErrorContext::new()
                                .with_details(e.to_string())
                                .with_source("batching_gateway"),
                        )
                    })?;
                    if batching.strategy.requires_opt_in() {
                        info!(
                            upstream = %upstream.name,
                            "indiscriminate batching enabled; requests from different callers share upstream calls"
                        );
                    }
                    let dispatcher = Arc::new(Dispatcher::new(
                        upstream.clone(),
                        codec,
                        Arc::clone(&transport),
                        self.config.deadline_padding_ms,
                    ));
                    Target::Batched(WindowedScheduler::new(batching, dispatcher))
                }
                None => Target::Unbatched(Arc::new(Dispatcher::new(
                    upstream.clone(),
                    Codec::Plain,
                    Arc::clone(&transport),
                    self.config.deadline_padding_ms,
                ))),
            };
            targets.insert(upstream.name.clone(), target);
        }

        Ok(BatchingGateway { targets })
    }
}
