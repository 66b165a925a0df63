//! 类型模块：定义上游 GraphQL 请求及其请求级上下文。
//!
//! # Types Module
//!
//! Core data types shared by the partitioner, the strategies, the codecs and
//! the scheduler.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GraphQLRequest`] | Wire shape of one upstream GraphQL request |
//! | [`OperationKind`] | Query / mutation / subscription; the ordering series |
//! | [`RequestContext`] | State owned by one inbound request (deadline, headers, memoized batching state) |
//! | [`UpstreamRequest`] | One candidate for batching: a request plus the context it came from |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use subgraph_batching::types::{GraphQLRequest, OperationKind, RequestContext, UpstreamRequest};
//!
//! let context = Arc::new(
//!     RequestContext::new().with_header("authorization", "Bearer abc"),
//! );
//! let request = UpstreamRequest::new(
//!     GraphQLRequest::new("{ me { id } }"),
//!     OperationKind::Query,
//!     context,
//! );
//! assert!(!request.is_subscription());
//! ```

pub mod request;

pub use request::{ForwardHeaders, GraphQLRequest, OperationKind, RequestContext, UpstreamRequest};
