//! # subgraph-batching
//!
//! 这是 GraphQL 网关的上游请求批处理与合并引擎。
//!
//! Request batching and coalescing engine for a GraphQL gateway that fans
//! requests out to many upstream subgraph services.
//!
//! ## Overview
//!
//! Concurrently arriving upstream calls for the same target are buffered in a
//! short window, split into correctness-preserving sub-batches, sent as one
//! physical request per sub-batch, and demultiplexed back so every caller
//! receives exactly its own result within its own deadline.
//!
//! ```text
//! inbound request ─▶ strategy keys ─▶ windowed scheduler ─▶ partitioner
//!                                                        │
//!         caller ◀─ order restorer ◀─ style codec ◀─ deadline aggregator
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Option resolution with clamping, gateway configuration files |
//! | [`batch`] | Key/series/size partitioner and order restorer |
//! | [`strategy`] | Which requests may share a batch |
//! | [`scheduler`] | Per-target window buffering and sub-batch dispatch |
//! | [`style`] | Legacy / Array / Single wire encodings |
//! | [`deadline`] | Deadline reduction and timeout budgets |
//! | [`transport`] | Physical upstream calls |
//! | [`gateway`] | Target registry tying it all together |
//! | [`types`] | Requests and request-scoped context |

pub mod batch;
pub mod config;
pub mod deadline;
pub mod gateway;
pub mod scheduler;
pub mod strategy;
pub mod style;
pub mod transport;
pub mod types;

pub use config::{BatchingConfig, BatchingOptions, GatewayConfig, UpstreamConfig};
pub use deadline::Deadline;
pub use gateway::{BatchingGateway, BatchingGatewayBuilder};
pub use strategy::BatchingStrategy;
pub use style::BatchStyle;
pub use types::{GraphQLRequest, OperationKind, RequestContext, UpstreamRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
