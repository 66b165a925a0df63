//! 批处理配置解析：将用户提供的批处理选项钳制到安全范围内。
//!
//! # Batching Configuration
//!
//! User supplied batching options are never rejected by default. Every numeric
//! field is resolved independently as `value ?? default` and then clamped into
//! its `[min, max]` bounds:
//!
//! | Option | Bounds | Default |
//! |--------|--------|---------|
//! | `max_size` | `[2, 100]` | 50 |
//! | `wait.queries` | `[2, 200]` | 100 |
//! | `wait.millis` | `[0, 100]` | 20 |
//!
//! Under [`BatchingStrategy::Indiscriminate`] `wait.queries` is overwritten with
//! the resolved `max_size`: a window never needs to hold more items than fit
//! in one batch.
//!
//! Silent clamping can hide operator mistakes, so every adjustment is reported
//! as a [`ClampAdjustment`] and logged. [`resolve_config_strict`] refuses to
//! resolve when an option was out of range.
//!
//! ```rust
//! use subgraph_batching::config::{resolve_config, BatchingOptions};
//! use subgraph_batching::strategy::BatchingStrategy;
//!
//! let options = BatchingOptions::new(BatchingStrategy::Indiscriminate)
//!     .with_max_size(50)
//!     .with_wait_queries(5);
//! let config = resolve_config(&options);
//! assert_eq!(config.wait.queries, 50);
//! ```

pub mod gateway;

pub use gateway::{GatewayConfig, UpstreamConfig};

use crate::strategy::BatchingStrategy;
use crate::style::BatchStyle;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Inclusive bounds and default for one numeric option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u64,
    pub max: u64,
    pub default: u64,
}

impl Bounds {
    const fn new(min: u64, max: u64, default: u64) -> Self {
        Self { min, max, default }
    }

    fn resolve(&self, field: &'static str, requested: Option<u64>) -> (u64, Option<ClampAdjustment>) {
        let value = requested.unwrap_or(self.default);
        let applied = value.clamp(self.min, self.max);
        let adjustment = if applied != value {
            Some(ClampAdjustment {
                field,
                requested: value,
                applied,
                reason: if value < self.min {
                    AdjustmentReason::BelowMinimum
                } else {
                    AdjustmentReason::AboveMaximum
                },
            })
        } else {
            None
        };
        (applied, adjustment)
    }
}

pub const MAX_SIZE_BOUNDS: Bounds = Bounds::new(2, 100, 50);
pub const WAIT_QUERIES_BOUNDS: Bounds = Bounds::new(2, 200, 100);
pub const WAIT_MILLIS_BOUNDS: Bounds = Bounds::new(0, 100, 20);

/// Flush thresholds as supplied by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    pub queries: Option<u64>,
    pub millis: Option<u64>,
}

/// Unresolved batching options for one upstream target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchingOptions {
    pub strategy: BatchingStrategy,
    #[serde(default)]
    pub style: BatchStyle,
    #[serde(default, alias = "maxSize")]
    pub max_size: Option<u64>,
    #[serde(default)]
    pub wait: WaitOptions,
}

impl BatchingOptions {
    pub fn new(strategy: BatchingStrategy) -> Self {
        Self {
            strategy,
            style: BatchStyle::default(),
            max_size: None,
            wait: WaitOptions::default(),
        }
    }

    pub fn with_style(mut self, style: BatchStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_wait_queries(mut self, queries: u64) -> Self {
        self.wait.queries = Some(queries);
        self
    }

    pub fn with_wait_millis(mut self, millis: u64) -> Self {
        self.wait.millis = Some(millis);
        self
    }
}

/// Resolved flush thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitConfig {
    pub queries: usize,
    pub millis: u64,
}

/// Fully resolved batching configuration; every field is within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchingConfig {
    pub strategy: BatchingStrategy,
    pub style: BatchStyle,
    pub max_size: usize,
    pub wait: WaitConfig,
}

impl BatchingConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(self.wait.millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    BelowMinimum,
    AboveMaximum,
    /// `wait.queries` replaced by `max_size` under the indiscriminate strategy.
    ForcedByStrategy,
}

/// One change the resolver made to an operator supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClampAdjustment {
    pub field: &'static str,
    pub requested: u64,
    pub applied: u64,
    pub reason: AdjustmentReason,
}

impl ClampAdjustment {
    /// Out-of-range input, as opposed to a documented strategy override.
    pub fn is_out_of_range(&self) -> bool {
        !matches!(self.reason, AdjustmentReason::ForcedByStrategy)
    }
}

impl fmt::Display for ClampAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            AdjustmentReason::BelowMinimum => "below minimum",
            AdjustmentReason::AboveMaximum => "above maximum",
            AdjustmentReason::ForcedByStrategy => "forced by indiscriminate strategy",
        };
        write!(
            f,
            "{}: {} -> {} ({})",
            self.field, self.requested, self.applied, why
        )
    }
}

/// Resolves options and reports every adjustment that was applied.
pub fn resolve_config_with_report(options: &BatchingOptions) -> (BatchingConfig, Vec<ClampAdjustment>) {
    let mut adjustments = Vec::new();

    let (max_size, adj) = MAX_SIZE_BOUNDS.resolve("max_size", options.max_size);
    adjustments.extend(adj);
    let (mut queries, adj) = WAIT_QUERIES_BOUNDS.resolve("wait.queries", options.wait.queries);
    adjustments.extend(adj);
    let (millis, adj) = WAIT_MILLIS_BOUNDS.resolve("wait.millis", options.wait.millis);
    adjustments.extend(adj);

    if options.strategy == BatchingStrategy::Indiscriminate && queries != max_size {
        if options.wait.queries.is_some() {
            adjustments.push(ClampAdjustment {
                field: "wait.queries",
                requested: queries,
                applied: max_size,
                reason: AdjustmentReason::ForcedByStrategy,
            });
        }
        queries = max_size;
    }

    let config = BatchingConfig {
        strategy: options.strategy,
        style: options.style,
        max_size: max_size as usize,
        wait: WaitConfig {
            queries: queries as usize,
            millis,
        },
    };
    (config, adjustments)
}

/// Resolves options, clamping out-of-range values. Never fails.
pub fn resolve_config(options: &BatchingOptions) -> BatchingConfig {
    let (config, adjustments) = resolve_config_with_report(options);
    for adj in adjustments.iter().filter(|a| a.is_out_of_range()) {
        tracing::warn!(
            field = adj.field,
            requested = adj.requested,
            applied = adj.applied,
            "batching option clamped"
        );
    }
    config
}

/// Resolves options, rejecting any out-of-range value instead of clamping it.
pub fn resolve_config_strict(options: &BatchingOptions) -> Result<BatchingConfig> {
    let (config, adjustments) = resolve_config_with_report(options);
    let rejected: Vec<String> = adjustments
        .iter()
        .filter(|a| a.is_out_of_range())
        .map(|a| a.to_string())
        .collect();
    if rejected.is_empty() {
        Ok(config)
    } else {
        Err(Error::configuration_with_context(
            "batching options out of range",
            ErrorContext::new()
                .with_details(rejected.join("; "))
                .with_source("config_resolver"),
        ))
    }
}
