//! Gateway-level configuration: the set of upstream targets and their batching blocks.

use super::{resolve_config, resolve_config_strict, BatchingConfig, BatchingOptions};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Milliseconds reserved between the computed timeout and the caller's deadline.
pub const DEFAULT_DEADLINE_PADDING_MS: i64 = 5;

fn default_padding() -> i64 {
    DEFAULT_DEADLINE_PADDING_MS
}

/// One upstream subgraph service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub url: String,
    /// Upper bound for any physical call to this upstream.
    #[serde(default, alias = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    /// Absent means every request is sent on its own.
    #[serde(default)]
    pub batching: Option<BatchingOptions>,
}

impl UpstreamConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout_ms: None,
            batching: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_batching(mut self, options: BatchingOptions) -> Self {
        self.batching = Some(options);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_padding", alias = "deadlinePaddingMs")]
    pub deadline_padding_ms: i64,
    /// Reject out-of-range batching options instead of clamping them.
    #[serde(default, alias = "strictBatching")]
    pub strict_batching: bool,
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            deadline_padding_ms: DEFAULT_DEADLINE_PADDING_MS,
            strict_batching: false,
            upstreams: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstreams.push(upstream);
        self
    }

    pub fn with_strict_batching(mut self, strict: bool) -> Self {
        self.strict_batching = strict;
        self
    }

    pub fn with_deadline_padding_ms(mut self, padding: i64) -> Self {
        self.deadline_padding_ms = padding;
        self
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.json` file as JSON and anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("gateway_config"),
            )
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.deadline_padding_ms < 0 {
            return Err(Error::configuration_with_context(
                "deadline padding must not be negative",
                ErrorContext::new()
                    .with_field_path("deadline_padding_ms")
                    .with_source("gateway_config"),
            ));
        }
        let mut seen = HashSet::new();
        for (i, upstream) in self.upstreams.iter().enumerate() {
            if upstream.name.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    "upstream name must not be empty",
                    ErrorContext::new()
                        .with_field_path(format!("upstreams[{}].name", i))
                        .with_source("gateway_config"),
                ));
            }
            if !seen.insert(upstream.name.as_str()) {
                return Err(Error::configuration_with_context(
                    format!("duplicate upstream name '{}'", upstream.name),
                    ErrorContext::new()
                        .with_field_path(format!("upstreams[{}].name", i))
                        .with_source("gateway_config"),
                ));
            }
            if let Err(e) = url::Url::parse(&upstream.url) {
                return Err(Error::configuration_with_context(
                    format!("invalid url for upstream '{}'", upstream.name),
                    ErrorContext::new()
                        .with_field_path(format!("upstreams[{}].url", i))
                        .with_details(e.to_string())
                        .with_source("gateway_config"),
                ));
            }
        }
        Ok(())
    }

    /// Resolves the batching block of one upstream, honoring `strict_batching`.
    pub fn resolve_batching(&self, upstream: &UpstreamConfig) -> Result<Option<BatchingConfig>> {
        let Some(options) = upstream.batching.as_ref() else {
            return Ok(None);
        };
        if self.strict_batching {
            resolve_config_strict(options)
                .map(Some)
                .map_err(|e| match e {
                    Error::Configuration { message, context } => Error::Configuration {
                        message: format!("{} for upstream '{}'", message, upstream.name),
                        context,
                    },
                    other => other,
                })
        } else {
            Ok(Some(resolve_config(options)))
        }
    }
}
