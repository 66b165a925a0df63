use crate::transport::TransportError;
use thiserror::Error;

/// Where a configuration or runtime failure happened.
///
/// Rendered after the message as `(field: .., details: .., source: ..)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Dotted path into the gateway configuration, `upstreams[2].url`.
    pub field_path: Option<String>,
    pub details: Option<String>,
    /// Component that raised it.
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the batching engine.
///
/// Cloneable so a single sub-batch failure can be handed to every caller
/// whose item travelled in that sub-batch.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Deadline exceeded: {remaining_ms}ms remaining before deadline {deadline_ms}")]
    Timeout { deadline_ms: i64, remaining_ms: i64 },

    #[error("Protocol violation ({style}): expected {expected} results, got {actual}{}", format_message(.message))]
    Protocol {
        style: &'static str,
        expected: usize,
        actual: usize,
        message: Option<String>,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization {
            message: e.to_string(),
        }
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Result count mismatch between a dispatched sub-batch and its decoded response.
    pub fn protocol(style: &'static str, expected: usize, actual: usize) -> Self {
        Error::Protocol {
            style,
            expected,
            actual,
            message: None,
        }
    }

    /// Response body that could not be decoded into per-item results at all.
    pub fn malformed(style: &'static str, expected: usize, msg: impl Into<String>) -> Self {
        Error::Protocol {
            style,
            expected,
            actual: 0,
            message: Some(msg.into()),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
            || matches!(self, Error::Transport(TransportError::Timeout))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}
