use super::{PhysicalCall, TransportError, UpstreamTransport, CALL_ID_HEADER};
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Headers the client computes itself; forwarding them would corrupt the call.
const HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "content-type",
    "transfer-encoding",
    "accept-encoding",
    "keep-alive",
    "upgrade",
];

/// Error bodies are truncated to this many bytes.
const MAX_ERROR_BODY: usize = 2048;

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with env-overridable pool and timeout defaults.
    pub fn from_env() -> Result<Self> {
        let timeout_secs = env_parse::<u64>("GATEWAY_HTTP_TIMEOUT_SECS").unwrap_or(30);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env_parse::<usize>("GATEWAY_HTTP_POOL_MAX_IDLE_PER_HOST").unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env_parse::<u64>("GATEWAY_HTTP_POOL_IDLE_TIMEOUT_SECS").unwrap_or(90),
            )));

        if let Ok(proxy_url) = env::var("GATEWAY_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(error = %e, "ignoring invalid GATEWAY_PROXY_URL"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn execute(&self, call: PhysicalCall<'_>) -> Result<Value> {
        let mut req = self
            .client
            .post(&call.target.url)
            .json(call.body)
            .header("accept", "application/graphql-response+json, application/json");

        for (name, values) in call.headers {
            if HOP_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            for value in values {
                req = req.header(name.as_str(), value.as_str());
            }
        }
        req = req.header(CALL_ID_HEADER, call.call_id.to_string());

        if let Some(timeout) = call.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(body),
            }
            .into());
        }

        response.json::<Value>().await.map_err(|e| classify(e).into())
    }
}
