//! 批处理线格式模块：将子批次编码为一次物理上游调用，并把响应解码为逐项结果。
//!
//! # Batch Styles
//!
//! The wire encoding of a sub-batch is independent of the strategy that
//! formed it.
//!
//! | Style | Request body | Response body |
//! |-------|--------------|---------------|
//! | `Legacy` | `{"requests":[<req>,...]}` | `{"results":[{"result":<res>},...]}` |
//! | `Array` | `[<req>,...]` | `[<res>,...]` |
//! | `Single` | one merged request | one execution result, split by a [`QueryMerger`] |
//!
//! Whatever the style, decoding a call must yield exactly one result per
//! request it carried; anything else is a [`Error::Protocol`] for the whole call.

mod array;
mod legacy;
mod single;

pub use single::{MergedDocument, QueryMerger};

use crate::types::GraphQLRequest;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStyle {
    Legacy,
    Single,
    #[default]
    Array,
}

impl BatchStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStyle::Legacy => "legacy",
            BatchStyle::Single => "single",
            BatchStyle::Array => "array",
        }
    }
}

impl std::fmt::Display for BatchStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical call produced by encoding a sub-batch.
#[derive(Debug, Clone)]
pub struct EncodedCall {
    pub body: Value,
    /// Positions within the sub-batch this call answers for.
    pub members: Vec<usize>,
    merged: Option<MergedDocument>,
}

impl EncodedCall {
    fn covering(body: Value, count: usize) -> Self {
        Self {
            body,
            members: (0..count).collect(),
            merged: None,
        }
    }
}

/// Encoder/decoder for one upstream target.
#[derive(Clone)]
pub enum Codec {
    /// No batching: one request object per call.
    Plain,
    Legacy,
    Array,
    Single(Arc<dyn QueryMerger>),
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Codec({})", self.name())
    }
}

impl Codec {
    pub fn for_style(style: BatchStyle, merger: Option<Arc<dyn QueryMerger>>) -> Result<Self> {
        match style {
            BatchStyle::Legacy => Ok(Codec::Legacy),
            BatchStyle::Array => Ok(Codec::Array),
            BatchStyle::Single => merger.map(Codec::Single).ok_or_else(|| {
                Error::configuration_with_context(
                    "single batch style requires a query merger",
                    ErrorContext::new().with_source("style_codec"),
                )
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Plain => "plain",
            Codec::Legacy => BatchStyle::Legacy.as_str(),
            Codec::Array => BatchStyle::Array.as_str(),
            Codec::Single(_) => BatchStyle::Single.as_str(),
        }
    }

    pub fn encode(&self, requests: &[&GraphQLRequest]) -> Result<Vec<EncodedCall>> {
        let count = requests.len();
        match self {
            Codec::Plain => match requests {
                [request] => Ok(vec![EncodedCall::covering(serde_json::to_value(request)?, 1)]),
                _ => Err(Error::runtime_with_context(
                    format!("unbatched target received {} requests", count),
                    ErrorContext::new().with_source("style_codec"),
                )),
            },
            Codec::Legacy => Ok(vec![EncodedCall::covering(legacy::encode(requests)?, count)]),
            Codec::Array => Ok(vec![EncodedCall::covering(array::encode(requests)?, count)]),
            Codec::Single(merger) => match requests {
                [request] => Ok(vec![EncodedCall::covering(serde_json::to_value(request)?, 1)]),
                _ => Ok(single::merge(merger.as_ref(), requests)?
                    .into_iter()
                    .map(|doc| -> Result<EncodedCall> {
                        Ok(EncodedCall {
                            body: serde_json::to_value(&doc.request)?,
                            members: doc.members.clone(),
                            merged: Some(doc),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?),
            },
        }
    }

    /// Decodes one call's response; the result count must equal `call.members.len()`.
    pub fn decode(&self, call: &EncodedCall, response: Value) -> Result<Vec<Value>> {
        let expected = call.members.len();
        let results = match (self, &call.merged) {
            (Codec::Legacy, _) => legacy::decode(response, expected)?,
            (Codec::Array, _) => array::decode(response, expected)?,
            (Codec::Single(merger), Some(doc)) => merger.split(doc, response)?,
            (Codec::Plain, _) | (Codec::Single(_), None) => vec![response],
        };
        if results.len() != expected {
            return Err(Error::protocol(self.name(), expected, results.len()));
        }
        Ok(results)
    }
}
