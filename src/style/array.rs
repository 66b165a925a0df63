//! Bare JSON array in, bare JSON array out.

use crate::types::GraphQLRequest;
use crate::{Error, Result};
use serde_json::Value;

const STYLE: &str = "array";

pub(super) fn encode(requests: &[&GraphQLRequest]) -> Result<Value> {
    Ok(serde_json::to_value(requests)?)
}

pub(super) fn decode(response: Value, expected: usize) -> Result<Vec<Value>> {
    match response {
        Value::Array(results) => Ok(results),
        _ => Err(Error::malformed(STYLE, expected, "response is not an array")),
    }
}
