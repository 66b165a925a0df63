//! `{"requests": [...]}` in, `{"results": [{"result": ...}, ...]}` out.

use crate::types::GraphQLRequest;
use crate::{Error, Result};
use serde_json::{json, Value};

const STYLE: &str = "legacy";

pub(super) fn encode(requests: &[&GraphQLRequest]) -> Result<Value> {
    let requests = requests
        .iter()
        .map(|r| serde_json::to_value(r))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(json!({ "requests": requests }))
}

pub(super) fn decode(response: Value, expected: usize) -> Result<Vec<Value>> {
    let Value::Object(mut body) = response else {
        return Err(Error::malformed(STYLE, expected, "response is not an object"));
    };
    let Some(Value::Array(results)) = body.remove("results") else {
        return Err(Error::malformed(STYLE, expected, "missing \"results\" array"));
    };
    results
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(mut entry) => entry.remove("result").ok_or_else(|| {
                Error::malformed(STYLE, expected, format!("results[{}] has no \"result\"", i))
            }),
            _ => Err(Error::malformed(
                STYLE,
                expected,
                format!("results[{}] is not an object", i),
            )),
        })
        .collect()
}
