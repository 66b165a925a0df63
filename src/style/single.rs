//! Merged-document style: a batch becomes one (or a few) combined GraphQL
//! requests, each answered by one execution result.
//!
//! Document merging and response demultiplexing belong to a [`QueryMerger`]
//! collaborator; this module only enforces the "N members in, N results out"
//! contract around it.

use crate::types::GraphQLRequest;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::collections::HashSet;

/// One combined upstream request and the batch positions it answers for.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    pub request: GraphQLRequest,
    /// Indices into the merged batch, in the order `split` returns results.
    pub members: Vec<usize>,
    /// Opaque field-path bookkeeping owned by the merger.
    pub metadata: Value,
}

/// Query merging collaborator for [`BatchStyle::Single`](super::BatchStyle::Single).
pub trait QueryMerger: Send + Sync {
    /// Combines `requests` into one or more documents whose `members`
    /// together cover every index exactly once.
    fn merge(&self, requests: &[&GraphQLRequest]) -> Result<Vec<MergedDocument>>;

    /// Demultiplexes the execution result of `document` into one result per member.
    fn split(&self, document: &MergedDocument, response: Value) -> Result<Vec<Value>>;
}

pub(super) fn merge(merger: &dyn QueryMerger, requests: &[&GraphQLRequest]) -> Result<Vec<MergedDocument>> {
    let documents = merger.merge(requests)?;
    let mut seen = HashSet::with_capacity(requests.len());
    for document in &documents {
        for &member in &document.members {
            if member >= requests.len() || !seen.insert(member) {
                return Err(invalid_merge(format!("member index {} out of range or repeated", member)));
            }
        }
    }
    if seen.len() != requests.len() {
        return Err(invalid_merge(format!(
            "merged documents cover {} of {} requests",
            seen.len(),
            requests.len()
        )));
    }
    Ok(documents)
}

fn invalid_merge(details: String) -> Error {
    Error::runtime_with_context(
        "query merger produced an invalid partition",
        ErrorContext::new()
            .with_details(details)
            .with_source("single_style"),
    )
}
