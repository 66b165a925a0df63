//! Restores per-batch results to the callers' original order.

use super::partition::Batch;
use crate::{Error, ErrorContext, Result};

/// Original-index structure of a partition, kept after the values have been
/// moved out for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    groups: Vec<Vec<usize>>,
    len: usize,
}

impl BatchLayout {
    pub fn from_groups(groups: Vec<Vec<usize>>) -> Self {
        let len = groups.iter().map(Vec::len).sum();
        Self { groups, len }
    }

    pub fn of<T>(batches: &[Batch<T>]) -> Self {
        Self::from_groups(batches.iter().map(Batch::indices).collect())
    }

    /// Consumes the batches, returning their layout and the bare values.
    pub fn split_batches<T>(batches: Vec<Batch<T>>) -> (Self, Vec<Vec<T>>) {
        let (groups, values): (Vec<_>, Vec<_>) = batches.into_iter().map(Batch::split).unzip();
        (Self::from_groups(groups), values)
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// Total number of items across all groups.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Places `results[g][i]` at position `groups[g][i]`.
    pub fn restore<R>(&self, results: Vec<Vec<R>>) -> Result<Vec<R>> {
        if results.len() != self.groups.len() {
            return Err(Error::protocol("batch", self.groups.len(), results.len()));
        }

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(self.len).collect();
        for (group, group_results) in self.groups.iter().zip(results) {
            if group.len() != group_results.len() {
                return Err(Error::protocol("batch", group.len(), group_results.len()));
            }
            for (&index, result) in group.iter().zip(group_results) {
                match slots.get_mut(index).filter(|slot| slot.is_none()) {
                    Some(slot) => *slot = Some(result),
                    None => {
                        return Err(Error::runtime_with_context(
                            "batch layout is not a permutation of its input",
                            ErrorContext::new()
                                .with_details(format!("index {} out of range or repeated", index))
                                .with_source("order_restorer"),
                        ))
                    }
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| {
                Error::runtime_with_context(
                    "batch layout does not cover every input position",
                    ErrorContext::new().with_source("order_restorer"),
                )
            })
    }
}

/// Reconstructs a flat result list in original input order.
pub fn restore_order<R>(layout: &BatchLayout, results: Vec<Vec<R>>) -> Result<Vec<R>> {
    layout.restore(results)
}
