//! 批次划分模块：按键、序列和大小上限将候选请求划分为子批次，并恢复原始顺序。
//!
//! # Batch Partitioning
//!
//! A flushed window is an ordered list of candidates. [`BatchByKey`] splits it
//! into sub-batches that may each travel as one physical upstream call, and
//! [`BatchLayout`] remembers where every item came from so per-batch results
//! can be put back in caller order.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchByKey`] | Key / series / equality / size-cap partitioner |
//! | [`ClusterBy`] | Optional post-hoc clustering of each batch |
//! | [`Batch`] | Ordered group of [`BatchEntry`] values |
//! | [`BatchLayout`] | Original-index structure used by [`restore_order`] |
//!
//! ## Example
//!
//! ```rust
//! use subgraph_batching::batch::{BatchByKey, BatchLayout};
//!
//! let items = vec![("q", 1), ("q", 2), ("m", 1), ("q", 1)];
//! let batches = BatchByKey::new(|i: &(&str, u32)| i.1)
//!     .with_series(|i: &(&str, u32)| i.0)
//!     .with_max_size(Some(50))
//!     .partition(items);
//! // the mutation freezes the first query batch
//! assert_eq!(batches.len(), 4);
//!
//! let (layout, groups) = BatchLayout::split_batches(batches);
//! let results: Vec<Vec<u32>> = groups
//!     .into_iter()
//!     .map(|g| g.into_iter().map(|(_, k)| k * 10).collect())
//!     .collect();
//! assert_eq!(layout.restore(results).unwrap(), vec![10, 20, 10, 10]);
//! ```

mod order;
mod partition;

pub use order::{restore_order, BatchLayout};
pub use partition::{batch_by_key, Batch, BatchByKey, BatchEntry, ClusterBy};
