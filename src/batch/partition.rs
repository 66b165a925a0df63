//! Key/series/size partitioning of a candidate window.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// A candidate paired with its position in the list it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry<T> {
    pub value: T,
    pub original_index: usize,
}

/// Ordered group of mutually compatible entries.
///
/// Entries keep their relative input order unless a clustering comparator
/// re-sorted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    entries: Vec<BatchEntry<T>>,
}

impl<T> Batch<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn singleton(value: T, original_index: usize) -> Self {
        Self {
            entries: vec![BatchEntry {
                value,
                original_index,
            }],
        }
    }

    fn push(&mut self, value: T, original_index: usize) {
        self.entries.push(BatchEntry {
            value,
            original_index,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry<T>] {
        &self.entries
    }

    /// The item every later candidate is compared against.
    pub fn representative(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.value)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.original_index).collect()
    }

    pub fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|e| e.value).collect()
    }

    /// Separates original indices from values.
    pub fn split(self) -> (Vec<usize>, Vec<T>) {
        self.entries
            .into_iter()
            .map(|e| (e.original_index, e.value))
            .unzip()
    }
}

/// Post-hoc clustering of each output batch.
pub struct ClusterBy<'f, T> {
    comparator: Option<Box<dyn Fn(&T, &T) -> Ordering + 'f>>,
    clusterable: Box<dyn Fn(&T, &T) -> bool + 'f>,
}

impl<'f, T> ClusterBy<'f, T> {
    /// `clusterable(base, candidate)` decides whether `candidate` may join the
    /// run started by `base`.
    pub fn new(clusterable: impl Fn(&T, &T) -> bool + 'f) -> Self {
        Self {
            comparator: None,
            clusterable: Box::new(clusterable),
        }
    }

    pub fn with_comparator(mut self, comparator: impl Fn(&T, &T) -> Ordering + 'f) -> Self {
        self.comparator = Some(Box::new(comparator));
        self
    }

    fn split(&self, batch: Batch<T>) -> Vec<Batch<T>> {
        let mut entries = batch.entries;
        if let Some(cmp) = &self.comparator {
            entries.sort_by(|a, b| cmp(&a.value, &b.value));
        }

        let mut clusters: Vec<Batch<T>> = Vec::new();
        for entry in entries {
            let joins = clusters
                .last()
                .and_then(|c| c.representative())
                .map_or(false, |base| (self.clusterable)(base, &entry.value));
            if joins {
                if let Some(current) = clusters.last_mut() {
                    current.entries.push(entry);
                }
            } else {
                clusters.push(Batch {
                    entries: vec![entry],
                });
            }
        }
        clusters
    }
}

/// Splits an ordered candidate list into sub-batches.
///
/// - `key` selects the partition an item belongs to.
/// - `series` is a causal ordering domain: whenever it changes between two
///   consecutive items, every batch opened so far is frozen and can no longer
///   receive items.
/// - `equality` refines batches sharing a key; an item joins the first open
///   batch whose representative it is equal to.
/// - `max_size` caps a batch; a full batch is evicted from consideration and
///   a fresh one is opened in its slot.
/// - `clustering` regroups each output batch afterwards.
///
/// Batches come out in order of first appearance of their first member.
pub struct BatchByKey<'f, T, K, S = ()> {
    key: Box<dyn Fn(&T) -> K + 'f>,
    series: Box<dyn Fn(&T) -> S + 'f>,
    equality: Option<Box<dyn Fn(&T, &T) -> bool + 'f>>,
    max_size: Option<usize>,
    clustering: Option<ClusterBy<'f, T>>,
}

impl<'f, T, K> BatchByKey<'f, T, K, ()> {
    pub fn new(key: impl Fn(&T) -> K + 'f) -> Self {
        Self {
            key: Box::new(key),
            series: Box::new(|_| ()),
            equality: None,
            max_size: None,
            clustering: None,
        }
    }
}

impl<'f, T, K, S> BatchByKey<'f, T, K, S> {
    pub fn with_series<S2>(self, series: impl Fn(&T) -> S2 + 'f) -> BatchByKey<'f, T, K, S2> {
        BatchByKey {
            key: self.key,
            series: Box::new(series),
            equality: self.equality,
            max_size: self.max_size,
            clustering: self.clustering,
        }
    }

    pub fn with_equality(mut self, equality: impl Fn(&T, &T) -> bool + 'f) -> Self {
        self.equality = Some(Box::new(equality));
        self
    }

    /// `None` leaves batches unbounded.
    pub fn with_max_size(mut self, max_size: Option<usize>) -> Self {
        self.max_size = max_size.filter(|m| *m > 0);
        self
    }

    pub fn with_clustering(mut self, clustering: ClusterBy<'f, T>) -> Self {
        self.clustering = Some(clustering);
        self
    }
}

impl<'f, T, K, S> BatchByKey<'f, T, K, S>
where
    K: Hash + Eq,
    S: PartialEq,
{
    pub fn partition(&self, items: Vec<T>) -> Vec<Batch<T>> {
        if items.len() <= 1 {
            return items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Batch::singleton(item, i))
                .collect();
        }

        // batch id -> entries; `open` only ever holds ids, so freezing and
        // eviction never touch the batches themselves.
        let mut batches: Vec<Batch<T>> = Vec::new();
        let mut open: HashMap<K, Vec<usize>> = HashMap::new();
        let mut current_series: Option<S> = None;

        for (index, item) in items.into_iter().enumerate() {
            let series = (self.series)(&item);
            if current_series.as_ref() != Some(&series) {
                open.clear();
                current_series = Some(series);
            }

            let slots = open.entry((self.key)(&item)).or_default();
            let matched = match &self.equality {
                Some(eq) => slots.iter().position(|&id| {
                    batches[id]
                        .representative()
                        .map_or(false, |rep| eq(rep, &item))
                }),
                None => (!slots.is_empty()).then_some(0),
            };

            let target = match matched {
                Some(slot)
                    if self
                        .max_size
                        .map_or(false, |max| batches[slots[slot]].len() >= max) =>
                {
                    let id = batches.len();
                    batches.push(Batch::new());
                    slots[slot] = id;
                    id
                }
                Some(slot) => slots[slot],
                None => {
                    let id = batches.len();
                    batches.push(Batch::new());
                    slots.push(id);
                    id
                }
            };
            batches[target].push(item, index);
        }

        match &self.clustering {
            Some(clustering) => batches
                .into_iter()
                .flat_map(|b| clustering.split(b))
                .collect(),
            None => batches,
        }
    }
}

/// Partitions by key alone.
pub fn batch_by_key<T, K: Hash + Eq>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<Batch<T>> {
    BatchByKey::new(key).partition(items)
}
