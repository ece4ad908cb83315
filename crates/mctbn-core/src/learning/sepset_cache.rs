//! Memoized fits of one node under candidate parent sets.
//!
//! The constraint-based searches evaluate the same "separating set" and
//! "separating set + candidate" parent sets over and over. A [`SepsetCache`]
//! belongs to a single node and maps the canonical [`ParentSetKey`] of a parent
//! set to the node's statistics and parameters under it. Entries are immutable
//! once stored and handed out as `Arc`s.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::LearnError;
use crate::model::parent_set::{ParentConfigurations, ParentSetKey};
use crate::model::pgm::Pgm;
use crate::model::statistics::NodeFit;

/// A node fit together with the indexing of its parent configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFit {
    pub configs: ParentConfigurations,
    pub fit: NodeFit,
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Clone)]
pub struct SepsetCache {
    node: usize,
    entries: FxHashMap<ParentSetKey, Arc<CachedFit>>,
    stats: CacheStats,
}

impl SepsetCache {
    pub fn new(node: usize) -> Self {
        Self {
            node,
            entries: FxHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    /// Node whose fits this cache holds.
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn get(&self, parents: &ParentSetKey) -> Option<&Arc<CachedFit>> {
        self.entries.get(parents)
    }

    /// Returns the node's fit under `parents`, scanning the dataset only the
    /// first time a given set is requested.
    pub fn get_or_fit(
        &mut self,
        pgm: &Pgm,
        parents: &ParentSetKey,
    ) -> Result<Arc<CachedFit>, LearnError> {
        if let Some(entry) = self.entries.get(parents) {
            self.stats.hits += 1;
            return Ok(Arc::clone(entry));
        }

        self.stats.misses += 1;
        let list: Vec<usize> = parents.indices().collect();
        let entry = Arc::new(CachedFit {
            configs: pgm.parent_configurations(&list)?,
            fit: pgm.fit_with_parents(self.node, &list)?,
        });
        self.entries.insert(parents.clone(), Arc::clone(&entry));
        Ok(entry)
    }
}
