//! Merging freshly fetched entries into a bounded cache.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Deserialize;

use super::Entry;

/// Ordering of a cache after new entries are merged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// New entries in fetch order, followed by the prior cache in its order.
    #[default]
    Arrival,
    /// Descending `pubDate`; entries without a usable date sort last.
    Time,
}

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// New cache contents, at most `max_items` long.
    pub entries: Vec<Entry>,
    /// Number of fresh entries admitted, counted before truncation.
    pub added: usize,
}

impl Reconciled {
    /// Whether the cache needs to be rewritten.
    pub fn has_changes(&self) -> bool {
        self.added > 0
    }
}

/// Merge `fresh` entries into `prior`.
///
/// A fresh entry is admitted unless its identity already appears in the
/// prior cache or earlier in the fresh batch. Entries without identity are
/// always admitted. Identities repeated within the prior cache keep their
/// first copy only. When nothing is admitted the prior cache is returned
/// as is, including its length.
pub fn reconcile(
    fresh: &[Entry],
    prior: &[Entry],
    max_items: usize,
    policy: MergePolicy,
) -> Reconciled {
    let mut seen: HashSet<&str> = prior.iter().filter_map(Entry::identity).collect();

    let mut admitted: Vec<&Entry> = Vec::new();
    for entry in fresh {
        match entry.identity() {
            Some(identity) if !seen.insert(identity) => continue,
            _ => admitted.push(entry),
        }
    }

    let added = admitted.len();
    if added == 0 {
        return Reconciled {
            entries: prior.to_vec(),
            added,
        };
    }

    // Repeats inside the prior cache collapse to their first copy.
    let mut merged = admitted;
    let mut retained: HashSet<&str> = HashSet::new();
    for entry in prior {
        match entry.identity() {
            Some(identity) if !retained.insert(identity) => continue,
            _ => merged.push(entry),
        }
    }

    let mut entries: Vec<Entry> = merged.into_iter().cloned().collect();

    if policy == MergePolicy::Time {
        // Stable, so equal dates keep arrival order.
        entries.sort_by_cached_key(|entry| Reverse(entry.published_at()));
    }

    entries.truncate(max_items);

    Reconciled { entries, added }
}
