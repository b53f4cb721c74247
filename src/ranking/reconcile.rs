use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::models::{Review, ReviewSource};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Remote reviews in their original order, then surviving local ones.
    pub merged: Vec<Review>,
    /// Local reviews not yet confirmed by the remote store.
    pub pruned_local: Vec<Review>,
}

impl Reconciled {
    /// True when some local entries were superseded and the pending queue
    /// should be rewritten with `pruned_local`.
    pub fn local_changed(&self, original_local_len: usize) -> bool {
        self.pruned_local.len() < original_local_len
    }
}

pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Identity of a review: author, comment and item, ignoring case and
/// surrounding whitespace. Date and rating are not part of it.
pub fn review_key(review: &Review) -> (String, String, String) {
    (
        normalize(&review.author),
        normalize(&review.comment),
        normalize(&review.item),
    )
}

/// Merges the authoritative remote list with the local pending queue.
/// Pure: no storage is touched here.
pub fn reconcile(remote: &[Review], local: &[Review]) -> Reconciled {
    let mut slots: HashMap<(String, String, String), usize> = HashMap::with_capacity(remote.len());
    let mut merged = Vec::with_capacity(remote.len() + local.len());

    for review in remote {
        let review = review.clone().tagged(ReviewSource::Server);
        // A repeated key keeps its first position but takes the later copy.
        match slots.entry(review_key(&review)) {
            Entry::Occupied(slot) => merged[*slot.get()] = review,
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(review);
            }
        }
    }
    let remote_kept = merged.len();

    let mut pruned_local = Vec::new();
    for review in local {
        if let Entry::Vacant(slot) = slots.entry(review_key(review)) {
            slot.insert(merged.len());
            merged.push(review.clone().tagged(ReviewSource::Local));
            pruned_local.push(review.clone());
        }
    }

    debug!(
        "Reconciled reviews: {} of {} remote, {} of {} local kept",
        remote_kept,
        remote.len(),
        pruned_local.len(),
        local.len()
    );

    Reconciled {
        merged,
        pruned_local,
    }
}
