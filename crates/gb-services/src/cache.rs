//! Per-post cache of the language → slug mapping.
//!
//! Each post carries a generation that every invalidation bumps, and the
//! whole cache an epoch that `clear` bumps. A reader takes a ticket before it
//! goes to the repository and may only fill the slot if nothing invalidated
//! it meanwhile, so a read that overlaps a write never puts the old mapping
//! back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    slugs: Option<BTreeMap<String, String>>,
}

/// Filled by `PostService::slug_langs`, invalidated by every write to the
/// post it caches.
#[derive(Debug, Default)]
pub struct SlugLangsCache {
    entries: DashMap<Uuid, Slot>,
    epoch: AtomicU64,
}

/// State of one post's slot when a read started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket {
    epoch: u64,
    generation: u64,
}

impl SlugLangsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, post_id: Uuid) -> Option<BTreeMap<String, String>> {
        self.entries
            .get(&post_id)
            .and_then(|slot| slot.slugs.clone())
    }

    /// Take before reading the repository; pass it back to `fill`.
    pub fn ticket(&self, post_id: Uuid) -> FillTicket {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let generation = self
            .entries
            .get(&post_id)
            .map(|slot| slot.generation)
            .unwrap_or(0);
        FillTicket { epoch, generation }
    }

    /// Stores `slugs` if the slot is unchanged since `ticket` was taken.
    /// Returns whether it did.
    pub fn fill(&self, post_id: Uuid, ticket: FillTicket, slugs: BTreeMap<String, String>) -> bool {
        let entry = self.entries.entry(post_id);
        // Checked under the slot's lock; `clear` bumps the epoch first.
        let current = self.epoch.load(Ordering::SeqCst) == ticket.epoch;
        match entry {
            Entry::Occupied(mut slot) if current && slot.get().generation == ticket.generation => {
                slot.get_mut().slugs = Some(slugs);
                true
            }
            Entry::Vacant(slot) if current && ticket.generation == 0 => {
                slot.insert(Slot {
                    generation: 0,
                    slugs: Some(slugs),
                });
                true
            }
            _ => {
                debug!(%post_id, "slug_langs read overlapped a write, not cached");
                false
            }
        }
    }

    pub fn invalidate(&self, post_id: Uuid) {
        let mut slot = self.entries.entry(post_id).or_default();
        slot.generation += 1;
        if slot.slugs.take().is_some() {
            debug!(%post_id, "slug_langs cache entry invalidated");
        }
    }

    /// Drop everything, e.g. after a language was (de)activated.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }
}
