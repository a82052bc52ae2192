use crate::domain::detection::{Detection, DetectionId};
use crate::domain::market::PairKey;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct CooldownEntry {
    /// Event timestamp (ms) of the last admitted detection
    accepted_at: i64,
    last_id: DetectionId,
    /// Recency stamp for LRU eviction
    touched: u64,
}

/// Cool-down gate in front of the sinks.
///
/// Admission for a key happens under that key's shard lock, so of several
/// concurrent candidates for the same key exactly one can win.
pub struct Deduplicator {
    cooldown_ms: i64,
    max_entries: Option<usize>,
    entries: DashMap<PairKey, CooldownEntry>,
    clock: AtomicU64,
}

impl Deduplicator {
    pub fn new(cooldown: Duration, max_entries: Option<usize>) -> Self {
        Self {
            cooldown_ms: i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX),
            max_entries: max_entries.filter(|n| *n > 0),
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
        }
    }

    /// Returns true when the detection is novel and should be dispatched.
    ///
    /// A candidate is admitted when its key has no entry, or when its bucket
    /// id differs from the last admitted one and strictly more than the
    /// cool-down has elapsed (event time).
    pub fn admit(&self, detection: &Detection) -> bool {
        let key = PairKey::new(&detection.pair, detection.interval);
        let touched = self.clock.fetch_add(1, Ordering::Relaxed);

        let admitted = match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(CooldownEntry {
                    accepted_at: detection.timestamp,
                    last_id: detection.id.clone(),
                    touched,
                });
                true
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.touched = touched;
                let elapsed = detection.timestamp.saturating_sub(entry.accepted_at);
                if entry.last_id != detection.id && elapsed > self.cooldown_ms {
                    entry.accepted_at = detection.timestamp;
                    entry.last_id = detection.id.clone();
                    true
                } else {
                    debug!(
                        "Deduplicator: suppressed {} {} ({}ms since last admit)",
                        detection.pair, detection.interval, elapsed
                    );
                    false
                }
            }
        };

        // Entry guard is released above; the map can be scanned safely here
        if admitted {
            self.evict_if_needed();
        }
        admitted
    }

    fn evict_if_needed(&self) {
        let Some(limit) = self.max_entries else {
            return;
        };
        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().touched)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    debug!("Deduplicator: evicting least recently used key {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
