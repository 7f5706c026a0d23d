use std::collections::VecDeque;

use driftwatch_core_types::PredictionRecord;
use parking_lot::RwLock;

pub const DEFAULT_CAPACITY: usize = 50;

/// Newest-first ring of the most recent `capacity` items.
///
/// One writer pushes; any number of readers take snapshots. A snapshot is cloned under
/// the read lock, so it never observes a half-applied push.
#[derive(Debug)]
pub struct BoundedRing<T> {
    capacity: usize,
    inner: RwLock<Ring<T>>,
}

#[derive(Debug)]
struct Ring<T> {
    data: VecDeque<T>,
    pushed: u64,
}

pub type EventBuffer = BoundedRing<PredictionRecord>;

impl<T> BoundedRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(Ring {
                data: VecDeque::with_capacity(capacity),
                pushed: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Total number of items ever pushed, including evicted ones.
    pub fn pushed(&self) -> u64 {
        self.inner.read().pushed
    }

    /// Insert at the front, evicting the oldest entry when full.
    pub fn push(&self, item: T) {
        let mut ring = self.inner.write();
        if ring.data.len() == self.capacity {
            ring.data.pop_back();
        }
        ring.data.push_front(item);
        ring.pushed += 1;
    }
}

impl<T: Clone> BoundedRing<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.read().data.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<T> {
        self.inner.read().data.front().cloned()
    }
}

impl<T> Default for BoundedRing<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn keeps_last_capacity_items_newest_first() {
        let ring = BoundedRing::new(3);
        for i in 0..7u32 {
            ring.push(i);
        }
        assert_eq!(ring.snapshot(), vec![6, 5, 4]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pushed(), 7);
        assert_eq!(ring.latest(), Some(6));
    }

    #[test]
    fn below_capacity_nothing_is_evicted() {
        let ring = BoundedRing::new(50);
        for i in 0..10u32 {
            ring.push(i);
        }
        let snap = ring.snapshot();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap.first(), Some(&9));
        assert_eq!(snap.last(), Some(&0));
    }

    #[test]
    fn length_never_exceeds_capacity_for_any_push_count() {
        for capacity in [1usize, 2, 5, 50] {
            for pushes in 0..(capacity * 3) {
                let ring = BoundedRing::new(capacity);
                for i in 0..pushes {
                    ring.push(i);
                }
                let snap = ring.snapshot();
                assert_eq!(snap.len(), pushes.min(capacity));
                let expected: Vec<usize> = (0..pushes).rev().take(capacity).collect();
                assert_eq!(snap, expected);
            }
        }
    }

    #[test]
    fn duplicates_are_kept() {
        let ring = BoundedRing::new(4);
        ring.push("same");
        ring.push("same");
        assert_eq!(ring.snapshot(), vec!["same", "same"]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let ring = BoundedRing::new(0);
        ring.push(1u8);
        ring.push(2u8);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.snapshot(), vec![2]);
    }

    #[test]
    fn readers_only_see_whole_pushes() {
        let ring = Arc::new(BoundedRing::new(16));
        let writer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..5_000u64 {
                    ring.push(i);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snap = ring.snapshot();
                        assert!(snap.len() <= 16);
                        for pair in snap.windows(2) {
                            assert_eq!(pair[0], pair[1] + 1, "snapshot must be contiguous");
                        }
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(ring.latest(), Some(4_999));
    }
}
