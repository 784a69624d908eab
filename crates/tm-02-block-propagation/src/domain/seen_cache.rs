//! Bounded memory of already routed documents.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Inner {
    digests: HashSet<String>,
    insertion_order: VecDeque<String>,
}

/// FIFO-evicting set of document digests.
#[derive(Debug)]
pub struct SeenCache {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl SeenCache {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_size: max_size.max(1),
        }
    }

    #[must_use]
    pub fn has_seen(&self, digest: &str) -> bool {
        self.inner.lock().digests.contains(digest)
    }

    /// Record `digest`. Returns `false` if it was already recorded.
    pub fn mark_seen(&self, digest: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.digests.contains(digest) {
            return false;
        }
        if inner.digests.len() >= self.max_size {
            if let Some(oldest) = inner.insertion_order.pop_front() {
                inner.digests.remove(&oldest);
            }
        }
        inner.digests.insert(digest.to_string());
        inner.insertion_order.push_back(digest.to_string());
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().digests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_once() {
        let cache = SeenCache::new(10);
        assert!(cache.mark_seen("a"));
        assert!(!cache.mark_seen("a"));
        assert!(cache.has_seen("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let cache = SeenCache::new(2);
        cache.mark_seen("a");
        cache.mark_seen("b");
        cache.mark_seen("c");
        assert!(!cache.has_seen("a"));
        assert!(cache.has_seen("b"));
        assert!(cache.has_seen("c"));
        assert_eq!(cache.len(), 2);
    }
}
