use std::sync::atomic::{AtomicI64, Ordering};

use mcpcore_types::RequestId;

/// Lock-free monotonic allocator for outbound request ids.
///
/// `next()` returns successive positive integers starting at 1; 0 is
/// reserved as a sentinel and never allocated. Ordering among
/// allocations is not a correctness requirement — only uniqueness is —
/// so [`Ordering::Relaxed`] is sufficient.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counter: AtomicI64,
}

impl IdAllocator {
    /// A fresh allocator whose first `next()` call returns 1.
    pub fn new() -> Self {
        Self {
            counter: AtomicI64::new(0),
        }
    }

    /// Allocate the next id.
    pub fn next(&self) -> RequestId {
        let mut current = self.counter.load(Ordering::Relaxed);
        loop {
            let next = if current == i64::MAX { 1 } else { current + 1 };
            match self.counter.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return RequestId::Number(next),
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_one() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.next(), RequestId::Number(1));
        assert_eq!(alloc.next(), RequestId::Number(2));
    }

    #[test]
    fn concurrent_allocations_are_unique() {
        let alloc = Arc::new(IdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = Arc::clone(&alloc);
            handles.push(std::thread::spawn(move || {
                (0..500).map(|_| alloc.next()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id allocated");
            }
        }
        assert_eq!(seen.len(), 8 * 500);
    }
}
