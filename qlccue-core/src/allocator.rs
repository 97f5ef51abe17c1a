//! Function identifier allocation

use std::collections::BTreeSet;

/// Hands out unused function IDs for a single run.
///
/// Seeded with every ID in the source workspace; each call to
/// [`IdAllocator::allocate`] returns the smallest positive ID not yet in use
/// and marks it as used.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    in_use: BTreeSet<u32>,
}

impl IdAllocator {
    /// Creates an allocator with the given IDs already taken
    pub fn new<I: IntoIterator<Item = u32>>(in_use: I) -> Self {
        Self {
            in_use: in_use.into_iter().collect(),
        }
    }

    /// Returns the smallest unused positive ID and reserves it
    pub fn allocate(&mut self) -> u32 {
        // IDs are sorted, so the first gap in 1, 2, 3, ... is the answer
        let mut candidate = 1;
        for &id in self.in_use.range(1..) {
            if id != candidate {
                break;
            }
            candidate += 1;
        }
        self.in_use.insert(candidate);
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_fills_gaps_first() {
        let mut allocator = IdAllocator::new([1, 2, 4, 7]);
        assert_eq!(allocator.allocate(), 3);
        assert_eq!(allocator.allocate(), 5);
        assert_eq!(allocator.allocate(), 6);
        assert_eq!(allocator.allocate(), 8);
    }

    #[test]
    fn test_allocate_from_empty() {
        let mut allocator = IdAllocator::default();
        assert_eq!(allocator.allocate(), 1);
        assert_eq!(allocator.allocate(), 2);
    }

    #[test]
    fn test_zero_is_never_handed_out() {
        let mut allocator = IdAllocator::new([0, 2]);
        assert_eq!(allocator.allocate(), 1);
        assert_eq!(allocator.allocate(), 3);
    }

    #[test]
    fn test_allocations_are_distinct_increasing_and_disjoint() {
        let seed = [3, 9, 10, 11, 40, 2];
        let mut allocator = IdAllocator::new(seed);
        let ids: Vec<u32> = (0..50).map(|_| allocator.allocate()).collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(ids.iter().all(|id| *id > 0 && !seed.contains(id)));
    }
}
