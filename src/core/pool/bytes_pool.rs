//! Heap pools
//!
//! Heap storage has no hard ceiling, so `total` acts as a soft budget:
//! allocations past it succeed and are logged.

use crate::core::error::Result;
use crate::core::pool::{Backing, PoolManager};
use crate::core::segment::Bytes;
use crate::core::size_class::SizeClass;
use std::ops::Deref;

/// Fresh zeroed heap arrays
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesBacking;

impl BytesBacking {
    pub fn new() -> Self {
        BytesBacking
    }
}

impl Backing for BytesBacking {
    type Storage = Bytes;

    fn sub_allocate(&mut self, class: SizeClass) -> Result<Bytes> {
        Ok(Bytes::new(class.bytes()))
    }
}

pub type BytesPool = PoolManager<BytesBacking>;

/// Heap pool serving one segment size, segments reused
pub struct SingleBytesPool(BytesPool);

impl SingleBytesPool {
    pub fn new(total: SizeClass, segment: SizeClass) -> Result<Self> {
        Ok(SingleBytesPool(PoolManager::new(
            BytesBacking::new(),
            total,
            segment,
            segment,
        )?))
    }

    pub fn into_inner(self) -> BytesPool {
        self.0
    }
}

impl Deref for SingleBytesPool {
    type Target = BytesPool;

    fn deref(&self) -> &BytesPool {
        &self.0
    }
}

/// Heap pool serving any class within `[min, max]`
pub struct ArbitraryBytesPool(BytesPool);

impl ArbitraryBytesPool {
    pub fn new(total: SizeClass, min: SizeClass, max: SizeClass) -> Result<Self> {
        Ok(ArbitraryBytesPool(PoolManager::new(
            BytesBacking::new(),
            total,
            min,
            max,
        )?))
    }

    pub fn into_inner(self) -> BytesPool {
        self.0
    }
}

impl Deref for ArbitraryBytesPool {
    type Target = BytesPool;

    fn deref(&self) -> &BytesPool {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::MemoryManager;
    use crate::core::segment::ByteString;
    use std::collections::HashSet;

    #[test]
    fn test_single_pool_past_soft_budget() {
        let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B128).unwrap();

        let segments: Vec<_> = (0..10).map(|_| pool.allocate_default().unwrap()).collect();
        let ids: HashSet<_> = segments.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), 10);
        assert!(segments.iter().all(|s| s.size() == 128));

        let eleventh = pool.allocate(128).unwrap();
        assert!(!ids.contains(&eleventh.id()));
        assert_eq!(pool.stats().allocated_bytes, 11 * 128);
    }

    #[test]
    fn test_single_pool_rejects_other_classes() {
        let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B128).unwrap();
        assert!(pool.allocate(64).is_err());
        assert!(pool.allocate(129).is_err());
        // Rounded up into the class
        assert!(pool.allocate(65).is_ok());
    }

    #[test]
    fn test_arbitrary_pool_classes() {
        let pool = ArbitraryBytesPool::new(SizeClass::B256, SizeClass::B32, SizeClass::B128).unwrap();
        assert_eq!(pool.allocate(1).unwrap().size(), 32);
        assert_eq!(pool.allocate(64).unwrap().size(), 64);
        assert_eq!(pool.allocate(100).unwrap().size(), 128);
        assert!(pool.allocate(129).is_err());
    }
}
