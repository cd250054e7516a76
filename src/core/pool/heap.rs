//! Unpooled heap allocation

use crate::core::error::{BufferError, Result};
use crate::core::pool::MemoryManager;
use crate::core::segment::{Bytes, Segment};
use crate::core::size_class::SizeClass;

/// Hands out exact-size heap segments and lets recycled ones drop
///
/// Segments are unmanaged, so `dispose` on them needs no manager at all.
/// Segments owned by some other manager are refused on `recycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapManager {
    segment_size: SizeClass,
}

impl HeapManager {
    pub fn new(segment_size: SizeClass) -> Self {
        HeapManager { segment_size }
    }
}

impl Default for HeapManager {
    fn default() -> Self {
        HeapManager::new(SizeClass::K4)
    }
}

impl MemoryManager<Bytes> for HeapManager {
    fn total_size(&self) -> Option<SizeClass> {
        None
    }

    fn segment_size(&self) -> Option<SizeClass> {
        Some(self.segment_size)
    }

    fn allocate(&self, size: usize) -> Result<Segment<Bytes>> {
        Ok(Segment::unmanaged(Bytes::new(size)))
    }

    fn recycle(&self, segment: Segment<Bytes>) -> Result<()> {
        if segment.is_managed() {
            return Err(BufferError::OwnershipViolation(segment.id()));
        }
        drop(segment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::SingleBytesPool;
    use crate::core::segment::ByteString;

    #[test]
    fn test_exact_sizes() {
        let heap = HeapManager::default();
        assert_eq!(heap.allocate(100).unwrap().size(), 100);
        assert_eq!(heap.allocate(0).unwrap().size(), 0);
        assert_eq!(heap.allocate_default().unwrap().size(), 4096);
        assert_eq!(heap.total_size(), None);
    }

    #[test]
    fn test_recycle_accepts_unmanaged() {
        let heap = HeapManager::new(SizeClass::B64);
        let seg = heap.allocate(10).unwrap();
        heap.recycle(seg).unwrap();
        heap.recycle(Segment::unmanaged(Bytes::new(3))).unwrap();
    }

    #[test]
    fn test_recycle_rejects_pool_segment() {
        let heap = HeapManager::default();
        let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B128).unwrap();
        let seg = pool.allocate(128).unwrap();
        let id = seg.id();

        assert!(matches!(
            heap.recycle(seg),
            Err(BufferError::OwnershipViolation(rejected)) if rejected == id
        ));
        assert_eq!(pool.stats().segments, 1);
    }
}
