//! Size-classed segment pools
//!
//! A pool hands out segments rounded up to a `SizeClass` and takes them back
//! through `recycle`, keeping idle segments per class for reuse. Fresh
//! storage comes from a `Backing`, which is where heap, native and
//! word-packed pools differ.
//!
//! Pools are single-threaded (`Rc`/`RefCell` inside). Each segment keeps a
//! weak reference to the pool that produced it, so `Segment::dispose` can
//! route it home without the pool being borrowed by the caller.

pub mod bytes_pool;
pub mod heap;
pub mod memory_pool;
pub mod model_pool;
pub mod null;

pub use bytes_pool::{ArbitraryBytesPool, BytesBacking, BytesPool, SingleBytesPool};
pub use heap::HeapManager;
pub use memory_pool::{ArbitraryMemoryPool, FixedMemoryPool, MemoryPool, NativeBacking, SingleMemoryPool};
pub use model_pool::{ArbitraryModelPool, ModelBacking, ModelPool, SingleModelPool};
pub use null::NullManager;

use crate::core::error::{BufferError, Result};
use crate::core::segment::{ByteString, Segment, SegmentId, Storage};
use crate::core::size_class::SizeClass;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;
type FastSet<K> = HashSet<K, ahash::RandomState>;

/// Allocation contract shared by every manager
pub trait MemoryManager<B: Storage> {
    /// Overall budget, `None` when the manager has none
    fn total_size(&self) -> Option<SizeClass>;

    /// Segment size used by `allocate_default`, `None` when undefined
    fn segment_size(&self) -> Option<SizeClass>;

    fn allocate_default(&self) -> Result<Segment<B>> {
        match self.segment_size() {
            Some(class) => self.allocate(class.bytes()),
            None => Err(BufferError::Unsupported("manager has no default segment size")),
        }
    }

    fn allocate(&self, size: usize) -> Result<Segment<B>>;

    fn recycle(&self, segment: Segment<B>) -> Result<()>;
}

/// Source of fresh storage for a pool
pub trait Backing: 'static {
    type Storage: Storage;

    /// Produce new storage of exactly `class` bytes
    fn sub_allocate(&mut self, class: SizeClass) -> Result<Self::Storage>;

    /// Release everything the backing holds
    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What a recycle does to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecyclePolicy {
    /// Keep the segment idle for the next allocation of its class
    Reuse,
    /// The pool exists for one segment; recycling it tears the pool down
    OneShot,
}

/// Pool usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total_size: SizeClass,
    pub min_size: SizeClass,
    pub max_size: SizeClass,
    /// Bytes of storage created so far
    pub allocated_bytes: usize,
    /// Segments produced and still tracked
    pub segments: usize,
    pub idle_segments: usize,
    pub reuse_hits: u64,
    pub fresh_allocations: u64,
}

impl PoolStats {
    /// Fraction of allocations served from idle segments
    pub fn reuse_rate(&self) -> f64 {
        let total = self.reuse_hits + self.fresh_allocations;
        if total == 0 {
            0.0
        } else {
            self.reuse_hits as f64 / total as f64
        }
    }
}

struct PoolState<K: Backing> {
    backing: K,
    idle: FastMap<SizeClass, Vec<Segment<K::Storage>>>,
    all: FastSet<SegmentId>,
    allocated_bytes: usize,
    reuse_hits: u64,
    fresh_allocations: u64,
    disposed: bool,
}

struct PoolInner<K: Backing> {
    this: Weak<PoolInner<K>>,
    total: SizeClass,
    min: SizeClass,
    max: SizeClass,
    policy: RecyclePolicy,
    state: RefCell<PoolState<K>>,
}

/// Generic size-classed pool over a `Backing`
///
/// Cloning yields another handle to the same pool.
pub struct PoolManager<K: Backing> {
    inner: Rc<PoolInner<K>>,
}

impl<K: Backing> Clone for PoolManager<K> {
    fn clone(&self) -> Self {
        PoolManager {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Backing> PoolManager<K> {
    /// Create a reusing pool; requires `min <= max <= total`
    pub fn new(backing: K, total: SizeClass, min: SizeClass, max: SizeClass) -> Result<Self> {
        Self::with_policy(backing, total, min, max, RecyclePolicy::Reuse)
    }

    pub fn with_policy(
        backing: K,
        total: SizeClass,
        min: SizeClass,
        max: SizeClass,
        policy: RecyclePolicy,
    ) -> Result<Self> {
        if min > max || max > total {
            return Err(BufferError::InvalidConfig(format!(
                "pool bounds must satisfy min <= max <= total (got {} / {} / {})",
                min, max, total
            )));
        }

        let inner = Rc::new_cyclic(|this| PoolInner {
            this: this.clone(),
            total,
            min,
            max,
            policy,
            state: RefCell::new(PoolState {
                backing,
                idle: FastMap::default(),
                all: FastSet::default(),
                allocated_bytes: 0,
                reuse_hits: 0,
                fresh_allocations: 0,
                disposed: false,
            }),
        });

        info!(
            "Created {:?} pool: total {}, segments {}..={}",
            policy, total, min, max
        );

        Ok(PoolManager { inner })
    }

    pub fn min_size(&self) -> SizeClass {
        self.inner.min
    }

    pub fn max_size(&self) -> SizeClass {
        self.inner.max
    }

    pub fn policy(&self) -> RecyclePolicy {
        self.inner.policy
    }

    /// Whether `segment` was produced by this pool and is still tracked
    pub fn contains(&self, segment: &Segment<K::Storage>) -> bool {
        self.inner.state.borrow().all.contains(&segment.id())
    }

    /// Idle segments waiting in `class`
    pub fn idle_count(&self, class: SizeClass) -> usize {
        self.inner
            .state
            .borrow()
            .idle
            .get(&class)
            .map_or(0, Vec::len)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.borrow();
        PoolStats {
            total_size: self.inner.total,
            min_size: self.inner.min,
            max_size: self.inner.max,
            allocated_bytes: state.allocated_bytes,
            segments: state.all.len(),
            idle_segments: state.idle.values().map(Vec::len).sum(),
            reuse_hits: state.reuse_hits,
            fresh_allocations: state.fresh_allocations,
        }
    }

    /// Forget every segment and release the backing
    pub fn dispose(&self) -> Result<()> {
        self.inner.dispose()
    }
}

impl<K: Backing> MemoryManager<K::Storage> for PoolManager<K> {
    fn total_size(&self) -> Option<SizeClass> {
        self.inner.total_size()
    }

    fn segment_size(&self) -> Option<SizeClass> {
        self.inner.segment_size()
    }

    fn allocate(&self, size: usize) -> Result<Segment<K::Storage>> {
        self.inner.allocate(size)
    }

    fn recycle(&self, segment: Segment<K::Storage>) -> Result<()> {
        self.inner.recycle(segment)
    }
}

impl<K: Backing> PoolInner<K> {
    fn dispose(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Ok(());
        }

        state.disposed = true;
        state.idle.clear();
        state.all.clear();
        state.backing.teardown()?;

        info!(
            "Disposed pool (total {}, {} bytes allocated)",
            self.total, state.allocated_bytes
        );
        Ok(())
    }
}

impl<K: Backing> MemoryManager<K::Storage> for PoolInner<K> {
    fn total_size(&self) -> Option<SizeClass> {
        Some(self.total)
    }

    /// Smallest class the pool serves
    fn segment_size(&self) -> Option<SizeClass> {
        Some(self.min)
    }

    fn allocate(&self, size: usize) -> Result<Segment<K::Storage>> {
        let class = SizeClass::find_lowest_above(size)?;
        if class < self.min || class > self.max {
            return Err(BufferError::SizeOutOfRange {
                requested: size,
                min: self.min.bytes(),
                max: self.max.bytes(),
            });
        }

        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Err(BufferError::Lifecycle("pool already disposed"));
        }

        if let Some(segment) = state.idle.get_mut(&class).and_then(Vec::pop) {
            state.reuse_hits += 1;
            debug!("Reusing segment {} of class {}", segment.id(), class);
            return Ok(segment);
        }

        let storage = state.backing.sub_allocate(class)?;
        let manager: Weak<dyn MemoryManager<K::Storage>> = self.this.clone();
        let segment = Segment::new(storage, Some(class), Some(manager));

        state.all.insert(segment.id());
        state.fresh_allocations += 1;
        state.allocated_bytes += class.bytes();

        if state.allocated_bytes > self.total.bytes() {
            warn!(
                "Pool over budget: {} bytes allocated, total {}",
                state.allocated_bytes, self.total
            );
        }

        debug!("Allocated segment {} of class {}", segment.id(), class);
        Ok(segment)
    }

    fn recycle(&self, mut segment: Segment<K::Storage>) -> Result<()> {
        {
            let state = self.state.borrow();
            if state.disposed {
                return Err(BufferError::Lifecycle("pool already disposed"));
            }
            if !state.all.contains(&segment.id()) {
                return Err(BufferError::OwnershipViolation(segment.id()));
            }
        }

        if self.policy == RecyclePolicy::OneShot {
            warn!(
                "Recycling segment {} tears down its one-shot pool",
                segment.id()
            );
            drop(segment);
            return self.dispose();
        }

        segment.clear()?;
        let class = segment
            .size_class()
            .ok_or(BufferError::OwnershipViolation(segment.id()))?;

        self.state
            .borrow_mut()
            .idle
            .entry(class)
            .or_default()
            .push(segment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::Bytes;

    fn pool() -> BytesPool {
        PoolManager::new(BytesBacking::new(), SizeClass::B256, SizeClass::B32, SizeClass::B128)
            .unwrap()
    }

    #[test]
    fn test_bounds_validated() {
        let result = PoolManager::new(
            BytesBacking::new(),
            SizeClass::B64,
            SizeClass::B32,
            SizeClass::B128,
        );
        assert!(matches!(result, Err(BufferError::InvalidConfig(_))));

        let result = PoolManager::new(
            BytesBacking::new(),
            SizeClass::K1,
            SizeClass::B128,
            SizeClass::B64,
        );
        assert!(matches!(result, Err(BufferError::InvalidConfig(_))));
    }

    #[test]
    fn test_allocate_rounds_to_class() {
        let pool = pool();
        let seg = pool.allocate(33).unwrap();
        assert_eq!(seg.size(), 64);
        assert_eq!(seg.limit(), 64);
        assert_eq!(seg.size_class(), Some(SizeClass::B64));
        assert!(pool.contains(&seg));
    }

    #[test]
    fn test_size_out_of_range() {
        let pool = PoolManager::new(
            BytesBacking::new(),
            SizeClass::B256,
            SizeClass::B64,
            SizeClass::B128,
        )
        .unwrap();

        assert!(matches!(
            pool.allocate(200),
            Err(BufferError::SizeOutOfRange { requested: 200, .. })
        ));
        assert!(matches!(
            pool.allocate(10),
            Err(BufferError::SizeOutOfRange { .. })
        ));
        assert!(pool.allocate(64).is_ok());
    }

    #[test]
    fn test_recycle_then_reuse() {
        let pool = pool();
        let seg = pool.allocate(100).unwrap();
        let id = seg.id();

        pool.recycle(seg).unwrap();
        assert_eq!(pool.idle_count(SizeClass::B128), 1);

        let again = pool.allocate(128).unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(pool.idle_count(SizeClass::B128), 0);

        let stats = pool.stats();
        assert_eq!(stats.reuse_hits, 1);
        assert_eq!(stats.fresh_allocations, 1);
        assert_eq!(stats.segments, 1);
        assert!((stats.reuse_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recycle_clears_limit() {
        let pool = pool();
        let mut seg = pool.allocate(64).unwrap();
        seg.limit_at(3).unwrap();
        pool.recycle(seg).unwrap();
        assert_eq!(pool.allocate(64).unwrap().limit(), 64);
    }

    #[test]
    fn test_dispose_routes_home() {
        let pool = pool();
        let seg = pool.allocate(32).unwrap();
        let id = seg.id();
        seg.dispose().unwrap();
        assert_eq!(pool.allocate(32).unwrap().id(), id);
    }

    #[test]
    fn test_foreign_segment_rejected() {
        let first = pool();
        let second = pool();
        let seg = first.allocate(32).unwrap();
        let id = seg.id();

        assert!(matches!(
            second.recycle(seg),
            Err(BufferError::OwnershipViolation(rejected)) if rejected == id
        ));
        assert!(matches!(
            first.recycle(Segment::unmanaged(Bytes::new(32))),
            Err(BufferError::OwnershipViolation(_))
        ));
    }

    #[test]
    fn test_dispose_pool() {
        let pool = pool();
        let seg = pool.allocate(32).unwrap();
        pool.dispose().unwrap();

        assert!(pool.is_disposed());
        assert!(matches!(pool.allocate(32), Err(BufferError::Lifecycle(_))));
        assert!(matches!(pool.recycle(seg), Err(BufferError::Lifecycle(_))));
        assert!(pool.dispose().is_ok());
    }

    #[test]
    fn test_dispose_after_pool_dropped() {
        let seg = pool().allocate(32).unwrap();
        assert!(matches!(seg.dispose(), Err(BufferError::Lifecycle(_))));
    }

    #[test]
    fn test_sizes_reported() {
        let pool = pool();
        assert_eq!(pool.total_size(), Some(SizeClass::B256));
        assert_eq!(pool.segment_size(), Some(SizeClass::B32));
        assert_eq!(pool.allocate_default().unwrap().size(), 32);
    }

    #[test]
    fn test_default_allocation_uses_smallest_class() {
        let pool = ArbitraryBytesPool::new(SizeClass::K1, SizeClass::B32, SizeClass::B512).unwrap();
        assert_eq!(pool.segment_size(), Some(SizeClass::B32));

        let seg = pool.allocate_default().unwrap();
        assert_eq!(seg.size_class(), Some(SizeClass::B32));
        assert_eq!(pool.allocate(512).unwrap().size(), 512);
    }

    #[test]
    fn test_handles_share_state() {
        let pool = pool();
        let other = pool.clone();
        let seg = pool.allocate(32).unwrap();
        assert!(other.contains(&seg));
        other.recycle(seg).unwrap();
        assert_eq!(pool.idle_count(SizeClass::B32), 1);
    }
}
