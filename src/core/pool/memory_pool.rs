//! Native memory pools
//!
//! Segments are carved from one root mapping of `total` bytes by bump
//! allocation. Carved space is never handed back to the root; it is reused
//! only through the pool's idle sets, and unmapped when the pool is disposed.

use crate::core::error::{BufferError, Result};
use crate::core::native::{NativeMemoryManager, NativeState};
use crate::core::pointer::MemoryBlock;
use crate::core::pool::{Backing, PoolManager, RecyclePolicy};
use crate::core::segment::Memory;
use crate::core::size_class::SizeClass;
use std::ops::Deref;
use tracing::debug;

/// Bump allocator over a lazily mapped root block
#[derive(Debug)]
pub struct NativeBacking {
    native: NativeMemoryManager,
}

impl NativeBacking {
    pub fn new(total: SizeClass) -> Self {
        NativeBacking {
            native: NativeMemoryManager::new(total.bytes()),
        }
    }

    pub fn native(&self) -> &NativeMemoryManager {
        &self.native
    }

    /// Bump cursor of the root block, `None` while nothing is mapped
    pub fn cursor(&self) -> Option<usize> {
        self.native.root().map(|root| root.limit())
    }
}

impl Backing for NativeBacking {
    type Storage = Memory;

    fn sub_allocate(&mut self, class: SizeClass) -> Result<Memory> {
        let root = self.native.allocate()?;
        let requested = class.bytes();
        let available = root.size() - root.limit();

        if available < requested {
            return Err(BufferError::OutOfMemory {
                requested,
                available,
            });
        }

        let offset = root.limit();
        root.limit_at(offset + requested)?;
        debug!("Carved {} bytes at offset {} of root block", requested, offset);

        Ok(Memory::new(root.sub_block(offset, requested)?))
    }

    fn teardown(&mut self) -> Result<()> {
        match self.native.state() {
            NativeState::Uninitialized => Ok(()),
            _ => self.native.release(),
        }
    }
}

pub type MemoryPool = PoolManager<NativeBacking>;

/// One-shot native pool holding a single segment
///
/// Recycling that segment unmaps the pool's memory.
pub struct SingleMemoryPool(MemoryPool);

impl SingleMemoryPool {
    pub fn new(segment: SizeClass) -> Result<Self> {
        Ok(SingleMemoryPool(PoolManager::with_policy(
            NativeBacking::new(segment),
            segment,
            segment,
            segment,
            RecyclePolicy::OneShot,
        )?))
    }

    pub fn into_inner(self) -> MemoryPool {
        self.0
    }
}

impl Deref for SingleMemoryPool {
    type Target = MemoryPool;

    fn deref(&self) -> &MemoryPool {
        &self.0
    }
}

/// Native pool of equally sized segments
pub struct FixedMemoryPool(MemoryPool);

impl FixedMemoryPool {
    pub fn new(total: SizeClass, segment: SizeClass) -> Result<Self> {
        Ok(FixedMemoryPool(PoolManager::new(
            NativeBacking::new(total),
            total,
            segment,
            segment,
        )?))
    }

    pub fn into_inner(self) -> MemoryPool {
        self.0
    }
}

impl Deref for FixedMemoryPool {
    type Target = MemoryPool;

    fn deref(&self) -> &MemoryPool {
        &self.0
    }
}

/// Native pool serving any class within `[min, max]`
pub struct ArbitraryMemoryPool(MemoryPool);

impl ArbitraryMemoryPool {
    pub fn new(total: SizeClass, min: SizeClass, max: SizeClass) -> Result<Self> {
        Ok(ArbitraryMemoryPool(PoolManager::new(
            NativeBacking::new(total),
            total,
            min,
            max,
        )?))
    }

    pub fn into_inner(self) -> MemoryPool {
        self.0
    }
}

impl Deref for ArbitraryMemoryPool {
    type Target = MemoryPool;

    fn deref(&self) -> &MemoryPool {
        &self.0
    }
}
