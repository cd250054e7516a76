//! The single native allocation a pool carves segments from

use crate::core::error::{BufferError, Result};
use crate::core::native::segment_block::SegmentBlock;
use crate::core::pointer::{BlockSpan, MemoryBlock, TypePointer};
use memmap2::{MmapMut, MmapOptions};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

/// Anonymous mapping with a bump cursor
///
/// `limit` starts at 0 and is advanced as child blocks are carved. The
/// mapping is released when the block is dropped; any `SegmentBlock`
/// created from it is invalidated at that moment and refuses further access.
pub struct RootBlock {
    map: MmapMut,
    base: *mut u8,
    limit: usize,
    live: Rc<Cell<bool>>,
}

impl RootBlock {
    /// Map `size` zeroed bytes of anonymous memory
    pub fn map(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(BufferError::InvalidSize(0));
        }

        let mut map = MmapOptions::new().len(size).map_anon()?;
        let base = map.as_mut_ptr();

        info!("Mapped root block of {} bytes at {:#x}", size, base as usize);

        Ok(RootBlock {
            map,
            base,
            limit: 0,
            live: Rc::new(Cell::new(true)),
        })
    }

    /// Bytes left above the cursor
    pub fn remaining(&self) -> usize {
        self.map.len() - self.limit
    }

    /// Create a view over `[offset, offset + size)`
    ///
    /// The range must already lie below `limit()`.
    pub fn sub_block(&self, offset: usize, size: usize) -> Result<SegmentBlock> {
        let span = self.check_sub_range(offset, size)?;
        // SAFETY: check_sub_range guarantees offset + size <= limit <= map.len()
        let ptr = unsafe { self.base.add(offset) };
        Ok(SegmentBlock::new(self.span(), span, ptr, Rc::clone(&self.live)))
    }
}

impl MemoryBlock for RootBlock {
    fn parent(&self) -> Option<BlockSpan> {
        None
    }

    fn address(&self) -> TypePointer<u8> {
        TypePointer::new(self.base as usize)
    }

    fn size(&self) -> usize {
        self.map.len()
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn limit_at(&mut self, limit: usize) -> Result<()> {
        if limit > self.map.len() {
            return Err(BufferError::InvalidLimit {
                limit,
                size: self.map.len(),
            });
        }
        self.limit = limit;
        Ok(())
    }
}

impl Drop for RootBlock {
    fn drop(&mut self) {
        self.live.set(false);
        info!(
            "Unmapping root block of {} bytes at {:#x}",
            self.map.len(),
            self.base as usize
        );
    }
}

impl std::fmt::Debug for RootBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootBlock")
            .field("address", &self.address())
            .field("size", &self.map.len())
            .field("limit", &self.limit)
            .finish()
    }
}
