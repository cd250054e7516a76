//! Native memory backend over a `SegmentBlock`

use crate::core::error::Result;
use crate::core::native::SegmentBlock;
use crate::core::pointer::{MemoryBlock, TypePointer};
use crate::core::segment::{BackendKind, Storage, Width};

/// Segment storage living inside a pool's root mapping
#[derive(Debug)]
pub struct Memory {
    block: SegmentBlock,
}

impl Memory {
    pub fn new(block: SegmentBlock) -> Self {
        Memory { block }
    }

    pub fn block(&self) -> &SegmentBlock {
        &self.block
    }
}

impl Storage for Memory {
    const KIND: BackendKind = BackendKind::Memory;

    fn capacity(&self) -> usize {
        self.block.size()
    }

    fn load(&self, index: usize, width: Width) -> Result<u64> {
        self.block.read(index, width)
    }

    fn store(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        self.block.write(index, width, value)
    }

    fn on_limit(&mut self, limit: usize) -> Result<()> {
        self.block.limit_at(limit)
    }

    fn address(&self) -> Option<TypePointer<u8>> {
        Some(self.block.address())
    }
}
