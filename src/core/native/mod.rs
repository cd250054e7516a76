//! Native memory: one anonymous mapping per manager, carved by bump allocation

pub mod root_block;
pub mod segment_block;

pub use root_block::RootBlock;
pub use segment_block::SegmentBlock;

use crate::core::error::{BufferError, Result};
use std::cell::OnceCell;
use tracing::debug;

/// Lifecycle of a `NativeMemoryManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeState {
    Uninitialized,
    Allocated,
    Released,
}

/// Owner of exactly one `RootBlock`
///
/// The block is mapped lazily on the first `allocate()` and handed out again
/// on every later call. `release()` unmaps it for good.
#[derive(Debug)]
pub struct NativeMemoryManager {
    size: usize,
    state: NativeState,
    root: OnceCell<RootBlock>,
}

impl NativeMemoryManager {
    pub fn new(size: usize) -> Self {
        NativeMemoryManager {
            size,
            state: NativeState::Uninitialized,
            root: OnceCell::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self) -> NativeState {
        self.state
    }

    /// The mapped root block, if any
    pub fn root(&self) -> Option<&RootBlock> {
        self.root.get()
    }

    /// Map the root block if needed and return it
    pub fn allocate(&mut self) -> Result<&mut RootBlock> {
        match self.state {
            NativeState::Released => {
                Err(BufferError::Lifecycle("native memory already released"))
            }
            NativeState::Uninitialized => {
                let root = RootBlock::map(self.size)?;
                self.state = NativeState::Allocated;
                let _ = self.root.set(root);
                self.root
                    .get_mut()
                    .ok_or(BufferError::Lifecycle("root block missing after map"))
            }
            NativeState::Allocated => self
                .root
                .get_mut()
                .ok_or(BufferError::Lifecycle("root block missing while allocated")),
        }
    }

    /// Unmap the root block
    ///
    /// Releasing twice is allowed; releasing before any allocation is not.
    pub fn release(&mut self) -> Result<()> {
        match self.state {
            NativeState::Uninitialized => {
                Err(BufferError::Lifecycle("native memory was never allocated"))
            }
            NativeState::Released => Ok(()),
            NativeState::Allocated => {
                self.state = NativeState::Released;
                drop(self.root.take());
                debug!("Native memory manager of {} bytes released", self.size);
                Ok(())
            }
        }
    }
}
