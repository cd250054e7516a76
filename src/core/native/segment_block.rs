//! Child views into a root block

use crate::core::error::{BufferError, Result};
use crate::core::pointer::{BlockSpan, MemoryBlock, TypePointer};
use crate::core::segment::Width;
use std::cell::Cell;
use std::ptr;
use std::rc::Rc;

/// Window into a `RootBlock` that owns no memory of its own
///
/// Raw accessors translate `index` to `address + index` and store values
/// little-endian. Every access is checked against the block's limit and
/// against the liveness of the root mapping.
pub struct SegmentBlock {
    parent: BlockSpan,
    span: BlockSpan,
    ptr: *mut u8,
    limit: usize,
    live: Rc<Cell<bool>>,
}

impl SegmentBlock {
    pub(crate) fn new(parent: BlockSpan, span: BlockSpan, ptr: *mut u8, live: Rc<Cell<bool>>) -> Self {
        SegmentBlock {
            parent,
            span,
            ptr,
            limit: span.size,
            live,
        }
    }

    /// Whether the root mapping behind this view still exists
    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    fn check(&self, index: usize, width: Width) -> Result<()> {
        if !self.live.get() {
            return Err(BufferError::Lifecycle("root block already released"));
        }

        match index.checked_add(width.len()) {
            Some(end) if end <= self.limit => Ok(()),
            _ => Err(BufferError::OutOfBounds {
                width,
                index,
                limit: self.limit,
            }),
        }
    }

    /// Read `width` bytes at `index`, zero-extended
    pub fn read(&self, index: usize, width: Width) -> Result<u64> {
        self.check(index, width)?;

        let mut buf = [0u8; 8];
        // SAFETY: the mapping is live and index + width <= limit <= span.size
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.add(index), buf.as_mut_ptr(), width.len());
        }
        Ok(u64::from_le_bytes(buf))
    }

    /// Write the low `width` bytes of `value` at `index`
    pub fn write(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        self.check(index, width)?;

        let buf = value.to_le_bytes();
        // SAFETY: the mapping is live and index + width <= limit <= span.size
        unsafe {
            ptr::copy_nonoverlapping(buf.as_ptr(), self.ptr.add(index), width.len());
        }
        Ok(())
    }
}

impl MemoryBlock for SegmentBlock {
    fn parent(&self) -> Option<BlockSpan> {
        Some(self.parent)
    }

    fn address(&self) -> TypePointer<u8> {
        TypePointer::new(self.span.address)
    }

    fn size(&self) -> usize {
        self.span.size
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn limit_at(&mut self, limit: usize) -> Result<()> {
        if limit > self.span.size {
            return Err(BufferError::InvalidLimit {
                limit,
                size: self.span.size,
            });
        }
        self.limit = limit;
        Ok(())
    }
}

impl std::fmt::Debug for SegmentBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentBlock")
            .field("address", &self.address())
            .field("size", &self.span.size)
            .field("limit", &self.limit)
            .field("live", &self.live.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::native::root_block::RootBlock;

    fn carve(root: &mut RootBlock, size: usize) -> SegmentBlock {
        let offset = root.limit();
        root.limit_at(offset + size).unwrap();
        root.sub_block(offset, size).unwrap()
    }

    #[test]
    fn test_read_write_widths() {
        let mut root = RootBlock::map(64).unwrap();
        let mut block = carve(&mut root, 32);

        block.write(0, Width::Byte, 0xAB).unwrap();
        block.write(1, Width::Short, 0xBEEF).unwrap();
        block.write(3, Width::Int, 0xDEAD_BEEF).unwrap();
        block.write(7, Width::Long, 0x0123_4567_89AB_CDEF).unwrap();

        assert_eq!(block.read(0, Width::Byte).unwrap(), 0xAB);
        assert_eq!(block.read(1, Width::Short).unwrap(), 0xBEEF);
        assert_eq!(block.read(3, Width::Int).unwrap(), 0xDEAD_BEEF);
        assert_eq!(block.read(7, Width::Long).unwrap(), 0x0123_4567_89AB_CDEF);

        // Little-endian layout
        assert_eq!(block.read(1, Width::Byte).unwrap(), 0xEF);
        assert_eq!(block.read(2, Width::Byte).unwrap(), 0xBE);
    }

    #[test]
    fn test_sibling_blocks_do_not_overlap() {
        let mut root = RootBlock::map(64).unwrap();
        let mut first = carve(&mut root, 32);
        let mut second = carve(&mut root, 32);

        first.write(24, Width::Long, u64::MAX).unwrap();
        second.write(0, Width::Long, 0).unwrap();
        assert_eq!(first.read(24, Width::Long).unwrap(), u64::MAX);
        assert_eq!(second.read(0, Width::Long).unwrap(), 0);
    }

    #[test]
    fn test_limit_narrows_access() {
        let mut root = RootBlock::map(64).unwrap();
        let mut block = carve(&mut root, 32);

        block.limit_at(8).unwrap();
        assert!(block.read(0, Width::Long).is_ok());
        assert!(matches!(
            block.read(1, Width::Long),
            Err(BufferError::OutOfBounds { .. })
        ));
        assert!(matches!(
            block.limit_at(33),
            Err(BufferError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn test_access_after_unmap_fails() {
        let mut root = RootBlock::map(64).unwrap();
        let block = carve(&mut root, 32);
        assert!(block.is_live());

        drop(root);
        assert!(!block.is_live());
        assert!(matches!(
            block.read(0, Width::Byte),
            Err(BufferError::Lifecycle(_))
        ));
    }
}
