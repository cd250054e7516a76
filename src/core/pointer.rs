//! Typed addresses and the memory block contract
//!
//! A `MemoryBlock` is a window `[address, address + size)` with a movable
//! `limit` marking how much of it is in use. Child blocks are carved out of
//! a parent's in-use range with `check_sub_range` and always lie inside it.

use crate::core::error::{BufferError, Result};
use std::fmt;
use std::marker::PhantomData;

/// Raw address tagged with the element type it points at
///
/// The tag is only a compile-time marker; no memory is owned or borrowed.
pub struct TypePointer<E> {
    addr: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<E> TypePointer<E> {
    pub const fn new(addr: usize) -> Self {
        TypePointer {
            addr,
            _marker: PhantomData,
        }
    }

    pub const fn null() -> Self {
        Self::new(0)
    }

    pub const fn address(&self) -> usize {
        self.addr
    }

    pub const fn is_null(&self) -> bool {
        self.addr == 0
    }

    /// Same address, different element tag
    pub const fn cast<F>(self) -> TypePointer<F> {
        TypePointer::new(self.addr)
    }

    /// Address `bytes` further on, `None` on overflow
    pub fn offset(self, bytes: usize) -> Option<Self> {
        self.addr.checked_add(bytes).map(Self::new)
    }
}

impl<E> Clone for TypePointer<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for TypePointer<E> {}

impl<E> PartialEq for TypePointer<E> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<E> Eq for TypePointer<E> {}

impl<E> std::hash::Hash for TypePointer<E> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl<E> fmt::Debug for TypePointer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypePointer({:#x})", self.addr)
    }
}

impl<E> fmt::Display for TypePointer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypePointer(ptr={:#x})", self.addr)
    }
}

/// Address range of a block, as recorded by its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub address: usize,
    pub size: usize,
}

impl BlockSpan {
    pub fn end(&self) -> usize {
        self.address + self.size
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &BlockSpan) -> bool {
        other.address >= self.address && other.end() <= self.end()
    }
}

/// A contiguous region of memory with an in-use limit
///
/// Invariant: `0 <= limit() <= size()`.
pub trait MemoryBlock {
    /// Span of the enclosing block, `None` for roots
    fn parent(&self) -> Option<BlockSpan>;

    fn address(&self) -> TypePointer<u8>;

    fn size(&self) -> usize;

    fn limit(&self) -> usize;

    /// Move the in-use limit, which must stay within `0..=size()`
    fn limit_at(&mut self, limit: usize) -> Result<()>;

    fn span(&self) -> BlockSpan {
        BlockSpan {
            address: self.address().address(),
            size: self.size(),
        }
    }

    fn is_null(&self) -> bool {
        self.address().is_null() && self.size() == 0
    }

    /// Validate that `[offset, offset + size)` fits below the current limit
    ///
    /// Returns the span the child block would occupy.
    fn check_sub_range(&self, offset: usize, size: usize) -> Result<BlockSpan> {
        let end = offset.checked_add(size).ok_or(BufferError::InvalidLimit {
            limit: usize::MAX,
            size: self.size(),
        })?;

        if end > self.limit() {
            return Err(BufferError::InvalidLimit {
                limit: end,
                size: self.limit(),
            });
        }

        Ok(BlockSpan {
            address: self.address().address() + offset,
            size,
        })
    }
}

/// Zero-sized block standing in where a block is structurally required
///
/// It is its own parent and refuses every limit change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullBlock;

impl MemoryBlock for NullBlock {
    fn parent(&self) -> Option<BlockSpan> {
        Some(self.span())
    }

    fn address(&self) -> TypePointer<u8> {
        TypePointer::null()
    }

    fn size(&self) -> usize {
        0
    }

    fn limit(&self) -> usize {
        0
    }

    fn limit_at(&mut self, _limit: usize) -> Result<()> {
        Err(BufferError::Unsupported("limit_at on the null block"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_cast_keeps_address() {
        let ptr: TypePointer<u64> = TypePointer::new(0x1000);
        let bytes: TypePointer<u8> = ptr.cast();
        assert_eq!(bytes.address(), 0x1000);
        assert_eq!(ptr.offset(8).unwrap().address(), 0x1008);
        assert!(TypePointer::<u8>::new(usize::MAX).offset(1).is_none());
    }

    #[test]
    fn test_pointer_display() {
        let ptr: TypePointer<u8> = TypePointer::new(255);
        assert_eq!(ptr.to_string(), "TypePointer(ptr=0xff)");
        assert!(TypePointer::<u8>::null().is_null());
    }

    #[test]
    fn test_null_block() {
        let mut block = NullBlock;
        assert!(block.is_null());
        assert_eq!(block.size(), 0);
        assert_eq!(block.limit(), 0);
        assert_eq!(block.parent(), Some(block.span()));
        assert!(matches!(
            block.limit_at(0),
            Err(BufferError::Unsupported(_))
        ));
        assert!(block.check_sub_range(0, 1).is_err());
        assert!(block.check_sub_range(0, 0).is_ok());
    }

    #[test]
    fn test_span_containment() {
        let outer = BlockSpan {
            address: 100,
            size: 50,
        };
        let inner = BlockSpan {
            address: 120,
            size: 30,
        };
        let past = BlockSpan {
            address: 120,
            size: 31,
        };
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&past));
        assert!(!inner.contains(&outer));
    }
}
