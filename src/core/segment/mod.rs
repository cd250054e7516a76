//! Segments: bounds-checked binary storage handed out by memory managers
//!
//! A `Segment<B>` pairs a fixed-size storage backend with a movable limit.
//! All primitive access goes through the `ByteString` contract, which checks
//! `index + width <= limit` before touching the backend. Three backends exist:
//!
//! - `Bytes`: a heap byte array
//! - `Memory`: a view into native memory carved from a root block
//! - `Model`: an array of u64 words with values packed across word boundaries
//!
//! Every backend stores multi-byte values little-endian, so identical
//! contents checksum identically regardless of where they live.

pub mod bytes;
pub mod checksum;
pub mod memory;
pub mod model;

pub use bytes::Bytes;
pub use memory::Memory;
pub use model::Model;

use crate::core::error::{BufferError, Result};
use crate::core::pointer::TypePointer;
use crate::core::pool::MemoryManager;
use crate::core::size_class::SizeClass;
use checksum::{fold, Sponge};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique segment identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(u64);

impl SegmentId {
    fn next() -> Self {
        SegmentId(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Width of a primitive access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Short,
    Int,
    Long,
}

impl Width {
    pub const fn len(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Short => 2,
            Width::Int => 4,
            Width::Long => 8,
        }
    }

    pub const fn bits(self) -> u32 {
        (self.len() * 8) as u32
    }

    /// All-ones mask covering the width
    pub const fn mask(self) -> u64 {
        match self {
            Width::Long => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Width::Byte => "byte",
            Width::Short => "short",
            Width::Int => "int",
            Width::Long => "long",
        };
        f.write_str(name)
    }
}

/// Which backend a storage type is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Bytes,
    Memory,
    Model,
}

impl BackendKind {
    /// Native memory must be released explicitly
    pub fn is_native(self) -> bool {
        self == BackendKind::Memory
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Bytes => "bytes",
            BackendKind::Memory => "memory",
            BackendKind::Model => "model",
        };
        f.write_str(name)
    }
}

/// Fixed-capacity backend of a segment
///
/// `load`/`store` work on zero-extended little-endian values of `width`
/// bytes. Implementations check their own capacity but know nothing of the
/// segment's limit; `Segment` enforces that before delegating.
pub trait Storage: Sized + 'static {
    const KIND: BackendKind;

    fn capacity(&self) -> usize;

    fn load(&self, index: usize, width: Width) -> Result<u64>;

    fn store(&mut self, index: usize, width: Width, value: u64) -> Result<()>;

    /// Called after the segment limit moved
    fn on_limit(&mut self, _limit: usize) -> Result<()> {
        Ok(())
    }

    /// Native address of the first byte, if there is one
    fn address(&self) -> Option<TypePointer<u8>> {
        None
    }
}

/// Bounds-checked primitive access over a limited byte range
///
/// Accessors are relative to `limit()`: a `width`-byte access at `index` is
/// valid only when `index + width <= limit()`.
pub trait ByteString {
    fn size(&self) -> usize;

    fn limit(&self) -> usize;

    /// Move the limit, which must not exceed `size()`
    fn limit_at(&mut self, limit: usize) -> Result<()>;

    /// Zero-extended little-endian read
    fn read(&self, index: usize, width: Width) -> Result<u64>;

    /// Write the low `width` bytes of `value`
    fn write(&mut self, index: usize, width: Width, value: u64) -> Result<()>;

    /// Reset the limit to the full size
    fn clear(&mut self) -> Result<()> {
        let size = self.size();
        self.limit_at(size)
    }

    fn get_byte(&self, index: usize) -> Result<i8> {
        Ok(self.read(index, Width::Byte)? as i8)
    }

    fn get_short(&self, index: usize) -> Result<i16> {
        Ok(self.read(index, Width::Short)? as i16)
    }

    fn get_int(&self, index: usize) -> Result<i32> {
        Ok(self.read(index, Width::Int)? as i32)
    }

    fn get_long(&self, index: usize) -> Result<i64> {
        Ok(self.read(index, Width::Long)? as i64)
    }

    fn set_byte(&mut self, index: usize, value: i8) -> Result<()> {
        self.write(index, Width::Byte, value as u8 as u64)
    }

    fn set_short(&mut self, index: usize, value: i16) -> Result<()> {
        self.write(index, Width::Short, value as u16 as u64)
    }

    fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.write(index, Width::Int, value as u32 as u64)
    }

    fn set_long(&mut self, index: usize, value: i64) -> Result<()> {
        self.write(index, Width::Long, value as u64)
    }

    /// Seeded 64-bit checksum of `[0, limit)`
    ///
    /// Absorbs the seed, then each full 8-byte word, then the tail bytes.
    fn check_sum_with(&self, seed: u128) -> Result<u64> {
        let limit = self.limit();
        let words = limit / 8;

        let mut sponge = Sponge::new(seed);
        for word in 0..words {
            sponge.absorb(self.read(word * 8, Width::Long)?);
        }
        for index in words * 8..limit {
            sponge.absorb_byte(self.read(index, Width::Byte)? as u8);
        }
        Ok(sponge.squeeze())
    }

    fn check_sum(&self) -> Result<u32> {
        Ok(fold(self.check_sum_with(0)?))
    }

    fn content_equals<O: ByteString + ?Sized>(&self, other: &O) -> Result<bool>
    where
        Self: Sized,
    {
        Ok(self.check_sum_with(0)? == other.check_sum_with(0)?)
    }

    /// Overwrite `[0, limit)` with bytes from the operating system RNG
    fn securely_randomize(&mut self) -> Result<()> {
        let limit = self.limit();
        let mut chunk = [0u8; 256];
        let mut index = 0;

        while index < limit {
            let len = (limit - index).min(chunk.len());
            OsRng.fill_bytes(&mut chunk[..len]);

            for piece in chunk[..len].chunks(8) {
                if let Ok(word) = <[u8; 8]>::try_from(piece) {
                    self.write(index, Width::Long, u64::from_le_bytes(word))?;
                    index += 8;
                } else {
                    for &byte in piece {
                        self.write(index, Width::Byte, byte as u64)?;
                        index += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A unit of storage owned by exactly one memory manager
///
/// Segments leave their manager on `allocate` and go back through
/// `dispose`, which wipes them first. Dropping a segment without disposing
/// it simply forgets it; native memory is only returned to the system when
/// the owning manager is torn down.
pub struct Segment<B: Storage> {
    id: SegmentId,
    class: Option<SizeClass>,
    limit: usize,
    storage: B,
    manager: Option<Weak<dyn MemoryManager<B>>>,
}

impl<B: Storage> Segment<B> {
    pub(crate) fn new(
        storage: B,
        class: Option<SizeClass>,
        manager: Option<Weak<dyn MemoryManager<B>>>,
    ) -> Self {
        Segment {
            id: SegmentId::next(),
            class,
            limit: storage.capacity(),
            storage,
            manager,
        }
    }

    /// Segment with no owning manager; `dispose` just drops it
    pub fn unmanaged(storage: B) -> Self {
        Self::new(storage, None, None)
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Size class the segment was allocated for, `None` for exact-size segments
    pub fn size_class(&self) -> Option<SizeClass> {
        self.class
    }

    pub fn kind(&self) -> BackendKind {
        B::KIND
    }

    pub fn is_native(&self) -> bool {
        B::KIND.is_native()
    }

    pub fn address(&self) -> Option<TypePointer<u8>> {
        self.storage.address()
    }

    pub fn storage(&self) -> &B {
        &self.storage
    }

    /// Reset the limit and overwrite the contents with random bytes
    pub fn scrub(&mut self) -> Result<()> {
        self.clear()?;
        self.securely_randomize()
    }

    /// Whether the segment was handed out by a manager it must go back to
    pub fn is_managed(&self) -> bool {
        self.manager.is_some()
    }

    /// Wipe the segment and hand it back to its manager
    pub fn dispose(mut self) -> Result<()> {
        self.scrub()?;

        let Some(manager) = self.manager.clone() else {
            return Ok(());
        };

        match manager.upgrade() {
            Some(manager) => manager.recycle(self),
            None => Err(BufferError::Lifecycle("owning manager already dropped")),
        }
    }

    fn check(&self, index: usize, width: Width) -> Result<()> {
        match index.checked_add(width.len()) {
            Some(end) if end <= self.limit => Ok(()),
            _ => Err(BufferError::OutOfBounds {
                width,
                index,
                limit: self.limit,
            }),
        }
    }
}

impl<B: Storage> ByteString for Segment<B> {
    fn size(&self) -> usize {
        self.storage.capacity()
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn limit_at(&mut self, limit: usize) -> Result<()> {
        let size = self.storage.capacity();
        if limit > size {
            return Err(BufferError::InvalidLimit { limit, size });
        }
        self.storage.on_limit(limit)?;
        self.limit = limit;
        Ok(())
    }

    fn read(&self, index: usize, width: Width) -> Result<u64> {
        self.check(index, width)?;
        self.storage.load(index, width)
    }

    fn write(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        self.check(index, width)?;
        self.storage.store(index, width, value & width.mask())
    }
}

impl<B: Storage> fmt::Debug for Segment<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("kind", &B::KIND)
            .field("class", &self.class)
            .field("size", &self.storage.capacity())
            .field("limit", &self.limit)
            .finish()
    }
}
