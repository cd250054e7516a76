//! # segbuf - Zero-Copy Binary Segments
//!
//! `segbuf` is a typed view over raw memory with pooled allocation. Storage
//! comes in three flavours behind one bounds-checked access contract:
//!
//! - **Bytes**: heap byte arrays
//! - **Memory**: native memory carved from a single anonymous mapping
//! - **Model**: u64 word arrays with values packed across word boundaries
//!
//! Segments are handed out by size-classed pools, recycled into per-class
//! idle sets, and wiped with secure random data on the way back.
//!
//! ## Quick Start
//!
//! ```rust
//! use segbuf::{ByteString, MemoryManager, SingleBytesPool, SizeClass, Result};
//!
//! # fn main() -> Result<()> {
//! let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B128)?;
//!
//! let mut segment = pool.allocate(100)?;
//! assert_eq!(segment.size(), 128);
//!
//! segment.set_int(0, 42)?;
//! assert_eq!(segment.get_int(0)?, 42);
//! assert!(segment.get_long(124).is_err());
//!
//! // Wipe and return to the pool
//! let id = segment.id();
//! segment.dispose()?;
//! assert_eq!(pool.allocate(128)?.id(), id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Native Memory
//!
//! ```rust
//! use segbuf::{with_ram, Result};
//!
//! # fn main() -> Result<()> {
//! // Mapped, used and unmapped in one scope
//! let value = with_ram(64, |buffer| {
//!     buffer.store_f64(0, 1.25)?;
//!     buffer.retrieve_f64(0)
//! })?;
//! assert_eq!(value, 1.25);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PoolManager<K: Backing> ── allocate(size) ──► Segment<K::Storage>
//!        ▲                                          │
//!        └──────── recycle ◄── dispose (scrub) ─────┘
//!
//! NativeBacking ─► NativeMemoryManager ─► RootBlock ─► SegmentBlock ─► Memory
//! BytesBacking  ─► Bytes
//! ModelBacking  ─► Model
//! ```
//!
//! Pools are single-threaded; wrap them in your own synchronization to share
//! them across threads.

pub mod core;

pub use crate::core::{
    buffer::{with_ram, Binary, Endian},
    config::{Backend, PoolConfig, PoolShape},
    error::{BufferError, Result},
    native::{NativeMemoryManager, NativeState, RootBlock, SegmentBlock},
    pointer::{BlockSpan, MemoryBlock, NullBlock, TypePointer},
    pool::{
        ArbitraryBytesPool, ArbitraryMemoryPool, ArbitraryModelPool, Backing, BytesBacking,
        BytesPool, FixedMemoryPool, HeapManager, MemoryManager, MemoryPool, ModelBacking,
        ModelPool, NativeBacking, NullManager, PoolManager, PoolStats, RecyclePolicy,
        SingleBytesPool, SingleMemoryPool, SingleModelPool,
    },
    segment::{BackendKind, ByteString, Bytes, Memory, Model, Segment, SegmentId, Storage, Width},
    size_class::SizeClass,
};
