//! Typed buffers over segments
//!
//! A `Binary` either owns its segment or borrows one as a view. Owning
//! buffers give the segment back exactly once, on `close`; views never do.
//! Values are encoded in the buffer's byte order on top of the segment's
//! little-endian storage.

use crate::core::error::{BufferError, Result};
use crate::core::pool::{MemoryManager, SingleMemoryPool};
use crate::core::segment::{ByteString, Memory, Segment, Storage, Width};
use crate::core::size_class::SizeClass;
use std::mem;

/// Byte order of multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Byte order of the running target
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    pub fn reverse_short(value: i16) -> i16 {
        value.swap_bytes()
    }

    pub fn reverse_int(value: i32) -> i32 {
        value.swap_bytes()
    }

    pub fn reverse_long(value: i64) -> i64 {
        value.swap_bytes()
    }

    /// Convert a little-endian `width`-byte value to this order, or back
    fn convert(self, value: u64, width: Width) -> u64 {
        let value = value & width.mask();
        match self {
            Endian::Little => value,
            Endian::Big => value.swap_bytes() >> (64 - width.bits()),
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Endian::native()
    }
}

enum Holder<'a, B: Storage> {
    Owned(Segment<B>),
    View(&'a mut Segment<B>),
    Closed,
}

/// Random-access typed buffer over a segment
pub struct Binary<'a, B: Storage> {
    holder: Holder<'a, B>,
    endian: Endian,
}

impl<'a, B: Storage> Binary<'a, B> {
    /// Buffer that owns `segment` and disposes it on close
    pub fn owned(segment: Segment<B>, endian: Endian) -> Self {
        Binary {
            holder: Holder::Owned(segment),
            endian,
        }
    }

    /// Buffer borrowing `segment`; closing it leaves the segment alone
    pub fn view(segment: &'a mut Segment<B>, endian: Endian) -> Self {
        Binary {
            holder: Holder::View(segment),
            endian,
        }
    }

    /// Owning buffer over a fresh segment from `manager`
    pub fn allocate<M: MemoryManager<B> + ?Sized>(manager: &M, size: usize, endian: Endian) -> Result<Self> {
        let mut segment = manager.allocate(size)?;
        segment.limit_at(size.min(segment.size()))?;
        Ok(Self::owned(segment, endian))
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn is_view(&self) -> bool {
        matches!(self.holder, Holder::View(_))
    }

    /// Whether the buffer sits on native memory
    pub fn is_mem(&self) -> bool {
        B::KIND.is_native()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.holder, Holder::Closed)
    }

    pub fn segment(&self) -> Result<&Segment<B>> {
        match &self.holder {
            Holder::Owned(segment) => Ok(segment),
            Holder::View(segment) => Ok(&**segment),
            Holder::Closed => Err(BufferError::Lifecycle("buffer already closed")),
        }
    }

    pub fn segment_mut(&mut self) -> Result<&mut Segment<B>> {
        match &mut self.holder {
            Holder::Owned(segment) => Ok(segment),
            Holder::View(segment) => Ok(&mut **segment),
            Holder::Closed => Err(BufferError::Lifecycle("buffer already closed")),
        }
    }

    pub fn size(&self) -> Result<usize> {
        Ok(self.segment()?.size())
    }

    pub fn limit(&self) -> Result<usize> {
        Ok(self.segment()?.limit())
    }

    fn load(&self, index: usize, width: Width) -> Result<u64> {
        let raw = self.segment()?.read(index, width)?;
        Ok(self.endian.convert(raw, width))
    }

    fn save(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        let raw = self.endian.convert(value, width);
        self.segment_mut()?.write(index, width, raw)
    }

    pub fn retrieve_i8(&self, index: usize) -> Result<i8> {
        Ok(self.load(index, Width::Byte)? as i8)
    }

    pub fn retrieve_u8(&self, index: usize) -> Result<u8> {
        Ok(self.load(index, Width::Byte)? as u8)
    }

    pub fn retrieve_i16(&self, index: usize) -> Result<i16> {
        Ok(self.load(index, Width::Short)? as i16)
    }

    pub fn retrieve_u16(&self, index: usize) -> Result<u16> {
        Ok(self.load(index, Width::Short)? as u16)
    }

    pub fn retrieve_i32(&self, index: usize) -> Result<i32> {
        Ok(self.load(index, Width::Int)? as i32)
    }

    pub fn retrieve_u32(&self, index: usize) -> Result<u32> {
        Ok(self.load(index, Width::Int)? as u32)
    }

    pub fn retrieve_i64(&self, index: usize) -> Result<i64> {
        Ok(self.load(index, Width::Long)? as i64)
    }

    pub fn retrieve_u64(&self, index: usize) -> Result<u64> {
        self.load(index, Width::Long)
    }

    pub fn retrieve_f32(&self, index: usize) -> Result<f32> {
        Ok(f32::from_bits(self.retrieve_u32(index)?))
    }

    pub fn retrieve_f64(&self, index: usize) -> Result<f64> {
        Ok(f64::from_bits(self.retrieve_u64(index)?))
    }

    pub fn store_i8(&mut self, index: usize, value: i8) -> Result<()> {
        self.save(index, Width::Byte, value as u8 as u64)
    }

    pub fn store_u8(&mut self, index: usize, value: u8) -> Result<()> {
        self.save(index, Width::Byte, value as u64)
    }

    pub fn store_i16(&mut self, index: usize, value: i16) -> Result<()> {
        self.save(index, Width::Short, value as u16 as u64)
    }

    pub fn store_u16(&mut self, index: usize, value: u16) -> Result<()> {
        self.save(index, Width::Short, value as u64)
    }

    pub fn store_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.save(index, Width::Int, value as u32 as u64)
    }

    pub fn store_u32(&mut self, index: usize, value: u32) -> Result<()> {
        self.save(index, Width::Int, value as u64)
    }

    pub fn store_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.save(index, Width::Long, value as u64)
    }

    pub fn store_u64(&mut self, index: usize, value: u64) -> Result<()> {
        self.save(index, Width::Long, value)
    }

    pub fn store_f32(&mut self, index: usize, value: f32) -> Result<()> {
        self.store_u32(index, value.to_bits())
    }

    pub fn store_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.store_u64(index, value.to_bits())
    }

    /// Checksum of the segment contents below its limit
    pub fn check_sum(&self) -> Result<u32> {
        self.segment()?.check_sum()
    }

    pub fn securely_randomize(&mut self) -> Result<()> {
        self.segment_mut()?.securely_randomize()
    }

    /// Release the buffer
    ///
    /// An owned segment is disposed back to its manager; a view is merely
    /// detached. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.holder, Holder::Closed) {
            Holder::Owned(segment) => segment.dispose(),
            Holder::View(_) | Holder::Closed => Ok(()),
        }
    }

    /// Run `f` on the buffer, then close it if it owns native memory
    ///
    /// The close happens whether or not `f` fails; an error from `f` takes
    /// precedence over an error from closing.
    pub fn use_with<R>(mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let result = f(&mut self);

        if !self.is_view() && self.is_mem() {
            let closed = self.close();
            let value = result?;
            closed?;
            return Ok(value);
        }

        result
    }
}

/// Run `f` on a scratch buffer of `size` bytes of native memory
///
/// The memory comes from a one-shot pool and is unmapped before returning.
pub fn with_ram<R>(size: usize, f: impl FnOnce(&mut Binary<'_, Memory>) -> Result<R>) -> Result<R> {
    let class = SizeClass::find_lowest_above(size)?;
    let pool = SingleMemoryPool::new(class)?;
    let buffer = Binary::allocate(&*pool, size, Endian::native())?;
    buffer.use_with(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::{FixedMemoryPool, SingleBytesPool};
    use crate::core::segment::Bytes;

    #[test]
    fn test_endian_conversion() {
        let mut seg = Segment::unmanaged(Bytes::new(16));
        {
            let mut big = Binary::view(&mut seg, Endian::Big);
            big.store_i32(0, 0x0102_0304).unwrap();
            big.store_u16(4, 0xA1B2).unwrap();
            assert_eq!(big.retrieve_i32(0).unwrap(), 0x0102_0304);
            assert_eq!(big.retrieve_u16(4).unwrap(), 0xA1B2);
        }
        assert_eq!(seg.get_byte(0).unwrap(), 1);
        assert_eq!(seg.get_byte(3).unwrap(), 4);
        assert_eq!(seg.get_byte(4).unwrap() as u8, 0xA1);

        let little = Binary::view(&mut seg, Endian::Little);
        assert_eq!(little.retrieve_i32(0).unwrap(), 0x0403_0201);
    }

    #[test]
    fn test_floats_and_unsigned() {
        let mut buffer = Binary::owned(Segment::unmanaged(Bytes::new(32)), Endian::Big);
        buffer.store_f64(0, -1.5).unwrap();
        buffer.store_f32(8, 3.25).unwrap();
        buffer.store_u64(12, u64::MAX - 1).unwrap();
        buffer.store_u8(20, 200).unwrap();
        buffer.store_i8(21, -100).unwrap();
        buffer.store_i16(22, -300).unwrap();
        buffer.store_i64(24, i64::MIN).unwrap();

        assert_eq!(buffer.retrieve_f64(0).unwrap(), -1.5);
        assert_eq!(buffer.retrieve_f32(8).unwrap(), 3.25);
        assert_eq!(buffer.retrieve_u64(12).unwrap(), u64::MAX - 1);
        assert_eq!(buffer.retrieve_u8(20).unwrap(), 200);
        assert_eq!(buffer.retrieve_i8(21).unwrap(), -100);
        assert_eq!(buffer.retrieve_i16(22).unwrap(), -300);
        assert_eq!(buffer.retrieve_i64(24).unwrap(), i64::MIN);
        assert!(buffer.retrieve_u32(30).is_err());
    }

    #[test]
    fn test_reverse_helpers() {
        assert_eq!(Endian::reverse_short(0x0102), 0x0201);
        assert_eq!(Endian::reverse_int(0x0102_0304), 0x0403_0201);
        assert_eq!(Endian::reverse_long(1), 1 << 56);
    }

    #[test]
    fn test_view_close_keeps_segment() {
        let mut seg = Segment::unmanaged(Bytes::new(8));
        let mut view = Binary::view(&mut seg, Endian::Little);
        assert!(view.is_view());
        view.store_i64(0, 9).unwrap();
        view.close().unwrap();
        assert!(view.is_closed());
        assert!(matches!(view.retrieve_i64(0), Err(BufferError::Lifecycle(_))));
        assert_eq!(seg.get_long(0).unwrap(), 9);
    }

    #[test]
    fn test_use_with_releases_native() {
        let pool = FixedMemoryPool::new(SizeClass::B128, SizeClass::B64).unwrap();
        let buffer = Binary::allocate(&*pool, 64, Endian::Little).unwrap();
        assert!(buffer.is_mem());

        let sum = buffer
            .use_with(|b| {
                b.store_i32(0, 42)?;
                b.retrieve_i32(0)
            })
            .unwrap();
        assert_eq!(sum, 42);
        assert_eq!(pool.idle_count(SizeClass::B64), 1);
    }

    #[test]
    fn test_use_with_releases_on_error() {
        let pool = FixedMemoryPool::new(SizeClass::B128, SizeClass::B64).unwrap();
        let buffer = Binary::allocate(&*pool, 64, Endian::Little).unwrap();

        let result: Result<()> = buffer.use_with(|b| {
            b.store_i64(60, 1)?;
            Ok(())
        });
        assert!(matches!(result, Err(BufferError::OutOfBounds { .. })));
        assert_eq!(pool.idle_count(SizeClass::B64), 1);
    }

    #[test]
    fn test_use_with_leaves_heap_alone() {
        let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B64).unwrap();
        let buffer = Binary::allocate(&*pool, 64, Endian::Little).unwrap();
        assert!(!buffer.is_mem());

        buffer.use_with(|b| b.store_u8(0, 1)).unwrap();
        assert_eq!(pool.idle_count(SizeClass::B64), 0);
    }

    #[test]
    fn test_with_ram() {
        let value = with_ram(100, |b| {
            assert_eq!(b.limit()?, 100);
            assert_eq!(b.size()?, 128);
            b.store_f64(92, 2.5)?;
            assert!(b.store_f64(93, 2.5).is_err());
            b.retrieve_f64(92)
        })
        .unwrap();
        assert_eq!(value, 2.5);
    }

    #[test]
    fn test_allocate_limits_to_request() {
        let pool = SingleBytesPool::new(SizeClass::K1, SizeClass::B64).unwrap();
        let mut buffer = Binary::allocate(&*pool, 50, Endian::native()).unwrap();
        assert_eq!(buffer.limit().unwrap(), 50);
        assert!(buffer.check_sum().is_ok());
        buffer.securely_randomize().unwrap();
        buffer.close().unwrap();
        assert_eq!(pool.idle_count(SizeClass::B64), 1);
    }
}
