//! Heap byte array backend

use crate::core::error::{BufferError, Result};
use crate::core::segment::{BackendKind, Storage, Width};

#[derive(Debug, Clone)]
pub struct Bytes {
    data: Box<[u8]>,
}

impl Bytes {
    /// Zeroed array of `size` bytes
    pub fn new(size: usize) -> Self {
        Bytes {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, index: usize, width: Width) -> Result<std::ops::Range<usize>> {
        match index.checked_add(width.len()) {
            Some(end) if end <= self.data.len() => Ok(index..end),
            _ => Err(BufferError::OutOfBounds {
                width,
                index,
                limit: self.data.len(),
            }),
        }
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Bytes {
            data: data.into_boxed_slice(),
        }
    }
}

impl Storage for Bytes {
    const KIND: BackendKind = BackendKind::Bytes;

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn load(&self, index: usize, width: Width) -> Result<u64> {
        let range = self.range(index, width)?;
        let mut buf = [0u8; 8];
        buf[..width.len()].copy_from_slice(&self.data[range]);
        Ok(u64::from_le_bytes(buf))
    }

    fn store(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        let range = self.range(index, width)?;
        self.data[range].copy_from_slice(&value.to_le_bytes()[..width.len()]);
        Ok(())
    }
}
