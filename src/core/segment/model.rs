//! Word-packed backend
//!
//! Bytes live inside an array of u64 words, byte `i` at bits
//! `(i % 8) * 8 ..` of word `i / 8`. A multi-byte value whose bits run past
//! bit 63 continues at the bottom of the next word.

use crate::core::error::{BufferError, Result};
use crate::core::segment::{BackendKind, Storage, Width};

#[derive(Debug, Clone)]
pub struct Model {
    words: Box<[u64]>,
    size: usize,
}

impl Model {
    /// Zeroed model holding `size` bytes
    pub fn new(size: usize) -> Self {
        Model {
            words: vec![0u64; size.div_ceil(8)].into_boxed_slice(),
            size,
        }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn check(&self, index: usize, width: Width) -> Result<()> {
        match index.checked_add(width.len()) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(BufferError::OutOfBounds {
                width,
                index,
                limit: self.size,
            }),
        }
    }
}

impl Storage for Model {
    const KIND: BackendKind = BackendKind::Model;

    fn capacity(&self) -> usize {
        self.size
    }

    fn load(&self, index: usize, width: Width) -> Result<u64> {
        self.check(index, width)?;

        let word = index / 8;
        let bit = ((index % 8) * 8) as u32;

        let mut value = self.words[word] >> bit;
        if bit + width.bits() > 64 {
            value |= self.words[word + 1] << (64 - bit);
        }
        Ok(value & width.mask())
    }

    fn store(&mut self, index: usize, width: Width, value: u64) -> Result<()> {
        self.check(index, width)?;

        let word = index / 8;
        let bit = ((index % 8) * 8) as u32;
        let mask = width.mask();
        let value = value & mask;

        self.words[word] = (self.words[word] & !(mask << bit)) | (value << bit);
        if bit + width.bits() > 64 {
            let spill = 64 - bit;
            self.words[word + 1] = (self.words[word + 1] & !(mask >> spill)) | (value >> spill);
        }
        Ok(())
    }
}
