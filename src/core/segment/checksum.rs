//! Content checksums over a sponge
//!
//! The sponge absorbs a 128-bit seed, then little-endian words, then loose
//! bytes, and is squeezed into a single u64. SHA-256 provides the mixing.

use sha2::{Digest, Sha256};

/// Incremental checksum state
pub struct Sponge {
    hasher: Sha256,
}

impl Sponge {
    pub fn new(seed: u128) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        Sponge { hasher }
    }

    pub fn absorb(&mut self, word: u64) {
        self.hasher.update(word.to_le_bytes());
    }

    pub fn absorb_byte(&mut self, byte: u8) {
        self.hasher.update([byte]);
    }

    pub fn squeeze(self) -> u64 {
        let digest = self.hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(head)
    }
}

/// Fold a 64-bit checksum to 32 bits by XOR of its halves
pub fn fold(sum: u64) -> u32 {
    ((sum >> 32) as u32) ^ (sum as u32)
}
