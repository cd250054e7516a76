//! Power-of-two size classes used to bucket allocation requests
//!
//! Classes run from 32 bytes to 1 gigabyte, each twice the previous one.
//! Requests are rounded up to the nearest class, so a pool only ever keeps
//! segments of 26 distinct sizes.

use crate::core::error::{BufferError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size class of a segment
///
/// Variant `B32` is 32 bytes and every following variant doubles it.
/// Absence of a size (an unbounded or unconfigured manager) is expressed
/// as `Option<SizeClass>` rather than a sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum SizeClass {
    B32 = 0,
    B64,
    B128,
    B256,
    B512,
    K1,
    K2,
    K4,
    K8,
    K16,
    K32,
    K64,
    K128,
    K256,
    K512,
    M1,
    M2,
    M4,
    M8,
    M16,
    M32,
    M64,
    M128,
    M256,
    M512,
    G1,
}

impl SizeClass {
    /// All classes in ascending order
    pub const ALL: [SizeClass; 26] = [
        SizeClass::B32,
        SizeClass::B64,
        SizeClass::B128,
        SizeClass::B256,
        SizeClass::B512,
        SizeClass::K1,
        SizeClass::K2,
        SizeClass::K4,
        SizeClass::K8,
        SizeClass::K16,
        SizeClass::K32,
        SizeClass::K64,
        SizeClass::K128,
        SizeClass::K256,
        SizeClass::K512,
        SizeClass::M1,
        SizeClass::M2,
        SizeClass::M4,
        SizeClass::M8,
        SizeClass::M16,
        SizeClass::M32,
        SizeClass::M64,
        SizeClass::M128,
        SizeClass::M256,
        SizeClass::M512,
        SizeClass::G1,
    ];

    /// Smallest class in bytes
    pub const MIN_BYTES: usize = 32;

    /// Largest class in bytes
    pub const MAX_BYTES: usize = 1 << 30;

    /// Number of bytes in this class
    pub const fn bytes(self) -> usize {
        Self::MIN_BYTES << (self as u8)
    }

    /// Round a request up to the smallest class that holds it
    ///
    /// Valid for `0 <= size <= 1G`; anything larger is `InvalidSize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use segbuf::SizeClass;
    ///
    /// assert_eq!(SizeClass::find_lowest_above(0).unwrap(), SizeClass::B32);
    /// assert_eq!(SizeClass::find_lowest_above(33).unwrap(), SizeClass::B64);
    /// assert_eq!(SizeClass::find_lowest_above(1000).unwrap(), SizeClass::K1);
    /// assert!(SizeClass::find_lowest_above((1 << 30) + 1).is_err());
    /// ```
    pub fn find_lowest_above(size: usize) -> Result<Self> {
        if size > Self::MAX_BYTES {
            return Err(BufferError::InvalidSize(size));
        }

        let rounded = size.max(Self::MIN_BYTES).next_power_of_two();
        let index = rounded.trailing_zeros() - Self::MIN_BYTES.trailing_zeros();
        Ok(Self::ALL[index as usize])
    }

    /// Exact class for a byte count, `None` unless `bytes` is a class size
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        Self::ALL.iter().copied().find(|class| class.bytes() == bytes)
    }

    /// Short human label ("32B", "4K", "1M", "1G")
    pub fn label(self) -> String {
        let bytes = self.bytes();
        if bytes >= 1 << 30 {
            format!("{}G", bytes >> 30)
        } else if bytes >= 1 << 20 {
            format!("{}M", bytes >> 20)
        } else if bytes >= 1 << 10 {
            format!("{}K", bytes >> 10)
        } else {
            format!("{}B", bytes)
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for SizeClass {
    type Err = BufferError;

    /// Parses labels ("128B", "4K", "4k") or exact byte counts ("4096")
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || BufferError::InvalidConfig(format!("unknown size class: {:?}", s));

        let (digits, shift) = match trimmed.chars().last() {
            Some('B') | Some('b') => (&trimmed[..trimmed.len() - 1], 0),
            Some('K') | Some('k') => (&trimmed[..trimmed.len() - 1], 10),
            Some('M') | Some('m') => (&trimmed[..trimmed.len() - 1], 20),
            Some('G') | Some('g') => (&trimmed[..trimmed.len() - 1], 30),
            Some(c) if c.is_ascii_digit() => (trimmed, 0),
            _ => return Err(invalid()),
        };

        let value: usize = digits.parse().map_err(|_| invalid())?;
        let bytes = value.checked_shl(shift).ok_or_else(invalid)?;
        SizeClass::from_bytes(bytes).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SizeClass {
    type Error = BufferError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SizeClass> for String {
    fn from(class: SizeClass) -> Self {
        class.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_bytes() {
        assert_eq!(SizeClass::B32.bytes(), 32);
        assert_eq!(SizeClass::B64.bytes(), 64);
        assert_eq!(SizeClass::K1.bytes(), 1024);
        assert_eq!(SizeClass::K4.bytes(), 4096);
        assert_eq!(SizeClass::M1.bytes(), 1 << 20);
        assert_eq!(SizeClass::G1.bytes(), 1 << 30);
    }

    #[test]
    fn test_classes_double() {
        for pair in SizeClass::ALL.windows(2) {
            assert_eq!(pair[0].bytes() * 2, pair[1].bytes());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_find_lowest_above_basic() {
        assert_eq!(SizeClass::find_lowest_above(0).unwrap(), SizeClass::B32);
        assert_eq!(SizeClass::find_lowest_above(1).unwrap(), SizeClass::B32);
        assert_eq!(SizeClass::find_lowest_above(31).unwrap(), SizeClass::B32);
        assert_eq!(SizeClass::find_lowest_above(32).unwrap(), SizeClass::B32);
        assert_eq!(SizeClass::find_lowest_above(33).unwrap(), SizeClass::B64);
        assert_eq!(SizeClass::find_lowest_above(63).unwrap(), SizeClass::B64);
        assert_eq!(SizeClass::find_lowest_above(64).unwrap(), SizeClass::B64);
        assert_eq!(SizeClass::find_lowest_above(65).unwrap(), SizeClass::B128);
    }

    #[test]
    fn test_find_lowest_above_powers_and_large() {
        assert_eq!(SizeClass::find_lowest_above(512).unwrap(), SizeClass::B512);
        assert_eq!(SizeClass::find_lowest_above(1024).unwrap(), SizeClass::K1);
        assert_eq!(SizeClass::find_lowest_above(1 << 30).unwrap(), SizeClass::G1);
        assert_eq!(SizeClass::find_lowest_above(1000).unwrap(), SizeClass::K1);
        assert_eq!(SizeClass::find_lowest_above(1025).unwrap(), SizeClass::K2);
    }

    #[test]
    fn test_find_lowest_above_out_of_range() {
        let result = SizeClass::find_lowest_above((1 << 30) + 1);
        assert!(matches!(result, Err(BufferError::InvalidSize(_))));
    }

    #[test]
    fn test_labels_round_trip() {
        for class in SizeClass::ALL {
            let parsed: SizeClass = class.label().parse().unwrap();
            assert_eq!(parsed, class);
        }
        assert_eq!("4096".parse::<SizeClass>().unwrap(), SizeClass::K4);
        assert_eq!("4k".parse::<SizeClass>().unwrap(), SizeClass::K4);
    }

    #[test]
    fn test_parse_rejects_non_classes() {
        assert!("100".parse::<SizeClass>().is_err());
        assert!("3K".parse::<SizeClass>().is_err());
        assert!("".parse::<SizeClass>().is_err());
        assert!("K".parse::<SizeClass>().is_err());
        assert!("2T".parse::<SizeClass>().is_err());
    }
}
