use crate::core::segment::{SegmentId, Width};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("Out of bounds: {width} access at index {index} (limit {limit})")]
    OutOfBounds {
        width: Width,
        index: usize,
        limit: usize,
    },

    #[error("Invalid limit: {limit} (must be between 0 and {size})")]
    InvalidLimit { limit: usize, size: usize },

    #[error("Invalid size: {0} bytes is outside the supported size classes")]
    InvalidSize(usize),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Requested size {requested} outside pool bounds [{min}, {max}]")]
    SizeOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },

    #[error("Ownership violation: segment {0} is not managed by this pool")]
    OwnershipViolation(SegmentId),

    #[error("Out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Lifecycle error: {0}")]
    Lifecycle(&'static str),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Native mapping failed: {0}")]
    NativeMap(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BufferError>;
