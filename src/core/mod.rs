//! Segment storage and allocation
//!
//! - [`size_class`] - Power-of-two size classes (32B to 1G)
//! - [`pointer`] - Typed addresses and the memory block contract
//! - [`native`] - Root mapping, child blocks and the native memory manager
//! - [`segment`] - Segments, storage backends and the `ByteString` contract
//! - [`pool`] - Size-classed pools and the other memory managers
//! - [`buffer`] - Typed owning/view buffers with byte order
//! - [`config`] - TOML pool descriptions

pub mod buffer;
pub mod config;
pub mod error;
pub mod native;
pub mod pointer;
pub mod pool;
pub mod segment;
pub mod size_class;
