//! Manager that refuses everything

use crate::core::error::{BufferError, Result};
use crate::core::pool::MemoryManager;
use crate::core::segment::{Segment, Storage};
use crate::core::size_class::SizeClass;

/// Stand-in manager for any backend; every operation is `Unsupported`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullManager;

impl<B: Storage> MemoryManager<B> for NullManager {
    fn total_size(&self) -> Option<SizeClass> {
        None
    }

    fn segment_size(&self) -> Option<SizeClass> {
        None
    }

    fn allocate_default(&self) -> Result<Segment<B>> {
        Err(BufferError::Unsupported("null manager cannot allocate"))
    }

    fn allocate(&self, _size: usize) -> Result<Segment<B>> {
        Err(BufferError::Unsupported("null manager cannot allocate"))
    }

    fn recycle(&self, _segment: Segment<B>) -> Result<()> {
        Err(BufferError::Unsupported("null manager cannot recycle"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::{Bytes, Memory, Model};

    #[test]
    fn test_null_manager_refuses() {
        let manager = NullManager;
        assert_eq!(MemoryManager::<Bytes>::total_size(&manager), None);
        assert_eq!(MemoryManager::<Model>::segment_size(&manager), None);

        let bytes: Result<Segment<Bytes>> = manager.allocate(32);
        assert!(matches!(bytes, Err(BufferError::Unsupported(_))));

        let memory: Result<Segment<Memory>> = manager.allocate_default();
        assert!(matches!(memory, Err(BufferError::Unsupported(_))));

        let result = manager.recycle(Segment::unmanaged(Model::new(32)));
        assert!(matches!(result, Err(BufferError::Unsupported(_))));
    }
}
