//! Word-packed pools

use crate::core::error::Result;
use crate::core::pool::{Backing, PoolManager, RecyclePolicy};
use crate::core::segment::Model;
use crate::core::size_class::SizeClass;
use std::ops::Deref;

#[derive(Debug, Default, Clone, Copy)]
pub struct ModelBacking;

impl ModelBacking {
    pub fn new() -> Self {
        ModelBacking
    }
}

impl Backing for ModelBacking {
    type Storage = Model;

    fn sub_allocate(&mut self, class: SizeClass) -> Result<Model> {
        Ok(Model::new(class.bytes()))
    }
}

pub type ModelPool = PoolManager<ModelBacking>;

/// One-shot model pool holding a single segment
pub struct SingleModelPool(ModelPool);

impl SingleModelPool {
    pub fn new(segment: SizeClass) -> Result<Self> {
        Ok(SingleModelPool(PoolManager::with_policy(
            ModelBacking::new(),
            segment,
            segment,
            segment,
            RecyclePolicy::OneShot,
        )?))
    }

    pub fn into_inner(self) -> ModelPool {
        self.0
    }
}

impl Deref for SingleModelPool {
    type Target = ModelPool;

    fn deref(&self) -> &ModelPool {
        &self.0
    }
}

/// Model pool serving any class within `[min, max]`
pub struct ArbitraryModelPool(ModelPool);

impl ArbitraryModelPool {
    pub fn new(total: SizeClass, min: SizeClass, max: SizeClass) -> Result<Self> {
        Ok(ArbitraryModelPool(PoolManager::new(
            ModelBacking::new(),
            total,
            min,
            max,
        )?))
    }

    pub fn into_inner(self) -> ModelPool {
        self.0
    }
}

impl Deref for ArbitraryModelPool {
    type Target = ModelPool;

    fn deref(&self) -> &ModelPool {
        &self.0
    }
}
