//! Pool configuration
//!
//! Pools can be described in TOML and built from the description:
//!
//! ```toml
//! backend = "memory"
//! shape = "fixed"
//! total_size = "1M"
//! min_size = "4K"
//! max_size = "4K"
//! ```

use crate::core::error::{BufferError, Result};
use crate::core::pool::{
    BytesBacking, BytesPool, MemoryPool, ModelBacking, ModelPool, NativeBacking, PoolManager,
    RecyclePolicy,
};
use crate::core::size_class::SizeClass;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Bytes,
    Memory,
    Model,
}

/// How segment sizes are constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolShape {
    /// Any class in `[min_size, max_size]`
    #[default]
    Arbitrary,
    /// One class, `min_size == max_size`
    Fixed,
    /// One segment size; native and model pools are one-shot
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub backend: Backend,

    #[serde(default)]
    pub shape: PoolShape,

    pub total_size: SizeClass,

    #[serde(default = "default_min_size")]
    pub min_size: SizeClass,

    /// Defaults to `total_size`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<SizeClass>,
}

fn default_min_size() -> SizeClass {
    SizeClass::B32
}

impl PoolConfig {
    pub fn new(backend: Backend, total_size: SizeClass) -> Self {
        PoolConfig {
            backend,
            shape: PoolShape::Arbitrary,
            total_size,
            min_size: default_min_size(),
            max_size: None,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BufferError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BufferError::InvalidConfig(e.to_string()))
    }

    pub fn max_size(&self) -> SizeClass {
        self.max_size.unwrap_or(self.total_size)
    }

    pub fn validate(&self) -> Result<()> {
        let max = self.max_size();

        if self.min_size > max {
            return Err(BufferError::InvalidConfig(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, max
            )));
        }

        if max > self.total_size {
            return Err(BufferError::InvalidConfig(format!(
                "max_size ({}) exceeds total_size ({})",
                max, self.total_size
            )));
        }

        match self.shape {
            PoolShape::Arbitrary => Ok(()),
            PoolShape::Fixed | PoolShape::Single if self.min_size != max => {
                Err(BufferError::InvalidConfig(format!(
                    "{:?} pools need min_size == max_size (got {} and {})",
                    self.shape, self.min_size, max
                )))
            }
            PoolShape::Fixed => Ok(()),
            PoolShape::Single => {
                if self.backend != Backend::Bytes && self.total_size != max {
                    return Err(BufferError::InvalidConfig(format!(
                        "single {:?} pools hold exactly one segment; total_size must be {}",
                        self.backend, max
                    )));
                }
                Ok(())
            }
        }
    }

    fn policy(&self) -> RecyclePolicy {
        match (self.shape, self.backend) {
            (PoolShape::Single, Backend::Memory | Backend::Model) => RecyclePolicy::OneShot,
            _ => RecyclePolicy::Reuse,
        }
    }

    fn expect_backend(&self, backend: Backend) -> Result<()> {
        if self.backend != backend {
            return Err(BufferError::InvalidConfig(format!(
                "configured backend is {:?}, not {:?}",
                self.backend, backend
            )));
        }
        self.validate()
    }

    pub fn build_bytes(&self) -> Result<BytesPool> {
        self.expect_backend(Backend::Bytes)?;
        PoolManager::with_policy(
            BytesBacking::new(),
            self.total_size,
            self.min_size,
            self.max_size(),
            self.policy(),
        )
    }

    pub fn build_memory(&self) -> Result<MemoryPool> {
        self.expect_backend(Backend::Memory)?;
        PoolManager::with_policy(
            NativeBacking::new(self.total_size),
            self.total_size,
            self.min_size,
            self.max_size(),
            self.policy(),
        )
    }

    pub fn build_model(&self) -> Result<ModelPool> {
        self.expect_backend(Backend::Model)?;
        PoolManager::with_policy(
            ModelBacking::new(),
            self.total_size,
            self.min_size,
            self.max_size(),
            self.policy(),
        )
    }
}
