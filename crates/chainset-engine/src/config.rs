use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Batch size used when materializing plans against streamed sources.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Configuration for a [`DifferenceComparer`](crate::DifferenceComparer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparerConfig {
    /// Skip the consistency checks that normally run before every
    /// progression and squash. Only safe for inputs already known to be
    /// consistent; a composed result from inconsistent inputs is wrong.
    pub skip_validation: bool,
    /// Number of entries pulled from each source per batch.
    pub chunk_size: usize,
}

impl Default for ComparerConfig {
    fn default() -> Self {
        Self {
            skip_validation: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ComparerConfig {
    /// Validation disabled, default chunk size.
    pub fn unchecked() -> Self {
        Self {
            skip_validation: true,
            ..Default::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Reject configurations the engine can't run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.chunk_size == 0 {
            return Err(EngineError::InvalidConfig(
                "chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
