use thiserror::Error;

const DEFAULT_CONCURRENCY_LEVEL: usize = 16;
const DEFAULT_GROWTH_FACTOR: usize = 3;
const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Sizing parameters for a [`StripedHashSet`](super::StripedHashSet).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashSetOptions {
    /// Number of stripe locks. Fixed for the lifetime of the set.
    pub concurrency_level: usize,
    /// The bucket array is multiplied by this on every resize, and starts out at
    /// `concurrency_level * growth_factor` buckets.
    pub growth_factor: usize,
    /// A resize is triggered once `len / buckets` reaches this.
    pub max_load_factor: f64
}

impl HashSetOptions {
    pub fn new(concurrency_level: usize) -> Self {
        HashSetOptions {
            concurrency_level,
            ..HashSetOptions::default()
        }
    }

    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_level == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.growth_factor < 2 {
            return Err(ConfigError::GrowthFactorTooSmall(self.growth_factor));
        }
        if !self.max_load_factor.is_finite() || self.max_load_factor <= 0.0 {
            return Err(ConfigError::InvalidLoadFactor(self.max_load_factor));
        }
        if self.concurrency_level.checked_mul(self.growth_factor).is_none() {
            return Err(ConfigError::TooManyBuckets(self.concurrency_level, self.growth_factor));
        }
        Ok(())
    }

    /// The length of the bucket array before the first resize.
    pub fn initial_buckets(&self) -> usize {
        self.concurrency_level * self.growth_factor
    }
}

impl Default for HashSetOptions {
    fn default() -> Self {
        HashSetOptions {
            concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR
        }
    }
}

/// Rejected [`HashSetOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("concurrency level must be at least 1")]
    ZeroConcurrency,
    #[error("growth factor must be at least 2, got {0}")]
    GrowthFactorTooSmall(usize),
    #[error("max load factor must be a positive finite number, got {0}")]
    InvalidLoadFactor(f64),
    #[error("{0} stripes times a growth factor of {1} overflows the bucket count")]
    TooManyBuckets(usize, usize)
}
