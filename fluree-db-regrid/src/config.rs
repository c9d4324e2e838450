//! Regridding configuration types.
//!
//! Defines configuration for building index mappings, aggregating fine
//! arrays and persisting mappings. All types are serde-friendly so callers
//! can embed them in their own config files.

use crate::error::{RegridError, Result};
use serde::{Deserialize, Serialize};

/// How candidate points are found for each coarse polygon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointIndexConfig {
    /// Test every point against every non-degenerate polygon.
    #[default]
    Scan,

    /// Bucket points into a uniform grid and only test points in the
    /// buckets overlapping each polygon's bounding box.
    Grid {
        /// Number of buckets along each axis of the point extent.
        cells_per_axis: usize,
    },
}

/// Configuration for building an index mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Emit a progress notification every N polygons.
    /// Default: None (silent).
    pub progress_interval: Option<usize>,

    /// Scan polygons on the rayon pool.
    /// Default: false
    pub parallel: bool,

    /// Candidate point lookup strategy.
    /// Default: Scan
    pub point_index: PointIndexConfig,
}

impl BuildConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress notification interval.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Enable or disable parallel polygon scans.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the candidate point lookup strategy.
    pub fn with_point_index(mut self, point_index: PointIndexConfig) -> Self {
        self.point_index = point_index;
        self
    }

    /// Reject settings that cannot be honored.
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.progress_interval)?;
        if let PointIndexConfig::Grid { cells_per_axis } = self.point_index {
            if cells_per_axis == 0 {
                return Err(RegridError::Config(
                    "grid cells_per_axis must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for aggregating fine arrays onto coarse cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Emit a progress notification every N coarse cells.
    /// Default: None (silent).
    pub progress_interval: Option<usize>,

    /// Reduce cells on the rayon pool.
    /// Default: false
    pub parallel: bool,

    /// Check every mapping index against the fine array length before
    /// reducing anything. Out-of-range indices are reported either way;
    /// this only moves the check ahead of the reduction work.
    /// Default: false
    pub validate_indices: bool,
}

impl AggregateConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress notification interval.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Enable or disable parallel reduction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable eager index validation.
    pub fn with_validate_indices(mut self, validate: bool) -> Self {
        self.validate_indices = validate;
        self
    }

    /// Reject settings that cannot be honored.
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.progress_interval)
    }
}

/// Configuration for mapping persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// zstd compression level (1-22).
    /// Default: 3
    pub zstd_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { zstd_level: 3 }
    }
}

impl StorageConfig {
    /// Set the zstd compression level.
    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    /// Reject settings that cannot be honored.
    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.zstd_level) {
            return Err(RegridError::Config(format!(
                "zstd level {} outside 1..=22",
                self.zstd_level
            )));
        }
        Ok(())
    }
}

fn validate_interval(interval: Option<usize>) -> Result<()> {
    if interval == Some(0) {
        return Err(RegridError::Config(
            "progress interval must be positive".into(),
        ));
    }
    Ok(())
}
