//! Regridding of fine-resolution samples onto coarse polygonal cells.
//!
//! This crate summarizes high-resolution gridded data (e.g. raster cell
//! centres) onto an irregular coarse grid (e.g. polygons). It supports:
//!
//! - **Mapping construction** by point-in-polygon tests behind a bbox
//!   prefilter, with an optional grid bucketing of the points
//! - **Persistence** of the mapping as compressed text, so it is computed
//!   once and reused
//! - **Aggregation** of any number of fine arrays through one mapping with
//!   a pluggable reducer and explicit missing-value / fill-value handling
//!
//! # Architecture
//!
//! ```text
//!   polygons + points
//!          │
//!          ▼
//!   MappingBuilder ── bbox prefilter ─► exact contains (geo crate)
//!          │
//!          ▼
//!     IndexMapping ◄──────► storage (zstd, one line per cell)
//!          │
//!          ▼
//!     Aggregator ◄── MaskedArray (fine values + missing mask)
//!          │     ◄── Reducer (median, mean, sum, min, max, closures)
//!          ▼
//!   coarse values (one per cell, fill value where nothing is present)
//! ```
//!
//! Reshaping coarse values into a 2D raster is left to the caller.
//!
//! # Modules
//!
//! - [`config`]: Build, aggregate and storage configuration
//! - [`geometry`]: Coarse cell shapes, bounding boxes, WKT parsing
//! - [`mapping`]: The cell → sample index mapping
//! - [`storage`]: Mapping serialization
//! - [`masked`]: Fine arrays with a missing-value mask
//! - [`reduce`]: Reduction functions
//! - [`progress`]: Progress notifications
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod masked;
pub mod progress;
pub mod reduce;
pub mod storage;

mod aggregate;
mod builder;
mod grid;

// Re-export key types
pub use aggregate::{aggregate_median, AggregateResult, AggregateStats, Aggregator};
pub use builder::{build_mapping, BuildResult, BuildStats, MappingBuilder};
pub use config::{AggregateConfig, BuildConfig, PointIndexConfig, StorageConfig};
pub use error::{RegridError, Result};
pub use geometry::{parse_wkt_cell, BBox, CellPolygon};
pub use grid::PointGrid;
pub use mapping::IndexMapping;
pub use masked::MaskedArray;
pub use progress::{ProgressEvent, ProgressSink, Stage, TracingProgress};
pub use reduce::{Reducer, Reduction};
pub use storage::{load_mapping, read_mapping, write_mapping};
