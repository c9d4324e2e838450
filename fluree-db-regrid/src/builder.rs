//! Index mapping builder.
//!
//! Assigns fine sample points to coarse polygons. For each polygon, in
//! input order:
//! 1. Take its bounding box. A box with zero width or height cannot hold
//!    a sample: the cell gets an empty index list without any scan.
//! 2. Collect candidate points: all of them (`Scan`), or those in grid
//!    buckets overlapping the box (`Grid`).
//! 3. Reject candidates outside the box, then run the exact
//!    point-in-polygon test on the rest.
//! 4. Store the indices of contained points, ascending.
//!
//! # Usage
//!
//! ```ignore
//! let builder = MappingBuilder::new(BuildConfig::new().with_progress_interval(1000));
//! let mapping = builder.build(&polygons, &points)?;
//! mapping.save("cells.csv.zst", &StorageConfig::default())?;
//! ```

use crate::config::{BuildConfig, PointIndexConfig};
use crate::error::Result;
use crate::geometry::CellPolygon;
use crate::grid::PointGrid;
use crate::mapping::IndexMapping;
use crate::progress::{Progress, ProgressSink, Stage, TracingProgress};
use geo_types::Coord;
use rayon::prelude::*;

/// Statistics collected while building a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of polygons processed.
    pub polygons: u64,

    /// Polygons skipped because their bbox has zero extent.
    pub degenerate_cells: u64,

    /// Cells that ended with an empty index list (degenerate included).
    pub empty_cells: u64,

    /// Total indices written across all cells.
    pub points_assigned: u64,

    /// Candidates rejected by the bbox test.
    pub bbox_rejections: u64,

    /// Exact point-in-polygon tests performed.
    pub containment_tests: u64,
}

impl BuildStats {
    fn record(&mut self, cell: &CellScan) {
        self.polygons += 1;
        if cell.degenerate {
            self.degenerate_cells += 1;
        }
        if cell.indices.is_empty() {
            self.empty_cells += 1;
        }
        self.points_assigned += cell.indices.len() as u64;
        self.bbox_rejections += cell.bbox_rejections;
        self.containment_tests += cell.containment_tests;
    }
}

/// Result of building a mapping.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub mapping: IndexMapping,
    pub stats: BuildStats,
}

/// Outcome of scanning one polygon.
struct CellScan {
    indices: Vec<usize>,
    degenerate: bool,
    bbox_rejections: u64,
    containment_tests: u64,
}

/// Builds index mappings from polygons and points.
pub struct MappingBuilder {
    config: BuildConfig,
    sink: Box<dyn ProgressSink>,
}

impl MappingBuilder {
    /// Create a builder reporting progress through `tracing`.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingProgress),
        }
    }

    /// Deliver progress notifications to `sink` instead of `tracing`.
    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Assign points to polygons. Index list `i` of the result belongs to
    /// `polygons[i]`.
    pub fn build(&self, polygons: &[CellPolygon], points: &[Coord<f64>]) -> Result<IndexMapping> {
        Ok(self.build_with_stats(polygons, points)?.mapping)
    }

    /// Like [`MappingBuilder::build`], also returning build statistics.
    pub fn build_with_stats(
        &self,
        polygons: &[CellPolygon],
        points: &[Coord<f64>],
    ) -> Result<BuildResult> {
        self.config.validate()?;

        let span = tracing::info_span!(
            "regrid_build_mapping",
            polygon_count = polygons.len(),
            point_count = points.len(),
            parallel = self.config.parallel,
            rayon_threads = rayon::current_num_threads()
        );
        let _guard = span.enter();

        let grid = match self.config.point_index {
            PointIndexConfig::Scan => None,
            PointIndexConfig::Grid { cells_per_axis } => {
                let grid = PointGrid::new(points, cells_per_axis);
                tracing::debug!(buckets = grid.bucket_count(), "Bucketed fine points");
                Some(grid)
            }
        };

        let progress = Progress::new(
            Stage::Mapping,
            polygons.len(),
            self.config.progress_interval,
            self.sink.as_ref(),
        );
        let scan = |polygon: &CellPolygon| {
            let cell = scan_polygon(polygon, points, grid.as_ref());
            progress.tick();
            cell
        };

        // par_iter collects in input order, so cell identity is preserved
        let scans: Vec<CellScan> = if self.config.parallel {
            polygons.par_iter().map(scan).collect()
        } else {
            polygons.iter().map(scan).collect()
        };
        progress.finish();

        let mut stats = BuildStats::default();
        let mut cells = Vec::with_capacity(scans.len());
        for cell in scans {
            stats.record(&cell);
            cells.push(cell.indices);
        }

        tracing::debug!(
            polygons = stats.polygons,
            degenerate = stats.degenerate_cells,
            empty = stats.empty_cells,
            assigned = stats.points_assigned,
            exact_tests = stats.containment_tests,
            "Index mapping built"
        );

        Ok(BuildResult {
            mapping: IndexMapping::from(cells),
            stats,
        })
    }
}

impl Default for MappingBuilder {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

/// Build a mapping with a plain scan, optionally reporting progress every
/// `progress_interval` polygons.
pub fn build_mapping(
    polygons: &[CellPolygon],
    points: &[Coord<f64>],
    progress_interval: Option<usize>,
) -> Result<IndexMapping> {
    let config = BuildConfig {
        progress_interval,
        ..BuildConfig::default()
    };
    MappingBuilder::new(config).build(polygons, points)
}

fn scan_polygon(polygon: &CellPolygon, points: &[Coord<f64>], grid: Option<&PointGrid>) -> CellScan {
    let bbox = match polygon.bbox() {
        Some(bbox) if !bbox.is_degenerate() => bbox,
        _ => {
            tracing::trace!("Skipping zero-extent polygon");
            return CellScan {
                indices: Vec::new(),
                degenerate: true,
                bbox_rejections: 0,
                containment_tests: 0,
            };
        }
    };

    let mut cell = CellScan {
        indices: Vec::new(),
        degenerate: false,
        bbox_rejections: 0,
        containment_tests: 0,
    };
    let mut test = |idx: usize, c: &Coord<f64>| {
        if !bbox.contains_coord(c) {
            cell.bbox_rejections += 1;
            return;
        }
        cell.containment_tests += 1;
        if polygon.contains(c) {
            cell.indices.push(idx);
        }
    };

    match grid {
        Some(grid) => {
            for idx in grid.candidates(bbox) {
                test(idx, &points[idx]);
            }
        }
        None => {
            for (idx, c) in points.iter().enumerate() {
                test(idx, c);
            }
        }
    }

    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn unit_square(x0: f64, y0: f64) -> CellPolygon {
        CellPolygon::from_ring([(x0, y0), (x0 + 1.0, y0), (x0 + 1.0, y0 + 1.0), (x0, y0 + 1.0)])
    }

    fn pts(coords: &[(f64, f64)]) -> Vec<Coord<f64>> {
        coords.iter().copied().map(Coord::from).collect()
    }

    #[test]
    fn test_two_squares() {
        let polygons = vec![unit_square(0.0, 0.0), unit_square(1.0, 0.0)];
        let points = pts(&[(0.5, 0.5), (1.5, 0.5), (0.9, 0.9)]);

        let mapping = build_mapping(&polygons, &points, None).unwrap();
        assert_eq!(mapping.cells(), &[vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_empty_cell() {
        let polygons = vec![unit_square(0.0, 0.0), unit_square(1.0, 0.0)];
        let mapping = build_mapping(&polygons, &pts(&[(0.5, 0.5)]), None).unwrap();
        assert_eq!(mapping.cells(), &[vec![0], vec![]]);
    }

    #[test]
    fn test_degenerate_polygon_skipped() {
        // zero height; points sit exactly on its extent
        let sliver = CellPolygon::from_ring([(0.0, 1.0), (2.0, 1.0), (1.0, 1.0)]);
        let points = pts(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (0.5, 1.0)]);

        let builder = MappingBuilder::default();
        let result = builder.build_with_stats(&[sliver], &points).unwrap();

        assert_eq!(result.mapping.cells(), &[Vec::<usize>::new()]);
        assert_eq!(result.stats.degenerate_cells, 1);
        assert_eq!(result.stats.containment_tests, 0);
    }

    #[test]
    fn test_zero_width_polygon_skipped() {
        // zero width; points sit on the sliver, including both ends
        let sliver = CellPolygon::from_ring([(1.0, 0.0), (1.0, 2.0), (1.0, 1.0)]);
        let points = pts(&[(1.0, 0.0), (1.0, 1.0), (1.0, 2.0), (1.0, 0.5)]);

        for point_index in [
            PointIndexConfig::Scan,
            PointIndexConfig::Grid { cells_per_axis: 4 },
        ] {
            let builder = MappingBuilder::new(BuildConfig::new().with_point_index(point_index));
            let result = builder.build_with_stats(&[sliver.clone()], &points).unwrap();

            assert_eq!(result.mapping.cells(), &[Vec::<usize>::new()]);
            assert_eq!(result.stats.degenerate_cells, 1);
            assert_eq!(result.stats.containment_tests, 0);
        }
    }

    #[test]
    fn test_bbox_rejects_before_exact_test() {
        let polygons = vec![unit_square(0.0, 0.0)];
        let points = pts(&[(0.5, 0.5), (5.0, 5.0), (-3.0, 0.5)]);

        let result = MappingBuilder::default()
            .build_with_stats(&polygons, &points)
            .unwrap();
        assert_eq!(result.stats.bbox_rejections, 2);
        assert_eq!(result.stats.containment_tests, 1);
        assert_eq!(result.stats.points_assigned, 1);
    }

    #[test]
    fn test_no_points() {
        let polygons = vec![unit_square(0.0, 0.0)];
        let mapping = build_mapping(&polygons, &[], None).unwrap();
        assert_eq!(mapping.size(), 1);
        assert_eq!(mapping.empty_cells(), 1);
    }

    #[test]
    fn test_no_polygons() {
        let mapping = build_mapping(&[], &pts(&[(0.5, 0.5)]), None).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_triangle_containment() {
        let tri = CellPolygon::from_ring([(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        // (3, 3) is inside the bbox but outside the triangle
        let points = pts(&[(1.0, 1.0), (3.0, 3.0), (0.5, 3.0)]);
        let mapping = build_mapping(&[tri], &points, None).unwrap();
        assert_eq!(mapping.cells(), &[vec![0, 2]]);
    }

    #[test]
    fn test_grid_matches_scan() {
        let mut polygons = Vec::new();
        for row in 0..4 {
            for col in 0..4 {
                polygons.push(unit_square(col as f64, row as f64));
            }
        }
        polygons.push(CellPolygon::from_ring([(1.0, 1.0), (1.0, 3.0), (1.0, 2.0)]));

        let mut points = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                points.push(Coord {
                    x: i as f64 * 0.1 + 0.05,
                    y: j as f64 * 0.1 + 0.05,
                });
            }
        }

        let scan = MappingBuilder::default().build(&polygons, &points).unwrap();
        let grid = MappingBuilder::new(
            BuildConfig::new().with_point_index(PointIndexConfig::Grid { cells_per_axis: 7 }),
        )
        .build(&polygons, &points)
        .unwrap();

        assert_eq!(scan, grid);
        assert_eq!(scan.total_indices(), points.len());
    }

    #[test]
    fn test_parallel_preserves_order() {
        let polygons: Vec<_> = (0..50).map(|i| unit_square(i as f64, 0.0)).collect();
        let points: Vec<_> = (0..50)
            .rev()
            .map(|i| Coord {
                x: i as f64 + 0.5,
                y: 0.5,
            })
            .collect();

        let mapping = MappingBuilder::new(BuildConfig::new().with_parallel(true))
            .build(&polygons, &points)
            .unwrap();
        for (i, cell) in mapping.iter().enumerate() {
            assert_eq!(cell, &[49 - i]);
        }
    }

    #[test]
    fn test_progress_notifications() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);

        let polygons: Vec<_> = (0..5).map(|i| unit_square(i as f64, 0.0)).collect();
        MappingBuilder::new(BuildConfig::new().with_progress_interval(2))
            .with_progress_sink(move |e: crate::progress::ProgressEvent| {
                sink_events.lock().unwrap().push((e.completed, e.total))
            })
            .build(&polygons, &pts(&[(0.5, 0.5)]))
            .unwrap();

        assert_eq!(*events.lock().unwrap(), vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[test]
    fn test_invalid_config() {
        let err = MappingBuilder::new(BuildConfig::new().with_progress_interval(0))
            .build(&[], &[]);
        assert!(matches!(err, Err(crate::error::RegridError::Config(_))));
    }
}
