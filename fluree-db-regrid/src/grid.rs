//! Uniform grid bucketing over fine sample points.
//!
//! The plain builder scans every point for every polygon. With a
//! `PointGrid` the builder instead asks for the points whose bucket
//! overlaps the polygon's bounding box, and runs the exact test on those
//! only. Candidates come back in ascending point order, so the resulting
//! index lists are identical to the scan's.
//!
//! ```text
//!   extent of all points, split into cells_per_axis x cells_per_axis buckets
//!   ┌────┬────┬────┬────┐
//!   │    │ ░░ │ ░░ │    │   ░ = buckets overlapping a polygon bbox
//!   ├────┼────┼────┼────┤
//!   │    │ ░░ │ ░░ │    │
//!   └────┴────┴────┴────┘
//! ```

use crate::geometry::BBox;
use geo_types::Coord;
use rustc_hash::FxHashMap;

/// Sparse bucket grid over a point set.
pub struct PointGrid {
    /// Extent of all finite points.
    extent: Option<BBox>,

    /// Buckets along each axis.
    cells_per_axis: usize,

    /// (column, row) -> point indices, ascending.
    buckets: FxHashMap<(usize, usize), Vec<usize>>,
}

impl PointGrid {
    /// Bucket `points` into a `cells_per_axis` square grid over their extent.
    ///
    /// Points with non-finite coordinates are left out; they can never
    /// fall inside a polygon.
    pub fn new(points: &[Coord<f64>], cells_per_axis: usize) -> Self {
        let cells_per_axis = cells_per_axis.max(1);
        let finite: Vec<Coord<f64>> = points
            .iter()
            .copied()
            .filter(|c| c.x.is_finite() && c.y.is_finite())
            .collect();
        let extent = BBox::enclosing(&finite);

        let mut grid = Self {
            extent,
            cells_per_axis,
            buckets: FxHashMap::default(),
        };

        if let Some(extent) = extent {
            for (idx, c) in points.iter().enumerate() {
                if !(c.x.is_finite() && c.y.is_finite()) {
                    continue;
                }
                let col = grid.bucket(c.x, extent.min_x, extent.width());
                let row = grid.bucket(c.y, extent.min_y, extent.height());
                grid.buckets.entry((col, row)).or_default().push(idx);
            }
        }

        grid
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Indices of points whose bucket overlaps `bbox`, ascending.
    ///
    /// This is a superset of the points inside `bbox`; callers still run
    /// the exact test.
    pub fn candidates(&self, bbox: &BBox) -> Vec<usize> {
        let Some(extent) = self.extent else {
            return Vec::new();
        };
        if !extent.intersects(bbox) {
            return Vec::new();
        }

        let col_lo = self.bucket(bbox.min_x, extent.min_x, extent.width());
        let col_hi = self.bucket(bbox.max_x, extent.min_x, extent.width());
        let row_lo = self.bucket(bbox.min_y, extent.min_y, extent.height());
        let row_hi = self.bucket(bbox.max_y, extent.min_y, extent.height());

        let mut out = Vec::new();
        let span = (col_hi - col_lo + 1).saturating_mul(row_hi - row_lo + 1);
        if span > self.buckets.len() {
            // sparse grid: walk the occupied buckets instead of the range
            for (&(col, row), bucket) in &self.buckets {
                if (col_lo..=col_hi).contains(&col) && (row_lo..=row_hi).contains(&row) {
                    out.extend_from_slice(bucket);
                }
            }
        } else {
            for col in col_lo..=col_hi {
                for row in row_lo..=row_hi {
                    if let Some(bucket) = self.buckets.get(&(col, row)) {
                        out.extend_from_slice(bucket);
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Bucket position of `v` along one axis, clamped to the grid.
    fn bucket(&self, v: f64, min: f64, span: f64) -> usize {
        if span <= 0.0 || v <= min {
            return 0;
        }
        let pos = ((v - min) / span * self.cells_per_axis as f64).floor();
        (pos as usize).min(self.cells_per_axis - 1)
    }
}
