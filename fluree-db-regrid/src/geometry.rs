//! Coarse cell shapes and fine sample points.
//!
//! This module provides:
//! - Axis-aligned bounding boxes used as the cheap rejection test
//! - `CellPolygon`, the region associated with one coarse cell
//! - WKT parsing for callers that keep their cell boundaries as text
//!
//! Fine samples are plain `geo_types::Coord<f64>` values; a sample's
//! identity is its position in the point slice handed to the builder.

use crate::error::{RegridError, Result};
use geo::{BoundingRect, Contains};
use geo_types::{Coord, Geometry, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when the box has zero width or zero height.
    ///
    /// A degenerate box cannot enclose any sample, so cells with one are
    /// never scanned.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Check if this bbox contains a coordinate (boundary inclusive).
    pub fn contains_coord(&self, c: &Coord<f64>) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Smallest box enclosing all coordinates, `None` for an empty slice.
    pub fn enclosing(coords: &[Coord<f64>]) -> Option<Self> {
        let first = coords.first()?;
        let mut bbox = BBox::new(first.x, first.x, first.y, first.y);
        for c in &coords[1..] {
            bbox.min_x = bbox.min_x.min(c.x);
            bbox.max_x = bbox.max_x.max(c.x);
            bbox.min_y = bbox.min_y.min(c.y);
            bbox.max_y = bbox.max_y.max(c.y);
        }
        Some(bbox)
    }
}

impl From<Rect<f64>> for BBox {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            max_x: rect.max().x,
            min_y: rect.min().y,
            max_y: rect.max().y,
        }
    }
}

/// Region covered by one coarse cell.
///
/// The bounding box is computed once at construction; the shape is
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct CellPolygon {
    shape: MultiPolygon<f64>,
    bbox: Option<BBox>,
}

impl CellPolygon {
    /// Wrap a (multi)polygon, computing its bounding box.
    pub fn new(shape: MultiPolygon<f64>) -> Self {
        let bbox = shape.bounding_rect().map(BBox::from);
        Self { shape, bbox }
    }

    /// Build a cell from an exterior ring given as `(x, y)` vertices.
    ///
    /// The ring is closed automatically if the last vertex differs from
    /// the first.
    pub fn from_ring(vertices: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let ring: Vec<Coord<f64>> = vertices.into_iter().map(Coord::from).collect();
        Polygon::new(ring.into(), Vec::new()).into()
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Bounding box, `None` when the shape has no vertices.
    pub fn bbox(&self) -> Option<&BBox> {
        self.bbox.as_ref()
    }

    /// True when the cell has no area to hold samples: either no vertices
    /// or a bounding box of zero width or height.
    pub fn is_degenerate(&self) -> bool {
        self.bbox.as_ref().map_or(true, BBox::is_degenerate)
    }

    /// Exact containment test. Points on the boundary count as outside.
    pub fn contains(&self, c: &Coord<f64>) -> bool {
        self.shape.contains(&Point::from(*c))
    }
}

impl From<Polygon<f64>> for CellPolygon {
    fn from(polygon: Polygon<f64>) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]))
    }
}

impl From<MultiPolygon<f64>> for CellPolygon {
    fn from(shape: MultiPolygon<f64>) -> Self {
        Self::new(shape)
    }
}

impl From<Rect<f64>> for CellPolygon {
    fn from(rect: Rect<f64>) -> Self {
        rect.to_polygon().into()
    }
}

impl TryFrom<Geometry<f64>> for CellPolygon {
    type Error = RegridError;

    fn try_from(geom: Geometry<f64>) -> Result<Self> {
        match geom {
            Geometry::Polygon(p) => Ok(p.into()),
            Geometry::MultiPolygon(mp) => Ok(mp.into()),
            Geometry::Rect(r) => Ok(r.into()),
            Geometry::Triangle(t) => Ok(t.to_polygon().into()),
            other => Err(RegridError::InvalidGeometry(format!(
                "coarse cells must be polygonal, got {:?}",
                other
            ))),
        }
    }
}

/// Parse WKT string to geo-types Geometry.
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    use std::str::FromStr;
    let parsed =
        wkt::Wkt::<f64>::from_str(wkt).map_err(|e| RegridError::WktParse(format!("{:?}", e)))?;
    Geometry::try_from(parsed).map_err(|e| RegridError::WktParse(format!("{:?}", e)))
}

/// Parse a `POLYGON` or `MULTIPOLYGON` WKT string into a coarse cell.
pub fn parse_wkt_cell(wkt: &str) -> Result<CellPolygon> {
    CellPolygon::try_from(parse_wkt(wkt)?)
}
