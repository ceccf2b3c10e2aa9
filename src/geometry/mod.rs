//! Geometry primitives
//!
//! Restriction areas are CRS-tagged multi-polygons backed by `geo`. Union
//! and intersection use its boolean operations, so arbitrary polygons
//! (holes included) are merged exactly as drawn.
//!
//! Areas are exchanged as EWKT (`SRID=4326;POLYGON((...))`). Text without an
//! `SRID=` prefix is tagged with the caller's default SRID.

pub mod ops;
pub mod projection;

pub use ops::{NullPolicy, intersection, union};
pub use projection::{WEB_MERCATOR, WGS84, is_supported, reproject};

use crate::error::GeometryError;
use geo::{Area, BooleanOps, Contains, MultiPolygon, Point, Polygon, coord};
use serde::{Serialize, Serializer};
use std::fmt;
use wkt::{ToWkt, TryFromWkt};

/// A CRS-tagged multi-polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    srid: u32,
    shape: MultiPolygon<f64>,
}

impl Geometry {
    pub fn new(srid: u32, shape: MultiPolygon<f64>) -> Self {
        Self { srid, shape }
    }

    pub fn from_polygons(srid: u32, polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        Self::new(srid, MultiPolygon::new(polygons.into_iter().collect()))
    }

    /// A single axis-aligned box in the given CRS
    pub fn rect(srid: u32, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let rect = geo::Rect::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 });
        Self::from_polygons(srid, [rect.to_polygon()])
    }

    /// The empty area: nothing passes through it
    pub fn empty(srid: u32) -> Self {
        Self::new(srid, MultiPolygon::new(Vec::new()))
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty() || self.shape.unsigned_area() == 0.0
    }

    /// Whether the point lies in the interior of the area
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    /// Point-set union. Both operands must share a CRS.
    pub fn union(&self, other: &Geometry) -> Geometry {
        debug_assert_eq!(self.srid, other.srid);
        if self.is_empty() {
            return Geometry::new(self.srid, other.shape.clone());
        }
        if other.is_empty() || self.shape == other.shape {
            return self.clone();
        }
        Geometry::new(self.srid, self.shape.union(&other.shape))
    }

    /// Point-set intersection. Both operands must share a CRS.
    pub fn intersection(&self, other: &Geometry) -> Geometry {
        debug_assert_eq!(self.srid, other.srid);
        if self.is_empty() || other.is_empty() {
            return Geometry::empty(self.srid);
        }
        if self.shape == other.shape {
            return self.clone();
        }
        Geometry::new(self.srid, self.shape.intersection(&other.shape))
    }

    /// Parse EWKT, tagging untagged text with `default_srid`
    pub fn parse(text: &str, default_srid: u32) -> Result<Self, GeometryError> {
        let trimmed = text.trim();
        let (srid, body) = match trimmed.split_once(';') {
            Some((prefix, body)) if prefix.trim().to_ascii_uppercase().starts_with("SRID") => {
                let srid = prefix
                    .split_once('=')
                    .and_then(|(_, v)| v.trim().parse::<u32>().ok())
                    .ok_or_else(|| parse_error(text, "malformed SRID prefix"))?;
                (srid, body.trim())
            }
            _ => (default_srid, trimmed),
        };
        if body.is_empty() {
            return Err(parse_error(text, "missing geometry type"));
        }

        let parsed = geo::Geometry::<f64>::try_from_wkt_str(body)
            .map_err(|e| parse_error(text, &e.to_string()))?;

        let polygons = match parsed {
            geo::Geometry::Polygon(p) => vec![p],
            geo::Geometry::MultiPolygon(mp) => mp.0,
            geo::Geometry::Rect(r) => vec![r.to_polygon()],
            other => {
                return Err(GeometryError::Unsupported {
                    text: text.to_string(),
                    reason: format!("{} is not a polygonal geometry", kind_name(&other)),
                });
            }
        };

        Ok(Geometry::from_polygons(
            srid,
            polygons.into_iter().filter(|p| !p.exterior().0.is_empty()),
        ))
    }

    /// WKT without the SRID prefix
    pub fn to_wkt(&self) -> String {
        match self.shape.0.as_slice() {
            [] => "MULTIPOLYGON EMPTY".to_string(),
            [single] => single.wkt_string(),
            _ => self.shape.wkt_string(),
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SRID={};{}", self.srid, self.to_wkt())
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn kind_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "POINT",
        geo::Geometry::Line(_) | geo::Geometry::LineString(_) => "LINESTRING",
        geo::Geometry::MultiPoint(_) => "MULTIPOINT",
        geo::Geometry::MultiLineString(_) => "MULTILINESTRING",
        geo::Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        geo::Geometry::Triangle(_) => "TRIANGLE",
        geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) | geo::Geometry::Rect(_) => {
            "POLYGON"
        }
    }
}

fn parse_error(text: &str, reason: &str) -> GeometryError {
    GeometryError::Parse {
        text: text.to_string(),
        reason: reason.to_string(),
    }
}
