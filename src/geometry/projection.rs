//! Reprojection between the supported coordinate reference systems
//!
//! Coordinates are transformed vertex by vertex. Geographic WGS84 and
//! spherical Web Mercator are separable in x and y, so axis-aligned edges
//! stay axis-aligned.

use super::Geometry;
use geo::{Coord, MapCoords};
use crate::error::GeometryError;
use std::f64::consts::PI;

/// Geographic WGS84 (EPSG:4326)
pub const WGS84: u32 = 4326;

/// Spherical Web Mercator (EPSG:3857)
pub const WEB_MERCATOR: u32 = 3857;

/// Legacy codes for Web Mercator
const WEB_MERCATOR_ALIASES: &[u32] = &[900913, 3785, 102100, 102113];

const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

fn canonical(srid: u32) -> u32 {
    if WEB_MERCATOR_ALIASES.contains(&srid) {
        WEB_MERCATOR
    } else {
        srid
    }
}

/// Whether areas in this CRS can be merged with areas in other CRSs
pub fn is_supported(srid: u32) -> bool {
    matches!(canonical(srid), WGS84 | WEB_MERCATOR)
}

/// Reproject `geometry` into `target`. A geometry already in the target CRS
/// is returned unchanged.
pub fn reproject(geometry: &Geometry, target: u32) -> Result<Geometry, GeometryError> {
    let from = canonical(geometry.srid());
    let to = canonical(target);
    if from == to {
        return Ok(Geometry::new(target, geometry.shape().clone()));
    }

    let transform: fn(f64, f64) -> (f64, f64) = match (from, to) {
        (WGS84, WEB_MERCATOR) => to_mercator,
        (WEB_MERCATOR, WGS84) => to_geographic,
        _ => {
            return Err(GeometryError::Reprojection {
                from: geometry.srid(),
                to: target,
            });
        }
    };

    let shape = geometry.shape().map_coords(|c: Coord<f64>| {
        let (x, y) = transform(c.x, c.y);
        Coord { x, y }
    });
    Ok(Geometry::new(target, shape))
}

fn to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
