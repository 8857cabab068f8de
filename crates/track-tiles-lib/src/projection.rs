//! Projection of geographic points onto the tile pyramid
//!
//! Tile rows use a flipped convention: `y = (2^zoom - 1) - standard_y`, so row 0 is the
//! southernmost row. Local pixel offsets are not flipped.

use std::f64::consts::PI;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Side of a square tile in pixels
pub const TILE_SIZE: i64 = 256;

/// Deepest zoom level the pyramid is built for
pub const MAX_ZOOM: u8 = 16;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// A track sample in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the latitude is inside the Web Mercator range
    #[inline]
    pub fn is_projectable(&self) -> bool {
        self.lat.abs() <= MAX_LATITUDE
    }
}

impl From<&gpx::Waypoint> for GeoPoint {
    fn from(waypoint: &gpx::Waypoint) -> Self {
        let point = waypoint.point();
        Self::new(point.y(), point.x())
    }
}

/// One tile of the pyramid (with the flipped row convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// The tile `dx` columns east and `dy` rows north of this one
    ///
    /// Offsets that leave the pyramid saturate at the edge.
    #[inline]
    pub fn offset(&self, dx: i64, dy: i64) -> Self {
        let shift = |v: u32, d: i64| (i64::from(v) + d).clamp(0, i64::from(u32::MAX)) as u32;
        Self {
            zoom: self.zoom,
            x: shift(self.x, dx),
            y: shift(self.y, dy),
        }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Position inside a tile, `(0, 0)` being the north-west corner
///
/// Projected points are always within `0..256`; crossing points on the east or south edge
/// carry the value 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocalPixel {
    pub px: u16,
    pub py: u16,
}

impl LocalPixel {
    pub fn new(px: u16, py: u16) -> Self {
        Self { px, py }
    }
}

impl fmt::Display for LocalPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.px, self.py)
    }
}

/// A local pixel tagged with the tile it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelPoint {
    pub tile: TileCoord,
    pub pixel: LocalPixel,
}

impl PixelPoint {
    pub fn new(tile: TileCoord, pixel: LocalPixel) -> Self {
        Self { tile, pixel }
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tile, self.pixel)
    }
}

/// Project a point to its tile and local pixel at `zoom`
///
/// Latitudes beyond [`MAX_LATITUDE`] are not clamped and produce meaningless tiles.
#[inline]
pub fn project(point: GeoPoint, zoom: u8) -> PixelPoint {
    let n = f64::from(1u32 << zoom);
    let xtile = (point.lon + 180.0) / 360.0 * n;
    let ytile = (1.0 - point.lat.to_radians().tan().asinh() / PI) / 2.0 * n;

    let (x_floor, y_floor) = (xtile.floor(), ytile.floor());
    let px = (TILE_SIZE as f64 * (xtile - x_floor)).floor() as u16;
    let py = (TILE_SIZE as f64 * (ytile - y_floor)).floor() as u16;

    let rows = 1i64 << zoom;
    let y = (rows - y_floor as i64 - 1).clamp(0, i64::from(u32::MAX)) as u32;

    PixelPoint::new(
        TileCoord::new(zoom, x_floor.max(0.0) as u32, y),
        LocalPixel::new(px, py),
    )
}
