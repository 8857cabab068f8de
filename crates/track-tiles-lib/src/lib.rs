//! Track Tiles Library - Per-tile path extraction for GPX tracks
//!
//! This library converts a GPS track into the exact sub-path that crosses every tile of a
//! slippy-map pyramid, expressed in each tile's local 256x256 pixel space. A renderer can then
//! draw a tile by replaying its polylines without touching the original geometry.
//!
//! # Architecture
//!
//! - **[`projection`]**: Web-Mercator projection of a point to a tile and local pixel
//! - **[`crossing`]**: Grid-line crossings between two points in different tiles
//! - **[`PathIndex`]** / **[`PathBuilder`]**: Per-zoom accumulation of polylines per tile
//! - **[`serialize`]**: Fixed little-endian binary layout, one file per tile
//! - **[`TilePyramid`]**: Runs every zoom level of a [`Config`] in parallel
//! - **[`render`]**: Diagnostic PNG of one zoom level
//!
//! # Coordinate conventions
//!
//! Tile rows are flipped: row 0 is the southernmost row of a zoom level. Local pixel rows are
//! not flipped, `py = 0` is the northern edge of a tile.

pub mod crossing;
mod path;
pub mod projection;
mod pyramid;
pub mod render;
pub mod serialize;
mod track;

// Public API exports
pub use crossing::Crossing;
pub use path::{PathBuilder, PathIndex, Polyline, TilePaths, build_zoom};
pub use projection::{GeoPoint, LocalPixel, PixelPoint, TileCoord, project};
pub use pyramid::{Config, PyramidInfo, TilePyramid};
pub use render::RenderOptions;
pub use track::Track;

/// What went wrong while attributing crossing points to tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The origin tile did not receive exactly one crossing point
    OriginPointCount(usize),
    /// A touched tile received no point or more than two points
    GroupSize(usize),
    /// The destination tile was never opened by the crossings
    MissingDestination,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OriginPointCount(n) => {
                write!(f, "origin tile received {n} crossing points, expected exactly 1")
            }
            Self::GroupSize(n) => write!(f, "tile received {n} crossing points, expected 1 or 2"),
            Self::MissingDestination => write!(f, "destination tile has no open polyline"),
        }
    }
}

/// Internal consistency failure of the crossing attribution
///
/// This is never recoverable: it means either a geometry bug or a segment that passes exactly
/// through a tile corner, which only the two tiles adjacent along each crossed axis are
/// proven to touch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("consistency violation at tile {tile}: {kind} (segment {begin} -> {end})")]
pub struct ConsistencyViolation {
    /// The tile the failed check was about
    pub tile: TileCoord,
    /// Projected point the segment starts at
    pub begin: PixelPoint,
    /// Projected point the segment ends at
    pub end: PixelPoint,
    pub kind: ViolationKind,
}

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("Track has {0} points, at least 2 are required")]
    TooFewPoints(usize),

    #[error(transparent)]
    Consistency(#[from] Box<ConsistencyViolation>),

    #[error("Failed to write tile {coord}: {source}")]
    TileWrite {
        coord: TileCoord,
        #[source]
        source: std::io::Error,
    },

    #[error("Tile {coord} holds {count} {what}, more than a u16 count can describe")]
    CountOverflow {
        coord: TileCoord,
        what: &'static str,
        count: usize,
    },

    #[error("Malformed tile data: {0}")]
    MalformedTile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Zoom levels {0:?} could not be built")]
    IncompleteLevels(Vec<u8>),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConsistencyViolation> for TileError {
    fn from(violation: ConsistencyViolation) -> Self {
        Self::Consistency(Box::new(violation))
    }
}

pub type Result<T> = std::result::Result<T, TileError>;
