//! Per-zoom accumulation of the track's path, split by tile
//!
//! A [`PathBuilder`] walks the projected track once and owns the [`PathIndex`] it fills. Each
//! contiguous visit of the track to a tile becomes one [`Polyline`] in that tile's local pixel
//! space; crossing points are shared by the tiles on both sides of the boundary.

use crate::crossing::{self, Crossing};
use crate::projection::{GeoPoint, LocalPixel, PixelPoint, TileCoord, project};
use crate::{ConsistencyViolation, Result, TileError, ViolationKind};
use smallvec::SmallVec;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One contiguous visit of the track to a tile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polyline {
    points: Vec<LocalPixel>,
}

impl Polyline {
    pub fn new(points: Vec<LocalPixel>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[LocalPixel] {
        &self.points
    }

    #[inline]
    pub fn push(&mut self, point: LocalPixel) {
        self.points.push(point);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Collapse runs of identical consecutive points into one
    pub fn normalize(&mut self) {
        self.points.dedup();
    }
}

impl From<Vec<LocalPixel>> for Polyline {
    fn from(points: Vec<LocalPixel>) -> Self {
        Self::new(points)
    }
}

/// All polylines of one tile, in the order they were opened
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilePaths {
    pub coord: TileCoord,
    pub polylines: Vec<Polyline>,
}

/// Mapping from tile to its polylines for one zoom level
///
/// Iteration follows the order in which tiles were first touched along the track.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "Vec<TilePaths>", into = "Vec<TilePaths>")
)]
pub struct PathIndex {
    tiles: Vec<TilePaths>,
    lookup: HashMap<TileCoord, usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new polyline to `coord`, inserting the tile if it was never touched
    pub fn open_polyline(&mut self, coord: TileCoord, polyline: Polyline) {
        match self.lookup.get(&coord) {
            Some(&i) => self.tiles[i].polylines.push(polyline),
            None => {
                self.lookup.insert(coord, self.tiles.len());
                self.tiles.push(TilePaths {
                    coord,
                    polylines: vec![polyline],
                });
            }
        }
    }

    /// The most recently opened polyline of `coord`
    pub fn last_polyline_mut(&mut self, coord: &TileCoord) -> Option<&mut Polyline> {
        let i = *self.lookup.get(coord)?;
        self.tiles[i].polylines.last_mut()
    }

    /// Append `point` to the most recently opened polyline of `coord`
    ///
    /// Returns false if the tile was never touched.
    pub fn push_to_last(&mut self, coord: &TileCoord, point: LocalPixel) -> bool {
        match self.last_polyline_mut(coord) {
            Some(polyline) => {
                polyline.push(point);
                true
            }
            None => false,
        }
    }

    /// Polylines of `coord`, if the track touched it
    pub fn get(&self, coord: &TileCoord) -> Option<&[Polyline]> {
        self.lookup
            .get(coord)
            .map(|&i| self.tiles[i].polylines.as_slice())
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.lookup.contains_key(coord)
    }

    /// Tiles in first-touched order
    pub fn iter(&self) -> std::slice::Iter<'_, TilePaths> {
        self.tiles.iter()
    }

    /// Number of tiles touched
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn polyline_count(&self) -> usize {
        self.tiles.iter().map(|t| t.polylines.len()).sum()
    }

    pub fn point_count(&self) -> usize {
        self.tiles
            .iter()
            .flat_map(|t| &t.polylines)
            .map(Polyline::len)
            .sum()
    }

    /// Remove consecutive duplicate points from every polyline
    pub fn normalize(&mut self) {
        for tile in &mut self.tiles {
            for polyline in &mut tile.polylines {
                polyline.normalize();
            }
        }
    }
}

impl From<Vec<TilePaths>> for PathIndex {
    /// Rebuild an index from its tiles, merging repeated tiles in order
    fn from(tiles: Vec<TilePaths>) -> Self {
        let mut index = Self::new();
        for tile in tiles {
            for polyline in tile.polylines {
                index.open_polyline(tile.coord, polyline);
            }
        }
        index
    }
}

impl From<PathIndex> for Vec<TilePaths> {
    fn from(index: PathIndex) -> Self {
        index.tiles
    }
}

impl<'a> IntoIterator for &'a PathIndex {
    type Item = &'a TilePaths;
    type IntoIter = std::slice::Iter<'a, TilePaths>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Crossing points grouped by the absolute tile they belong to
type CrossingGroups = SmallVec<[(TileCoord, SmallVec<[LocalPixel; 2]>); 4]>;

/// Builds the [`PathIndex`] of one zoom level from consecutive track points
#[derive(Debug)]
pub struct PathBuilder {
    zoom: u8,
    index: PathIndex,
    current: PixelPoint,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PathBuilder {
    /// Start a pass at `zoom`, opening the first tile's polyline with `first`
    pub fn new(zoom: u8, first: GeoPoint) -> Self {
        let current = project(first, zoom);
        let mut index = PathIndex::new();
        index.open_polyline(current.tile, Polyline::new(vec![current.pixel]));
        Self {
            zoom,
            index,
            current,
        }
    }

    #[inline]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Add the next track point
    pub fn push(&mut self, point: GeoPoint) -> Result<()> {
        let next = project(point, self.zoom);
        self.push_projected(next)
    }

    /// Add the next track point, already projected at this builder's zoom
    pub fn push_projected(&mut self, next: PixelPoint) -> Result<()> {
        if next.tile == self.current.tile {
            if !self.index.push_to_last(&next.tile, next.pixel) {
                return Err(self.violation(next.tile, next, ViolationKind::MissingDestination));
            }
        } else {
            let crossings = crossing::resolve_crossings(&self.current, &next);
            self.apply_crossings(next, &crossings)?;
        }
        self.current = next;
        Ok(())
    }

    /// Distribute the crossings between the current point and `next` over the touched tiles
    pub(crate) fn apply_crossings(
        &mut self,
        next: PixelPoint,
        crossings: &[Crossing],
    ) -> Result<()> {
        let origin = self.current.tile;
        let groups = Self::group_by_tile(origin, crossings);

        let origin_points = groups
            .iter()
            .find(|(coord, _)| *coord == origin)
            .map_or(0, |(_, points)| points.len());
        if origin_points != 1 {
            let kind = ViolationKind::OriginPointCount(origin_points);
            return Err(self.violation(origin, next, kind));
        }
        if let Some((coord, points)) = groups.iter().find(|(_, p)| p.is_empty() || p.len() > 2) {
            return Err(self.violation(*coord, next, ViolationKind::GroupSize(points.len())));
        }

        for (coord, points) in groups {
            if coord == origin {
                if !self.index.push_to_last(&origin, points[0]) {
                    return Err(self.violation(origin, next, ViolationKind::MissingDestination));
                }
            } else {
                self.index
                    .open_polyline(coord, Polyline::new(points.into_vec()));
            }
        }

        if !self.index.push_to_last(&next.tile, next.pixel) {
            return Err(self.violation(next.tile, next, ViolationKind::MissingDestination));
        }
        Ok(())
    }

    /// Group crossings by absolute tile, keeping the order in which tiles first appear
    fn group_by_tile(origin: TileCoord, crossings: &[Crossing]) -> CrossingGroups {
        let mut groups = CrossingGroups::new();
        for crossing in crossings {
            let coord = origin.offset(crossing.dx, crossing.dy);
            match groups.iter_mut().find(|(c, _)| *c == coord) {
                Some((_, points)) => points.push(crossing.pixel),
                None => groups.push((coord, smallvec::smallvec![crossing.pixel])),
            }
        }
        groups
    }

    fn violation(&self, tile: TileCoord, end: PixelPoint, kind: ViolationKind) -> TileError {
        tracing::debug!(
            zoom = self.zoom,
            %tile,
            begin = %self.current,
            %end,
            "Crossing attribution failed: {kind}"
        );
        ConsistencyViolation {
            tile,
            begin: self.current,
            end,
            kind,
        }
        .into()
    }

    /// Finish the pass and hand over the accumulated index (not normalized)
    pub fn finish(self) -> PathIndex {
        self.index
    }
}

/// Build the normalized [`PathIndex`] of `points` at `zoom`
pub fn build_zoom(points: &[GeoPoint], zoom: u8) -> Result<PathIndex> {
    #[cfg(feature = "profiling")]
    profiling::scope!("path::build_zoom");

    let (first, rest) = match points {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => return Err(TileError::TooFewPoints(points.len())),
    };

    let mut builder = PathBuilder::new(zoom, *first);
    for point in rest {
        builder.push(*point)?;
    }

    let mut index = builder.finish();
    index.normalize();

    tracing::debug!(
        zoom,
        tiles = index.len(),
        polylines = index.polyline_count(),
        points = index.point_count(),
        "Built zoom level"
    );
    Ok(index)
}
