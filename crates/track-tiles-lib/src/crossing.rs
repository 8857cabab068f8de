//! Grid-line crossings between two points in different tiles
//!
//! Both points are placed in a single unfolded pixel plane anchored at the first point's tile:
//! that tile spans `x` in `[0, 256]` and `y` in `[-256, 0]`, with `y` growing northwards like
//! the flipped tile rows. Every crossing of the straight segment with a tile grid line is
//! then classified into the tiles on either side of that line.
//!
//! A crossing that lands exactly on a grid corner is only attributed to the tiles adjacent
//! along each crossed axis, never to all four tiles touching the corner.

use crate::projection::{LocalPixel, PixelPoint, TILE_SIZE};
use smallvec::SmallVec;

/// A point of the unfolded plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanePoint {
    pub x: i64,
    pub y: i64,
}

impl PlanePoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A crossing point attributed to one tile
///
/// `dx` and `dy` are the tile offsets relative to the segment's first tile (east and north
/// positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub pixel: LocalPixel,
    pub dx: i64,
    pub dy: i64,
}

impl Crossing {
    pub fn new(px: u16, py: u16, dx: i64, dy: i64) -> Self {
        Self {
            pixel: LocalPixel::new(px, py),
            dx,
            dy,
        }
    }

    /// Position of this crossing in the unfolded plane of its segment
    #[inline]
    pub fn to_plane(&self) -> PlanePoint {
        PlanePoint::new(
            self.dx * TILE_SIZE + i64::from(self.pixel.px),
            self.dy * TILE_SIZE - i64::from(self.pixel.py),
        )
    }
}

/// Raw grid crossings of one segment, split by the family of grid lines crossed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCrossings {
    /// Crossings with horizontal grid lines (`y` multiple of 256), in travel order
    pub horizontal_lines: Vec<PlanePoint>,
    /// Crossings with vertical grid lines (`x` multiple of 256), in travel order
    pub vertical_lines: Vec<PlanePoint>,
}

impl GridCrossings {
    /// Horizontal-line crossings followed by vertical-line crossings
    pub fn into_ordered(self) -> Vec<PlanePoint> {
        let mut points = self.horizontal_lines;
        points.extend(self.vertical_lines);
        points
    }
}

/// Place both endpoints of a segment in the unfolded plane of `begin`'s tile
pub fn unfold(begin: &PixelPoint, end: &PixelPoint) -> (PlanePoint, PlanePoint) {
    let tile_dx = i64::from(end.tile.x) - i64::from(begin.tile.x);
    let tile_dy = i64::from(end.tile.y) - i64::from(begin.tile.y);

    let start = PlanePoint::new(i64::from(begin.pixel.px), -i64::from(begin.pixel.py));
    let stop = PlanePoint::new(
        tile_dx * TILE_SIZE + i64::from(end.pixel.px),
        tile_dy * TILE_SIZE - i64::from(end.pixel.py),
    );
    (start, stop)
}

/// Whether `value` has not yet passed `limit` when travelling in direction `dir`
#[inline]
fn before_or_at(value: f64, limit: f64, dir: f64) -> bool {
    if dir > 0.0 { value <= limit } else { value >= limit }
}

/// Round a plane coordinate to the nearest pixel, ties away from zero
#[inline]
fn snap(value: f64) -> i64 {
    value.round() as i64
}

/// Enumerate every grid-line crossing between `p1` and `p2`
///
/// Lines are stepped from the first grid line of `p1`'s tile in the travel direction until the
/// line passes `p2`; a line through `p2` is included.
pub fn grid_crossings(p1: PlanePoint, p2: PlanePoint) -> GridCrossings {
    let tile = TILE_SIZE as f64;
    let (x1, y1) = (p1.x as f64, p1.y as f64);
    let (x2, y2) = (p2.x as f64, p2.y as f64);

    let dir_x = if x1 < x2 { 1.0 } else { -1.0 };
    let dir_y = if y1 < y2 { 1.0 } else { -1.0 };
    let first_vertical_line = if dir_x > 0.0 { tile } else { 0.0 };
    let first_horizontal_line = if dir_y > 0.0 { 0.0 } else { -tile };

    // Each family is (start point, per-step increment), or None when the segment never meets
    // lines of that family
    let (vertical, horizontal) = if p1.x == p2.x {
        (None, Some(((x1, first_horizontal_line), (0.0, dir_y * tile))))
    } else if p1.y == p2.y {
        (Some(((first_vertical_line, y1), (dir_x * tile, 0.0))), None)
    } else {
        let a = (y2 - y1) / (x2 - x1);
        let b = y1 - a * x1;
        let step_x = dir_x * (tile / a).abs();
        let step_y = dir_y * (tile * a).abs();
        (
            Some((
                (first_vertical_line, a * first_vertical_line + b),
                (dir_x * tile, step_y),
            )),
            Some((
                ((first_horizontal_line - b) / a, first_horizontal_line),
                (step_x, dir_y * tile),
            )),
        )
    };

    // Only the coordinate a family steps exactly is bounded; the other one is interpolated and
    // may miss an endpoint lying on the grid line by a rounding error
    let walk = |family: Option<((f64, f64), (f64, f64))>, steps_x: bool| {
        let mut points = Vec::new();
        if let Some(((mut sx, mut sy), (step_x, step_y))) = family {
            while if steps_x {
                before_or_at(sx, x2, dir_x)
            } else {
                before_or_at(sy, y2, dir_y)
            } {
                points.push(PlanePoint::new(snap(sx), snap(sy)));
                sx += step_x;
                sy += step_y;
            }
        }
        points
    };

    GridCrossings {
        horizontal_lines: walk(horizontal, false),
        vertical_lines: walk(vertical, true),
    }
}

/// Expand a crossing point into the tiles whose edge it lies on
///
/// A point on a vertical edge belongs to the tiles west and east of it, a point on a
/// horizontal edge to the tiles south and north of it. A corner fires both rules.
pub fn classify(point: PlanePoint) -> SmallVec<[Crossing; 4]> {
    let mut out = SmallVec::new();

    let dx = point.x.rem_euclid(TILE_SIZE);
    let dy = point.y.rem_euclid(TILE_SIZE);
    let tx = point.x.div_euclid(TILE_SIZE);
    let ty = point.y.div_euclid(TILE_SIZE) + 1;

    debug_assert!(
        dx == 0 || dy == 0,
        "crossing {point:?} does not lie on a tile edge"
    );

    // dx and dy are within 0..256, so every local coordinate below fits in 0..=256
    let (dx, dy) = (dx as u16, dy as u16);
    let size = TILE_SIZE as u16;

    if dx == 0 {
        out.push(Crossing::new(0, size - dy, tx, ty));
        out.push(Crossing::new(size, size - dy, tx - 1, ty));
    }

    if dy == 0 {
        out.push(Crossing::new(dx, size, tx, ty));
        out.push(Crossing::new(dx, 0, tx, ty - 1));
    }

    out
}

/// Resolve the tile-attributed crossings between two points lying in different tiles
///
/// The result is ordered with all horizontal-line crossings first, then all vertical-line
/// crossings; every crossing appears once per tile it touches.
pub fn resolve_crossings(begin: &PixelPoint, end: &PixelPoint) -> Vec<Crossing> {
    #[cfg(feature = "profiling")]
    profiling::scope!("crossing::resolve_crossings");

    let (p1, p2) = unfold(begin, end);
    grid_crossings(p1, p2)
        .into_ordered()
        .into_iter()
        .flat_map(classify)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::TileCoord;

    fn pixel_point(x: u32, y: u32, px: u16, py: u16) -> PixelPoint {
        PixelPoint::new(TileCoord::new(10, x, y), LocalPixel::new(px, py))
    }

    /// Perpendicular distance of `p` from the infinite line through `a` and `b`
    fn distance_to_line(p: PlanePoint, a: PlanePoint, b: PlanePoint) -> f64 {
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        let (px, py) = (p.x as f64, p.y as f64);
        let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
        cross.abs() / ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
    }

    fn within(value: i64, a: i64, b: i64) -> bool {
        value >= a.min(b) && value <= a.max(b)
    }

    #[test]
    fn test_unfold() {
        let (p1, p2) = unfold(&pixel_point(5, 5, 10, 20), &pixel_point(6, 4, 30, 40));
        assert_eq!(p1, PlanePoint::new(10, -20));
        assert_eq!(p2, PlanePoint::new(256 + 30, -256 - 40));
    }

    #[test]
    fn test_horizontal_crossing() {
        let begin = pixel_point(0, 0, 255, 128);
        let end = pixel_point(1, 0, 0, 128);

        let grid = grid_crossings(unfold(&begin, &end).0, unfold(&begin, &end).1);
        assert!(grid.horizontal_lines.is_empty());
        assert_eq!(grid.vertical_lines, vec![PlanePoint::new(256, -128)]);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(
            crossings,
            vec![Crossing::new(0, 128, 1, 0), Crossing::new(256, 128, 0, 0)]
        );
    }

    #[test]
    fn test_vertical_crossing() {
        // Moving south from the bottom edge of the upper tile into the top of the lower one
        let begin = pixel_point(0, 1, 128, 255);
        let end = pixel_point(0, 0, 128, 0);

        let (p1, p2) = unfold(&begin, &end);
        assert_eq!(p2, PlanePoint::new(128, -256));
        let grid = grid_crossings(p1, p2);
        assert_eq!(grid.horizontal_lines, vec![PlanePoint::new(128, -256)]);
        assert!(grid.vertical_lines.is_empty());

        // ty = -256 div 256 + 1 = 0 is the origin row, the row below is one further south
        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(
            crossings,
            vec![Crossing::new(128, 256, 0, 0), Crossing::new(128, 0, 0, -1)]
        );
    }

    #[test]
    fn test_vertical_crossing_north() {
        let begin = pixel_point(3, 3, 40, 10);
        let end = pixel_point(3, 4, 40, 200);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(
            crossings,
            vec![Crossing::new(40, 256, 0, 1), Crossing::new(40, 0, 0, 0)]
        );
    }

    #[test]
    fn test_west_crossing_from_left_edge() {
        // A point on the west edge of its tile crosses that edge immediately
        let begin = pixel_point(2, 2, 0, 50);
        let end = pixel_point(1, 2, 200, 50);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(
            crossings,
            vec![Crossing::new(0, 50, 0, 0), Crossing::new(256, 50, -1, 0)]
        );
    }

    #[test]
    fn test_end_on_grid_line_is_crossed() {
        // The interpolated x of the crossing lands a hair short of the end point
        let begin = pixel_point(0, 1, 166, 235);
        let end = pixel_point(0, 0, 132, 0);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(
            crossings,
            vec![Crossing::new(132, 256, 0, 0), Crossing::new(132, 0, 0, -1)]
        );
    }

    #[test]
    fn test_diagonal_crossing_two_tiles() {
        // Crosses the east edge only
        let begin = pixel_point(0, 0, 200, 100);
        let end = pixel_point(1, 0, 50, 150);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(crossings.len(), 2);
        assert_eq!(crossings[0].dx, 1);
        assert_eq!(crossings[0].pixel.px, 0);
        assert_eq!(crossings[1].dx, 0);
        assert_eq!(crossings[1].pixel.px, 256);
        assert_eq!(crossings[0].pixel.py, crossings[1].pixel.py);
        // y = -100 - 50 * (56 / 106) rounded
        assert_eq!(crossings[0].pixel.py, 126);
    }

    #[test]
    fn test_diagonal_crossing_three_tiles() {
        // North-east travel that crosses the north edge first, then the east edge
        let begin = pixel_point(0, 0, 200, 20);
        let end = pixel_point(1, 1, 100, 100);

        let crossings = resolve_crossings(&begin, &end);
        let tiles: Vec<(i64, i64)> = crossings.iter().map(|c| (c.dx, c.dy)).collect();
        assert_eq!(tiles, vec![(0, 1), (0, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn test_crossings_come_in_shared_pairs() {
        let begin = pixel_point(10, 10, 17, 233);
        let end = pixel_point(13, 8, 201, 5);

        let crossings = resolve_crossings(&begin, &end);
        assert_eq!(crossings.len() % 2, 0);
        for pair in crossings.chunks(2) {
            assert_eq!(pair[0].to_plane(), pair[1].to_plane());
            assert_ne!((pair[0].dx, pair[0].dy), (pair[1].dx, pair[1].dy));
        }
    }

    #[test]
    fn test_crossings_lie_on_segment_in_travel_order() {
        let cases = [
            (pixel_point(10, 10, 17, 233), pixel_point(13, 8, 201, 5)),
            (pixel_point(10, 10, 250, 3), pixel_point(7, 12, 9, 180)),
            (pixel_point(4, 4, 128, 128), pixel_point(9, 5, 3, 250)),
            (pixel_point(4, 4, 1, 254), pixel_point(3, 1, 77, 11)),
        ];

        for (begin, end) in cases {
            let (p1, p2) = unfold(&begin, &end);
            let grid = grid_crossings(p1, p2);
            assert!(!grid.horizontal_lines.is_empty());
            assert!(!grid.vertical_lines.is_empty());

            for family in [&grid.horizontal_lines, &grid.vertical_lines] {
                for point in family {
                    assert!(distance_to_line(*point, p1, p2) <= 1.0, "{point:?} off the line");
                    assert!(within(point.x, p1.x, p2.x) || (point.x - p1.x).abs() <= 1);
                    assert!(within(point.y, p1.y, p2.y) || (point.y - p1.y).abs() <= 1);
                }
                // Distance from the start grows monotonically along each family
                let progress: Vec<i64> = family
                    .iter()
                    .map(|p| (p.x - p1.x).abs() + (p.y - p1.y).abs())
                    .collect();
                assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
            }

            for crossing in resolve_crossings(&begin, &end) {
                assert!(distance_to_line(crossing.to_plane(), p1, p2) <= 1.0);
            }
        }
    }

    #[test]
    fn test_crossing_count_matches_tiles_spanned() {
        let begin = pixel_point(10, 10, 17, 233);
        let end = pixel_point(13, 8, 201, 5);
        let grid = grid_crossings(unfold(&begin, &end).0, unfold(&begin, &end).1);
        assert_eq!(grid.vertical_lines.len(), 3);
        assert_eq!(grid.horizontal_lines.len(), 2);
    }

    #[test]
    fn test_classify_vertical_edge() {
        let crossings = classify(PlanePoint::new(512, -300));
        // -300 div 256 = -2, so the point is in row -1 at 300 - 256 = 44 below its top edge
        assert_eq!(
            crossings.as_slice(),
            &[Crossing::new(0, 44, 2, -1), Crossing::new(256, 44, 1, -1)]
        );
    }

    #[test]
    fn test_classify_horizontal_edge() {
        let crossings = classify(PlanePoint::new(-20, 256));
        assert_eq!(
            crossings.as_slice(),
            &[Crossing::new(236, 256, -1, 2), Crossing::new(236, 0, -1, 1)]
        );
    }

    #[test]
    fn test_classify_corner_fires_both_rules() {
        let crossings = classify(PlanePoint::new(256, 0));
        assert_eq!(crossings.len(), 4);
        assert!(crossings.iter().all(|c| c.to_plane() == PlanePoint::new(256, 0)));
    }
}
