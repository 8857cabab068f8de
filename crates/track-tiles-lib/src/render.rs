//! Diagnostic rendering of one zoom level
//!
//! Draws every polyline of a [`PathIndex`] on a canvas covering the touched tiles, with the tile
//! grid in grey. Markers distinguish a polyline's first point (green), last point (blue) and
//! interior points (red), which makes misplaced crossing points easy to spot.

use crate::path::PathIndex;
use crate::projection::{LocalPixel, MAX_ZOOM, TILE_SIZE, TileCoord};
use crate::{Result, TileError};
use image::{Rgb, RgbImage};
use std::path::Path;

/// Largest canvas, in pixels, the renderer agrees to allocate
const MAX_CANVAS_PIXELS: u64 = 1 << 26;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([128, 128, 128]);
const LINE: Rgb<u8> = Rgb([0, 0, 0]);
const FIRST_POINT: Rgb<u8> = Rgb([0, 128, 0]);
const LAST_POINT: Rgb<u8> = Rgb([0, 0, 255]);
const INTERIOR_POINT: Rgb<u8> = Rgb([255, 0, 0]);

/// Options for the diagnostic image
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Zoom level to draw
    pub zoom: u8,
    /// Canvas pixels per tile pixel
    pub scale: u32,
    /// Radius of the point markers in canvas pixels
    pub marker_radius: u32,
    /// Width of the polyline strokes in canvas pixels
    pub line_width: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            zoom: MAX_ZOOM,
            scale: 2,
            marker_radius: 5,
            line_width: 2,
        }
    }
}

/// Tile extent of a level, rows flipped so the northernmost row is drawn on top
struct Extent {
    min_x: u32,
    max_y: u32,
    columns: u32,
    rows: u32,
}

impl Extent {
    fn of(index: &PathIndex) -> Option<Self> {
        let mut tiles = index.iter().map(|t| t.coord);
        let first = tiles.next()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for TileCoord { x, y, .. } in tiles {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        Some(Self {
            min_x,
            max_y,
            columns: max_x - min_x + 1,
            rows: max_y - min_y + 1,
        })
    }

    /// Canvas position of a local pixel of `tile`
    fn place(&self, tile: &TileCoord, point: &LocalPixel, scale: u32) -> (i64, i64) {
        let (scale, size) = (i64::from(scale), TILE_SIZE);
        let column = i64::from(tile.x - self.min_x);
        let row = i64::from(self.max_y - tile.y);
        (
            scale * i64::from(point.px) + scale * size * column,
            scale * i64::from(point.py) + scale * size * row,
        )
    }
}

/// Draw the polylines of one zoom level
pub fn render_index(index: &PathIndex, options: &RenderOptions) -> Result<RgbImage> {
    #[cfg(feature = "profiling")]
    profiling::scope!("render::render_index");

    if options.scale == 0 {
        return Err(TileError::InvalidConfig("render scale must be at least 1".into()));
    }
    let extent = Extent::of(index)
        .ok_or_else(|| TileError::InvalidConfig(format!("zoom {} has no tiles", options.zoom)))?;

    let tile_side = u64::from(options.scale) * TILE_SIZE as u64;
    let width = tile_side * u64::from(extent.columns);
    let height = tile_side * u64::from(extent.rows);
    let max_side = u64::from(u32::MAX);
    if width * height > MAX_CANVAS_PIXELS || width > max_side || height > max_side {
        return Err(TileError::InvalidConfig(format!(
            "a {width}x{height} canvas is too large, render a shallower zoom or a smaller scale"
        )));
    }

    let mut img = RgbImage::from_pixel(width as u32, height as u32, BACKGROUND);
    draw_grid(&mut img, tile_side as u32);

    for tile in index {
        for polyline in &tile.polylines {
            let points: Vec<(i64, i64)> = polyline
                .points()
                .iter()
                .map(|p| extent.place(&tile.coord, p, options.scale))
                .collect();

            for segment in points.windows(2) {
                draw_line(&mut img, segment[0], segment[1], options.line_width, LINE);
            }
            draw_markers(&mut img, &points, options.marker_radius);
        }
    }

    tracing::debug!(width, height, zoom = options.zoom, "Rendered zoom level");
    Ok(img)
}

/// Save an image as PNG
pub fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

fn draw_grid(img: &mut RgbImage, tile_side: u32) {
    let (width, height) = img.dimensions();
    for x in (0..width).step_by(tile_side as usize) {
        for y in 0..height {
            img.put_pixel(x, y, GRID);
        }
    }
    for y in (0..height).step_by(tile_side as usize) {
        for x in 0..width {
            img.put_pixel(x, y, GRID);
        }
    }
}

fn draw_markers(img: &mut RgbImage, points: &[(i64, i64)], radius: u32) {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return;
    };
    draw_disc(img, *first, radius, FIRST_POINT);
    draw_disc(img, *last, radius, LAST_POINT);
    if points.len() > 2 {
        for point in &points[1..points.len() - 1] {
            draw_disc(img, *point, radius, INTERIOR_POINT);
        }
    }
}

/// Set a pixel, ignoring positions outside the canvas
#[inline]
fn plot(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_disc(img: &mut RgbImage, (cx, cy): (i64, i64), radius: u32, color: Rgb<u8>) {
    let r = i64::from(radius);
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                plot(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham's line, widened by stamping a square brush
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), width: u32, color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
    let (sx, sy) = (if x < to.0 { 1 } else { -1 }, if y < to.1 { 1 } else { -1 });
    let (lo, hi) = (-(i64::from(width) / 2), (i64::from(width) - 1) / 2);
    let mut err = dx + dy;

    loop {
        for oy in lo..=hi.max(lo) {
            for ox in lo..=hi.max(lo) {
                plot(img, x + ox, y + oy, color);
            }
        }
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
