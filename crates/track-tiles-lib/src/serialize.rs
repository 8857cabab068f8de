//! Binary tile files
//!
//! Every tile of a [`PathIndex`] is written to `<root>/<zoom>/<x>/<y>.bin`. The file carries no
//! header; the tile identity lives in the path. All integers are little-endian `u16`:
//!
//! ```text
//! polyline_count
//! repeat polyline_count times:
//!     point_count
//!     repeat point_count times:
//!         px
//!         py
//! ```

use crate::path::{PathIndex, Polyline, TilePaths};
use crate::projection::{LocalPixel, TileCoord};
use crate::{Result, TileError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Extension of tile files
pub const TILE_EXTENSION: &str = "bin";

/// Location of a tile file below `root`
pub fn tile_path(root: &Path, coord: &TileCoord) -> PathBuf {
    root.join(coord.zoom.to_string())
        .join(coord.x.to_string())
        .join(format!("{}.{TILE_EXTENSION}", coord.y))
}

fn count_u16(coord: &TileCoord, what: &'static str, count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| TileError::CountOverflow {
        coord: *coord,
        what,
        count,
    })
}

/// Check that every count of a tile fits the format
fn check_counts(tile: &TilePaths) -> Result<()> {
    count_u16(&tile.coord, "polylines", tile.polylines.len())?;
    for polyline in &tile.polylines {
        count_u16(&tile.coord, "points in one polyline", polyline.len())?;
    }
    Ok(())
}

/// Encode the polylines of one tile into `writer`
pub fn write_tile<W: Write>(writer: &mut W, tile: &TilePaths) -> Result<()> {
    check_counts(tile)?;
    encode(writer, &tile.polylines).map_err(|source| TileError::TileWrite {
        coord: tile.coord,
        source,
    })
}

fn encode<W: Write>(writer: &mut W, polylines: &[Polyline]) -> io::Result<()> {
    // Counts were checked by the caller
    writer.write_u16::<LittleEndian>(polylines.len() as u16)?;
    for polyline in polylines {
        writer.write_u16::<LittleEndian>(polyline.len() as u16)?;
        for point in polyline.points() {
            writer.write_u16::<LittleEndian>(point.px)?;
            writer.write_u16::<LittleEndian>(point.py)?;
        }
    }
    Ok(())
}

/// Decode the polylines of one tile from `reader`
///
/// Truncated input is rejected; trailing bytes are ignored.
pub fn read_tile<R: Read>(reader: &mut R) -> Result<Vec<Polyline>> {
    let truncated = |e: io::Error| match e.kind() {
        io::ErrorKind::UnexpectedEof => TileError::MalformedTile("unexpected end of data".into()),
        _ => TileError::Io(e),
    };

    let polyline_count = reader.read_u16::<LittleEndian>().map_err(truncated)?;
    let mut polylines = Vec::with_capacity(usize::from(polyline_count));
    for _ in 0..polyline_count {
        let point_count = reader.read_u16::<LittleEndian>().map_err(truncated)?;
        let mut points = Vec::with_capacity(usize::from(point_count));
        for _ in 0..point_count {
            let px = reader.read_u16::<LittleEndian>().map_err(truncated)?;
            let py = reader.read_u16::<LittleEndian>().map_err(truncated)?;
            points.push(LocalPixel::new(px, py));
        }
        polylines.push(Polyline::new(points));
    }
    Ok(polylines)
}

/// Read the tile file of `coord` below `root`
pub fn read_tile_file(root: &Path, coord: &TileCoord) -> Result<Vec<Polyline>> {
    let mut file = io::BufReader::new(File::open(tile_path(root, coord))?);
    read_tile(&mut file)
}

/// Write one tile file below `root`, creating its directories
pub fn write_tile_file(root: &Path, tile: &TilePaths) -> Result<PathBuf> {
    check_counts(tile)?;
    let path = tile_path(root, &tile.coord);
    create_and_encode(&path, &tile.polylines).map_err(|source| TileError::TileWrite {
        coord: tile.coord,
        source,
    })?;
    Ok(path)
}

fn create_and_encode(path: &Path, polylines: &[Polyline]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        // Tolerates directories created concurrently by another zoom level
        fs::create_dir_all(dir)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    encode(&mut writer, polylines)?;
    writer.flush()
}

/// Write every tile of `index` below `root`
///
/// Tiles are independent: a failure leaves the tiles already written in place.
pub fn write_index(root: &Path, index: &PathIndex) -> Result<usize> {
    #[cfg(feature = "profiling")]
    profiling::scope!("serialize::write_index");

    let mut written = 0;
    for tile in index {
        write_tile_file(root, tile)?;
        written += 1;
    }
    tracing::debug!(tiles = written, root = %root.display(), "Wrote tile files");
    Ok(written)
}
