//! TilePyramid - Top-level driver building every zoom level of a track
//!
//! This module provides the high-level API: validate a [`Config`], build one [`PathIndex`] per
//! zoom level in parallel, and write the resulting tile files.

use crate::path::{PathIndex, build_zoom};
use crate::projection::MAX_ZOOM;
use crate::{Result, TileError, Track, serialize};

use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the tile pyramid
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Shallowest zoom level to build (default 0)
    pub min_zoom: u8,
    /// Deepest zoom level to build (default and maximum 16)
    pub max_zoom: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Config {
    /// Check the zoom range
    pub fn validate(&self) -> Result<()> {
        if self.max_zoom > MAX_ZOOM {
            return Err(TileError::InvalidConfig(format!(
                "max zoom {} is deeper than {MAX_ZOOM}",
                self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(TileError::InvalidConfig(format!(
                "min zoom {} is deeper than max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }

    /// Zoom levels covered by this configuration
    pub fn zooms(&self) -> std::ops::RangeInclusive<u8> {
        self.min_zoom..=self.max_zoom
    }
}

/// Summary of a built pyramid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PyramidInfo {
    /// Number of zoom levels built
    pub zoom_levels: usize,
    /// Number of zoom levels that failed to build
    pub failed_levels: usize,
    /// Tiles touched, summed over all levels
    pub tile_count: usize,
    /// Polylines, summed over all levels
    pub polyline_count: usize,
    /// Points after normalization, summed over all levels
    pub point_count: usize,
}

/// Per-zoom path indices of one track
///
/// Levels are independent: a level that fails to build is left out and remembered in
/// [`TilePyramid::failed_zooms`], the others are kept.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilePyramid {
    /// Configuration the levels were built with
    config: Config,
    /// Successfully built levels, by ascending zoom
    levels: Vec<(u8, PathIndex)>,
    /// Zoom levels whose build failed, ascending
    failed: Vec<u8>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TilePyramid {
    /// Create an empty pyramid for the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            levels: Vec::new(),
            failed: Vec::new(),
        })
    }

    /// Build every zoom level of `track`, replacing any previous levels
    ///
    /// Zoom levels share nothing and are built in parallel. A level that fails (typically with a
    /// consistency violation) is logged and skipped; see [`TilePyramid::ensure_complete`].
    pub fn build(&mut self, track: &Track) {
        #[cfg(feature = "profiling")]
        profiling::scope!("pyramid::build");

        let results: Vec<(u8, Result<PathIndex>)> = self
            .config
            .zooms()
            .into_par_iter()
            .map(|zoom| (zoom, build_zoom(track.points(), zoom)))
            .collect();

        self.levels.clear();
        self.failed.clear();
        for (zoom, result) in results {
            match result {
                Ok(index) => self.levels.push((zoom, index)),
                Err(e) => {
                    tracing::error!(track = track.name(), zoom, "Skipping zoom level: {e}");
                    self.failed.push(zoom);
                }
            }
        }

        let info = self.info();
        tracing::info!(
            track = track.name(),
            zoom_levels = info.zoom_levels,
            failed_levels = info.failed_levels,
            tiles = info.tile_count,
            polylines = info.polyline_count,
            points = info.point_count,
            "Built tile pyramid"
        );
    }

    /// Convenience constructor: validate, then build
    pub fn from_track(track: &Track, config: Config) -> Result<Self> {
        let mut pyramid = Self::new(config)?;
        pyramid.build(track);
        Ok(pyramid)
    }

    /// Index of a zoom level, if it was built
    pub fn level(&self, zoom: u8) -> Option<&PathIndex> {
        self.levels
            .iter()
            .find(|(z, _)| *z == zoom)
            .map(|(_, index)| index)
    }

    /// Built levels with their zoom
    pub fn levels(&self) -> impl Iterator<Item = (u8, &PathIndex)> {
        self.levels.iter().map(|(zoom, index)| (*zoom, index))
    }

    /// Zoom levels that failed to build
    #[inline]
    pub fn failed_zooms(&self) -> &[u8] {
        &self.failed
    }

    /// Fail if any zoom level could not be built
    pub fn ensure_complete(&self) -> Result<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(TileError::IncompleteLevels(self.failed.clone()))
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Totals over all built levels
    pub fn info(&self) -> PyramidInfo {
        let indices = || self.levels.iter().map(|(_, index)| index);
        PyramidInfo {
            zoom_levels: self.levels.len(),
            failed_levels: self.failed.len(),
            tile_count: indices().map(PathIndex::len).sum(),
            polyline_count: indices().map(PathIndex::polyline_count).sum(),
            point_count: indices().map(PathIndex::point_count).sum(),
        }
    }

    /// Write the tile files of every built level below `root`, one level per task
    ///
    /// Returns the number of files written. Failed levels have no files.
    pub fn write(&self, root: &Path) -> Result<usize> {
        #[cfg(feature = "profiling")]
        profiling::scope!("pyramid::write");

        let written: Result<Vec<usize>> = self
            .levels
            .par_iter()
            .map(|(_, index)| serialize::write_index(root, index))
            .collect();
        let written: usize = written?.into_iter().sum();

        tracing::info!(files = written, root = %root.display(), "Wrote tile files");
        Ok(written)
    }
}
