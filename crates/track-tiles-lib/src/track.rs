//! Track loading module
//!
//! This module provides the `Track` struct: the ordered, immutable list of points of a GPX file
//! together with a few precomputed statistics used for logging.

use crate::projection::GeoPoint;
use crate::{Result, TileError};
use geo::Rect;
use std::io::BufReader;
use std::path::Path;

/// Earth's mean radius in meters
const EARTH_RADIUS_M: f64 = 6371000.0;

/// An ordered list of track points with precomputed metadata
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    /// Name used for the output directory
    name: String,
    /// Points of every track segment, in document order
    points: Vec<GeoPoint>,
    /// Bounding box in degrees (x = longitude, y = latitude)
    bounding_box: Rect<f64>,
    /// Cached total distance in meters
    cached_total_distance: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Track {
    /// Create a track from points, rejecting tracks with fewer than two points
    pub fn new(name: impl Into<String>, points: Vec<GeoPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(TileError::TooFewPoints(points.len()));
        }

        let outside = points.iter().filter(|p| !p.is_projectable()).count();
        if outside > 0 {
            tracing::warn!(
                "{outside} points lie beyond the Web Mercator latitude limit \
                 and will land in meaningless tiles"
            );
        }

        let (bounding_box, total_distance) = Self::compute_metadata(&points);
        Ok(Self {
            name: name.into(),
            points,
            bounding_box,
            cached_total_distance: total_distance,
        })
    }

    /// Flatten every `trk/trkseg/trkpt` of parsed GPX data into one track
    pub fn from_gpx(name: impl Into<String>, gpx_data: gpx::Gpx) -> Result<Self> {
        let points: Vec<GeoPoint> = gpx_data
            .tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .map(GeoPoint::from)
            .collect();
        Self::new(name, points)
    }

    /// Load a GPX file, naming the track after the file stem
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("track::from_path");

        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("track")
            .to_string();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let gpx_data = gpx::read(reader)?;
        Self::from_gpx(name, gpx_data)
    }

    /// Compute the bounding box and the length in a single pass
    fn compute_metadata(points: &[GeoPoint]) -> (Rect<f64>, f64) {
        let mut min = geo::Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = geo::Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };
        for p in points {
            min.x = min.x.min(p.lon);
            min.y = min.y.min(p.lat);
            max.x = max.x.max(p.lon);
            max.y = max.y.max(p.lat);
        }

        let total_distance = points
            .windows(2)
            .map(|w| Self::haversine_distance(&w[0], &w[1]))
            .sum();

        (Rect::new(min, max), total_distance)
    }

    /// Track name (the input file stem when loaded from a file)
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Bounding box in degrees (x = longitude, y = latitude)
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    #[inline]
    pub fn total_points(&self) -> usize {
        self.points.len()
    }

    /// Total length in meters
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.cached_total_distance
    }

    /// Calculate the Haversine distance between two points in meters
    #[inline]
    fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
        let lat1 = p1.lat.to_radians();
        let lat2 = p2.lat.to_radians();
        let delta_lat = (p2.lat - p1.lat).to_radians();
        let delta_lon = (p2.lon - p1.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpx::{Gpx, Track as GpxTrack, TrackSegment, Waypoint};

    fn create_test_waypoint(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(geo::Point::new(lon, lat))
    }

    fn create_test_gpx() -> Gpx {
        let mut gpx = Gpx::default();
        let mut track = GpxTrack::default();

        // Two segments around London, flattened in order
        let mut first = TrackSegment::default();
        first.points.push(create_test_waypoint(51.5074, -0.1278));
        first.points.push(create_test_waypoint(51.5076, -0.1276));
        let mut second = TrackSegment::default();
        second.points.push(create_test_waypoint(51.5078, -0.1274));

        track.segments.push(first);
        track.segments.push(second);
        gpx.tracks.push(track);
        gpx
    }

    const GPX_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Lake loop</name>
    <trkseg>
      <trkpt lat="47.3769" lon="8.5417"></trkpt>
      <trkpt lat="47.3600" lon="8.5500"></trkpt>
      <trkpt lat="47.3400" lon="8.5700"></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_track_from_gpx() {
        let track = Track::from_gpx("london", create_test_gpx()).unwrap();

        assert_eq!(track.name(), "london");
        assert_eq!(track.total_points(), 3);
        assert_eq!(track.points()[0], GeoPoint::new(51.5074, -0.1278));
        assert_eq!(track.points()[2], GeoPoint::new(51.5078, -0.1274));
    }

    #[test]
    fn test_too_few_points_fails() {
        let result = Track::from_gpx("empty", Gpx::default());
        assert!(matches!(result, Err(TileError::TooFewPoints(0))));

        let result = Track::new("single", vec![GeoPoint::new(1.0, 2.0)]);
        assert!(matches!(result, Err(TileError::TooFewPoints(1))));
    }

    #[test]
    fn test_bounding_box() {
        let track = Track::from_gpx("london", create_test_gpx()).unwrap();

        let bbox = track.bounding_box();
        assert!((bbox.min().y - 51.5074).abs() < 1e-9);
        assert!((bbox.max().x - -0.1274).abs() < 1e-9);
        assert!(bbox.width() > 0.0);
        assert!(bbox.height() > 0.0);
    }

    #[test]
    fn test_total_distance() {
        let track = Track::from_gpx("london", create_test_gpx()).unwrap();

        // The test points are a few tens of meters apart
        let distance = track.total_distance();
        assert!(distance > 0.0);
        assert!(distance < 1000.0);
    }

    #[test]
    fn test_from_path_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lake-loop.gpx");
        std::fs::write(&path, GPX_DOCUMENT).unwrap();

        let track = Track::from_path(&path).unwrap();
        assert_eq!(track.name(), "lake-loop");
        assert_eq!(track.total_points(), 3);
        assert_eq!(track.points()[1], GeoPoint::new(47.36, 8.55));
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = Track::from_path("/nonexistent/track.gpx");
        assert!(matches!(result, Err(TileError::Io(_))));
    }

    #[test]
    fn test_invalid_gpx_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gpx");
        std::fs::write(&path, "<gpx><trk>").unwrap();
        assert!(matches!(Track::from_path(&path), Err(TileError::GpxParse(_))));
    }
}
