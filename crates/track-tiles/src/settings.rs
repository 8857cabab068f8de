use clap::Parser;
use std::path::PathBuf;
use track_tiles_lib::projection::MAX_ZOOM;
use track_tiles_lib::{Config, RenderOptions};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Track Tiles - Convert a GPX track into per-tile polyline files for every zoom level
pub struct Settings {
    /// GPX file to convert
    #[clap(value_name = "TRACK")]
    pub track: PathBuf,

    /// Directory receiving the tile tree and the rendered image
    #[clap(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Name of the tile tree directory (defaults to the track file stem)
    #[clap(long)]
    pub name: Option<String>,

    /// Shallowest zoom level to build
    #[clap(
        long,
        default_value = "0",
        value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64)
    )]
    pub min_zoom: u8,

    /// Deepest zoom level to build
    #[clap(
        long,
        default_value = "16",
        value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64)
    )]
    pub max_zoom: u8,

    /// Also draw one zoom level to `<output>/<name>.png`
    #[clap(
        long,
        value_name = "ZOOM",
        num_args = 0..=1,
        default_missing_value = "16",
        value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64)
    )]
    pub render: Option<u8>,

    /// Canvas pixels per tile pixel in the rendered image
    #[clap(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=16))]
    pub scale: u32,

    /// Skip writing the tile files
    #[clap(long, default_value = "false")]
    pub no_tiles: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long, default_value = "false")]
    pub verbose: bool,
}

impl Settings {
    /// Zoom range of the pyramid
    pub fn config(&self) -> Config {
        Config {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        }
    }

    /// Render options, when an image was requested
    pub fn render_options(&self) -> Option<RenderOptions> {
        self.render.map(|zoom| RenderOptions {
            zoom,
            scale: self.scale,
            ..RenderOptions::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["track-tiles", "ride.gpx"]).unwrap();
        assert_eq!(settings.track, PathBuf::from("ride.gpx"));
        assert_eq!(settings.output, PathBuf::from("."));
        assert_eq!(settings.config(), Config::default());
        assert!(settings.render_options().is_none());
        assert!(!settings.no_tiles);
    }

    #[test]
    fn test_render_flag() {
        let settings = Settings::try_parse_from(["track-tiles", "ride.gpx", "--render"]).unwrap();
        assert_eq!(settings.render_options(), Some(RenderOptions::default()));

        let settings =
            Settings::try_parse_from(["track-tiles", "--render", "12", "--scale", "1", "ride.gpx"])
                .unwrap();
        let options = settings.render_options().unwrap();
        assert_eq!(options.zoom, 12);
        assert_eq!(options.scale, 1);
    }

    #[test]
    fn test_zoom_range() {
        let settings = Settings::try_parse_from([
            "track-tiles",
            "ride.gpx",
            "--min-zoom",
            "3",
            "--max-zoom",
            "9",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(
            settings.config(),
            Config {
                min_zoom: 3,
                max_zoom: 9
            }
        );
        assert_eq!(settings.output, PathBuf::from("out"));

        assert!(Settings::try_parse_from(["track-tiles", "ride.gpx", "--max-zoom", "17"]).is_err());
    }

    #[test]
    fn test_track_is_required() {
        assert!(Settings::try_parse_from(["track-tiles"]).is_err());
    }
}
