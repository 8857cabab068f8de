use crate::settings::Settings;
use std::path::PathBuf;
use track_tiles_lib::{Result, TilePyramid, Track, build_zoom, render};

/// What a conversion produced
#[derive(Debug, Default)]
pub struct Summary {
    /// Root of the tile tree, when tiles were written
    pub tiles_dir: Option<PathBuf>,
    pub tiles_written: usize,
    /// Rendered image, when requested
    pub image: Option<PathBuf>,
}

/// Convert one track as described by `settings`
pub fn run(settings: &Settings) -> Result<Summary> {
    #[cfg(feature = "profiling")]
    profiling::scope!("run");

    let track = Track::from_path(&settings.track)?;
    let name = settings.name.clone().unwrap_or_else(|| track.name().to_string());
    let bbox = track.bounding_box();
    tracing::info!(
        track = %settings.track.display(),
        points = track.total_points(),
        length_km = track.total_distance() / 1000.0,
        "Loaded track spanning lat {:.4}..{:.4}, lon {:.4}..{:.4}",
        bbox.min().y,
        bbox.max().y,
        bbox.min().x,
        bbox.max().x
    );

    let pyramid = TilePyramid::from_track(&track, settings.config())?;
    let mut summary = Summary::default();

    if !settings.no_tiles {
        let dir = settings.output.join(&name);
        summary.tiles_written = pyramid.write(&dir)?;
        summary.tiles_dir = Some(dir);
    }

    if let Some(options) = settings.render_options() {
        // The rendered level may lie outside the configured zoom range
        let standalone;
        let index = match pyramid.level(options.zoom) {
            Some(index) => index,
            None => {
                standalone = build_zoom(track.points(), options.zoom)?;
                &standalone
            }
        };

        let image = render::render_index(index, &options)?;
        std::fs::create_dir_all(&settings.output)?;
        let path = settings.output.join(format!("{name}.png"));
        render::save_png(&image, &path)?;
        tracing::info!(path = %path.display(), zoom = options.zoom, "Rendered image");
        summary.image = Some(path);
    }

    // Levels that did build are on disk by now
    pyramid.ensure_complete()?;
    Ok(summary)
}
