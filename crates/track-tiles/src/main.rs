mod logging;
mod run;
mod settings;

use clap::Parser;
use settings::Settings;
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = Settings::parse();
    let _guard = logging::setup_logging(settings.verbose);

    match run::run(&settings) {
        Ok(summary) => {
            if let Some(dir) = &summary.tiles_dir {
                tracing::info!("✓ Wrote {} tiles to {}", summary.tiles_written, dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Conversion of {} failed: {e}", settings.track.display());
            ExitCode::FAILURE
        }
    }
}
