/// Orrery - textured bodies orbiting a central one
///
/// Controls:
///   - W/S: Move forward/back
///   - A/D: Strafe
///   - Space / Left Shift: Move up/down
///   - Arrow keys: Turn and look up/down
///   - Esc or closing the window: Quit
use clap::Parser;
use orrery_viewer::Config;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!("Orrery - loading {}", config.mesh.display());

    if let Err(e) = orrery_viewer::run(config) {
        log::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
