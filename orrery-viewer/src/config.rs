/// Command-line configuration
use clap::Parser;
use orrery_core::SceneConfig;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "orrery", version, about = "Textured bodies orbiting in a free-fly scene")]
pub struct Config {
    /// OBJ mesh instanced for every body
    #[arg(long, default_value = "model.obj")]
    pub mesh: PathBuf,

    /// Diffuse texture applied to the mesh
    #[arg(long, default_value = "model_diffuse.png")]
    pub texture: PathBuf,

    /// Number of bodies orbiting the central one
    #[arg(long, default_value_t = 100)]
    pub satellites: usize,

    /// Seed for scene generation; defaults to the current time
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    #[arg(long, default_value_t = 900)]
    pub height: u32,
}

impl Config {
    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            satellites: self.satellites,
            ..SceneConfig::default()
        }
    }

    /// The explicit seed, or seconds since the Unix epoch.
    pub fn seed_or_time(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        })
    }
}
