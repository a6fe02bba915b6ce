/// Windowed front end for the orrery core: winit input, wgpu drawing
pub mod app;
pub mod config;
pub mod input;
pub mod renderer;
pub mod texture;

pub use app::run;
pub use config::Config;
pub use input::InputState;
pub use renderer::{GpuRenderer, RenderError};
