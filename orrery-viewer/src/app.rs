/// Startup sequence and the winit event loop
use anyhow::{Context, Result};
use orrery_core::{load_obj, Camera, FrameDriver, LoopState, Projection, Scene};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use crate::config::Config;
use crate::input::InputState;
use crate::renderer::{GpuRenderer, RenderError};
use crate::texture::load_texture;

/// Load assets, open the window and run until it is closed.
///
/// Any startup failure is returned before the first frame. A render error
/// during the loop ends it and is returned once the window has closed.
pub fn run(config: Config) -> Result<()> {
    let mesh = load_obj(&config.mesh)
        .with_context(|| format!("loading mesh {}", config.mesh.display()))?;
    let texture = load_texture(&config.texture)?;

    let seed = config.seed_or_time();
    log::info!("scene seed: {seed}");
    let scene = Scene::generate(&config.scene_config(), &mut ChaCha8Rng::seed_from_u64(seed));

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Orrery")
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );
    let size = window.inner_size();

    let mut renderer = pollster::block_on(GpuRenderer::new(
        window.clone(),
        &mesh,
        &texture,
        scene.len(),
    ))
    .context("initialising GPU")?;
    let mut driver = FrameDriver::new(
        scene,
        Camera::default(),
        Projection::new(size.width, size.height),
    );
    let mut input = InputState::new();

    log::info!("Controls: WASD move, Space/LShift up/down, arrows turn, Esc quit");

    let window_id = window.id();
    let mut failure: Option<RenderError> = None;
    let failed = &mut failure;
    let mut last_frame = Instant::now();
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(move |event, target| match event {
        Event::WindowEvent { event, window_id: id } if id == window_id => match event {
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - last_frame).as_secs_f32();
                last_frame = now;

                match driver.frame(dt, &mut input, &mut renderer) {
                    Ok(LoopState::Running) => {}
                    Ok(LoopState::ShuttingDown) => {
                        driver.shutdown(&mut renderer);
                        target.exit();
                    }
                    Err(e) => {
                        *failed = Some(e);
                        driver.shutdown(&mut renderer);
                        target.exit();
                    }
                }
            }
            other => input.handle_window_event(&other),
        },
        Event::AboutToWait => window.request_redraw(),
        Event::LoopExiting => driver.shutdown(&mut renderer),
        _ => {}
    })?;

    exit_status(failure)
}

/// The loop's result once it has stopped: an error seen mid-run fails it.
fn exit_status(failure: Option<RenderError>) -> Result<()> {
    match failure {
        Some(e) => Err(e).context("rendering frame"),
        None => Ok(()),
    }
}
