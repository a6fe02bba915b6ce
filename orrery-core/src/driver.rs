/// Per-frame sequencing of input, camera, simulation and drawing
///
/// The driver never talks to a window or GPU directly: the front end supplies
/// a [`Platform`] for events and held keys and a [`Renderer`] that turns
/// matrices into draw calls.
use crate::math::{Mat4, Vec3};
use crate::orbit::Scene;
use crate::projection::{Camera, Projection, MOVE_SPEED, TURN_SPEED};

/// Window events the driver reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    CloseRequested,
    Resized { width: u32, height: u32 },
}

/// Logical camera controls, bound to physical keys by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Up,
    Down,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
}

impl Key {
    pub const ALL: [Key; 10] = [
        Key::Forward,
        Key::Back,
        Key::StrafeLeft,
        Key::StrafeRight,
        Key::Up,
        Key::Down,
        Key::YawLeft,
        Key::YawRight,
        Key::PitchUp,
        Key::PitchDown,
    ];
}

/// Source of window events and keyboard state
pub trait Platform {
    /// Take every event queued since the last call.
    fn poll_events(&mut self) -> Vec<PlatformEvent>;

    fn is_key_held(&self, key: Key) -> bool;
}

/// Draws the shared mesh with a per-call model matrix.
///
/// A frame is `begin_frame`, any number of `draw`, then `present`.
pub trait Renderer {
    type Error: std::error::Error;

    fn resize(&mut self, width: u32, height: u32);

    /// Clear the targets and set the shared camera matrices.
    fn begin_frame(&mut self, view: &Mat4, projection: &Mat4);

    fn draw(&mut self, model: &Mat4);

    fn present(&mut self) -> Result<(), Self::Error>;

    /// Free GPU resources. Called once, after the last frame.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
}

/// Owns the camera, projection and scene, and runs one frame at a time.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    camera: Camera,
    projection: Projection,
    scene: Scene,
    state: LoopState,
    released: bool,
}

impl FrameDriver {
    pub fn new(scene: Scene, camera: Camera, projection: Projection) -> Self {
        Self {
            camera,
            projection,
            scene,
            state: LoopState::Running,
            released: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run one frame with `dt` seconds of elapsed time.
    ///
    /// The same `dt` drives camera movement and the simulation. Once a close
    /// request is seen the frame stops before drawing and every later call is
    /// a no-op returning [`LoopState::ShuttingDown`].
    pub fn frame<P, R>(
        &mut self,
        dt: f32,
        platform: &mut P,
        renderer: &mut R,
    ) -> Result<LoopState, R::Error>
    where
        P: Platform,
        R: Renderer,
    {
        if self.state == LoopState::ShuttingDown {
            return Ok(self.state);
        }

        for event in platform.poll_events() {
            match event {
                PlatformEvent::CloseRequested => {
                    log::info!("close requested");
                    self.state = LoopState::ShuttingDown;
                }
                PlatformEvent::Resized { width, height } => {
                    renderer.resize(width, height);
                    self.projection.resize(width, height);
                    log::debug!("viewport resized to {width}x{height}");
                }
            }
        }
        if self.state == LoopState::ShuttingDown {
            return Ok(self.state);
        }

        self.update_camera(dt, platform);
        self.scene.advance(dt);

        let view = self.camera.view_matrix();
        renderer.begin_frame(&view, &self.projection.matrix());
        for model in self.scene.world_transforms() {
            renderer.draw(&model);
        }
        renderer.present()?;

        Ok(self.state)
    }

    /// Enter the shutting-down state and release the renderer's resources.
    ///
    /// Safe to call more than once; the renderer is released only the first
    /// time.
    pub fn shutdown<R: Renderer>(&mut self, renderer: &mut R) {
        self.state = LoopState::ShuttingDown;
        if !self.released {
            renderer.release();
            self.released = true;
        }
    }

    fn update_camera<P: Platform>(&mut self, dt: f32, platform: &P) {
        self.camera.update_vectors();

        let step = MOVE_SPEED * dt;
        let turn = TURN_SPEED * dt;
        let forward = self.camera.forward;
        let right = self.camera.right;
        let up = self.camera.world_up;

        let mut offset = Vec3::ZERO;
        let mut yaw = 0.0;
        let mut pitch = 0.0;
        for key in Key::ALL {
            if !platform.is_key_held(key) {
                continue;
            }
            match key {
                Key::Forward => offset += forward * step,
                Key::Back => offset -= forward * step,
                Key::StrafeLeft => offset -= right * step,
                Key::StrafeRight => offset += right * step,
                Key::Up => offset += up * step,
                Key::Down => offset -= up * step,
                Key::YawLeft => yaw -= turn,
                Key::YawRight => yaw += turn,
                Key::PitchUp => pitch += turn * 0.5,
                Key::PitchDown => pitch -= turn * 0.5,
            }
        }

        self.camera.translate(offset);
        self.camera.rotate(yaw, pitch);
        self.camera.update_vectors();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::Body;
    use std::collections::HashSet;
    use std::convert::Infallible;

    #[derive(Default)]
    struct ScriptedPlatform {
        events: Vec<PlatformEvent>,
        held: HashSet<Key>,
    }

    impl Platform for ScriptedPlatform {
        fn poll_events(&mut self) -> Vec<PlatformEvent> {
            std::mem::take(&mut self.events)
        }

        fn is_key_held(&self, key: Key) -> bool {
            self.held.contains(&key)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(u32, u32),
        Begin(Mat4, Mat4),
        Draw(Mat4),
        Present,
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<Call>,
        released: usize,
    }

    impl Renderer for RecordingRenderer {
        type Error = Infallible;

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.push(Call::Resize(width, height));
        }

        fn begin_frame(&mut self, view: &Mat4, projection: &Mat4) {
            self.calls.push(Call::Begin(*view, *projection));
        }

        fn draw(&mut self, model: &Mat4) {
            self.calls.push(Call::Draw(*model));
        }

        fn present(&mut self) -> Result<(), Infallible> {
            self.calls.push(Call::Present);
            Ok(())
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn two_body_scene() -> Scene {
        let mut scene = Scene::new();
        scene.push(Body::new(0.0, 0.0, 0.2, 4.0));
        scene.push(Body::new(5.0, 0.5, 1.0, 1.0));
        scene
    }

    fn driver() -> FrameDriver {
        FrameDriver::new(two_body_scene(), Camera::default(), Projection::new(1200, 900))
    }

    #[test]
    fn test_one_draw_per_body_in_order() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform::default();
        let mut renderer = RecordingRenderer::default();

        let state = driver.frame(0.5, &mut platform, &mut renderer).unwrap();
        assert_eq!(state, LoopState::Running);

        let expected: Vec<Mat4> = driver.scene().world_transforms().collect();
        assert_eq!(renderer.calls.len(), 4);
        assert!(matches!(renderer.calls[0], Call::Begin(..)));
        assert_eq!(renderer.calls[1], Call::Draw(expected[0]));
        assert_eq!(renderer.calls[2], Call::Draw(expected[1]));
        assert_eq!(renderer.calls[3], Call::Present);
    }

    #[test]
    fn test_simulation_uses_frame_dt() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform::default();
        platform.held.insert(Key::Forward);
        let mut renderer = RecordingRenderer::default();
        let start = driver.camera().position;

        driver.frame(0.25, &mut platform, &mut renderer).unwrap();

        let body = driver.scene().bodies()[1];
        assert_eq!(body.orbit_angle, 0.5 * 0.25);
        assert_eq!(body.self_angle, 0.25);
        let moved = (driver.camera().position - start).length();
        assert!((moved - MOVE_SPEED * 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_resize_updates_projection() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform {
            events: vec![PlatformEvent::Resized {
                width: 800,
                height: 400,
            }],
            ..Default::default()
        };
        let mut renderer = RecordingRenderer::default();

        driver.frame(0.016, &mut platform, &mut renderer).unwrap();
        assert_eq!(renderer.calls[0], Call::Resize(800, 400));
        assert_eq!(driver.projection().aspect, 2.0);
        match &renderer.calls[1] {
            Call::Begin(_, projection) => assert_eq!(*projection, driver.projection().matrix()),
            other => panic!("unexpected call {other:?}"),
        }

        platform.events.push(PlatformEvent::Resized {
            width: 800,
            height: 0,
        });
        driver.frame(0.016, &mut platform, &mut renderer).unwrap();
        assert_eq!(driver.projection().aspect, 1.0);
    }

    #[test]
    fn test_close_stops_drawing() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform {
            events: vec![PlatformEvent::CloseRequested],
            ..Default::default()
        };
        let mut renderer = RecordingRenderer::default();

        let state = driver.frame(0.016, &mut platform, &mut renderer).unwrap();
        assert_eq!(state, LoopState::ShuttingDown);
        assert!(renderer.calls.is_empty());
        assert_eq!(driver.scene().bodies()[1].orbit_angle, 0.0);

        let state = driver.frame(0.016, &mut platform, &mut renderer).unwrap();
        assert_eq!(state, LoopState::ShuttingDown);
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn test_held_keys_turn_and_clamp() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform::default();
        platform.held.insert(Key::YawRight);
        platform.held.insert(Key::PitchUp);
        let mut renderer = RecordingRenderer::default();

        driver.frame(1.0, &mut platform, &mut renderer).unwrap();
        assert!((driver.camera().yaw - (-90.0 + TURN_SPEED)).abs() < 1e-4);
        assert!((driver.camera().pitch - (-15.0 + TURN_SPEED * 0.5)).abs() < 1e-4);

        for _ in 0..20 {
            driver.frame(1.0, &mut platform, &mut renderer).unwrap();
        }
        assert_eq!(driver.camera().pitch, 89.0);

        platform.held.clear();
        platform.held.insert(Key::PitchDown);
        for _ in 0..20 {
            driver.frame(1.0, &mut platform, &mut renderer).unwrap();
        }
        assert_eq!(driver.camera().pitch, -89.0);
    }

    #[test]
    fn test_view_follows_updated_camera() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform::default();
        platform.held.insert(Key::Up);
        let mut renderer = RecordingRenderer::default();

        driver.frame(0.5, &mut platform, &mut renderer).unwrap();
        let camera = driver.camera();
        assert!((camera.position.y - (3.0 + MOVE_SPEED * 0.5)).abs() < 1e-4);
        match &renderer.calls[0] {
            Call::Begin(view, _) => assert_eq!(*view, camera.view_matrix()),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut driver = driver();
        let mut platform = ScriptedPlatform::default();
        platform.held.extend([Key::StrafeLeft, Key::StrafeRight]);
        let mut renderer = RecordingRenderer::default();
        let start = driver.camera().position;

        driver.frame(0.3, &mut platform, &mut renderer).unwrap();
        assert!((driver.camera().position - start).length() < 1e-5);
    }

    #[test]
    fn test_shutdown_releases_once() {
        let mut driver = driver();
        let mut renderer = RecordingRenderer::default();

        driver.shutdown(&mut renderer);
        driver.shutdown(&mut renderer);
        assert_eq!(renderer.released, 1);
        assert_eq!(driver.state(), LoopState::ShuttingDown);

        let mut platform = ScriptedPlatform::default();
        driver.frame(0.1, &mut platform, &mut renderer).unwrap();
        assert!(renderer.calls.is_empty());
    }
}
