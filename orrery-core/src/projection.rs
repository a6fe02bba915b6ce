/// Free-fly camera and perspective projection
use crate::math::{Mat4, Vec3};

/// Pitch is kept strictly inside (-90, 90) so look-at never degenerates.
pub const PITCH_LIMIT: f32 = 89.0;
/// Camera translation speed, units per second.
pub const MOVE_SPEED: f32 = 7.0;
/// Camera yaw speed, degrees per second. Pitch turns at half this rate.
pub const TURN_SPEED: f32 = 50.0;

/// Camera placed by position plus yaw/pitch in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub forward: Vec3,
    pub right: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            world_up: Vec3::Y,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            forward: Vec3::ZERO,
            right: Vec3::ZERO,
        };
        camera.update_vectors();
        camera
    }

    /// Unit view direction for the current yaw and pitch.
    ///
    /// Yaw -90 with pitch 0 looks down -Z.
    pub fn front(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        Vec3::new(cy * cp, sp, sy * cp).normalize()
    }

    /// Recompute `forward` and `right` from yaw and pitch.
    pub fn update_vectors(&mut self) {
        self.forward = self.front();
        self.right = self.forward.cross(self.world_up).normalize();
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Turn by the given degrees, clamping pitch to +/-89.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.forward, self.world_up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 3.0, 12.0), -90.0, -15.0)
    }
}

/// Perspective parameters; the aspect ratio follows the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect: Self::aspect_for(width, height),
        }
    }

    /// `width / height`, or 1.0 for a zero-height viewport.
    pub fn aspect_for(width: u32, height: u32) -> f32 {
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = Self::aspect_for(width, height);
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov_y, self.aspect, self.near, self.far)
    }
}
