/// Orbiting bodies, time integration and world transforms
use rand::Rng;
use std::f32::consts::TAU;
use std::ops::Range;

use crate::math::{Mat4, Vec3};

/// One simulated body circling the origin in the XZ plane.
///
/// Angles are in radians and accumulate without wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Distance from the origin; 0 keeps the body fixed at the centre.
    pub orbit_radius: f32,
    /// Radians per second along the orbit.
    pub orbit_speed: f32,
    /// Radians per second about the body's own Y axis.
    pub self_speed: f32,
    pub scale: f32,
    pub orbit_angle: f32,
    pub self_angle: f32,
}

impl Body {
    pub fn new(orbit_radius: f32, orbit_speed: f32, self_speed: f32, scale: f32) -> Self {
        Self {
            orbit_radius,
            orbit_speed,
            self_speed,
            scale,
            orbit_angle: 0.0,
            self_angle: 0.0,
        }
    }

    pub fn with_angles(mut self, orbit_angle: f32, self_angle: f32) -> Self {
        self.orbit_angle = orbit_angle;
        self.self_angle = self_angle;
        self
    }

    /// Advance both angles by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.orbit_angle += self.orbit_speed * dt;
        self.self_angle += self.self_speed * dt;
    }

    pub fn position(&self) -> Vec3 {
        if self.orbit_radius > 0.0 {
            let (s, c) = self.orbit_angle.sin_cos();
            Vec3::new(c * self.orbit_radius, 0.0, s * self.orbit_radius)
        } else {
            Vec3::ZERO
        }
    }

    /// Scale, then spin about Y, then move onto the orbit.
    pub fn world_transform(&self) -> Mat4 {
        let p = self.position();
        Mat4::translation(p.x, p.y, p.z)
            * Mat4::rotation_y(self.self_angle)
            * Mat4::scale(self.scale, self.scale, self.scale)
    }
}

/// Parameters for [`Scene::generate`]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Bodies generated around the central one.
    pub satellites: usize,
    /// The body placed at the origin before any satellites.
    pub central: Body,
    /// Radius of the first ring; every two satellites move one unit out.
    pub base_radius: f32,
    /// Orbit speed is drawn from this range and divided by the radius.
    pub orbit_speed: Range<f32>,
    pub self_speed: Range<f32>,
    pub scale: Range<f32>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            satellites: 100,
            central: Body::new(0.0, 0.0, 0.2, 4.0),
            base_radius: 4.0,
            orbit_speed: 0.5..1.5,
            self_speed: 0.3..1.5,
            scale: 0.4..1.5,
        }
    }
}

/// Ordered collection of bodies; order is draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    bodies: Vec<Body>,
}

impl Scene {
    pub fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    /// Build a central body followed by `config.satellites` randomised ones.
    pub fn generate<R: Rng>(config: &SceneConfig, rng: &mut R) -> Self {
        let mut scene = Self::new();
        scene.push(config.central);

        for i in 0..config.satellites {
            let orbit_radius = (i / 2) as f32 + config.base_radius;
            let orbit_speed = rng.gen_range(config.orbit_speed.clone()) / orbit_radius;
            let self_speed = rng.gen_range(config.self_speed.clone());
            let scale = rng.gen_range(config.scale.clone());
            let orbit_angle = rng.gen_range(0.0..TAU);
            let self_angle = rng.gen_range(0.0..TAU);

            scene.push(
                Body::new(orbit_radius, orbit_speed, self_speed, scale)
                    .with_angles(orbit_angle, self_angle),
            );
        }

        log::debug!("generated scene with {} bodies", scene.len());
        scene
    }

    pub fn push(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn advance(&mut self, dt: f32) {
        for body in &mut self.bodies {
            body.advance(dt);
        }
    }

    pub fn world_transforms(&self) -> impl Iterator<Item = Mat4> + '_ {
        self.bodies.iter().map(Body::world_transform)
    }
}
