/// Vector and matrix algebra for transforms and camera math
///
/// `Mat4` wraps a nalgebra `Matrix4<f32>`, which stores its sixteen elements
/// column-major (`m[col * 4 + row]`), the layout shader uniforms expect, so a
/// matrix can be uploaded without transposition.
use nalgebra::{Matrix4, Point3, Vector3};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Lengths at or below this are treated as zero by [`Vec3::normalize`].
pub const NORMALIZE_EPSILON: f32 = 1e-6;

/// A 3-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// Degenerate vectors (length <= 1e-6) are returned unchanged so a bad
    /// direction never turns into NaNs downstream.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= NORMALIZE_EPSILON {
            return self;
        }
        self * (1.0 / len)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<Vec3> for Vector3<f32> {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

/// A 4x4 matrix in column-major order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    m: Matrix4<f32>,
}

impl Mat4 {
    pub fn identity() -> Self {
        Self {
            m: Matrix4::identity(),
        }
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            m: Matrix4::new_translation(&Vector3::new(x, y, z)),
        }
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Self {
            m: Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z)),
        }
    }

    /// Rotation about Y by `angle` radians, clockwise seen from +Y: local +X
    /// turns towards +Z.
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let m = Matrix4::new(
            c,   0.0, -s,  0.0,
            0.0, 1.0, 0.0, 0.0,
            s,   0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        Self { m }
    }

    /// Right-handed perspective projection with clip-space depth in [-1, 1].
    ///
    /// `aspect` must be finite and non-zero; callers map a zero-height
    /// viewport to 1.0 before getting here.
    pub fn perspective(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();
        let depth = z_far - z_near;
        #[rustfmt::skip]
        let m = Matrix4::new(
            f / aspect, 0.0, 0.0,                          0.0,
            0.0,        f,   0.0,                          0.0,
            0.0,        0.0, -(z_far + z_near) / depth,    -(2.0 * z_far * z_near) / depth,
            0.0,        0.0, -1.0,                         0.0,
        );
        Self { m }
    }

    /// View matrix looking from `eye` towards `target`.
    ///
    /// `target - eye` must not be parallel to `up`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            m: Matrix4::look_at_rh(
                &Point3::from(Vector3::from(eye)),
                &Point3::from(Vector3::from(target)),
                &Vector3::from(up),
            ),
        }
    }

    /// The sixteen elements, column-major.
    pub fn as_slice(&self) -> &[f32] {
        self.m.as_slice()
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.m.as_slice());
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Mat4 {
    type Output = Self;

    /// `(a * b) * v == a * (b * v)`: `b` is applied first.
    fn mul(self, b: Self) -> Self {
        Self { m: self.m * b.m }
    }
}
