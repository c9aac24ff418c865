//! Three-component vector

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::{MathError, MathResult, Matrix3, Matrix4, Quaternion};

/// 3D vector used for positions, directions and scales
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl_approx_fields!(Vector3, x, y, z);

impl Vector3 {
    /// All components zero
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All components one
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// Unit X axis
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    /// Unit Y axis
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Unit Z axis
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a vector from components
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a vector with all components set to `value`
    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Read component `index` (0 = x, 1 = y, 2 = z)
    pub fn get_component(&self, index: usize) -> MathResult<f64> {
        match index {
            0 => Ok(self.x),
            1 => Ok(self.y),
            2 => Ok(self.z),
            _ => Err(MathError::IndexOutOfRange { index, len: 3 }),
        }
    }

    /// Write component `index` (0 = x, 1 = y, 2 = z)
    pub fn set_component(&mut self, index: usize, value: f64) -> MathResult<&mut Self> {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            _ => return Err(MathError::IndexOutOfRange { index, len: 3 }),
        }
        Ok(self)
    }

    /// Read three consecutive values starting at `offset`
    pub fn from_slice(slice: &[f64], offset: usize) -> MathResult<Self> {
        match slice.get(offset..offset + 3) {
            Some(s) => Ok(Self::new(s[0], s[1], s[2])),
            None => Err(MathError::IndexOutOfRange {
                index: offset + 2,
                len: slice.len(),
            }),
        }
    }

    /// Components as an array
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Components narrowed to `f32` for GPU upload
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared Euclidean length
    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit-length copy; the zero vector stays zero
    #[must_use]
    pub fn normalize(&self) -> Self {
        let length = self.length();
        if length == 0.0 || !length.is_finite() {
            return Self::ZERO;
        }
        *self / length
    }

    /// Copy rescaled to `length` (zero stays zero)
    #[must_use]
    pub fn with_length(&self, length: f64) -> Self {
        self.normalize() * length
    }

    /// Distance to another point
    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_to_squared(other).sqrt()
    }

    /// Squared distance to another point
    pub fn distance_to_squared(&self, other: &Self) -> f64 {
        (*self - *other).length_squared()
    }

    /// Linear interpolation towards `other`
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }

    /// Component-wise minimum
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Component-wise clamp between `min` and `max`
    #[must_use]
    pub fn clamp(&self, min: &Self, max: &Self) -> Self {
        self.max(min).min(max)
    }

    /// Component-wise product
    #[must_use]
    pub fn mul_components(&self, other: &Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Largest component
    pub fn max_component(&self) -> f64 {
        self.x.max(self.y).max(self.z)
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Multiply by a 3x3 matrix
    #[must_use]
    pub fn apply_matrix3(&self, m: &Matrix3) -> Self {
        let e = &m.elements;
        Self::new(
            e[0] * self.x + e[3] * self.y + e[6] * self.z,
            e[1] * self.x + e[4] * self.y + e[7] * self.z,
            e[2] * self.x + e[5] * self.y + e[8] * self.z,
        )
    }

    /// Multiply by a 3x3 normal matrix and renormalize
    #[must_use]
    pub fn apply_normal_matrix(&self, m: &Matrix3) -> Self {
        self.apply_matrix3(m).normalize()
    }

    /// Transform as a point (w = 1) including the perspective divide
    ///
    /// A zero homogeneous coordinate yields the zero vector.
    #[must_use]
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        let e = &m.elements;
        let w = e[3] * self.x + e[7] * self.y + e[11] * self.z + e[15];
        if w == 0.0 {
            return Self::ZERO;
        }
        let w = 1.0 / w;
        Self::new(
            (e[0] * self.x + e[4] * self.y + e[8] * self.z + e[12]) * w,
            (e[1] * self.x + e[5] * self.y + e[9] * self.z + e[13]) * w,
            (e[2] * self.x + e[6] * self.y + e[10] * self.z + e[14]) * w,
        )
    }

    /// Rotate by a quaternion
    #[must_use]
    pub fn apply_quaternion(&self, q: &Quaternion) -> Self {
        let tx = 2.0 * (q.y * self.z - q.z * self.y);
        let ty = 2.0 * (q.z * self.x - q.x * self.z);
        let tz = 2.0 * (q.x * self.y - q.y * self.x);

        Self::new(
            self.x + q.w * tx + q.y * tz - q.z * ty,
            self.y + q.w * ty + q.z * tx - q.x * tz,
            self.z + q.w * tz + q.x * ty - q.y * tx,
        )
    }

    /// Transform as a direction (upper 3x3 only) and normalize
    #[must_use]
    pub fn transform_direction(&self, m: &Matrix4) -> Self {
        let e = &m.elements;
        Self::new(
            e[0] * self.x + e[4] * self.y + e[8] * self.z,
            e[1] * self.x + e[5] * self.y + e[9] * self.z,
            e[2] * self.x + e[6] * self.y + e[10] * self.z,
        )
        .normalize()
    }

    /// Project a world-space point into normalized device coordinates
    #[must_use]
    pub fn project(&self, view: &Matrix4, projection: &Matrix4) -> Self {
        self.apply_matrix4(view).apply_matrix4(projection)
    }

    /// Unproject normalized device coordinates back to world space
    #[must_use]
    pub fn unproject(&self, projection_inverse: &Matrix4, camera_world: &Matrix4) -> Self {
        self.apply_matrix4(projection_inverse).apply_matrix4(camera_world)
    }

    /// Translation part of a transform matrix
    pub fn from_matrix_position(m: &Matrix4) -> Self {
        Self::new(m.elements[12], m.elements[13], m.elements[14])
    }

    /// Per-axis scale of a transform matrix (column lengths)
    pub fn from_matrix_scale(m: &Matrix4) -> Self {
        let e = &m.elements;
        Self::new(
            Self::new(e[0], e[1], e[2]).length(),
            Self::new(e[4], e[5], e[6]).length(),
            Self::new(e[8], e[9], e[10]).length(),
        )
    }

    /// Column `index` of a 4x4 matrix (first three rows)
    pub fn from_matrix_column(m: &Matrix4, index: usize) -> MathResult<Self> {
        if index > 3 {
            return Err(MathError::IndexOutOfRange { index, len: 4 });
        }
        let base = index * 4;
        Ok(Self::new(m.elements[base], m.elements[base + 1], m.elements[base + 2]))
    }

    /// Angle in radians between two vectors; right angle when either is zero
    pub fn angle_to(&self, other: &Self) -> f64 {
        let denominator = (self.length_squared() * other.length_squared()).sqrt();
        if denominator == 0.0 {
            return std::f64::consts::FRAC_PI_2;
        }
        (self.dot(other) / denominator).clamp(-1.0, 1.0).acos()
    }

    /// Reflect off a plane with unit `normal`
    #[must_use]
    pub fn reflect(&self, normal: &Self) -> Self {
        *self - *normal * (2.0 * self.dot(normal))
    }

    /// Project onto another vector
    #[must_use]
    pub fn project_on_vector(&self, other: &Self) -> Self {
        let denominator = other.length_squared();
        if denominator == 0.0 {
            return Self::ZERO;
        }
        *other * (self.dot(other) / denominator)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl MulAssign<f64> for Vector3 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl Div<f64> for Vector3 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);
        let n = Vector3::new(3.0, 0.0, 4.0).normalize();
        assert_relative_eq!(n.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_component_access_out_of_range() {
        let mut v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(v.get_component(2), Ok(3.0));
        assert_eq!(
            v.get_component(3),
            Err(MathError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(v.set_component(5, 1.0).is_err());
        assert!(Vector3::from_slice(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_cross_right_handed() {
        assert_relative_eq!(Vector3::X.cross(&Vector3::Y), Vector3::Z);
        assert_relative_eq!(Vector3::Y.cross(&Vector3::Z), Vector3::X);
        assert_relative_eq!(Vector3::Z.cross(&Vector3::X), Vector3::Y);
    }

    #[test]
    fn test_apply_quaternion_quarter_turn() {
        let q = Quaternion::from_axis_angle(&Vector3::Y, std::f64::consts::FRAC_PI_2);
        let rotated = Vector3::X.apply_quaternion(&q);
        assert_relative_eq!(rotated, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_angle_to_degenerate() {
        assert_relative_eq!(Vector3::ZERO.angle_to(&Vector3::X), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(Vector3::X.angle_to(&Vector3::Y), std::f64::consts::FRAC_PI_2);
    }
}
