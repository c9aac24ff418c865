//! Four-component vector

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::{MathError, MathResult, Matrix4, Vector3};

/// 4D vector: homogeneous coordinates, viewports and packed uniforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector4 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// W component
    pub w: f64,
}

impl_approx_fields!(Vector4, x, y, z, w);

impl Default for Vector4 {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Vector4 {
    /// All components zero
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a vector from components
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Extend a 3D vector with `w`
    pub const fn from_vector3(v: Vector3, w: f64) -> Self {
        Self::new(v.x, v.y, v.z, w)
    }

    /// Drop the `w` component
    pub const fn xyz(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Read component `index`
    pub fn get_component(&self, index: usize) -> MathResult<f64> {
        match index {
            0 => Ok(self.x),
            1 => Ok(self.y),
            2 => Ok(self.z),
            3 => Ok(self.w),
            _ => Err(MathError::IndexOutOfRange { index, len: 4 }),
        }
    }

    /// Write component `index`
    pub fn set_component(&mut self, index: usize, value: f64) -> MathResult<&mut Self> {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            3 => self.w = value,
            _ => return Err(MathError::IndexOutOfRange { index, len: 4 }),
        }
        Ok(self)
    }

    /// Read four consecutive values starting at `offset`
    pub fn from_slice(slice: &[f64], offset: usize) -> MathResult<Self> {
        match slice.get(offset..offset + 4) {
            Some(s) => Ok(Self::new(s[0], s[1], s[2], s[3])),
            None => Err(MathError::IndexOutOfRange {
                index: offset + 3,
                len: slice.len(),
            }),
        }
    }

    /// Components as an array
    pub const fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; the zero vector stays zero
    #[must_use]
    pub fn normalize(&self) -> Self {
        let length = self.length();
        if length == 0.0 || !length.is_finite() {
            return Self::ZERO;
        }
        *self * (1.0 / length)
    }

    /// Linear interpolation towards `other`
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }

    /// Multiply by a 4x4 matrix without perspective divide
    #[must_use]
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        let e = &m.elements;
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        Self::new(
            e[0] * x + e[4] * y + e[8] * z + e[12] * w,
            e[1] * x + e[5] * y + e[9] * z + e[13] * w,
            e[2] * x + e[6] * y + e[10] * z + e[14] * w,
            e[3] * x + e[7] * y + e[11] * z + e[15] * w,
        )
    }
}

impl Add for Vector4 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w)
    }
}

impl Sub for Vector4 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.w - rhs.w)
    }
}

impl Mul<f64> for Vector4 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

impl Neg for Vector4 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_errors() {
        let mut v = Vector4::default();
        assert_eq!(v.get_component(3), Ok(1.0));
        assert_eq!(
            v.set_component(4, 0.0).err(),
            Some(MathError::IndexOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn test_apply_translation_keeps_directions() {
        let m = Matrix4::make_translation(1.0, 2.0, 3.0);
        let point = Vector4::new(0.0, 0.0, 0.0, 1.0).apply_matrix4(&m);
        let dir = Vector4::new(1.0, 0.0, 0.0, 0.0).apply_matrix4(&m);
        assert_eq!(point, Vector4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(dir, Vector4::new(1.0, 0.0, 0.0, 0.0));
    }
}
