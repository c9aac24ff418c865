//! Two-component vector

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::{MathError, MathResult, Matrix3};

/// 2D vector, mostly used for texture coordinates and screen sizes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl_approx_fields!(Vector2, x, y);

impl Vector2 {
    /// All components zero
    pub const ZERO: Self = Self::new(0.0, 0.0);
    /// All components one
    pub const ONE: Self = Self::new(1.0, 1.0);

    /// Create a vector from components
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Read component `index` (0 = x, 1 = y)
    pub fn get_component(&self, index: usize) -> MathResult<f64> {
        match index {
            0 => Ok(self.x),
            1 => Ok(self.y),
            _ => Err(MathError::IndexOutOfRange { index, len: 2 }),
        }
    }

    /// Write component `index` (0 = x, 1 = y)
    pub fn set_component(&mut self, index: usize, value: f64) -> MathResult<&mut Self> {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            _ => return Err(MathError::IndexOutOfRange { index, len: 2 }),
        }
        Ok(self)
    }

    /// Read two consecutive values starting at `offset`
    pub fn from_slice(slice: &[f64], offset: usize) -> MathResult<Self> {
        match slice.get(offset..offset + 2) {
            Some(s) => Ok(Self::new(s[0], s[1])),
            None => Err(MathError::IndexOutOfRange {
                index: offset + 1,
                len: slice.len(),
            }),
        }
    }

    /// Components as an array
    pub const fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared length
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

    /// Distance to another point
    pub fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    /// Linear interpolation towards `other`
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }

    /// Component-wise minimum
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Component-wise clamp
    #[must_use]
    pub fn clamp(&self, min: &Self, max: &Self) -> Self {
        self.max(min).min(max)
    }

    /// Transform as a 2D point by a 3x3 homogeneous matrix
    #[must_use]
    pub fn apply_matrix3(&self, m: &Matrix3) -> Self {
        let e = &m.elements;
        Self::new(
            e[0] * self.x + e[3] * self.y + e[6],
            e[1] * self.x + e[4] * self.y + e[7],
        )
    }

    /// Angle of the vector relative to the positive x axis, in `[0, 2π)`
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x).rem_euclid(std::f64::consts::TAU)
    }

    /// Rotate around `center` by `angle` radians
    #[must_use]
    pub fn rotate_around(&self, center: &Self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let x = self.x - center.x;
        let y = self.y - center.y;
        Self::new(x * c - y * s + center.x, x * s + y * c + center.y)
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<f64> for Vector2 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl Div<f64> for Vector2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotate_around() {
        let v = Vector2::new(1.0, 0.0).rotate_around(&Vector2::ZERO, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(v, Vector2::new(0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_index_errors() {
        let v = Vector2::new(1.0, 2.0);
        assert_eq!(v.get_component(1), Ok(2.0));
        assert!(v.get_component(2).is_err());
    }
}
