//! Rotation quaternion

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use super::{Euler, EulerOrder, Matrix4, Vector3};

/// Quaternion `(x, y, z, w)` with `w` as the scalar part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// Scalar component
    pub w: f64,
}

impl_approx_fields!(Quaternion, x, y, z, w);

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    /// The identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create from raw components (not normalized)
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about a unit `axis`
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Rotation equivalent to Euler angles in their order
    pub fn from_euler(euler: &Euler) -> Self {
        let qx = Self::from_axis_angle(&Vector3::X, euler.x);
        let qy = Self::from_axis_angle(&Vector3::Y, euler.y);
        let qz = Self::from_axis_angle(&Vector3::Z, euler.z);
        match euler.order {
            EulerOrder::Xyz => qx * qy * qz,
            EulerOrder::Yxz => qy * qx * qz,
            EulerOrder::Zxy => qz * qx * qy,
            EulerOrder::Zyx => qz * qy * qx,
            EulerOrder::Yzx => qy * qz * qx,
            EulerOrder::Xzy => qx * qz * qy,
        }
    }

    /// Rotation part of a matrix whose upper 3x3 is a pure (unscaled) rotation
    pub fn from_rotation_matrix(m: &Matrix4) -> Self {
        let te = &m.elements;
        let (m11, m12, m13) = (te[0], te[4], te[8]);
        let (m21, m22, m23) = (te[1], te[5], te[9]);
        let (m31, m32, m33) = (te[2], te[6], te[10]);
        let trace = m11 + m22 + m33;

        if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self::new((m32 - m23) * s, (m13 - m31) * s, (m21 - m12) * s, 0.25 / s)
        } else if m11 > m22 && m11 > m33 {
            let s = 2.0 * (1.0 + m11 - m22 - m33).sqrt();
            Self::new(0.25 * s, (m12 + m21) / s, (m13 + m31) / s, (m32 - m23) / s)
        } else if m22 > m33 {
            let s = 2.0 * (1.0 + m22 - m11 - m33).sqrt();
            Self::new((m12 + m21) / s, 0.25 * s, (m23 + m32) / s, (m13 - m31) / s)
        } else {
            let s = 2.0 * (1.0 + m33 - m11 - m22).sqrt();
            Self::new((m13 + m31) / s, (m23 + m32) / s, 0.25 * s, (m21 - m12) / s)
        }
    }

    /// Shortest rotation taking unit vector `from` onto unit vector `to`
    pub fn from_unit_vectors(from: &Vector3, to: &Vector3) -> Self {
        let mut r = from.dot(to) + 1.0;
        let q = if r < f64::EPSILON {
            // opposite vectors: rotate 180 degrees about any perpendicular axis
            r = 0.0;
            if from.x.abs() > from.z.abs() {
                Self::new(-from.y, from.x, 0.0, r)
            } else {
                Self::new(0.0, -from.z, from.y, r)
            }
        } else {
            let c = from.cross(to);
            Self::new(c.x, c.y, c.z, r)
        };
        q.normalize()
    }

    /// Hamilton product `self * other`
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        let (bx, by, bz, bw) = (other.x, other.y, other.z, other.w);
        Self::new(
            ax * bw + aw * bx + ay * bz - az * by,
            ay * bw + aw * by + az * bx - ax * bz,
            az * bw + aw * bz + ax * by - ay * bx,
            aw * bw - ax * bx - ay * by - az * bz,
        )
    }

    /// Hamilton product `other * self`
    #[must_use]
    pub fn premultiply(&self, other: &Self) -> Self {
        other.multiply(self)
    }

    /// Conjugate
    #[must_use]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Inverse rotation (the conjugate, for unit quaternions)
    #[must_use]
    pub fn invert(&self) -> Self {
        self.conjugate()
    }

    /// Four-component dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Squared length
    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Length
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit-length copy; a zero quaternion becomes the identity
    #[must_use]
    pub fn normalize(&self) -> Self {
        let l = self.length();
        if l == 0.0 || !l.is_finite() {
            return Self::IDENTITY;
        }
        let inv = 1.0 / l;
        Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Angle in radians between two unit rotations
    pub fn angle_to(&self, other: &Self) -> f64 {
        2.0 * self.dot(other).clamp(-1.0, 1.0).abs().acos()
    }

    /// Rotate towards `target` by at most `step` radians
    #[must_use]
    pub fn rotate_towards(&self, target: &Self, step: f64) -> Self {
        let angle = self.angle_to(target);
        if angle == 0.0 {
            return *self;
        }
        let t = (step / angle).min(1.0);
        self.slerp(target, t)
    }

    /// Spherical linear interpolation towards `target`
    #[must_use]
    pub fn slerp(&self, target: &Self, t: f64) -> Self {
        if t == 0.0 {
            return *self;
        }
        if t == 1.0 {
            return *target;
        }

        let mut b = *target;
        let mut cos_half_theta = self.dot(&b);
        if cos_half_theta < 0.0 {
            b = Self::new(-b.x, -b.y, -b.z, -b.w);
            cos_half_theta = -cos_half_theta;
        }

        if cos_half_theta >= 1.0 {
            return *self;
        }

        let sqr_sin_half_theta = 1.0 - cos_half_theta * cos_half_theta;
        if sqr_sin_half_theta <= f64::EPSILON {
            let s = 1.0 - t;
            return Self::new(
                s * self.x + t * b.x,
                s * self.y + t * b.y,
                s * self.z + t * b.z,
                s * self.w + t * b.w,
            )
            .normalize();
        }

        let sin_half_theta = sqr_sin_half_theta.sqrt();
        let half_theta = sin_half_theta.atan2(cos_half_theta);
        let ratio_a = ((1.0 - t) * half_theta).sin() / sin_half_theta;
        let ratio_b = (t * half_theta).sin() / sin_half_theta;

        Self::new(
            self.x * ratio_a + b.x * ratio_b,
            self.y * ratio_a + b.y * ratio_b,
            self.z * ratio_a + b.z * ratio_b,
            self.w * ratio_a + b.w * ratio_b,
        )
    }

    /// Components as `[x, y, z, w]`
    pub const fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_zero_is_identity() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0).normalize();
        assert_eq!(q, Quaternion::IDENTITY);
        let q = Quaternion::new(1.0, 2.0, 3.0, 4.0).normalize();
        assert_relative_eq!(q.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(&Vector3::Z, FRAC_PI_2);
        assert_eq!(a.slerp(&b, 0.0), a);
        assert_eq!(a.slerp(&b, 1.0), b);
        let mid = a.slerp(&b, 0.5);
        assert_relative_eq!(mid, Quaternion::from_axis_angle(&Vector3::Z, PI / 4.0), epsilon = 1e-12);
    }

    #[test]
    fn test_slerp_takes_short_path() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(&Vector3::Y, 0.5);
        let negated = Quaternion::new(-b.x, -b.y, -b.z, -b.w);
        let direct = a.slerp(&b, 0.3);
        let flipped = a.slerp(&negated, 0.3);
        assert_relative_eq!(direct, flipped, epsilon = 1e-12);
    }

    #[test]
    fn test_slerp_near_identical_inputs() {
        let a = Quaternion::from_axis_angle(&Vector3::X, 1e-9);
        let b = Quaternion::from_axis_angle(&Vector3::X, 2e-9);
        let q = a.slerp(&b, 0.5);
        assert_relative_eq!(q.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_unit_vectors() {
        let q = Quaternion::from_unit_vectors(&Vector3::X, &Vector3::Y);
        assert_relative_eq!(Vector3::X.apply_quaternion(&q), Vector3::Y, epsilon = 1e-12);

        let opposite = Quaternion::from_unit_vectors(&Vector3::Z, &-Vector3::Z);
        assert_relative_eq!(Vector3::Z.apply_quaternion(&opposite), -Vector3::Z, epsilon = 1e-12);
    }

    #[test]
    fn test_from_rotation_matrix_matches_axis_angle() {
        for (axis, angle) in [(Vector3::X, 0.4), (Vector3::Y, 2.9), (Vector3::Z, -2.5)] {
            let q = Quaternion::from_axis_angle(&axis, angle);
            let m = Matrix4::make_rotation_axis(&axis, angle);
            let back = Quaternion::from_rotation_matrix(&m);
            assert_relative_eq!(back.dot(&q).abs(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_towards_limits_step() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(&Vector3::Y, 1.0);
        let q = a.rotate_towards(&b, 0.25);
        assert_relative_eq!(a.angle_to(&q), 0.25, epsilon = 1e-9);
        assert_relative_eq!(a.rotate_towards(&b, 5.0), b, epsilon = 1e-12);
    }
}
