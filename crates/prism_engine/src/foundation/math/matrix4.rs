//! 4x4 matrix
//!
//! Column-major homogeneous transform. Element `(row, col)` lives at
//! `elements[col * 4 + row]`, which is also the layout uploaded to shaders.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use super::{CoordinateSystem, Euler, EulerOrder, MathError, MathResult, Quaternion, Vector3};

/// Column-major 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4 {
    /// Elements in column-major order
    pub elements: [f64; 16],
}

impl_approx_elements!(Matrix4);

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// All-zero matrix, also the result of inverting a singular matrix
    pub const ZERO: Self = Self { elements: [0.0; 16] };

    /// Build from row-major arguments
    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub const fn new(
        n11: f64, n12: f64, n13: f64, n14: f64,
        n21: f64, n22: f64, n23: f64, n24: f64,
        n31: f64, n32: f64, n33: f64, n34: f64,
        n41: f64, n42: f64, n43: f64, n44: f64,
    ) -> Self {
        Self {
            elements: [
                n11, n21, n31, n41,
                n12, n22, n32, n42,
                n13, n23, n33, n43,
                n14, n24, n34, n44,
            ],
        }
    }

    /// Overwrite all elements from row-major arguments
    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub fn set(
        &mut self,
        n11: f64, n12: f64, n13: f64, n14: f64,
        n21: f64, n22: f64, n23: f64, n24: f64,
        n31: f64, n32: f64, n33: f64, n34: f64,
        n41: f64, n42: f64, n43: f64, n44: f64,
    ) -> &mut Self {
        *self = Self::new(
            n11, n12, n13, n14,
            n21, n22, n23, n24,
            n31, n32, n33, n34,
            n41, n42, n43, n44,
        );
        self
    }

    /// Read element `index` in column-major order
    pub fn get(&self, index: usize) -> MathResult<f64> {
        self.elements
            .get(index)
            .copied()
            .ok_or(MathError::IndexOutOfRange { index, len: 16 })
    }

    /// Read sixteen values starting at `offset` (column-major)
    pub fn from_slice(slice: &[f64], offset: usize) -> MathResult<Self> {
        let s = slice.get(offset..offset + 16).ok_or(MathError::IndexOutOfRange {
            index: offset + 15,
            len: slice.len(),
        })?;
        let mut elements = [0.0; 16];
        elements.copy_from_slice(s);
        Ok(Self { elements })
    }

    /// Elements narrowed to `f32`, column-major
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(&self) -> [f32; 16] {
        self.elements.map(|e| e as f32)
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> f64 {
        self.elements[col * 4 + row]
    }

    /// Matrix product `self * other`
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| self.at(row, k) * other.at(k, col)).sum();
            }
        }
        Self { elements: out }
    }

    /// Matrix product `other * self`
    #[must_use]
    pub fn premultiply(&self, other: &Self) -> Self {
        other.multiply(self)
    }

    /// Multiply every element by `s`
    #[must_use]
    pub fn multiply_scalar(&self, s: f64) -> Self {
        Self {
            elements: self.elements.map(|e| e * s),
        }
    }

    /// Determinant of the 3x3 minor obtained by dropping `skip_row` and `skip_col`
    fn minor(&self, skip_row: usize, skip_col: usize) -> f64 {
        let mut m = [[0.0; 3]; 3];
        let rows = (0..4).filter(|r| *r != skip_row);
        for (i, row) in rows.enumerate() {
            let cols = (0..4).filter(|c| *c != skip_col);
            for (j, col) in cols.enumerate() {
                m[i][j] = self.at(row, col);
            }
        }
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    fn cofactor(&self, row: usize, col: usize) -> f64 {
        let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.minor(row, col)
    }

    /// Determinant (expansion along the first row)
    pub fn determinant(&self) -> f64 {
        (0..4).map(|col| self.at(0, col) * self.cofactor(0, col)).sum()
    }

    /// Inverse; a singular (or non-finite) matrix yields the zero matrix
    #[must_use]
    pub fn invert(&self) -> Self {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Self::ZERO;
        }
        let inv_det = 1.0 / det;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                // adjugate is the transposed cofactor matrix
                out[col * 4 + row] = self.cofactor(col, row) * inv_det;
            }
        }
        Self { elements: out }
    }

    /// Transpose
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[row * 4 + col] = self.at(row, col);
            }
        }
        Self { elements: out }
    }

    /// Translation matrix
    #[rustfmt::skip]
    pub const fn make_translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(
            1.0, 0.0, 0.0, x,
            0.0, 1.0, 0.0, y,
            0.0, 0.0, 1.0, z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Scale matrix
    #[rustfmt::skip]
    pub const fn make_scale(x: f64, y: f64, z: f64) -> Self {
        Self::new(
            x, 0.0, 0.0, 0.0,
            0.0, y, 0.0, 0.0,
            0.0, 0.0, z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation of `theta` radians about the X axis
    #[rustfmt::skip]
    pub fn make_rotation_x(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation of `theta` radians about the Y axis
    #[rustfmt::skip]
    pub fn make_rotation_y(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::new(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation of `theta` radians about the Z axis
    #[rustfmt::skip]
    pub fn make_rotation_z(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::new(
            c, -s, 0.0, 0.0,
            s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation of `angle` radians about a unit `axis`
    #[rustfmt::skip]
    pub fn make_rotation_axis(axis: &Vector3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        let (tx, ty) = (t * x, t * y);
        Self::new(
            tx * x + c, tx * y - s * z, tx * z + s * y, 0.0,
            tx * y + s * z, ty * y + c, ty * z - s * x, 0.0,
            tx * z - s * y, ty * z + s * x, t * z * z + c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation matrix of a unit quaternion
    pub fn make_rotation_from_quaternion(q: &Quaternion) -> Self {
        Self::compose(&Vector3::ZERO, q, &Vector3::ONE)
    }

    /// Rotation matrix of Euler angles, applying the axes in the stated order
    ///
    /// Order `XYZ` yields `Rx * Ry * Rz`.
    pub fn make_rotation_from_euler(euler: &Euler) -> Self {
        let rx = Self::make_rotation_x(euler.x);
        let ry = Self::make_rotation_y(euler.y);
        let rz = Self::make_rotation_z(euler.z);
        match euler.order {
            EulerOrder::Xyz => rx * ry * rz,
            EulerOrder::Yxz => ry * rx * rz,
            EulerOrder::Zxy => rz * rx * ry,
            EulerOrder::Zyx => rz * ry * rx,
            EulerOrder::Yzx => ry * rz * rx,
            EulerOrder::Xzy => rx * rz * ry,
        }
    }

    /// Pure rotation part of a transform (columns normalized, no translation)
    ///
    /// Zero-length columns stay zero.
    #[must_use]
    pub fn extract_rotation(&self) -> Self {
        let scale = Vector3::from_matrix_scale(self);
        let inv = |s: f64| if s == 0.0 { 0.0 } else { 1.0 / s };
        let (sx, sy, sz) = (inv(scale.x), inv(scale.y), inv(scale.z));
        let e = &self.elements;
        Self {
            elements: [
                e[0] * sx, e[1] * sx, e[2] * sx, 0.0, //
                e[4] * sy, e[5] * sy, e[6] * sy, 0.0, //
                e[8] * sz, e[9] * sz, e[10] * sz, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rotation that orients +Z from `target` towards `eye` with `up` as the up hint
    ///
    /// Coincident eye/target or an up vector parallel to the view direction are
    /// nudged by a small epsilon instead of producing NaN.
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Self {
        let mut z = *eye - *target;
        if z.length_squared() == 0.0 {
            z.z = 1.0;
        }
        z = z.normalize();

        let mut x = up.cross(&z);
        if x.length_squared() == 0.0 {
            if (up.z.abs() - 1.0).abs() < f64::EPSILON {
                z.x += 0.0001;
            } else {
                z.z += 0.0001;
            }
            z = z.normalize();
            x = up.cross(&z);
        }
        x = x.normalize();
        let y = z.cross(&x);

        let mut m = Self::IDENTITY;
        m.set_basis(&x, &y, &z);
        m
    }

    /// Overwrite the upper 3x3 with the given basis columns
    pub fn set_basis(&mut self, x: &Vector3, y: &Vector3, z: &Vector3) -> &mut Self {
        let e = &mut self.elements;
        e[0] = x.x;
        e[1] = x.y;
        e[2] = x.z;
        e[4] = y.x;
        e[5] = y.y;
        e[6] = y.z;
        e[8] = z.x;
        e[9] = z.y;
        e[10] = z.z;
        self
    }

    /// Overwrite the translation column
    pub fn set_position(&mut self, position: &Vector3) -> &mut Self {
        self.elements[12] = position.x;
        self.elements[13] = position.y;
        self.elements[14] = position.z;
        self
    }

    /// Scale the basis columns by `v`
    #[must_use]
    pub fn scale(&self, v: &Vector3) -> Self {
        let mut out = *self;
        for row in 0..4 {
            out.elements[row] *= v.x;
            out.elements[4 + row] *= v.y;
            out.elements[8 + row] *= v.z;
        }
        out
    }

    /// Largest axis scale factor of the transform
    pub fn max_scale_on_axis(&self) -> f64 {
        let e = &self.elements;
        let sx = e[0] * e[0] + e[1] * e[1] + e[2] * e[2];
        let sy = e[4] * e[4] + e[5] * e[5] + e[6] * e[6];
        let sz = e[8] * e[8] + e[9] * e[9] + e[10] * e[10];
        sx.max(sy).max(sz).sqrt()
    }

    /// Compose a transform from translation, rotation and scale
    pub fn compose(position: &Vector3, q: &Quaternion, scale: &Vector3) -> Self {
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, xy, xz) = (x * x2, x * y2, x * z2);
        let (yy, yz, zz) = (y * y2, y * z2, z * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);
        let (sx, sy, sz) = (scale.x, scale.y, scale.z);

        Self {
            elements: [
                (1.0 - (yy + zz)) * sx,
                (xy + wz) * sx,
                (xz - wy) * sx,
                0.0,
                (xy - wz) * sy,
                (1.0 - (xx + zz)) * sy,
                (yz + wx) * sy,
                0.0,
                (xz + wy) * sz,
                (yz - wx) * sz,
                (1.0 - (xx + yy)) * sz,
                0.0,
                position.x,
                position.y,
                position.z,
                1.0,
            ],
        }
    }

    /// Split into translation, rotation and scale
    ///
    /// A negative determinant is folded into the X scale.
    pub fn decompose(&self) -> (Vector3, Quaternion, Vector3) {
        let mut scale = Vector3::from_matrix_scale(self);
        if self.determinant() < 0.0 {
            scale.x = -scale.x;
        }
        let position = Vector3::from_matrix_position(self);

        let inv = |s: f64| if s == 0.0 { 0.0 } else { 1.0 / s };
        let (ix, iy, iz) = (inv(scale.x), inv(scale.y), inv(scale.z));
        let mut rotation = *self;
        for row in 0..3 {
            rotation.elements[row] *= ix;
            rotation.elements[4 + row] *= iy;
            rotation.elements[8 + row] *= iz;
        }
        let quaternion = Quaternion::from_rotation_matrix(&rotation);

        (position, quaternion, scale)
    }

    /// Perspective projection from frustum bounds at the near plane
    #[allow(clippy::too_many_arguments)]
    pub fn make_perspective(
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
        near: f64,
        far: f64,
        coordinate_system: CoordinateSystem,
    ) -> Self {
        let x = 2.0 * near / (right - left);
        let y = 2.0 * near / (top - bottom);
        let a = (right + left) / (right - left);
        let b = (top + bottom) / (top - bottom);
        let (c, d) = match coordinate_system {
            CoordinateSystem::OpenGl => (
                -(far + near) / (far - near),
                -2.0 * far * near / (far - near),
            ),
            CoordinateSystem::WebGpu => (-far / (far - near), -far * near / (far - near)),
        };

        let mut m = Self::ZERO;
        let e = &mut m.elements;
        e[0] = x;
        e[8] = a;
        e[5] = y;
        e[9] = b;
        e[10] = c;
        e[14] = d;
        e[11] = -1.0;
        m
    }

    /// Orthographic projection
    #[allow(clippy::too_many_arguments)]
    pub fn make_orthographic(
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
        near: f64,
        far: f64,
        coordinate_system: CoordinateSystem,
    ) -> Self {
        let w = 1.0 / (right - left);
        let h = 1.0 / (top - bottom);
        let p = 1.0 / (far - near);
        let x = (right + left) * w;
        let y = (top + bottom) * h;
        let (z, z_inv) = match coordinate_system {
            CoordinateSystem::OpenGl => ((far + near) * p, -2.0 * p),
            CoordinateSystem::WebGpu => (near * p, -p),
        };

        let mut m = Self::ZERO;
        let e = &mut m.elements;
        e[0] = 2.0 * w;
        e[12] = -x;
        e[5] = 2.0 * h;
        e[13] = -y;
        e[10] = z_inv;
        e[14] = -z;
        e[15] = 1.0;
        m
    }

    /// True when every element is finite
    pub fn is_finite(&self) -> bool {
        self.elements.iter().all(|e| e.is_finite())
    }
}

impl Mul for Matrix4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Matrix4 {
        let q = Quaternion::from_euler(&Euler::new(0.3, -0.7, 1.1, EulerOrder::Xyz));
        Matrix4::compose(&Vector3::new(1.0, -2.0, 3.5), &q, &Vector3::new(2.0, 0.5, 1.5))
    }

    #[test]
    fn test_invert_twice_returns_original() {
        let m = sample();
        assert_relative_eq!(m.invert().invert(), m, epsilon = 1e-10);
        assert_relative_eq!(m * m.invert(), Matrix4::IDENTITY, epsilon = 1e-10);
    }

    #[test]
    fn test_invert_matches_nalgebra() {
        let m = sample();
        let oracle: nalgebra::Matrix4<f64> = m.into();
        let expected = oracle.try_inverse().map(Matrix4::from);
        assert!(expected.is_some());
        if let Some(expected) = expected {
            assert_relative_eq!(m.invert(), expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_singular_invert_is_zero() {
        let m = Matrix4::make_scale(1.0, 0.0, 1.0);
        let inv = m.invert();
        assert_eq!(inv, Matrix4::ZERO);
        assert!(inv.is_finite());
    }

    #[test]
    fn test_determinant() {
        assert_relative_eq!(Matrix4::make_scale(2.0, 3.0, 4.0).determinant(), 24.0);
        assert_relative_eq!(Matrix4::IDENTITY.determinant(), 1.0);
    }

    #[test]
    fn test_compose_decompose() {
        let m = sample();
        let (p, q, s) = m.decompose();
        assert_relative_eq!(p, Vector3::new(1.0, -2.0, 3.5), epsilon = 1e-12);
        assert_relative_eq!(s, Vector3::new(2.0, 0.5, 1.5), epsilon = 1e-12);
        assert_relative_eq!(Matrix4::compose(&p, &q, &s), m, epsilon = 1e-12);
    }

    #[test]
    fn test_decompose_negative_determinant() {
        let m = Matrix4::make_scale(-2.0, 3.0, 4.0);
        let (_, q, s) = m.decompose();
        assert_relative_eq!(s, Vector3::new(-2.0, 3.0, 4.0), epsilon = 1e-12);
        assert_relative_eq!(q.length(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(Matrix4::compose(&Vector3::ZERO, &q, &s), m, epsilon = 1e-12);
    }

    #[test]
    fn test_perspective_divide_terms() {
        let (fov, aspect, near, far) = (50.0_f64, 1.0, 0.1, 2000.0);
        let top = near * (fov.to_radians() * 0.5).tan();
        let height = 2.0 * top;
        let width = aspect * height;
        let left = -0.5 * width;

        let gl = Matrix4::make_perspective(
            left,
            left + width,
            top,
            top - height,
            near,
            far,
            CoordinateSystem::OpenGl,
        );
        assert_relative_eq!(gl.elements[5], 1.0 / (fov.to_radians() * 0.5).tan(), epsilon = 1e-9);
        assert_relative_eq!(gl.elements[10], -(far + near) / (far - near), epsilon = 1e-12);
        assert_relative_eq!(gl.elements[14], -2.0 * far * near / (far - near), epsilon = 1e-12);
        assert_relative_eq!(gl.elements[11], -1.0);
        assert_relative_eq!(gl.elements[15], 0.0);

        let gpu = Matrix4::make_perspective(
            left,
            left + width,
            top,
            top - height,
            near,
            far,
            CoordinateSystem::WebGpu,
        );
        assert_relative_eq!(gpu.elements[10], -far / (far - near), epsilon = 1e-12);
        assert_relative_eq!(gpu.elements[14], -far * near / (far - near), epsilon = 1e-12);
    }

    #[test]
    fn test_orthographic_maps_near_far() {
        let m = Matrix4::make_orthographic(-1.0, 1.0, 1.0, -1.0, 1.0, 11.0, CoordinateSystem::WebGpu);
        let near = Vector3::new(0.0, 0.0, -1.0).apply_matrix4(&m);
        let far = Vector3::new(0.0, 0.0, -11.0).apply_matrix4(&m);
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_look_at_coincident_inputs_stay_finite() {
        let m = Matrix4::look_at(&Vector3::ZERO, &Vector3::ZERO, &Vector3::Y);
        assert!(m.is_finite());
        let m = Matrix4::look_at(&Vector3::new(0.0, 5.0, 0.0), &Vector3::ZERO, &Vector3::Y);
        assert!(m.is_finite());
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_axis_matches_elementary() {
        let a = Matrix4::make_rotation_axis(&Vector3::Y, 0.8);
        assert_relative_eq!(a, Matrix4::make_rotation_y(0.8), epsilon = 1e-12);
    }

    #[test]
    fn test_get_out_of_range() {
        assert_eq!(
            Matrix4::IDENTITY.get(16),
            Err(MathError::IndexOutOfRange { index: 16, len: 16 })
        );
        assert!(Matrix4::from_slice(&[0.0; 15], 0).is_err());
    }

    #[test]
    fn test_max_scale_on_axis() {
        assert_relative_eq!(Matrix4::make_scale(1.0, -5.0, 2.0).max_scale_on_axis(), 5.0);
    }
}
