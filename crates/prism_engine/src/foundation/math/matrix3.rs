//! 3x3 matrix
//!
//! Used for normal matrices and texture coordinate transforms.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use super::{MathError, MathResult, Matrix4};

/// Column-major 3x3 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3 {
    /// Elements in column-major order
    pub elements: [f64; 9],
}

impl_approx_elements!(Matrix3);

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        elements: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// All-zero matrix
    pub const ZERO: Self = Self { elements: [0.0; 9] };

    /// Build from row-major arguments
    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub const fn new(
        n11: f64, n12: f64, n13: f64,
        n21: f64, n22: f64, n23: f64,
        n31: f64, n32: f64, n33: f64,
    ) -> Self {
        Self {
            elements: [n11, n21, n31, n12, n22, n32, n13, n23, n33],
        }
    }

    /// Overwrite all elements from row-major arguments
    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub fn set(
        &mut self,
        n11: f64, n12: f64, n13: f64,
        n21: f64, n22: f64, n23: f64,
        n31: f64, n32: f64, n33: f64,
    ) -> &mut Self {
        *self = Self::new(n11, n12, n13, n21, n22, n23, n31, n32, n33);
        self
    }

    /// Read element `index` in column-major order
    pub fn get(&self, index: usize) -> MathResult<f64> {
        self.elements
            .get(index)
            .copied()
            .ok_or(MathError::IndexOutOfRange { index, len: 9 })
    }

    /// Read nine values starting at `offset` (column-major)
    pub fn from_slice(slice: &[f64], offset: usize) -> MathResult<Self> {
        let s = slice.get(offset..offset + 9).ok_or(MathError::IndexOutOfRange {
            index: offset + 8,
            len: slice.len(),
        })?;
        let mut elements = [0.0; 9];
        elements.copy_from_slice(s);
        Ok(Self { elements })
    }

    /// Upper-left 3x3 of a 4x4 matrix
    pub fn from_matrix4(m: &Matrix4) -> Self {
        let e = &m.elements;
        Self::new(e[0], e[4], e[8], e[1], e[5], e[9], e[2], e[6], e[10])
    }

    /// Matrix product `self * other`
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let a = &self.elements;
        let b = &other.elements;
        let mut out = [0.0; 9];
        for col in 0..3 {
            for row in 0..3 {
                out[col * 3 + row] = (0..3).map(|k| a[k * 3 + row] * b[col * 3 + k]).sum();
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
        let mut elements = self.elements;
        elements.iter_mut().for_each(|e| *e *= s);
        Self { elements }
    }

    /// Determinant
    pub fn determinant(&self) -> f64 {
        let e = &self.elements;
        let (a, b, c) = (e[0], e[1], e[2]);
        let (d, f, g) = (e[3], e[4], e[5]);
        let (h, i, j) = (e[6], e[7], e[8]);
        a * f * j - a * g * i - b * d * j + b * g * h + c * d * i - c * f * h
    }

    /// Inverse; a singular matrix yields the zero matrix
    #[must_use]
    pub fn invert(&self) -> Self {
        let e = &self.elements;
        let (n11, n21, n31) = (e[0], e[1], e[2]);
        let (n12, n22, n32) = (e[3], e[4], e[5]);
        let (n13, n23, n33) = (e[6], e[7], e[8]);

        let t11 = n33 * n22 - n32 * n23;
        let t12 = n32 * n13 - n33 * n12;
        let t13 = n23 * n12 - n22 * n13;

        let det = n11 * t11 + n21 * t12 + n31 * t13;
        if det == 0.0 || !det.is_finite() {
            return Self::ZERO;
        }
        let inv = 1.0 / det;

        Self {
            elements: [
                t11 * inv,
                (n31 * n23 - n33 * n21) * inv,
                (n32 * n21 - n31 * n22) * inv,
                t12 * inv,
                (n33 * n11 - n31 * n13) * inv,
                (n31 * n12 - n32 * n11) * inv,
                t13 * inv,
                (n21 * n13 - n23 * n11) * inv,
                (n22 * n11 - n21 * n12) * inv,
            ],
        }
    }

    /// Transpose
    #[must_use]
    pub fn transpose(&self) -> Self {
        let e = &self.elements;
        Self {
            elements: [e[0], e[3], e[6], e[1], e[4], e[7], e[2], e[5], e[8]],
        }
    }

    /// Inverse transpose of the upper 3x3 of `m`, for transforming normals
    pub fn normal_matrix(m: &Matrix4) -> Self {
        Self::from_matrix4(m).invert().transpose()
    }

    /// Texture coordinate transform from offset, repeat, rotation and center
    pub fn uv_transform(tx: f64, ty: f64, sx: f64, sy: f64, rotation: f64, cx: f64, cy: f64) -> Self {
        let (s, c) = rotation.sin_cos();
        Self::new(
            sx * c,
            sx * s,
            -sx * (c * cx + s * cy) + cx + tx,
            -sy * s,
            sy * c,
            -sy * (-s * cx + c * cy) + cy + ty,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Elements narrowed to `f32`, column-major
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(&self) -> [f32; 9] {
        self.elements.map(|e| e as f32)
    }
}

impl Mul for Matrix3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert_roundtrip() {
        let m = Matrix3::new(2.0, 0.0, 1.0, 1.0, 3.0, 0.0, 0.0, 1.0, 4.0);
        assert_relative_eq!(m.invert().invert(), m, epsilon = 1e-12);
        assert_relative_eq!(m * m.invert(), Matrix3::IDENTITY, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_invert_is_zero() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0);
        assert_eq!(m.invert(), Matrix3::ZERO);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_diagonal() {
        let m = Matrix4::make_scale(2.0, 2.0, 2.0);
        let n = Matrix3::normal_matrix(&m);
        assert_relative_eq!(n, Matrix3::IDENTITY.multiply_scalar(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_get_out_of_range() {
        assert_eq!(
            Matrix3::IDENTITY.get(9),
            Err(MathError::IndexOutOfRange { index: 9, len: 9 })
        );
    }
}
