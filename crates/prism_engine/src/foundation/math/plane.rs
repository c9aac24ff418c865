//! Infinite plane in Hessian normal form

use serde::{Deserialize, Serialize};

use super::{Matrix3, Matrix4, Vector3, Vector4};

/// Plane satisfying `normal · p + constant = 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Plane normal (unit length once normalized)
    pub normal: Vector3,
    /// Signed distance from the origin along `-normal`
    pub constant: f64,
}

impl_approx_fields!(Plane, normal, constant);

impl Default for Plane {
    fn default() -> Self {
        Self::new(Vector3::X, 0.0)
    }
}

impl Plane {
    /// Create from normal and constant
    pub const fn new(normal: Vector3, constant: f64) -> Self {
        Self { normal, constant }
    }

    /// Create from the raw `(a, b, c, d)` coefficients
    pub const fn from_components(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self::new(Vector3::new(x, y, z), w)
    }

    /// Plane through `point` with unit `normal`
    pub fn from_normal_and_point(normal: &Vector3, point: &Vector3) -> Self {
        Self::new(*normal, -point.dot(normal))
    }

    /// Plane through three counter-clockwise points
    pub fn from_coplanar_points(a: &Vector3, b: &Vector3, c: &Vector3) -> Self {
        let normal = (*c - *b).cross(&(*a - *b)).normalize();
        Self::from_normal_and_point(&normal, a)
    }

    /// Rescale so the normal has unit length; a zero normal is left as is
    #[must_use]
    pub fn normalize(&self) -> Self {
        let length = self.normal.length();
        if length == 0.0 {
            return *self;
        }
        let inv = 1.0 / length;
        Self::new(self.normal * inv, self.constant * inv)
    }

    /// Flip orientation
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::new(-self.normal, -self.constant)
    }

    /// Signed distance from `point`
    pub fn distance_to_point(&self, point: &Vector3) -> f64 {
        self.normal.dot(point) + self.constant
    }

    /// Orthogonal projection of `point` onto the plane
    pub fn project_point(&self, point: &Vector3) -> Vector3 {
        *point - self.normal * self.distance_to_point(point)
    }

    /// A point on the plane
    pub fn coplanar_point(&self) -> Vector3 {
        self.normal * -self.constant
    }

    /// Transform by `m`; `normal_matrix` may be supplied when already known
    #[must_use]
    pub fn apply_matrix4(&self, m: &Matrix4, normal_matrix: Option<&Matrix3>) -> Self {
        let normal_matrix = normal_matrix.copied().unwrap_or_else(|| Matrix3::normal_matrix(m));
        let reference = self.coplanar_point().apply_matrix4(m);
        let normal = self.normal.apply_matrix3(&normal_matrix).normalize();
        Self::from_normal_and_point(&normal, &reference)
    }

    /// Packed as `(normal, constant)` for uniform upload
    pub const fn to_vector4(&self) -> Vector4 {
        Vector4::new(self.normal.x, self.normal.y, self.normal.z, self.constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_and_projection() {
        let p = Plane::from_normal_and_point(&Vector3::Y, &Vector3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(p.distance_to_point(&Vector3::new(5.0, 5.0, 1.0)), 3.0);
        assert_relative_eq!(
            p.project_point(&Vector3::new(5.0, 5.0, 1.0)),
            Vector3::new(5.0, 2.0, 1.0)
        );
    }

    #[test]
    fn test_apply_matrix4_translates_constant() {
        let p = Plane::new(Vector3::Y, 0.0);
        let moved = p.apply_matrix4(&Matrix4::make_translation(0.0, 3.0, 0.0), None);
        assert_relative_eq!(moved.normal, Vector3::Y, epsilon = 1e-12);
        assert_relative_eq!(moved.constant, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize() {
        let p = Plane::from_components(0.0, 2.0, 0.0, 4.0).normalize();
        assert_relative_eq!(p.constant, 2.0);
        assert_relative_eq!(p.normal.length(), 1.0);
    }
}
