//! Axis-aligned box and sphere bounding volumes

use serde::{Deserialize, Serialize};

use super::{Matrix4, Vector3};

/// Axis-aligned bounding box
///
/// The empty box has `min = +inf` and `max = -inf` so that expanding it by any
/// point yields that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    /// Minimum corner
    pub min: Vector3,
    /// Maximum corner
    pub max: Vector3,
}

impl_approx_fields!(Box3, min, max);

impl Default for Box3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Box3 {
    /// A box containing nothing
    pub const EMPTY: Self = Self {
        min: Vector3::splat(f64::INFINITY),
        max: Vector3::splat(f64::NEG_INFINITY),
    };

    /// Create from corners
    pub const fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vector3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(p);
        }
        b
    }

    /// Box centered on `center` with extents `size`
    pub fn from_center_and_size(center: &Vector3, size: &Vector3) -> Self {
        let half = *size * 0.5;
        Self::new(*center - half, *center + half)
    }

    /// True when no point has been added (any max below min)
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Center point (zero for an empty box)
    pub fn center(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Extents (zero for an empty box)
    pub fn size(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Grow to include `point`
    pub fn expand_by_point(&mut self, point: &Vector3) -> &mut Self {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self
    }

    /// Grow each side by `v`
    pub fn expand_by_vector(&mut self, v: &Vector3) -> &mut Self {
        self.min -= *v;
        self.max += *v;
        self
    }

    /// Union with another box
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(&other.min), self.max.max(&other.max))
    }

    /// Intersection with another box (empty when disjoint)
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let b = Self::new(self.min.max(&other.min), self.max.min(&other.max));
        if b.is_empty() {
            Self::EMPTY
        } else {
            b
        }
    }

    /// Translate by `offset`
    #[must_use]
    pub fn translate(&self, offset: &Vector3) -> Self {
        Self::new(self.min + *offset, self.max + *offset)
    }

    /// Axis-aligned box around the eight transformed corners
    #[must_use]
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];
        let transformed: Vec<Vector3> = corners.iter().map(|c| c.apply_matrix4(m)).collect();
        Self::from_points(&transformed)
    }

    /// True when `point` is inside or on the boundary
    pub fn contains_point(&self, point: &Vector3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True when the boxes overlap (touching counts)
    pub fn intersects_box(&self, other: &Self) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y
            || other.max.z < self.min.z
            || other.min.z > self.max.z)
    }

    /// Closest point of the box to `point`
    pub fn clamp_point(&self, point: &Vector3) -> Vector3 {
        point.clamp(&self.min, &self.max)
    }

    /// Distance from `point` to the box (zero inside)
    pub fn distance_to_point(&self, point: &Vector3) -> f64 {
        self.clamp_point(point).distance_to(point)
    }

    /// True when the sphere touches the box
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.clamp_point(&sphere.center).distance_to_squared(&sphere.center)
            <= sphere.radius * sphere.radius
    }

    /// Sphere circumscribing the box
    pub fn bounding_sphere(&self) -> Sphere {
        if self.is_empty() {
            return Sphere::EMPTY;
        }
        Sphere::new(self.center(), self.size().length() * 0.5)
    }
}

/// Bounding sphere
///
/// A negative radius marks the empty sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Center
    pub center: Vector3,
    /// Radius
    pub radius: f64,
}

impl_approx_fields!(Sphere, center, radius);

impl Default for Sphere {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Sphere {
    /// A sphere containing nothing
    pub const EMPTY: Self = Self {
        center: Vector3::ZERO,
        radius: -1.0,
    };

    /// Create from center and radius
    pub const fn new(center: Vector3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Sphere around `points`; centered on `center` or on the points' box center
    pub fn from_points(points: &[Vector3], center: Option<Vector3>) -> Self {
        if points.is_empty() {
            return Self::EMPTY;
        }
        let center = center.unwrap_or_else(|| Box3::from_points(points).center());
        let radius_sq = points
            .iter()
            .map(|p| center.distance_to_squared(p))
            .fold(0.0, f64::max);
        Self::new(center, radius_sq.sqrt())
    }

    /// True for the empty sphere
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// True when `point` is inside or on the surface
    pub fn contains_point(&self, point: &Vector3) -> bool {
        point.distance_to_squared(&self.center) <= self.radius * self.radius
    }

    /// True when the spheres overlap
    pub fn intersects_sphere(&self, other: &Self) -> bool {
        let radius_sum = self.radius + other.radius;
        other.center.distance_to_squared(&self.center) <= radius_sum * radius_sum
    }

    /// Grow to include `point`
    pub fn expand_by_point(&mut self, point: &Vector3) -> &mut Self {
        if self.is_empty() {
            self.center = *point;
            self.radius = 0.0;
            return self;
        }
        let delta = *point - self.center;
        let length_sq = delta.length_squared();
        if length_sq > self.radius * self.radius {
            let length = length_sq.sqrt();
            let half_gap = (length - self.radius) * 0.5;
            self.center += delta * (half_gap / length);
            self.radius += half_gap;
        }
        self
    }

    /// Smallest sphere containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        if self.center == other.center {
            return Self::new(self.center, self.radius.max(other.radius));
        }
        let dir = (other.center - self.center).normalize();
        let far_point = other.center + dir * other.radius;
        let near_point = other.center - dir * other.radius;
        let mut out = *self;
        out.expand_by_point(&far_point);
        out.expand_by_point(&near_point);
        out
    }

    /// Transform the center and scale the radius by the largest axis scale
    #[must_use]
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        Self::new(self.center.apply_matrix4(m), self.radius * m.max_scale_on_axis())
    }

    /// Translate by `offset`
    #[must_use]
    pub fn translate(&self, offset: &Vector3) -> Self {
        Self::new(self.center + *offset, self.radius)
    }

    /// Axis-aligned box enclosing the sphere
    pub fn bounding_box(&self) -> Box3 {
        if self.is_empty() {
            return Box3::EMPTY;
        }
        Box3::from_center_and_size(&self.center, &Vector3::splat(self.radius * 2.0))
    }
}
