//! Clipping planes
//!
//! Global planes apply to every draw. Material planes are added when local
//! clipping is enabled. Both are transformed to view space once per draw and
//! packed into the `clippingPlanes` uniform, global planes first.

use crate::foundation::math::{Matrix3, Matrix4, Plane};

use super::material::Material;
use super::uniforms::UniformValue;

/// Clipping setup shared by every draw in a frame
#[derive(Debug, Clone, Default)]
pub struct ClippingState {
    global: Vec<Plane>,
    local_enabled: bool,
}

impl ClippingState {
    /// No planes, local clipping disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global planes (world space)
    pub fn set_global_planes(&mut self, planes: Vec<Plane>) {
        self.global = planes;
    }

    /// Global planes (world space)
    pub fn global_planes(&self) -> &[Plane] {
        &self.global
    }

    /// Enable or disable material clipping planes
    pub fn set_local_enabled(&mut self, enabled: bool) {
        self.local_enabled = enabled;
    }

    /// Material planes in effect for `material`
    fn local_planes<'a>(&self, material: &'a Material) -> &'a [Plane] {
        if self.local_enabled {
            &material.clipping_planes
        } else {
            &[]
        }
    }

    /// `(planes, intersection planes)` for a material
    ///
    /// Intersection planes clip only where all of them agree; they are the
    /// material planes when `clip_intersection` is set.
    pub fn counts(&self, material: &Material) -> (usize, usize) {
        let local = self.local_planes(material).len();
        let intersection = if material.clip_intersection { local } else { 0 };
        (self.global.len() + local, intersection)
    }

    /// Planes for one draw packed as view-space `vec4(normal, constant)`
    ///
    /// `None` when no plane applies.
    pub fn uniform(&self, material: &Material, view: &Matrix4) -> Option<UniformValue> {
        let local = self.local_planes(material);
        if self.global.is_empty() && local.is_empty() {
            return None;
        }
        let normal_matrix = Matrix3::normal_matrix(view);
        #[allow(clippy::cast_possible_truncation)]
        let packed = self
            .global
            .iter()
            .chain(local)
            .flat_map(|plane| plane.apply_matrix4(view, Some(&normal_matrix)).to_vector4().to_array())
            .map(|c| c as f32)
            .collect();
        Some(UniformValue::FloatArray(packed))
    }
}
