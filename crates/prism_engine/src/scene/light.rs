//! Lighting payloads

use crate::foundation::math::{constants::RAD_TO_DEG, Color, Matrix4, Vector3};

use super::camera::Camera;
use super::node::NodeId;

/// Where a directional or spot light points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightTarget {
    /// Fixed world-space point
    Point(Vector3),
    /// World position of another node
    Node(NodeId),
}

impl Default for LightTarget {
    fn default() -> Self {
        Self::Point(Vector3::ZERO)
    }
}

/// Light types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Uniform light from every direction
    Ambient,
    /// Sky/ground gradient
    Hemisphere {
        /// Color from below
        ground_color: Color,
    },
    /// Parallel rays (like sunlight)
    Directional {
        /// Aim point
        target: LightTarget,
    },
    /// Omnidirectional light (like a lightbulb)
    Point {
        /// Cutoff distance; zero means unlimited
        distance: f64,
        /// Falloff exponent
        decay: f64,
    },
    /// Cone light (like a flashlight)
    Spot {
        /// Cutoff distance; zero means unlimited
        distance: f64,
        /// Cone half-angle in radians
        angle: f64,
        /// Fraction of the cone that fades out, in `[0, 1]`
        penumbra: f64,
        /// Falloff exponent
        decay: f64,
        /// Aim point
        target: LightTarget,
    },
}

impl LightKind {
    /// Short label for logs and cache keys
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Hemisphere { .. } => "hemisphere",
            Self::Directional { .. } => "directional",
            Self::Point { .. } => "point",
            Self::Spot { .. } => "spot",
        }
    }

    /// Aim point for directional and spot lights
    pub const fn target(&self) -> Option<LightTarget> {
        match self {
            Self::Directional { target } | Self::Spot { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Shadow map settings and the camera that renders it
#[derive(Debug, Clone)]
pub struct LightShadow {
    /// Shadow map resolution
    pub map_size: (u32, u32),
    /// Depth bias
    pub bias: f64,
    /// Offset along the surface normal
    pub normal_bias: f64,
    /// Blur radius for soft shadow types
    pub radius: f64,
    /// Camera used to render casters
    pub camera: Camera,
    /// Re-render this map even when renderer auto-update is off
    pub needs_update: bool,
    /// Re-render every frame
    pub auto_update: bool,
    /// World to shadow-map texture space, refreshed by the shadow pass
    pub matrix: Matrix4,
    /// Spot shadow frustum multiplier applied to the cone angle
    pub focus: f64,
}

impl LightShadow {
    /// Shadow settings around a dedicated camera
    pub fn new(camera: Camera) -> Self {
        Self {
            map_size: (512, 512),
            bias: 0.0,
            normal_bias: 0.0,
            radius: 1.0,
            camera,
            needs_update: false,
            auto_update: true,
            matrix: Matrix4::IDENTITY,
            focus: 1.0,
        }
    }

    /// Builder: shadow map resolution
    pub fn with_map_size(mut self, width: u32, height: u32) -> Self {
        self.map_size = (width, height);
        self
    }

    /// Builder: depth bias
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }
}

/// Light source
#[derive(Debug, Clone)]
pub struct Light {
    /// Light color
    pub color: Color,
    /// Light intensity
    pub intensity: f64,
    /// Light type
    pub kind: LightKind,
    /// Shadow settings for shadow-capable lights
    pub shadow: Option<LightShadow>,
}

impl Light {
    fn new(kind: LightKind, color: Color, intensity: f64) -> Self {
        Self {
            color,
            intensity,
            kind,
            shadow: None,
        }
    }

    /// Create an ambient light
    pub fn ambient(color: Color, intensity: f64) -> Self {
        Self::new(LightKind::Ambient, color, intensity)
    }

    /// Create a hemisphere light
    pub fn hemisphere(sky_color: Color, ground_color: Color, intensity: f64) -> Self {
        Self::new(LightKind::Hemisphere { ground_color }, sky_color, intensity)
    }

    /// Create a directional light aimed at the origin
    pub fn directional(color: Color, intensity: f64) -> Self {
        Self::new(
            LightKind::Directional {
                target: LightTarget::default(),
            },
            color,
            intensity,
        )
    }

    /// Create a point light
    pub fn point(color: Color, intensity: f64, distance: f64, decay: f64) -> Self {
        Self::new(LightKind::Point { distance, decay }, color, intensity)
    }

    /// Create a spot light aimed at the origin
    pub fn spot(color: Color, intensity: f64, distance: f64, angle: f64, penumbra: f64, decay: f64) -> Self {
        Self::new(
            LightKind::Spot {
                distance,
                angle,
                penumbra,
                decay,
                target: LightTarget::default(),
            },
            color,
            intensity,
        )
    }

    /// Builder: aim a directional or spot light
    pub fn with_target(mut self, new_target: LightTarget) -> Self {
        match &mut self.kind {
            LightKind::Directional { target } | LightKind::Spot { target, .. } => *target = new_target,
            _ => log::warn!("{} lights have no target", self.kind.label()),
        }
        self
    }

    /// Builder: enable shadows with the default shadow camera for this light type
    ///
    /// Ambient and hemisphere lights cannot cast shadows; the call is ignored.
    pub fn with_shadow(mut self) -> Self {
        self.shadow = Self::default_shadow(&self.kind);
        if self.shadow.is_none() {
            log::warn!("{} lights cannot cast shadows", self.kind.label());
        }
        self
    }

    fn default_shadow(kind: &LightKind) -> Option<LightShadow> {
        match kind {
            LightKind::Directional { .. } => Some(LightShadow::new(Camera::orthographic(
                -5.0, 5.0, 5.0, -5.0, 0.5, 500.0,
            ))),
            LightKind::Point { .. } => Some(LightShadow::new(Camera::perspective(90.0, 1.0, 0.5, 500.0))),
            LightKind::Spot { .. } => Some(LightShadow::new(Camera::perspective(50.0, 1.0, 0.5, 500.0))),
            LightKind::Ambient | LightKind::Hemisphere { .. } => None,
        }
    }

    /// True when this light has shadow settings
    pub const fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    /// Spot shadow field of view that covers the cone, in degrees
    pub fn spot_shadow_fov(&self) -> Option<f64> {
        match (&self.kind, &self.shadow) {
            (LightKind::Spot { angle, .. }, Some(shadow)) => Some(RAD_TO_DEG * 2.0 * angle * shadow.focus),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_shadow_support_per_kind() {
        assert!(Light::directional(Color::WHITE, 1.0).with_shadow().casts_shadow());
        assert!(Light::point(Color::WHITE, 1.0, 0.0, 2.0).with_shadow().casts_shadow());
        assert!(!Light::ambient(Color::WHITE, 1.0).with_shadow().casts_shadow());
    }

    #[test]
    fn test_spot_shadow_fov_covers_cone() {
        let light = Light::spot(Color::WHITE, 1.0, 0.0, PI / 6.0, 0.0, 2.0).with_shadow();
        assert_relative_eq!(light.spot_shadow_fov().unwrap_or_default(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_target_only_for_aimed_lights() {
        let target = LightTarget::Point(Vector3::new(1.0, 2.0, 3.0));
        let light = Light::directional(Color::WHITE, 1.0).with_target(target);
        assert_eq!(light.kind.target(), Some(target));
        let light = Light::point(Color::WHITE, 1.0, 0.0, 2.0).with_target(target);
        assert_eq!(light.kind.target(), None);
    }
}
