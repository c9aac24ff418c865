//! Per-frame light setup
//!
//! Lights collected during classification are packed into the uniform
//! arrays the lit chunks declare. Positions and directions are expressed in
//! view space so the fragment stage never needs the view matrix.

use crate::foundation::math::{Color, Matrix4, Vector3};
use crate::scene::{Light, LightKind, NodeId};

use super::uniforms::{UniformValue, Uniforms};

/// Per-type light counts; part of every lit program's fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightCounts {
    /// Directional lights
    pub directional: usize,
    /// Point lights
    pub point: usize,
    /// Spot lights
    pub spot: usize,
    /// Hemisphere lights
    pub hemi: usize,
    /// Directional lights rendering a shadow map
    pub directional_shadows: usize,
    /// Point lights rendering a shadow map
    pub point_shadows: usize,
    /// Spot lights rendering a shadow map
    pub spot_shadows: usize,
}

impl LightCounts {
    /// True when any light casts a shadow
    pub const fn has_shadows(&self) -> bool {
        self.directional_shadows + self.point_shadows + self.spot_shadows > 0
    }
}

/// A light found during classification with its world placement resolved
#[derive(Debug, Clone)]
pub struct CollectedLight {
    /// Owning node
    pub node: NodeId,
    /// Light payload
    pub light: Light,
    /// World matrix of the owning node
    pub matrix_world: Matrix4,
    /// World-space aim point for directional and spot lights
    pub target: Vector3,
    /// Node has `cast_shadow` set
    pub cast_shadow: bool,
}

impl CollectedLight {
    /// World-space position
    pub fn position(&self) -> Vector3 {
        Vector3::from_matrix_position(&self.matrix_world)
    }

    /// True when this light renders a shadow map
    pub const fn shadowed(&self) -> bool {
        self.cast_shadow && self.light.casts_shadow()
    }
}

/// Light uniforms for the current frame
#[derive(Debug, Default)]
pub struct LightState {
    counts: LightCounts,
    uniforms: Uniforms,
    version: u64,
}

impl LightState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild uniforms from the collected lights
    ///
    /// Shadow-casting lights are placed first in each array so shadow map
    /// index `i` pairs with light index `i`. The version bumps when the
    /// counts change.
    pub fn setup(&mut self, lights: &mut [CollectedLight], view: &Matrix4, shadows_enabled: bool) {
        lights.sort_by_key(|l| !(shadows_enabled && l.shadowed()));

        let mut counts = LightCounts::default();
        let mut ambient = Color::BLACK;
        let mut uniforms = Uniforms::new();

        for collected in lights.iter() {
            let light = &collected.light;
            let color = light.color * light.intensity;
            let position = collected.position();
            let shadowed = shadows_enabled && collected.shadowed();
            match light.kind {
                LightKind::Ambient => ambient = ambient + color,
                LightKind::Hemisphere { ground_color } => {
                    let i = counts.hemi;
                    let direction = position.normalize().transform_direction(view);
                    uniforms.insert(format!("hemisphereLights[{i}].direction"), UniformValue::Vec3(direction));
                    uniforms.insert(format!("hemisphereLights[{i}].skyColor"), UniformValue::Color(color));
                    uniforms.insert(
                        format!("hemisphereLights[{i}].groundColor"),
                        UniformValue::Color(ground_color * light.intensity),
                    );
                    counts.hemi += 1;
                }
                LightKind::Directional { .. } => {
                    let i = counts.directional;
                    let direction = (position - collected.target).transform_direction(view);
                    uniforms.insert(format!("directionalLights[{i}].direction"), UniformValue::Vec3(direction));
                    uniforms.insert(format!("directionalLights[{i}].color"), UniformValue::Color(color));
                    counts.directional += 1;
                    counts.directional_shadows += usize::from(shadowed);
                }
                LightKind::Point { distance, decay } => {
                    let i = counts.point;
                    uniforms.insert(
                        format!("pointLights[{i}].position"),
                        UniformValue::Vec3(position.apply_matrix4(view)),
                    );
                    uniforms.insert(format!("pointLights[{i}].color"), UniformValue::Color(color));
                    uniforms.insert(format!("pointLights[{i}].distance"), UniformValue::Float(distance));
                    uniforms.insert(format!("pointLights[{i}].decay"), UniformValue::Float(decay));
                    counts.point += 1;
                    counts.point_shadows += usize::from(shadowed);
                }
                LightKind::Spot {
                    distance,
                    angle,
                    penumbra,
                    decay,
                    ..
                } => {
                    let i = counts.spot;
                    let direction = (position - collected.target).transform_direction(view);
                    uniforms.insert(
                        format!("spotLights[{i}].position"),
                        UniformValue::Vec3(position.apply_matrix4(view)),
                    );
                    uniforms.insert(format!("spotLights[{i}].direction"), UniformValue::Vec3(direction));
                    uniforms.insert(format!("spotLights[{i}].color"), UniformValue::Color(color));
                    uniforms.insert(format!("spotLights[{i}].distance"), UniformValue::Float(distance));
                    uniforms.insert(format!("spotLights[{i}].decay"), UniformValue::Float(decay));
                    uniforms.insert(format!("spotLights[{i}].coneCos"), UniformValue::Float(angle.cos()));
                    uniforms.insert(
                        format!("spotLights[{i}].penumbraCos"),
                        UniformValue::Float((angle * (1.0 - penumbra)).cos()),
                    );
                    counts.spot += 1;
                    counts.spot_shadows += usize::from(shadowed);
                }
            }
        }
        uniforms.insert("ambientLightColor".to_string(), UniformValue::Color(ambient));

        if counts != self.counts {
            self.version += 1;
            log::debug!("Light layout changed: {counts:?}");
        }
        self.counts = counts;
        self.uniforms = uniforms;
    }

    /// Counts from the last setup
    pub const fn counts(&self) -> LightCounts {
        self.counts
    }

    /// Uniforms from the last setup
    pub const fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Bumped whenever the light layout changes
    pub const fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, SceneGraph};
    use approx::assert_relative_eq;

    fn collected(light: Light, position: Vector3, cast_shadow: bool) -> CollectedLight {
        let mut graph = SceneGraph::new();
        let node = graph.insert(Node::group());
        CollectedLight {
            node,
            light,
            matrix_world: Matrix4::make_translation(position.x, position.y, position.z),
            target: Vector3::ZERO,
            cast_shadow,
        }
    }

    #[test]
    fn test_counts_and_ambient_sum() {
        let mut lights = vec![
            collected(Light::ambient(Color::new(0.2, 0.2, 0.2), 1.0), Vector3::ZERO, false),
            collected(Light::ambient(Color::new(0.1, 0.0, 0.0), 2.0), Vector3::ZERO, false),
            collected(Light::directional(Color::WHITE, 1.0), Vector3::new(0.0, 10.0, 0.0), false),
            collected(Light::point(Color::WHITE, 1.0, 0.0, 2.0), Vector3::X, false),
        ];
        let mut state = LightState::new();
        state.setup(&mut lights, &Matrix4::IDENTITY, false);

        let counts = state.counts();
        assert_eq!((counts.directional, counts.point, counts.spot, counts.hemi), (1, 1, 0, 0));
        match state.uniforms().get("ambientLightColor") {
            Some(UniformValue::Color(c)) => {
                assert_relative_eq!(c.r, 0.4, epsilon = 1e-12);
                assert_relative_eq!(c.g, 0.2, epsilon = 1e-12);
            }
            other => panic!("unexpected ambient uniform {other:?}"),
        }
        match state.uniforms().get("directionalLights[0].direction") {
            Some(UniformValue::Vec3(d)) => assert_relative_eq!(*d, Vector3::Y, epsilon = 1e-12),
            other => panic!("unexpected direction uniform {other:?}"),
        }
    }

    #[test]
    fn test_positions_in_view_space() {
        let mut lights = vec![collected(Light::point(Color::WHITE, 1.0, 0.0, 2.0), Vector3::new(1.0, 2.0, 3.0), false)];
        let view = Matrix4::make_translation(0.0, 0.0, -5.0);
        let mut state = LightState::new();
        state.setup(&mut lights, &view, false);
        assert_eq!(
            state.uniforms().get("pointLights[0].position"),
            Some(&UniformValue::Vec3(Vector3::new(1.0, 2.0, -2.0)))
        );
    }

    #[test]
    fn test_shadow_casters_sorted_first() {
        let mut lights = vec![
            collected(Light::directional(Color::WHITE, 1.0), Vector3::X, false),
            collected(Light::directional(Color::WHITE, 1.0).with_shadow(), Vector3::Y, true),
        ];
        let mut state = LightState::new();
        state.setup(&mut lights, &Matrix4::IDENTITY, true);
        assert!(lights[0].shadowed());
        assert_eq!(state.counts().directional_shadows, 1);

        state.setup(&mut lights, &Matrix4::IDENTITY, false);
        assert_eq!(state.counts().directional_shadows, 0);
    }

    #[test]
    fn test_version_tracks_layout() {
        let mut state = LightState::new();
        let mut lights = vec![collected(Light::point(Color::WHITE, 1.0, 0.0, 2.0), Vector3::X, false)];
        state.setup(&mut lights, &Matrix4::IDENTITY, false);
        let v = state.version();
        state.setup(&mut lights, &Matrix4::make_translation(1.0, 0.0, 0.0), false);
        assert_eq!(state.version(), v);
        lights.push(collected(Light::point(Color::WHITE, 1.0, 0.0, 2.0), Vector3::Y, false));
        state.setup(&mut lights, &Matrix4::IDENTITY, false);
        assert_eq!(state.version(), v + 1);
    }
}
