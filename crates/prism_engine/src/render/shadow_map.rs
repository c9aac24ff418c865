//! Shadow map targets and shadow cameras
//!
//! Every shadow-casting light owns a device-only color target holding
//! RGBA-packed depth. Directional and spot lights render one view; point
//! lights render six cube faces into a 4x2 atlas. The renderer draws the
//! casters for each [`ShadowView`] with the depth program and afterwards
//! samples the maps through the `*ShadowMatrix` / `*ShadowMap` uniforms.

use std::collections::{HashMap, HashSet};

use crate::foundation::math::{ColorSpace, CoordinateSystem, Matrix4, Vector3};
use crate::render::backend::{BackendResult, FramebufferId, GraphicsDevice, TextureDescriptor, TextureId, Viewport};
use crate::render::lights::CollectedLight;
use crate::render::uniforms::{UniformValue, Uniforms};
use crate::scene::{LightKind, NodeId, Projection};

/// Maps clip space [-1, 1] to texture space [0, 1]
#[rustfmt::skip]
const TEXTURE_BIAS: Matrix4 = Matrix4::new(
    0.5, 0.0, 0.0, 0.5,
    0.0, 0.5, 0.0, 0.5,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

const CUBE_DIRECTIONS: [Vector3; 6] = [
    Vector3::new(1.0, 0.0, 0.0),
    Vector3::new(-1.0, 0.0, 0.0),
    Vector3::new(0.0, 0.0, 1.0),
    Vector3::new(0.0, 0.0, -1.0),
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, -1.0, 0.0),
];

const CUBE_UPS: [Vector3; 6] = [
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, 0.0, 1.0),
    Vector3::new(0.0, 0.0, -1.0),
];

// Face placement in the 4x2 atlas, in face-size units
const CUBE_TILES: [(u32, u32); 6] = [(2, 1), (0, 1), (3, 1), (1, 1), (3, 0), (1, 0)];

/// One depth render the renderer must perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowView {
    /// Light node the map belongs to
    pub light: NodeId,
    /// Target to draw into
    pub framebuffer: FramebufferId,
    /// Region of the target
    pub viewport: Viewport,
    /// Shadow camera projection
    pub projection: Matrix4,
    /// Shadow camera view matrix
    pub view: Matrix4,
    /// Shadow camera world matrix
    pub camera_world: Matrix4,
    /// Clear the target before this view
    pub clear: bool,
}

#[derive(Debug, Clone, Copy)]
struct ShadowTarget {
    texture: TextureId,
    framebuffer: FramebufferId,
    size: (u32, u32),
}

/// Shadow targets for every shadow-casting light
#[derive(Debug, Default)]
pub struct ShadowMaps {
    targets: HashMap<NodeId, ShadowTarget>,
}

#[allow(clippy::cast_possible_wrap)]
const fn tile_offset(tile: u32, size: u32) -> i32 {
    (tile * size) as i32
}

/// World matrix of a camera at `eye` looking at `target`
fn camera_world(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
    let mut world = Matrix4::look_at(eye, target, up);
    world.set_position(eye);
    world
}

/// Up hint for a shadow camera looking from `eye` at `target`
///
/// Falls back to +Z when the view direction is (nearly) vertical.
fn shadow_up(eye: &Vector3, target: &Vector3) -> Vector3 {
    let direction = (*target - *eye).normalize();
    if direction.cross(&Vector3::Y).length_squared() < 1e-12 {
        Vector3::Z
    } else {
        Vector3::Y
    }
}

impl ShadowMaps {
    /// No targets
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the light's shadow camera and matrix and return the views to render
    ///
    /// Lights without shadow settings yield no views. The target is
    /// (re)allocated when the map size changes.
    pub fn prepare<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        collected: &mut CollectedLight,
        coordinate_system: CoordinateSystem,
    ) -> BackendResult<Vec<ShadowView>> {
        let eye = collected.position();
        let aim = collected.target;
        let node = collected.node;
        let fov = collected.light.spot_shadow_fov();
        let (is_point, spot_distance) = match collected.light.kind {
            LightKind::Point { .. } => (true, None),
            LightKind::Spot { distance, .. } => (false, Some(distance)),
            _ => (false, None),
        };
        let Some(shadow) = collected.light.shadow.as_mut() else {
            return Ok(Vec::new());
        };

        let (face_w, face_h) = (shadow.map_size.0.max(1), shadow.map_size.1.max(1));
        let size = if is_point { (face_w * 4, face_h * 2) } else { (face_w, face_h) };
        let target = self.ensure_target(device, node, size)?;

        let camera = &mut shadow.camera;
        camera.coordinate_system = coordinate_system;
        if let Projection::Perspective {
            fov: camera_fov,
            aspect,
            far,
            ..
        } = &mut camera.projection
        {
            if let Some(spot_fov) = fov {
                *camera_fov = spot_fov;
            }
            *aspect = f64::from(face_w) / f64::from(face_h);
            if let Some(distance) = spot_distance.filter(|d| *d > 0.0) {
                *far = distance;
            }
        }
        camera.update_projection_matrix();
        let projection = *camera.projection_matrix();

        if is_point {
            shadow.matrix = Matrix4::make_translation(-eye.x, -eye.y, -eye.z);
            let views = CUBE_DIRECTIONS
                .iter()
                .zip(CUBE_UPS.iter())
                .zip(CUBE_TILES.iter())
                .enumerate()
                .map(|(face, ((direction, up), (tx, ty)))| {
                    let world = camera_world(&eye, &(eye + *direction), up);
                    ShadowView {
                        light: node,
                        framebuffer: target.framebuffer,
                        viewport: Viewport::new(tile_offset(*tx, face_w), tile_offset(*ty, face_h), face_w, face_h),
                        projection,
                        view: world.invert(),
                        camera_world: world,
                        clear: face == 0,
                    }
                })
                .collect();
            return Ok(views);
        }

        let world = camera_world(&eye, &aim, &shadow_up(&eye, &aim));
        camera.set_matrix_world(&world);
        let view = *camera.matrix_world_inverse();
        shadow.matrix = TEXTURE_BIAS.multiply(&projection).multiply(&view);
        Ok(vec![ShadowView {
            light: node,
            framebuffer: target.framebuffer,
            viewport: Viewport::new(0, 0, face_w, face_h),
            projection,
            view,
            camera_world: world,
            clear: true,
        }])
    }

    fn ensure_target<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        node: NodeId,
        size: (u32, u32),
    ) -> BackendResult<ShadowTarget> {
        if let Some(existing) = self.targets.get(&node) {
            if existing.size == size {
                return Ok(*existing);
            }
        }
        self.release(device, node);
        let desc = TextureDescriptor {
            width: size.0,
            height: size.1,
            depth: false,
            color_space: ColorSpace::None,
            generate_mipmaps: false,
            repeat: false,
            linear_filter: false,
        };
        let texture = device.create_texture(&desc, None)?;
        let framebuffer = device.create_framebuffer(texture, true, false)?;
        log::debug!("Allocated {}x{} shadow map for light {node:?}", size.0, size.1);
        let target = ShadowTarget {
            texture,
            framebuffer,
            size,
        };
        self.targets.insert(node, target);
        Ok(target)
    }

    /// Map texture of a light
    pub fn texture(&self, light: NodeId) -> Option<TextureId> {
        self.targets.get(&light).map(|t| t.texture)
    }

    /// Release one light's map
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, light: NodeId) -> bool {
        self.targets.remove(&light).is_some_and(|target| {
            device.delete_framebuffer(target.framebuffer);
            device.delete_texture(target.texture);
            true
        })
    }

    /// Release maps of lights not in `live`
    pub fn retain<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, live: &HashSet<NodeId>) {
        let stale: Vec<NodeId> = self.targets.keys().filter(|k| !live.contains(k)).copied().collect();
        for light in stale {
            self.release(device, light);
        }
    }

    /// Live shadow maps
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when no map exists
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Release every map
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, target) in self.targets.drain() {
            device.delete_framebuffer(target.framebuffer);
            device.delete_texture(target.texture);
        }
    }

    /// Drop every target without touching the device
    pub fn forget_all(&mut self) {
        self.targets.clear();
    }
}

/// Shadow matrix uniforms for lights already sorted shadowed-first
///
/// Returns the uniforms and, per sampler uniform name, the light whose map
/// it samples. Indices follow the per-kind order used by the light arrays.
pub fn shadow_uniforms(lights: &[CollectedLight]) -> (Uniforms, Vec<(String, NodeId)>) {
    let mut uniforms = Uniforms::new();
    let mut samplers = Vec::new();
    let (mut directional, mut spot, mut point) = (0usize, 0usize, 0usize);
    let mut bias = None;

    for collected in lights.iter().filter(|l| l.shadowed()) {
        let Some(shadow) = collected.light.shadow.as_ref() else {
            continue;
        };
        let (prefix, index) = match collected.light.kind {
            LightKind::Directional { .. } => ("directional", &mut directional),
            LightKind::Spot { .. } => ("spot", &mut spot),
            LightKind::Point { .. } => ("point", &mut point),
            LightKind::Ambient | LightKind::Hemisphere { .. } => continue,
        };
        uniforms.insert(
            format!("{prefix}ShadowMatrix[{index}]"),
            UniformValue::Mat4(shadow.matrix),
        );
        samplers.push((format!("{prefix}ShadowMap[{index}]"), collected.node));
        *index += 1;
        bias.get_or_insert(shadow.bias);
    }
    uniforms.insert("shadowBias".into(), UniformValue::Float(bias.unwrap_or(0.0)));
    (uniforms, samplers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Color;
    use crate::render::backend::HeadlessDevice;
    use crate::scene::{Light, Node, SceneGraph};
    use approx::assert_relative_eq;

    fn collected(light: Light, position: Vector3) -> CollectedLight {
        let mut graph = SceneGraph::new();
        let node = graph.insert(Node::group());
        CollectedLight {
            node,
            light,
            matrix_world: Matrix4::make_translation(position.x, position.y, position.z),
            target: Vector3::ZERO,
            cast_shadow: true,
        }
    }

    #[test]
    fn test_directional_matrix_maps_target_to_center() {
        let mut device = HeadlessDevice::new();
        let mut maps = ShadowMaps::new();
        let mut light = collected(Light::directional(Color::WHITE, 1.0).with_shadow(), Vector3::new(0.0, 10.0, 0.0));
        let views = maps.prepare(&mut device, &mut light, CoordinateSystem::OpenGl).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].clear);

        let matrix = light.light.shadow.as_ref().map(|s| s.matrix).unwrap();
        let uv = Vector3::ZERO.apply_matrix4(&matrix);
        assert_relative_eq!(uv.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(uv.y, 0.5, epsilon = 1e-9);
        assert_eq!(device.framebuffer_count(), 1);
    }

    #[test]
    fn test_vertical_light_uses_fallback_up() {
        assert_eq!(shadow_up(&Vector3::new(0.0, 10.0, 0.0), &Vector3::ZERO), Vector3::Z);
        assert_eq!(shadow_up(&Vector3::new(0.0, -3.0, 0.0), &Vector3::ZERO), Vector3::Z);
        assert_eq!(shadow_up(&Vector3::new(1.0, 10.0, 0.0), &Vector3::ZERO), Vector3::Y);

        let mut device = HeadlessDevice::new();
        let mut maps = ShadowMaps::new();
        let mut light = collected(Light::directional(Color::WHITE, 1.0).with_shadow(), Vector3::new(0.0, 10.0, 0.0));
        maps.prepare(&mut device, &mut light, CoordinateSystem::OpenGl).unwrap();
        let matrix = light.light.shadow.as_ref().map(|s| s.matrix).unwrap();
        let below = Vector3::new(0.0, -2.0, 0.0).apply_matrix4(&matrix);
        assert_relative_eq!(below.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(below.y, 0.5, epsilon = 1e-9);
        let offset = Vector3::new(1.0, 0.0, 0.0).apply_matrix4(&matrix);
        assert!((offset.x - 0.5).abs() > 1e-3);
        assert_relative_eq!(offset.y, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_point_light_renders_six_faces() {
        let mut device = HeadlessDevice::new();
        let mut maps = ShadowMaps::new();
        let mut light = collected(Light::point(Color::WHITE, 1.0, 0.0, 2.0).with_shadow(), Vector3::ONE);
        let views = maps.prepare(&mut device, &mut light, CoordinateSystem::OpenGl).unwrap();
        assert_eq!(views.len(), 6);
        assert_eq!(views.iter().filter(|v| v.clear).count(), 1);
        assert_eq!(views[1].viewport, Viewport::new(0, 512, 512, 512));
        assert_eq!(device.texture_count(), 1);
    }

    #[test]
    fn test_resize_and_retain() {
        let mut device = HeadlessDevice::new();
        let mut maps = ShadowMaps::new();
        let mut light = collected(Light::spot(Color::WHITE, 1.0, 20.0, 0.5, 0.0, 2.0).with_shadow(), Vector3::Y);
        maps.prepare(&mut device, &mut light, CoordinateSystem::OpenGl).unwrap();
        let first = maps.texture(light.node);

        if let Some(shadow) = light.light.shadow.as_mut() {
            shadow.map_size = (1024, 1024);
        }
        maps.prepare(&mut device, &mut light, CoordinateSystem::OpenGl).unwrap();
        assert_ne!(first, maps.texture(light.node));
        assert_eq!(device.texture_count(), 1);

        maps.retain(&mut device, &HashSet::new());
        assert!(maps.is_empty());
        assert_eq!(device.framebuffer_count(), 0);
    }

    #[test]
    fn test_uniform_indices_per_kind() {
        let lights = vec![
            collected(Light::directional(Color::WHITE, 1.0).with_shadow(), Vector3::Y),
            collected(Light::spot(Color::WHITE, 1.0, 0.0, 0.4, 0.0, 2.0).with_shadow(), Vector3::Y),
            collected(Light::directional(Color::WHITE, 1.0).with_shadow(), Vector3::X),
        ];
        let (uniforms, samplers) = shadow_uniforms(&lights);
        assert!(uniforms.contains_key("directionalShadowMatrix[1]"));
        assert!(uniforms.contains_key("spotShadowMatrix[0]"));
        assert!(uniforms.contains_key("shadowBias"));
        assert_eq!(samplers.len(), 3);
        assert_eq!(samplers[2].0, "directionalShadowMap[1]");
    }
}
