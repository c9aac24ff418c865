//! Scene nodes
//!
//! A node carries a local TRS transform, cached local and world matrices and
//! a kind-specific payload. Hierarchy links are arena keys owned by the
//! [`SceneGraph`](super::SceneGraph).

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Euler, Matrix4, Quaternion, Vector3};

use super::camera::Camera;
use super::light::Light;
use super::mesh::Mesh;

slotmap::new_key_type! {
    /// Arena key of a node in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

/// Number of addressable layers
pub const LAYER_COUNT: u32 = 32;

/// Layer membership bitmask; a node is drawn when it shares a layer with the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layers {
    mask: u32,
}

impl Default for Layers {
    fn default() -> Self {
        Self::new()
    }
}

impl Layers {
    /// Member of layer 0 only
    pub const fn new() -> Self {
        Self { mask: 1 }
    }

    fn bit(channel: u32) -> u32 {
        1u32.checked_shl(channel).unwrap_or(0)
    }

    /// Raw bitmask
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Make `channel` the only layer
    pub fn set(&mut self, channel: u32) -> &mut Self {
        self.mask = Self::bit(channel);
        self
    }

    /// Add `channel`
    pub fn enable(&mut self, channel: u32) -> &mut Self {
        self.mask |= Self::bit(channel);
        self
    }

    /// Join every layer
    pub fn enable_all(&mut self) -> &mut Self {
        self.mask = u32::MAX;
        self
    }

    /// Remove `channel`
    pub fn disable(&mut self, channel: u32) -> &mut Self {
        self.mask &= !Self::bit(channel);
        self
    }

    /// Leave every layer
    pub fn disable_all(&mut self) -> &mut Self {
        self.mask = 0;
        self
    }

    /// Flip `channel`
    pub fn toggle(&mut self, channel: u32) -> &mut Self {
        self.mask ^= Self::bit(channel);
        self
    }

    /// True when both share at least one layer
    pub const fn test(&self, other: &Self) -> bool {
        self.mask & other.mask != 0
    }

    /// True when `channel` is enabled
    pub fn is_enabled(&self, channel: u32) -> bool {
        self.mask & Self::bit(channel) != 0
    }
}

/// Kind-specific node payload
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum NodeKind {
    /// Transform-only grouping node (also used for bones)
    Group,
    /// Drawable geometry
    Mesh(Mesh),
    /// Viewpoint
    Camera(Camera),
    /// Light source
    Light(Light),
}

impl NodeKind {
    /// Short label for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Mesh(_) => "mesh",
            Self::Camera(_) => "camera",
            Self::Light(_) => "light",
        }
    }
}

/// Scene graph node
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name, searchable with `find_by_name`
    pub name: String,
    /// Payload
    pub kind: NodeKind,
    position: Vector3,
    quaternion: Quaternion,
    rotation: Euler,
    scale: Vector3,
    /// Up hint for `look_at`
    pub up: Vector3,
    pub(super) matrix: Matrix4,
    pub(super) matrix_world: Matrix4,
    /// Rebuild the local matrix from TRS during world updates
    pub matrix_auto_update: bool,
    /// Recompute the world matrix during world updates
    pub matrix_world_auto_update: bool,
    pub(super) matrix_world_needs_update: bool,
    /// Hidden nodes (and their subtrees) are skipped during rendering
    pub visible: bool,
    /// Test the bounding sphere against the camera frustum
    pub frustum_culled: bool,
    /// Explicit ordering inside a render list
    pub render_order: i32,
    /// Layer membership
    pub layers: Layers,
    /// Rendered into shadow maps
    pub cast_shadow: bool,
    /// Samples shadow maps
    pub receive_shadow: bool,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
}

impl Node {
    /// Create a node with an identity transform
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            kind,
            position: Vector3::ZERO,
            quaternion: Quaternion::IDENTITY,
            rotation: Euler::default(),
            scale: Vector3::ONE,
            up: Vector3::Y,
            matrix: Matrix4::IDENTITY,
            matrix_world: Matrix4::IDENTITY,
            matrix_auto_update: true,
            matrix_world_auto_update: true,
            matrix_world_needs_update: false,
            visible: true,
            frustum_culled: true,
            render_order: 0,
            layers: Layers::new(),
            cast_shadow: false,
            receive_shadow: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Grouping node
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    /// Mesh node
    pub fn mesh(mesh: Mesh) -> Self {
        Self::new(NodeKind::Mesh(mesh))
    }

    /// Camera node
    pub fn camera(camera: Camera) -> Self {
        Self::new(NodeKind::Camera(camera))
    }

    /// Light node
    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    /// Builder: set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set the local position
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.set_position(position);
        self
    }

    /// Builder: set the local rotation
    pub fn with_quaternion(mut self, quaternion: Quaternion) -> Self {
        self.set_quaternion(quaternion);
        self
    }

    /// Builder: set the local scale
    pub fn with_scale(mut self, scale: Vector3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Local position
    pub const fn position(&self) -> Vector3 {
        self.position
    }

    /// Set the local position
    pub fn set_position(&mut self, position: Vector3) -> &mut Self {
        self.position = position;
        self
    }

    /// Local rotation
    pub const fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    /// Set the local rotation, keeping the Euler view in sync
    pub fn set_quaternion(&mut self, quaternion: Quaternion) -> &mut Self {
        self.quaternion = quaternion;
        self.rotation = Euler::from_quaternion(&quaternion, self.rotation.order);
        self
    }

    /// Local rotation as Euler angles
    pub const fn rotation(&self) -> Euler {
        self.rotation
    }

    /// Set the local rotation from Euler angles, keeping the quaternion in sync
    pub fn set_rotation(&mut self, rotation: Euler) -> &mut Self {
        self.rotation = rotation;
        self.quaternion = Quaternion::from_euler(&rotation);
        self
    }

    /// Local scale
    pub const fn scale(&self) -> Vector3 {
        self.scale
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vector3) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Local matrix as of the last update
    pub const fn matrix(&self) -> &Matrix4 {
        &self.matrix
    }

    /// World matrix as of the last update
    pub const fn matrix_world(&self) -> &Matrix4 {
        &self.matrix_world
    }

    /// True when the world matrix is stale
    pub const fn matrix_world_needs_update(&self) -> bool {
        self.matrix_world_needs_update
    }

    /// Parent key
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Rebuild the local matrix from position, rotation and scale
    pub fn update_matrix(&mut self) {
        self.matrix = Matrix4::compose(&self.position, &self.quaternion, &self.scale);
        self.matrix_world_needs_update = true;
    }

    /// Replace the local matrix and decompose it into TRS
    pub fn set_matrix(&mut self, matrix: Matrix4) -> &mut Self {
        self.matrix = matrix;
        let (position, quaternion, scale) = matrix.decompose();
        self.position = position;
        self.set_quaternion(quaternion);
        self.scale = scale;
        self.matrix_world_needs_update = true;
        self
    }

    /// Premultiply the local transform by `m`
    pub fn apply_matrix4(&mut self, m: &Matrix4) -> &mut Self {
        if self.matrix_auto_update {
            self.update_matrix();
        }
        let combined = self.matrix.premultiply(m);
        self.set_matrix(combined)
    }

    /// Premultiply the local rotation by `q`
    pub fn apply_quaternion(&mut self, q: &Quaternion) -> &mut Self {
        let rotated = self.quaternion.premultiply(q);
        self.set_quaternion(rotated)
    }

    /// Rotate about a normalized axis in local space
    pub fn rotate_on_axis(&mut self, axis: &Vector3, angle: f64) -> &mut Self {
        let q = Quaternion::from_axis_angle(axis, angle);
        let rotated = self.quaternion.multiply(&q);
        self.set_quaternion(rotated)
    }

    /// Rotate about a normalized axis in parent space
    pub fn rotate_on_world_axis(&mut self, axis: &Vector3, angle: f64) -> &mut Self {
        let q = Quaternion::from_axis_angle(axis, angle);
        let rotated = self.quaternion.premultiply(&q);
        self.set_quaternion(rotated)
    }

    /// Rotate about local X
    pub fn rotate_x(&mut self, angle: f64) -> &mut Self {
        self.rotate_on_axis(&Vector3::X, angle)
    }

    /// Rotate about local Y
    pub fn rotate_y(&mut self, angle: f64) -> &mut Self {
        self.rotate_on_axis(&Vector3::Y, angle)
    }

    /// Rotate about local Z
    pub fn rotate_z(&mut self, angle: f64) -> &mut Self {
        self.rotate_on_axis(&Vector3::Z, angle)
    }

    /// Move along a normalized local axis
    pub fn translate_on_axis(&mut self, axis: &Vector3, distance: f64) -> &mut Self {
        let offset = axis.apply_quaternion(&self.quaternion) * distance;
        self.position += offset;
        self
    }

    /// Move along local X
    pub fn translate_x(&mut self, distance: f64) -> &mut Self {
        self.translate_on_axis(&Vector3::X, distance)
    }

    /// Move along local Y
    pub fn translate_y(&mut self, distance: f64) -> &mut Self {
        self.translate_on_axis(&Vector3::Y, distance)
    }

    /// Move along local Z
    pub fn translate_z(&mut self, distance: f64) -> &mut Self {
        self.translate_on_axis(&Vector3::Z, distance)
    }

    /// Mesh payload
    pub const fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh payload
    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Camera payload
    pub const fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Mutable camera payload
    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Light payload
    pub const fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Mutable light payload
    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Cameras and lights look down -Z; everything else points +Z at a target
    pub const fn looks_down_negative_z(&self) -> bool {
        matches!(self.kind, NodeKind::Camera(_) | NodeKind::Light(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_layers() {
        let mut a = Layers::new();
        let mut b = Layers::new();
        assert!(a.test(&b));
        b.set(3);
        assert!(!a.test(&b));
        a.enable(3);
        assert!(a.test(&b));
        a.toggle(3);
        assert!(!a.is_enabled(3));
        a.disable(0);
        assert_eq!(a.mask(), 0);
        a.enable(40);
        assert_eq!(a.mask(), 0);
        a.enable_all();
        assert!(a.is_enabled(31));
    }

    #[test]
    fn test_rotation_views_stay_in_sync() {
        let mut node = Node::group();
        node.rotate_y(HALF_PI);
        assert_relative_eq!(node.rotation().y, HALF_PI, epsilon = 1e-12);
        node.set_rotation(Euler::new(0.0, 0.0, HALF_PI, node.rotation().order));
        let rotated = Vector3::X.apply_quaternion(&node.quaternion());
        assert_relative_eq!(rotated, Vector3::Y, epsilon = 1e-12);
    }

    #[test]
    fn test_translate_on_rotated_axis() {
        let mut node = Node::group();
        node.rotate_y(HALF_PI);
        node.translate_z(2.0);
        assert_relative_eq!(node.position(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_apply_matrix4_decomposes() {
        let mut node = Node::group().with_position(Vector3::new(1.0, 0.0, 0.0));
        node.apply_matrix4(&Matrix4::make_scale(2.0, 2.0, 2.0));
        assert_relative_eq!(node.position(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(node.scale(), Vector3::splat(2.0), epsilon = 1e-12);
    }
}
