//! Drawable mesh payload: geometry and material references plus per-object
//! morph, instancing and skinning state

use crate::assets::{GeometryHandle, MaterialHandle};
use crate::foundation::math::{Color, MathResult, Matrix4, Sphere};
use crate::geometry::{BufferAttribute, Usage};

use super::node::NodeId;

/// Material assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialSlot {
    /// One material for the whole geometry
    Single(MaterialHandle),
    /// One material per geometry group, indexed by `material_index`
    Multi(Vec<MaterialHandle>),
}

impl MaterialSlot {
    /// Material for a geometry group (`None` for the ungrouped draw)
    pub fn for_group(&self, material_index: Option<usize>) -> Option<MaterialHandle> {
        match (self, material_index) {
            (Self::Single(handle), _) => Some(*handle),
            (Self::Multi(handles), Some(index)) => handles.get(index).copied(),
            (Self::Multi(handles), None) => handles.first().copied(),
        }
    }

    /// Every referenced material
    pub fn handles(&self) -> Vec<MaterialHandle> {
        match self {
            Self::Single(handle) => vec![*handle],
            Self::Multi(handles) => handles.clone(),
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Independent triangles
    #[default]
    Triangles,
    /// Independent line segments
    Lines,
    /// Connected line strip
    LineStrip,
    /// Closed line loop
    LineLoop,
    /// Point sprites
    Points,
}

/// Per-instance transforms (and optional colors) for instanced drawing
#[derive(Debug, Clone)]
pub struct Instancing {
    count: usize,
    matrices: BufferAttribute,
    colors: Option<BufferAttribute>,
    bounding_sphere: Option<Sphere>,
}

impl Instancing {
    /// `count` instances, all with identity transforms
    pub fn new(count: usize) -> Self {
        let identity: Vec<f32> = Matrix4::IDENTITY.to_f32_array().to_vec();
        let data = identity.iter().copied().cycle().take(count * 16).collect();
        Self {
            count,
            matrices: BufferAttribute::from_f32(data, 16).with_usage(Usage::Dynamic).with_divisor(1),
            colors: None,
            bounding_sphere: None,
        }
    }

    /// Instance count
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Draw only the first `count` instances (clamped to the allocated amount)
    pub fn set_count(&mut self, count: usize) {
        self.count = count.min(self.matrices.count());
    }

    /// Instance matrix buffer
    pub const fn matrices(&self) -> &BufferAttribute {
        &self.matrices
    }

    /// Instance color buffer
    pub const fn colors(&self) -> Option<&BufferAttribute> {
        self.colors.as_ref()
    }

    /// Instance matrix buffer for in-place edits
    pub fn matrices_mut(&mut self) -> &mut BufferAttribute {
        &mut self.matrices
    }

    /// Instance color buffer for in-place edits
    pub fn colors_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.colors.as_mut()
    }

    /// Transform of instance `index`
    pub fn matrix_at(&self, index: usize) -> MathResult<Matrix4> {
        let mut elements = [0.0; 16];
        for (c, e) in elements.iter_mut().enumerate() {
            *e = self.matrices.get_component(index, c)?;
        }
        Ok(Matrix4 { elements })
    }

    /// Set the transform of instance `index`; invalidates the instance bounds
    pub fn set_matrix_at(&mut self, index: usize, m: &Matrix4) -> MathResult<()> {
        for (c, e) in m.elements.iter().enumerate() {
            self.matrices.set_component(index, c, *e)?;
        }
        self.matrices.needs_update();
        self.bounding_sphere = None;
        Ok(())
    }

    /// Set the color of instance `index`, allocating the color buffer on first use
    pub fn set_color_at(&mut self, index: usize, color: &Color) -> MathResult<()> {
        let allocated = self.matrices.count();
        let colors = self.colors.get_or_insert_with(|| {
            BufferAttribute::from_f32(vec![1.0; allocated * 3], 3).with_usage(Usage::Dynamic).with_divisor(1)
        });
        colors.set_xyz(index, color.r, color.g, color.b)?;
        colors.needs_update();
        Ok(())
    }

    /// Cached bounds of all instances
    pub const fn bounding_sphere(&self) -> Option<&Sphere> {
        self.bounding_sphere.as_ref()
    }

    /// Union of the geometry bounds placed at every active instance
    pub fn compute_bounding_sphere(&mut self, geometry_sphere: &Sphere) -> MathResult<Sphere> {
        let mut bounds = Sphere::EMPTY;
        for i in 0..self.count {
            let placed = geometry_sphere.apply_matrix4(&self.matrix_at(i)?);
            bounds = bounds.union(&placed);
        }
        self.bounding_sphere = Some(bounds);
        Ok(bounds)
    }
}

/// Bones and bind pose for skinned meshes
#[derive(Debug, Clone)]
pub struct Skin {
    /// Bone nodes in joint-index order
    pub bones: Vec<NodeId>,
    /// Inverse bind matrices, one per bone
    pub bone_inverses: Vec<Matrix4>,
    bind_matrix: Matrix4,
    bind_matrix_inverse: Matrix4,
    bone_matrices: Vec<f32>,
    version: u64,
}

impl Skin {
    /// Skin over `bones` with their inverse bind matrices
    ///
    /// Missing inverses are filled with identity.
    pub fn new(bones: Vec<NodeId>, mut bone_inverses: Vec<Matrix4>) -> Self {
        bone_inverses.resize(bones.len(), Matrix4::IDENTITY);
        let bone_matrices = vec![0.0; bones.len() * 16];
        Self {
            bones,
            bone_inverses,
            bind_matrix: Matrix4::IDENTITY,
            bind_matrix_inverse: Matrix4::IDENTITY,
            bone_matrices,
            version: 0,
        }
    }

    /// Set the mesh's bind-time world matrix
    pub fn bind(&mut self, bind_matrix: Matrix4) {
        self.bind_matrix = bind_matrix;
        self.bind_matrix_inverse = bind_matrix.invert();
    }

    /// Bind-time world matrix of the mesh
    pub const fn bind_matrix(&self) -> &Matrix4 {
        &self.bind_matrix
    }

    /// Inverse bind-time world matrix
    pub const fn bind_matrix_inverse(&self) -> &Matrix4 {
        &self.bind_matrix_inverse
    }

    /// Flattened bone matrices for upload, 16 floats per bone
    pub fn bone_matrices(&self) -> &[f32] {
        &self.bone_matrices
    }

    /// Bumped whenever bone matrices are recomputed
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Recompute `bone_world * bone_inverse` for every bone
    ///
    /// `bone_worlds` yields world matrices in bone order; a missing bone keeps
    /// the identity so the vertex stays at its bind pose.
    pub fn update(&mut self, bone_worlds: &[Option<Matrix4>]) {
        for (i, inverse) in self.bone_inverses.iter().enumerate() {
            let world = bone_worlds.get(i).copied().flatten();
            let m = world.map_or(Matrix4::IDENTITY, |w| w.multiply(inverse));
            if let Some(slot) = self.bone_matrices.get_mut(i * 16..(i + 1) * 16) {
                slot.copy_from_slice(&m.to_f32_array());
            }
        }
        self.version += 1;
    }
}

/// Mesh payload of a scene node
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Geometry in the asset store
    pub geometry: GeometryHandle,
    /// Material assignment
    pub material: MaterialSlot,
    /// Primitive topology
    pub draw_mode: DrawMode,
    /// Weights for the geometry's morph targets
    pub morph_target_influences: Vec<f64>,
    /// Instanced drawing
    pub instancing: Option<Instancing>,
    /// Skinning
    pub skin: Option<Skin>,
}

impl Mesh {
    /// Triangle mesh with one material
    pub fn new(geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            geometry,
            material: MaterialSlot::Single(material),
            draw_mode: DrawMode::Triangles,
            morph_target_influences: Vec::new(),
            instancing: None,
            skin: None,
        }
    }

    /// Triangle mesh with one material per geometry group
    pub fn multi(geometry: GeometryHandle, materials: Vec<MaterialHandle>) -> Self {
        Self {
            material: MaterialSlot::Multi(materials),
            ..Self::new(geometry, MaterialHandle::default())
        }
    }

    /// Builder: set the topology
    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    /// Builder: enable instancing
    pub fn with_instancing(mut self, instancing: Instancing) -> Self {
        self.instancing = Some(instancing);
        self
    }

    /// Builder: attach a skin
    pub fn with_skin(mut self, skin: Skin) -> Self {
        self.skin = Some(skin);
        self
    }

    /// Builder: morph target weights
    pub fn with_morph_influences(mut self, influences: Vec<f64>) -> Self {
        self.morph_target_influences = influences;
        self
    }

    /// True when drawn with instancing
    pub const fn is_instanced(&self) -> bool {
        self.instancing.is_some()
    }

    /// Active morph influences with their target indices, strongest first
    ///
    /// At most `limit` targets are returned; zero weights are dropped.
    pub fn active_morph_influences(&self, limit: usize) -> Vec<(usize, f64)> {
        let mut active: Vec<(usize, f64)> = self
            .morph_target_influences
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, w)| *w != 0.0)
            .collect();
        active.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
        active.truncate(limit);
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vector3;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    #[test]
    fn test_instance_matrices_roundtrip() {
        let mut instancing = Instancing::new(3);
        assert_eq!(instancing.matrix_at(2), Ok(Matrix4::IDENTITY));
        let m = Matrix4::make_translation(1.0, 2.0, 3.0);
        assert!(instancing.set_matrix_at(1, &m).is_ok());
        assert_eq!(instancing.matrix_at(1), Ok(m));
        assert!(instancing.set_matrix_at(3, &m).is_err());
        assert_eq!(instancing.matrices().version(), 1);
    }

    #[test]
    fn test_instance_bounds_cover_every_instance() {
        let mut instancing = Instancing::new(2);
        assert!(instancing
            .set_matrix_at(1, &Matrix4::make_translation(10.0, 0.0, 0.0))
            .is_ok());
        let unit = Sphere::new(Vector3::ZERO, 1.0);
        let bounds = instancing.compute_bounding_sphere(&unit).unwrap_or(Sphere::EMPTY);
        assert_relative_eq!(bounds.center, Vector3::new(5.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(bounds.radius, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_instance_colors_allocate_lazily() {
        let mut instancing = Instancing::new(2);
        assert!(instancing.colors().is_none());
        assert!(instancing.set_color_at(0, &Color::BLACK).is_ok());
        assert_eq!(instancing.colors().map(BufferAttribute::count), Some(2));
    }

    #[test]
    fn test_skin_update() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let bone = nodes.insert(());
        let inverse = Matrix4::make_translation(-1.0, 0.0, 0.0);
        let mut skin = Skin::new(vec![bone], vec![inverse]);
        skin.update(&[Some(Matrix4::make_translation(1.0, 0.0, 0.0))]);
        assert_eq!(skin.version(), 1);
        assert_eq!(&skin.bone_matrices()[..16], &Matrix4::IDENTITY.to_f32_array());
    }

    #[test]
    fn test_morph_influences_strongest_first() {
        let mut geometries: SlotMap<GeometryHandle, ()> = SlotMap::with_key();
        let mesh = Mesh::new(geometries.insert(()), MaterialHandle::default())
            .with_morph_influences(vec![0.1, 0.0, -0.9, 0.5]);
        assert_eq!(mesh.active_morph_influences(2), vec![(2, -0.9), (3, 0.5)]);
    }

    #[test]
    fn test_multi_material_lookup() {
        let mut materials: SlotMap<MaterialHandle, ()> = SlotMap::with_key();
        let a = materials.insert(());
        let b = materials.insert(());
        let slot = MaterialSlot::Multi(vec![a, b]);
        assert_eq!(slot.for_group(Some(1)), Some(b));
        assert_eq!(slot.for_group(Some(2)), None);
        assert_eq!(slot.for_group(None), Some(a));
    }
}
