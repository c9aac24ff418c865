//! Indexed geometry built from named attributes

use std::collections::BTreeMap;

use crate::foundation::ids::GEOMETRY_IDS;
use crate::foundation::math::{
    Box3, MathResult, Matrix3, Matrix4, Quaternion, Sphere, Vector2, Vector3,
};

use super::attribute::{AttributeArray, BufferAttribute};

/// Index values at or above this need a 32-bit index buffer
pub const WIDE_INDEX_THRESHOLD: u32 = 65_535;

/// Range of indices (or vertices) drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    /// First index
    pub start: usize,
    /// Number of indices
    pub count: usize,
    /// Material slot for multi-material meshes
    pub material_index: usize,
}

/// Sub-range of the geometry submitted to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// First index
    pub start: usize,
    /// Number of indices; `None` draws to the end
    pub count: Option<usize>,
}

impl Default for DrawRange {
    fn default() -> Self {
        Self { start: 0, count: None }
    }
}

/// Vertex data, index, morph targets and draw groups for one mesh shape
#[derive(Debug, Clone)]
pub struct Geometry {
    id: u64,
    /// Debug name
    pub name: String,
    attributes: BTreeMap<String, BufferAttribute>,
    index: Option<BufferAttribute>,
    morph_attributes: BTreeMap<String, Vec<BufferAttribute>>,
    /// Morph targets hold offsets from the base attribute rather than absolute values
    pub morph_targets_relative: bool,
    groups: Vec<GeometryGroup>,
    draw_range: DrawRange,
    bounding_box: Option<Box3>,
    bounding_sphere: Option<Sphere>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    /// Create an empty geometry
    pub fn new() -> Self {
        Self {
            id: GEOMETRY_IDS.next_id(),
            name: String::new(),
            attributes: BTreeMap::new(),
            index: None,
            morph_attributes: BTreeMap::new(),
            morph_targets_relative: false,
            groups: Vec::new(),
            draw_range: DrawRange::default(),
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Builder: set the debug name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: &str, attribute: BufferAttribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Builder: set the index
    pub fn with_index(mut self, indices: &[u32]) -> Self {
        self.set_index(indices);
        self
    }

    /// Unique identity
    pub const fn id(&self) -> u64 {
        self.id
    }

    fn invalidate_bounds(&mut self) {
        self.bounding_box = None;
        self.bounding_sphere = None;
    }

    /// Insert or replace an attribute; cached bounds are invalidated
    pub fn set_attribute(&mut self, name: &str, attribute: BufferAttribute) -> &mut Self {
        self.attributes.insert(name.to_string(), attribute);
        self.invalidate_bounds();
        self
    }

    /// Attribute by name
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    /// Mutable attribute by name
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut BufferAttribute> {
        self.attributes.get_mut(name)
    }

    /// True when `name` is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Remove an attribute
    pub fn delete_attribute(&mut self, name: &str) -> Option<BufferAttribute> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.invalidate_bounds();
        }
        removed
    }

    /// All attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Vertex attributes for in-place edits
    pub fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut BufferAttribute)> {
        self.attributes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Set the index from `u32` values, choosing 16-bit storage when every value fits
    ///
    /// A 32-bit buffer is used when there are more than 65535 entries or any
    /// value is at least 65535.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_index(&mut self, indices: &[u32]) -> &mut Self {
        let wide = indices.len() > WIDE_INDEX_THRESHOLD as usize
            || indices.iter().any(|&i| i >= WIDE_INDEX_THRESHOLD);
        let array = if wide {
            AttributeArray::U32(indices.to_vec())
        } else {
            AttributeArray::U16(indices.iter().map(|&i| i as u16).collect())
        };
        self.index = Some(BufferAttribute::from_index_array(array));
        self.invalidate_bounds();
        self
    }

    /// Replace the index with a prepared attribute
    pub fn set_index_attribute(&mut self, index: Option<BufferAttribute>) -> &mut Self {
        self.index = index;
        self.invalidate_bounds();
        self
    }

    /// Index attribute, if indexed
    pub const fn index(&self) -> Option<&BufferAttribute> {
        self.index.as_ref()
    }

    /// Index attribute for in-place edits
    pub fn index_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.index.as_mut()
    }

    /// Index values widened to `u32`
    pub fn index_values(&self) -> Option<Vec<u32>> {
        self.index.as_ref().and_then(|i| i.array().to_u32_vec())
    }

    /// Set the morph targets for attribute `name`
    pub fn set_morph_attribute(&mut self, name: &str, targets: Vec<BufferAttribute>) -> &mut Self {
        self.morph_attributes.insert(name.to_string(), targets);
        self.invalidate_bounds();
        self
    }

    /// Morph targets for attribute `name`
    pub fn morph_attribute(&self, name: &str) -> Option<&[BufferAttribute]> {
        self.morph_attributes.get(name).map(Vec::as_slice)
    }

    /// Morph targets for attribute `name`, for in-place edits
    pub fn morph_attribute_mut(&mut self, name: &str) -> Option<&mut [BufferAttribute]> {
        self.morph_attributes.get_mut(name).map(Vec::as_mut_slice)
    }

    /// All morph attributes in name order
    pub fn morph_attributes(&self) -> impl Iterator<Item = (&str, &[BufferAttribute])> {
        self.morph_attributes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Largest morph target count over all morph attributes
    pub fn morph_target_count(&self) -> usize {
        self.morph_attributes.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Append a draw group
    pub fn add_group(&mut self, start: usize, count: usize, material_index: usize) -> &mut Self {
        self.groups.push(GeometryGroup {
            start,
            count,
            material_index,
        });
        self
    }

    /// Remove all draw groups
    pub fn clear_groups(&mut self) -> &mut Self {
        self.groups.clear();
        self
    }

    /// Draw groups in insertion order
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    /// Restrict drawing to `count` elements starting at `start`
    pub fn set_draw_range(&mut self, start: usize, count: Option<usize>) -> &mut Self {
        self.draw_range = DrawRange { start, count };
        self
    }

    /// Current draw range
    pub const fn draw_range(&self) -> DrawRange {
        self.draw_range
    }

    /// Number of drawable elements: index count when indexed, else vertex count
    pub fn element_count(&self) -> usize {
        match &self.index {
            Some(index) => index.count(),
            None => self.attribute("position").map_or(0, BufferAttribute::count),
        }
    }

    /// Cached bounding box, if computed
    pub const fn bounding_box(&self) -> Option<&Box3> {
        self.bounding_box.as_ref()
    }

    /// Cached bounding sphere, if computed
    pub const fn bounding_sphere(&self) -> Option<&Sphere> {
        self.bounding_sphere.as_ref()
    }

    /// Bounding box, computing it first if needed
    pub fn ensure_bounding_box(&mut self) -> Box3 {
        match self.bounding_box {
            Some(b) => b,
            None => self.compute_bounding_box(),
        }
    }

    /// Bounding sphere, computing it first if needed
    pub fn ensure_bounding_sphere(&mut self) -> Sphere {
        match self.bounding_sphere {
            Some(s) => s,
            None => self.compute_bounding_sphere(),
        }
    }

    /// Recompute the bounding box from positions, widened by morph targets
    ///
    /// A geometry without positions gets the empty box.
    pub fn compute_bounding_box(&mut self) -> Box3 {
        let Some(position) = self.attributes.get("position") else {
            log::debug!("Geometry '{}' has no position attribute; bounding box is empty", self.name);
            self.bounding_box = Some(Box3::EMPTY);
            return Box3::EMPTY;
        };

        let mut bounds = Box3::from_points(&position.to_vector3s());

        if let Some(targets) = self.morph_attributes.get("position") {
            for target in targets {
                let extent = Box3::from_points(&target.to_vector3s());
                if self.morph_targets_relative {
                    bounds.expand_by_point(&(bounds.min + extent.min));
                    bounds.expand_by_point(&(bounds.max + extent.max));
                } else {
                    bounds.expand_by_point(&extent.min);
                    bounds.expand_by_point(&extent.max);
                }
            }
        }

        if !bounds.is_empty() && !(bounds.min.is_finite() && bounds.max.is_finite()) {
            log::error!(
                "Geometry '{}' bounding box has non-finite values; position data is likely NaN",
                self.name
            );
        }

        self.bounding_box = Some(bounds);
        bounds
    }

    /// Recompute the bounding sphere around the box center
    pub fn compute_bounding_sphere(&mut self) -> Sphere {
        let Some(position) = self.attributes.get("position") else {
            self.bounding_sphere = Some(Sphere::EMPTY);
            return Sphere::EMPTY;
        };
        let points = position.to_vector3s();
        let mut bounds = Box3::from_points(&points);

        let morph_targets: Vec<Vec<Vector3>> = self
            .morph_attributes
            .get("position")
            .map(|targets| targets.iter().map(BufferAttribute::to_vector3s).collect())
            .unwrap_or_default();

        for target in &morph_targets {
            let extent = Box3::from_points(target);
            if self.morph_targets_relative {
                bounds.expand_by_point(&(bounds.min + extent.min));
                bounds.expand_by_point(&(bounds.max + extent.max));
            } else {
                bounds.expand_by_point(&extent.min);
                bounds.expand_by_point(&extent.max);
            }
        }

        let center = bounds.center();
        let mut max_radius_sq = points
            .iter()
            .map(|p| center.distance_to_squared(p))
            .fold(0.0, f64::max);

        for target in &morph_targets {
            for (i, offset) in target.iter().enumerate() {
                let p = if self.morph_targets_relative {
                    points.get(i).map_or(*offset, |base| *base + *offset)
                } else {
                    *offset
                };
                max_radius_sq = max_radius_sq.max(center.distance_to_squared(&p));
            }
        }

        let sphere = if points.is_empty() {
            Sphere::EMPTY
        } else {
            Sphere::new(center, max_radius_sq.sqrt())
        };
        if sphere.radius.is_nan() {
            log::error!("Geometry '{}' bounding sphere radius is NaN", self.name);
        }
        self.bounding_sphere = Some(sphere);
        sphere
    }

    /// Triangle vertex indices honoring the index buffer
    fn triangles(&self) -> Vec<[usize; 3]> {
        let indices: Vec<usize> = match self.index_values() {
            Some(values) => values.into_iter().map(|i| i as usize).collect(),
            None => (0..self.attribute("position").map_or(0, BufferAttribute::count)).collect(),
        };
        indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect()
    }

    /// Recompute smooth per-vertex normals from triangle faces
    ///
    /// Silently skipped when there is no position attribute.
    pub fn compute_vertex_normals(&mut self) -> MathResult<()> {
        let Some(position) = self.attributes.get("position") else {
            log::debug!("Skipping vertex normals for '{}': no position attribute", self.name);
            return Ok(());
        };
        let positions = position.to_vector3s();
        let mut normals = vec![Vector3::ZERO; positions.len()];

        for [a, b, c] in self.triangles() {
            let (Some(pa), Some(pb), Some(pc)) = (positions.get(a), positions.get(b), positions.get(c))
            else {
                continue;
            };
            let face = (*pc - *pb).cross(&(*pa - *pb));
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        let mut attribute = match self.attributes.remove("normal") {
            Some(existing) if existing.count() == positions.len() && existing.item_size() == 3 => existing,
            _ => BufferAttribute::zeroed(positions.len(), 3),
        };
        for (i, n) in normals.iter().enumerate() {
            attribute.set_vector3(i, &n.normalize())?;
        }
        attribute.needs_update();
        self.attributes.insert("normal".to_string(), attribute);
        Ok(())
    }

    /// Renormalize the normal attribute in place
    pub fn normalize_normals(&mut self) -> MathResult<()> {
        if let Some(normal) = self.attributes.get_mut("normal") {
            for i in 0..normal.count() {
                let n = normal.get_vector3(i)?.normalize();
                normal.set_vector3(i, &n)?;
            }
            normal.needs_update();
        }
        Ok(())
    }

    /// Compute per-vertex tangents (xyz + handedness in w) for normal mapping
    ///
    /// Requires an index plus position, normal and uv attributes. When any is
    /// missing the call is a silent no-op.
    pub fn compute_tangents(&mut self) -> MathResult<()> {
        let (Some(indices), Some(position), Some(normal), Some(uv)) = (
            self.index_values(),
            self.attributes.get("position"),
            self.attributes.get("normal"),
            self.attributes.get("uv"),
        ) else {
            log::debug!(
                "Skipping tangents for '{}': index, position, normal and uv are required",
                self.name
            );
            return Ok(());
        };

        let positions = position.to_vector3s();
        let normals = normal.to_vector3s();
        let uvs: Vec<Vector2> = (0..uv.count()).filter_map(|i| uv.get_vector2(i).ok()).collect();
        let vertex_count = positions.len();

        let mut tan1 = vec![Vector3::ZERO; vertex_count];
        let mut tan2 = vec![Vector3::ZERO; vertex_count];

        let ranges: Vec<(usize, usize)> = if self.groups.is_empty() {
            vec![(0, indices.len())]
        } else {
            self.groups.iter().map(|g| (g.start, g.count)).collect()
        };

        let lookup = |i: u32| -> Option<(usize, Vector3, Vector2)> {
            let i = i as usize;
            Some((i, *positions.get(i)?, *uvs.get(i)?))
        };

        for &(start, count) in &ranges {
            let end = (start + count).min(indices.len());
            for tri in indices.get(start..end).unwrap_or_default().chunks_exact(3) {
                let (Some((a, va, ua)), Some((b, vb, ub)), Some((c, vc, uc))) =
                    (lookup(tri[0]), lookup(tri[1]), lookup(tri[2]))
                else {
                    continue;
                };
                let e1 = vb - va;
                let e2 = vc - va;
                let d1 = ub - ua;
                let d2 = uc - ua;
                let denom = d1.x * d2.y - d2.x * d1.y;
                if !denom.is_finite() || denom == 0.0 {
                    continue;
                }
                let r = 1.0 / denom;
                let sdir = (e1 * d2.y - e2 * d1.y) * r;
                let tdir = (e2 * d1.x - e1 * d2.x) * r;
                for v in [a, b, c] {
                    tan1[v] += sdir;
                    tan2[v] += tdir;
                }
            }
        }

        let mut tangent = BufferAttribute::zeroed(vertex_count, 4);
        for i in 0..vertex_count {
            let n = normals.get(i).copied().unwrap_or(Vector3::Z);
            let t = tan1[i];
            let ortho = (t - n * n.dot(&t)).normalize();
            let handedness = if n.cross(&t).dot(&tan2[i]) < 0.0 { -1.0 } else { 1.0 };
            tangent.set_xyzw(i, ortho.x, ortho.y, ortho.z, handedness)?;
        }
        self.attributes.insert("tangent".to_string(), tangent);
        Ok(())
    }

    /// Bake a transform into positions, normals and tangents
    pub fn apply_matrix4(&mut self, m: &Matrix4) -> MathResult<()> {
        if let Some(position) = self.attributes.get_mut("position") {
            position.apply_matrix4(m)?;
        }
        if let Some(normal) = self.attributes.get_mut("normal") {
            normal.apply_normal_matrix(&Matrix3::normal_matrix(m))?;
        }
        if let Some(tangent) = self.attributes.get_mut("tangent") {
            tangent.transform_direction(m)?;
        }
        if self.bounding_box.is_some() {
            self.compute_bounding_box();
        }
        if self.bounding_sphere.is_some() {
            self.compute_bounding_sphere();
        }
        Ok(())
    }

    /// Bake a rotation
    pub fn apply_quaternion(&mut self, q: &Quaternion) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_rotation_from_quaternion(q))
    }

    /// Bake a translation
    pub fn translate(&mut self, x: f64, y: f64, z: f64) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_translation(x, y, z))
    }

    /// Bake a scale
    pub fn scale(&mut self, x: f64, y: f64, z: f64) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_scale(x, y, z))
    }

    /// Bake a rotation about X
    pub fn rotate_x(&mut self, angle: f64) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_rotation_x(angle))
    }

    /// Bake a rotation about Y
    pub fn rotate_y(&mut self, angle: f64) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_rotation_y(angle))
    }

    /// Bake a rotation about Z
    pub fn rotate_z(&mut self, angle: f64) -> MathResult<()> {
        self.apply_matrix4(&Matrix4::make_rotation_z(angle))
    }

    /// Translate so the bounding box is centered on the origin
    pub fn center(&mut self) -> MathResult<Vector3> {
        let offset = -self.compute_bounding_box().center();
        self.translate(offset.x, offset.y, offset.z)?;
        Ok(offset)
    }

    /// Expanded copy where every index becomes its own vertex
    ///
    /// A non-indexed geometry is returned as a copy.
    pub fn to_non_indexed(&self) -> Self {
        let Some(indices) = self.index_values() else {
            log::warn!("Geometry '{}' is already non-indexed", self.name);
            return self.clone();
        };

        let expand = |attr: &BufferAttribute| -> BufferAttribute {
            let mut out = attr.clone();
            out.set_array(attr.array().gather(&indices, attr.item_size()));
            out
        };

        let mut result = Self::new().with_name(self.name.clone());
        for (name, attr) in &self.attributes {
            result.attributes.insert(name.clone(), expand(attr));
        }
        for (name, targets) in &self.morph_attributes {
            result
                .morph_attributes
                .insert(name.clone(), targets.iter().map(expand).collect());
        }
        result.morph_targets_relative = self.morph_targets_relative;
        result.groups = self.groups.clone();
        result.draw_range = self.draw_range;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::attribute::ComponentType;
    use crate::geometry::primitives::{box_geometry, plane_geometry};
    use approx::assert_relative_eq;

    fn triangle() -> Geometry {
        Geometry::new()
            .with_attribute(
                "position",
                BufferAttribute::from_vector3s(&[Vector3::ZERO, Vector3::X, Vector3::Y]),
            )
            .with_index(&[0, 1, 2])
    }

    #[test]
    fn test_unit_cube_bounds() {
        let mut cube = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
        let bounds = cube.compute_bounding_box();
        assert_relative_eq!(bounds.min, Vector3::splat(-0.5));
        assert_relative_eq!(bounds.max, Vector3::splat(0.5));
        let sphere = cube.compute_bounding_sphere();
        assert_relative_eq!(sphere.radius, 0.75_f64.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_index_width_selection() {
        let mut g = Geometry::new();
        g.set_index(&[0, 1, 65_534]);
        assert_eq!(g.index().map(BufferAttribute::component_type), Some(ComponentType::U16));
        g.set_index(&[0, 1, 65_535]);
        assert_eq!(g.index().map(BufferAttribute::component_type), Some(ComponentType::U32));
        let many: Vec<u32> = (0..70_000).map(|i| i % 3).collect();
        g.set_index(&many);
        assert_eq!(g.index().map(BufferAttribute::component_type), Some(ComponentType::U32));
    }

    #[test]
    fn test_attribute_replacement_invalidates_bounds() {
        let mut g = triangle();
        g.compute_bounding_box();
        assert!(g.bounding_box().is_some());
        g.set_attribute("position", BufferAttribute::from_vector3s(&[Vector3::ONE]));
        assert!(g.bounding_box().is_none());
    }

    #[test]
    fn test_morph_targets_widen_bounds() {
        let mut g = triangle();
        g.set_morph_attribute(
            "position",
            vec![BufferAttribute::from_vector3s(&[
                Vector3::new(0.0, 0.0, 2.0),
                Vector3::ZERO,
                Vector3::ZERO,
            ])],
        );
        assert_relative_eq!(g.compute_bounding_box().max.z, 2.0);

        g.morph_targets_relative = true;
        assert_relative_eq!(g.compute_bounding_box().max.z, 2.0);
        assert_relative_eq!(g.compute_bounding_box().max.x, 1.0);
    }

    #[test]
    fn test_vertex_normals_face_up() {
        let mut g = triangle();
        assert!(g.compute_vertex_normals().is_ok());
        let normal = g.attribute("normal").map(|n| n.get_vector3(0));
        assert_eq!(normal, Some(Ok(Vector3::Z)));
    }

    #[test]
    fn test_tangents_skip_without_uv() {
        let mut g = triangle();
        assert!(g.compute_vertex_normals().is_ok());
        assert!(g.compute_tangents().is_ok());
        assert!(!g.has_attribute("tangent"));
    }

    #[test]
    fn test_tangents_skip_without_index() {
        let mut g = plane_geometry(1.0, 1.0, 1, 1).to_non_indexed();
        assert!(g.compute_tangents().is_ok());
        assert!(!g.has_attribute("tangent"));
    }

    #[test]
    fn test_tangents_on_plane_follow_u() {
        let mut g = plane_geometry(2.0, 2.0, 1, 1);
        assert!(g.compute_tangents().is_ok());
        let tangent = g.attribute("tangent").map(|t| t.get_vector4(0));
        assert!(matches!(tangent, Some(Ok(_))));
        if let Some(Ok(t)) = tangent {
            assert_relative_eq!(t.x, 1.0, epsilon = 1e-6);
            assert_relative_eq!(t.w.abs(), 1.0);
        }
    }

    #[test]
    fn test_to_non_indexed_expands() {
        let cube = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
        let flat = cube.to_non_indexed();
        assert!(flat.index().is_none());
        assert_eq!(flat.attribute("position").map(BufferAttribute::count), Some(36));
        assert_eq!(flat.groups().len(), 6);
    }

    #[test]
    fn test_center_moves_box_to_origin() {
        let mut g = triangle();
        assert!(g.translate(5.0, 0.0, 0.0).is_ok());
        assert!(g.center().is_ok());
        let b = g.compute_bounding_box();
        assert_relative_eq!(b.center(), Vector3::ZERO, epsilon = 1e-6);
    }

    #[test]
    fn test_draw_range_and_groups() {
        let mut g = triangle();
        g.set_draw_range(0, Some(3));
        g.add_group(0, 3, 1);
        assert_eq!(g.draw_range().count, Some(3));
        assert_eq!(g.groups()[0].material_index, 1);
        g.clear_groups();
        assert!(g.groups().is_empty());
    }
}
