//! Built-in parametric shapes
//!
//! All builders produce indexed geometry with `position`, `normal` and `uv`
//! attributes. Segment counts below one are clamped to one.

use std::f64::consts::PI;

use super::attribute::BufferAttribute;
use super::geometry::Geometry;

#[derive(Default)]
struct MeshBuffers {
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
}

impl MeshBuffers {
    #[allow(clippy::cast_possible_truncation)]
    fn push_vertex(&mut self, position: [f64; 3], normal: [f64; 3], uv: [f64; 2]) {
        self.positions.extend(position.iter().map(|&v| v as f32));
        self.normals.extend(normal.iter().map(|&v| v as f32));
        self.uvs.extend(uv.iter().map(|&v| v as f32));
    }

    fn vertex_count(&self) -> u32 {
        u32::try_from(self.positions.len() / 3).unwrap_or(u32::MAX)
    }

    fn into_geometry(self, name: &str) -> Geometry {
        Geometry::new()
            .with_name(name)
            .with_attribute("position", BufferAttribute::from_f32(self.positions, 3))
            .with_attribute("normal", BufferAttribute::from_f32(self.normals, 3))
            .with_attribute("uv", BufferAttribute::from_f32(self.uvs, 2))
            .with_index(&self.indices)
    }
}

/// Emit the two triangles of every grid cell, with `row_len` vertices per row
fn grid_indices(indices: &mut Vec<u32>, base: u32, grid_x: u32, grid_y: u32) {
    let row_len = grid_x + 1;
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = base + ix + row_len * iy;
            let b = base + ix + row_len * (iy + 1);
            let c = base + (ix + 1) + row_len * (iy + 1);
            let d = base + (ix + 1) + row_len * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}

/// One face of a box; `u`, `v`, `w` are axis indices
struct BoxFace {
    u: usize,
    v: usize,
    w: usize,
    u_dir: f64,
    v_dir: f64,
    width: f64,
    height: f64,
    depth: f64,
    grid_x: u32,
    grid_y: u32,
}

/// Axis-aligned box centered on the origin
///
/// Faces are emitted in +X, -X, +Y, -Y, +Z, -Z order, each as its own group
/// with material index 0 through 5.
pub fn box_geometry(
    width: f64,
    height: f64,
    depth: f64,
    width_segments: u32,
    height_segments: u32,
    depth_segments: u32,
) -> Geometry {
    let ws = width_segments.max(1);
    let hs = height_segments.max(1);
    let ds = depth_segments.max(1);

    let faces = [
        BoxFace { u: 2, v: 1, w: 0, u_dir: -1.0, v_dir: -1.0, width: depth, height, depth: width, grid_x: ds, grid_y: hs },
        BoxFace { u: 2, v: 1, w: 0, u_dir: 1.0, v_dir: -1.0, width: depth, height, depth: -width, grid_x: ds, grid_y: hs },
        BoxFace { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: 1.0, width, height: depth, depth: height, grid_x: ws, grid_y: ds },
        BoxFace { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: -1.0, width, height: depth, depth: -height, grid_x: ws, grid_y: ds },
        BoxFace { u: 0, v: 1, w: 2, u_dir: 1.0, v_dir: -1.0, width, height, depth, grid_x: ws, grid_y: hs },
        BoxFace { u: 0, v: 1, w: 2, u_dir: -1.0, v_dir: -1.0, width, height, depth: -depth, grid_x: ws, grid_y: hs },
    ];

    let mut buffers = MeshBuffers::default();
    let mut groups = Vec::with_capacity(faces.len());
    let mut group_start = 0;

    for (material_index, face) in faces.iter().enumerate() {
        let base = buffers.vertex_count();
        let first_index = buffers.indices.len();
        let segment_width = face.width / f64::from(face.grid_x);
        let segment_height = face.height / f64::from(face.grid_y);
        let facing = if face.depth > 0.0 { 1.0 } else { -1.0 };

        for iy in 0..=face.grid_y {
            let y = f64::from(iy) * segment_height - face.height / 2.0;
            for ix in 0..=face.grid_x {
                let x = f64::from(ix) * segment_width - face.width / 2.0;
                let mut position = [0.0; 3];
                position[face.u] = x * face.u_dir;
                position[face.v] = y * face.v_dir;
                position[face.w] = face.depth / 2.0;
                let mut normal = [0.0; 3];
                normal[face.w] = facing;
                let uv = [
                    f64::from(ix) / f64::from(face.grid_x),
                    1.0 - f64::from(iy) / f64::from(face.grid_y),
                ];
                buffers.push_vertex(position, normal, uv);
            }
        }

        grid_indices(&mut buffers.indices, base, face.grid_x, face.grid_y);
        let count = buffers.indices.len() - first_index;
        groups.push((group_start, count, material_index));
        group_start += count;
    }

    let mut geometry = buffers.into_geometry("box");
    for (start, count, material_index) in groups {
        geometry.add_group(start, count, material_index);
    }
    geometry
}

/// Rectangle in the XY plane facing +Z
pub fn plane_geometry(width: f64, height: f64, width_segments: u32, height_segments: u32) -> Geometry {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let segment_width = width / f64::from(grid_x);
    let segment_height = height / f64::from(grid_y);

    let mut buffers = MeshBuffers::default();
    for iy in 0..=grid_y {
        let y = f64::from(iy) * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = f64::from(ix) * segment_width - width / 2.0;
            buffers.push_vertex(
                [x, -y, 0.0],
                [0.0, 0.0, 1.0],
                [f64::from(ix) / f64::from(grid_x), 1.0 - f64::from(iy) / f64::from(grid_y)],
            );
        }
    }
    grid_indices(&mut buffers.indices, 0, grid_x, grid_y);
    buffers.into_geometry("plane")
}

/// Sphere parameters; angles in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereParams {
    /// Radius
    pub radius: f64,
    /// Horizontal segments (at least 3)
    pub width_segments: u32,
    /// Vertical segments (at least 2)
    pub height_segments: u32,
    /// Horizontal start angle
    pub phi_start: f64,
    /// Horizontal sweep
    pub phi_length: f64,
    /// Vertical start angle
    pub theta_start: f64,
    /// Vertical sweep
    pub theta_length: f64,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 32,
            height_segments: 16,
            phi_start: 0.0,
            phi_length: PI * 2.0,
            theta_start: 0.0,
            theta_length: PI,
        }
    }
}

/// Full UV sphere
pub fn sphere_geometry(radius: f64, width_segments: u32, height_segments: u32) -> Geometry {
    sphere_geometry_with(&SphereParams {
        radius,
        width_segments,
        height_segments,
        ..SphereParams::default()
    })
}

/// UV sphere, optionally a partial sweep
///
/// Pole vertices get their u shifted half a segment so each pole triangle
/// samples the middle of its texel column. Degenerate pole triangles are
/// not emitted.
pub fn sphere_geometry_with(params: &SphereParams) -> Geometry {
    let width_segments = params.width_segments.max(3);
    let height_segments = params.height_segments.max(2);
    let theta_end = (params.theta_start + params.theta_length).min(PI);

    let mut buffers = MeshBuffers::default();
    let mut grid: Vec<Vec<u32>> = Vec::with_capacity(height_segments as usize + 1);
    let mut index = 0;

    for iy in 0..=height_segments {
        let v = f64::from(iy) / f64::from(height_segments);
        let u_offset = if iy == 0 && params.theta_start == 0.0 {
            0.5 / f64::from(width_segments)
        } else if iy == height_segments && (theta_end - PI).abs() < f64::EPSILON {
            -0.5 / f64::from(width_segments)
        } else {
            0.0
        };

        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = f64::from(ix) / f64::from(width_segments);
            let phi = params.phi_start + u * params.phi_length;
            let theta = params.theta_start + v * params.theta_length;
            let position = [
                -params.radius * phi.cos() * theta.sin(),
                params.radius * theta.cos(),
                params.radius * phi.sin() * theta.sin(),
            ];
            let length = position.iter().map(|c| c * c).sum::<f64>().sqrt();
            let normal = if length > 0.0 {
                [position[0] / length, position[1] / length, position[2] / length]
            } else {
                [0.0; 3]
            };
            buffers.push_vertex(position, normal, [u + u_offset, 1.0 - v]);
            row.push(index);
            index += 1;
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 || params.theta_start > 0.0 {
                buffers.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 || theta_end < PI {
                buffers.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    buffers.into_geometry("sphere")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vector3;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_counts_and_groups() {
        let cube = box_geometry(2.0, 2.0, 2.0, 1, 1, 1);
        assert_eq!(cube.attribute("position").map(BufferAttribute::count), Some(24));
        assert_eq!(cube.index().map(BufferAttribute::count), Some(36));
        let groups = cube.groups();
        assert_eq!(groups.len(), 6);
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.material_index, i);
            assert_eq!(group.start, i * 6);
            assert_eq!(group.count, 6);
        }
    }

    #[test]
    fn test_box_first_face_points_positive_x() {
        let cube = box_geometry(1.0, 1.0, 1.0, 2, 2, 2);
        let normal = cube.attribute("normal").map(|n| n.get_vector3(0));
        assert_eq!(normal, Some(Ok(Vector3::X)));
        let position = cube.attribute("position").map(|p| p.get_x(0));
        assert_eq!(position, Some(Ok(0.5)));
    }

    #[test]
    fn test_plane_layout() {
        let plane = plane_geometry(4.0, 2.0, 2, 1);
        assert_eq!(plane.attribute("position").map(BufferAttribute::count), Some(6));
        assert_eq!(plane.element_count(), 12);
        let top_left = plane.attribute("position").map(|p| p.get_vector3(0));
        assert_eq!(top_left, Some(Ok(Vector3::new(-2.0, 1.0, 0.0))));
        let uv = plane.attribute("uv").map(|p| p.get_vector2(0));
        assert!(matches!(uv, Some(Ok(v)) if v.x == 0.0 && v.y == 1.0));
    }

    #[test]
    fn test_sphere_vertices_on_radius() {
        let mut sphere = sphere_geometry(2.0, 8, 6);
        let positions = sphere.attribute("position").map(BufferAttribute::to_vector3s);
        for p in positions.unwrap_or_default() {
            assert_relative_eq!(p.length(), 2.0, epsilon = 1e-5);
        }
        // Pole rows contribute one triangle per segment instead of two.
        assert_eq!(sphere.element_count(), (8 * 6 * 2 - 2 * 8) * 3);
        assert_relative_eq!(sphere.compute_bounding_sphere().radius, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_segment_counts_are_clamped() {
        let sphere = sphere_geometry(1.0, 0, 0);
        assert_eq!(sphere.attribute("position").map(BufferAttribute::count), Some(4 * 3));
        let plane = plane_geometry(1.0, 1.0, 0, 0);
        assert_eq!(plane.element_count(), 6);
    }
}
