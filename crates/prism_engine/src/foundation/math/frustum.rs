//! View frustum used for culling

use serde::{Deserialize, Serialize};

use super::{Box3, CoordinateSystem, Matrix4, Plane, Sphere, Vector3};

/// Six inward-facing planes: right, left, bottom, top, far, near
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frustum {
    /// Clip planes with normals pointing into the frustum
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the planes of a combined projection * view matrix
    pub fn from_projection_matrix(m: &Matrix4, coordinate_system: CoordinateSystem) -> Self {
        let me = &m.elements;
        let plane = |a: f64, b: f64, c: f64, d: f64| Plane::from_components(a, b, c, d).normalize();

        let near = match coordinate_system {
            CoordinateSystem::OpenGl => {
                plane(me[3] + me[2], me[7] + me[6], me[11] + me[10], me[15] + me[14])
            }
            CoordinateSystem::WebGpu => plane(me[2], me[6], me[10], me[14]),
        };

        Self {
            planes: [
                plane(me[3] - me[0], me[7] - me[4], me[11] - me[8], me[15] - me[12]),
                plane(me[3] + me[0], me[7] + me[4], me[11] + me[8], me[15] + me[12]),
                plane(me[3] + me[1], me[7] + me[5], me[11] + me[9], me[15] + me[13]),
                plane(me[3] - me[1], me[7] - me[5], me[11] - me[9], me[15] - me[13]),
                plane(me[3] - me[2], me[7] - me[6], me[11] - me[10], me[15] - me[14]),
                near,
            ],
        }
    }

    /// True unless the sphere lies entirely outside one plane
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let negative_radius = -sphere.radius;
        self.planes
            .iter()
            .all(|p| p.distance_to_point(&sphere.center) >= negative_radius)
    }

    /// True unless the box lies entirely outside one plane
    pub fn intersects_box(&self, b: &Box3) -> bool {
        self.planes.iter().all(|p| {
            // corner furthest along the plane normal
            let corner = Vector3::new(
                if p.normal.x > 0.0 { b.max.x } else { b.min.x },
                if p.normal.y > 0.0 { b.max.y } else { b.min.y },
                if p.normal.z > 0.0 { b.max.z } else { b.min.z },
            );
            p.distance_to_point(&corner) >= 0.0
        })
    }

    /// True when `point` is inside every plane
    pub fn contains_point(&self, point: &Vector3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_frustum(cs: CoordinateSystem) -> Frustum {
        let top = 0.1 * (std::f64::consts::FRAC_PI_4 * 0.5).tan();
        let projection = Matrix4::make_perspective(-top, top, top, -top, 0.1, 100.0, cs);
        Frustum::from_projection_matrix(&projection, cs)
    }

    #[test]
    fn test_contains_point_in_front_of_camera() {
        for cs in [CoordinateSystem::OpenGl, CoordinateSystem::WebGpu] {
            let f = camera_frustum(cs);
            assert!(f.contains_point(&Vector3::new(0.0, 0.0, -10.0)));
            assert!(!f.contains_point(&Vector3::new(0.0, 0.0, 10.0)));
            assert!(!f.contains_point(&Vector3::new(0.0, 0.0, -200.0)));
            assert!(!f.contains_point(&Vector3::new(0.0, 0.0, -0.05)));
        }
    }

    #[test]
    fn test_sphere_and_box_culling() {
        let f = camera_frustum(CoordinateSystem::OpenGl);
        assert!(f.intersects_sphere(&Sphere::new(Vector3::new(0.0, 0.0, -5.0), 1.0)));
        assert!(!f.intersects_sphere(&Sphere::new(Vector3::new(50.0, 0.0, -5.0), 1.0)));
        // straddling the near plane still intersects
        assert!(f.intersects_sphere(&Sphere::new(Vector3::new(0.0, 0.0, 0.5), 1.0)));

        let visible = Box3::new(Vector3::new(-1.0, -1.0, -6.0), Vector3::new(1.0, 1.0, -4.0));
        let hidden = Box3::new(Vector3::new(-1.0, -1.0, 4.0), Vector3::new(1.0, 1.0, 6.0));
        assert!(f.intersects_box(&visible));
        assert!(!f.intersects_box(&hidden));
    }
}
