//! # Cameras
//!
//! Perspective and orthographic cameras with cached projection matrices.
//!
//! ## Design Principles
//! - **Explicit refresh**: projection parameters are plain fields; call
//!   [`Camera::update_projection_matrix`] after changing them
//! - **Node-owned pose**: the camera's placement is the transform of the node
//!   that holds it; the scene graph writes the world inverse (view matrix)
//!   whenever it refreshes that node
//! - **Clip convention per camera**: the coordinate system decides whether
//!   depth maps to `[-1, 1]` or `[0, 1]`

use crate::foundation::math::{constants::DEG_TO_RAD, constants::RAD_TO_DEG, CoordinateSystem, Matrix4};

/// Projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Pinhole perspective projection
    Perspective {
        /// Vertical field of view in degrees
        fov: f64,
        /// Width / height
        aspect: f64,
        /// Near clip distance
        near: f64,
        /// Far clip distance
        far: f64,
        /// Zoom factor dividing the frustum extents
        zoom: f64,
        /// Focus distance for stereo and depth-of-field hosts
        focus: f64,
        /// Film size in millimetres along the larger axis
        film_gauge: f64,
        /// Horizontal film offset in millimetres
        film_offset: f64,
    },
    /// Parallel projection
    Orthographic {
        /// Left frustum plane
        left: f64,
        /// Right frustum plane
        right: f64,
        /// Top frustum plane
        top: f64,
        /// Bottom frustum plane
        bottom: f64,
        /// Near clip distance
        near: f64,
        /// Far clip distance
        far: f64,
        /// Zoom factor dividing the frustum extents
        zoom: f64,
    },
}

/// Sub-rectangle of a larger virtual view, for tiled or multi-monitor rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOffset {
    /// Full width of the virtual view
    pub full_width: f64,
    /// Full height of the virtual view
    pub full_height: f64,
    /// Horizontal offset of this sub-view
    pub offset_x: f64,
    /// Vertical offset of this sub-view
    pub offset_y: f64,
    /// Width of this sub-view
    pub width: f64,
    /// Height of this sub-view
    pub height: f64,
}

/// Camera payload of a scene node
#[derive(Debug, Clone)]
pub struct Camera {
    /// Projection parameters
    pub projection: Projection,
    /// Clip-space depth convention
    pub coordinate_system: CoordinateSystem,
    view: Option<ViewOffset>,
    projection_matrix: Matrix4,
    projection_matrix_inverse: Matrix4,
    pub(super) matrix_world_inverse: Matrix4,
}

impl Camera {
    /// Create a perspective camera
    ///
    /// # Arguments
    /// * `fov` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Returns
    /// Camera with its projection matrix already computed
    pub fn perspective(fov: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self::from_projection(Projection::Perspective {
            fov,
            aspect,
            near,
            far,
            zoom: 1.0,
            focus: 10.0,
            film_gauge: 35.0,
            film_offset: 0.0,
        })
    }

    /// Create an orthographic camera
    ///
    /// # Arguments
    /// * `left`, `right`, `top`, `bottom` - Frustum planes in view space
    /// * `near`, `far` - Clip distances along -Z
    pub fn orthographic(left: f64, right: f64, top: f64, bottom: f64, near: f64, far: f64) -> Self {
        Self::from_projection(Projection::Orthographic {
            left,
            right,
            top,
            bottom,
            near,
            far,
            zoom: 1.0,
        })
    }

    /// Create from projection parameters with the default coordinate system
    pub fn from_projection(projection: Projection) -> Self {
        let mut camera = Self {
            projection,
            coordinate_system: CoordinateSystem::default(),
            view: None,
            projection_matrix: Matrix4::IDENTITY,
            projection_matrix_inverse: Matrix4::IDENTITY,
            matrix_world_inverse: Matrix4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Builder: use a different clip-space convention
    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self.update_projection_matrix();
        self
    }

    /// True for perspective cameras
    pub const fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }

    /// Near clip distance
    pub const fn near(&self) -> f64 {
        match self.projection {
            Projection::Perspective { near, .. } | Projection::Orthographic { near, .. } => near,
        }
    }

    /// Far clip distance
    pub const fn far(&self) -> f64 {
        match self.projection {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }

    /// Update the aspect ratio of a perspective camera
    ///
    /// This is typically called when the window/viewport is resized; call
    /// [`update_projection_matrix`](Self::update_projection_matrix) afterwards.
    /// Orthographic cameras are unaffected.
    ///
    /// # Automatic Change Detection
    /// Only logs aspect ratio changes when the difference is significant
    /// (> 0.01) to reduce log noise during window resize events.
    pub fn set_aspect(&mut self, new_aspect: f64) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            if (*aspect - new_aspect).abs() > 0.01 {
                log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", *aspect, new_aspect);
            }
            *aspect = new_aspect;
        }
    }

    /// Set the zoom factor
    pub fn set_zoom(&mut self, new_zoom: f64) {
        match &mut self.projection {
            Projection::Perspective { zoom, .. } | Projection::Orthographic { zoom, .. } => *zoom = new_zoom,
        }
    }

    /// Film width in millimetres for the current aspect
    pub fn film_width(&self) -> f64 {
        match self.projection {
            Projection::Perspective { film_gauge, aspect, .. } => film_gauge * aspect.min(1.0),
            Projection::Orthographic { .. } => 0.0,
        }
    }

    /// Film height in millimetres for the current aspect
    pub fn film_height(&self) -> f64 {
        match self.projection {
            Projection::Perspective { film_gauge, aspect, .. } => film_gauge / aspect.max(1.0),
            Projection::Orthographic { .. } => 0.0,
        }
    }

    /// Focal length in millimetres matching the vertical field of view
    pub fn focal_length(&self) -> f64 {
        match self.projection {
            Projection::Perspective { fov, .. } => {
                let v_extent_slope = (DEG_TO_RAD * 0.5 * fov).tan();
                0.5 * self.film_height() / v_extent_slope
            }
            Projection::Orthographic { .. } => 0.0,
        }
    }

    /// Set the field of view from a focal length in millimetres
    ///
    /// # Arguments
    /// * `focal_length` - Lens focal length relative to the film gauge (35mm by default)
    pub fn set_focal_length(&mut self, focal_length: f64) {
        let v_extent_slope = 0.5 * self.film_height() / focal_length;
        if let Projection::Perspective { fov, .. } = &mut self.projection {
            *fov = RAD_TO_DEG * 2.0 * v_extent_slope.atan();
        }
        self.update_projection_matrix();
    }

    /// Field of view after zoom, in degrees
    pub fn effective_fov(&self) -> f64 {
        match self.projection {
            Projection::Perspective { fov, zoom, .. } => {
                RAD_TO_DEG * 2.0 * ((DEG_TO_RAD * 0.5 * fov).tan() / zoom).atan()
            }
            Projection::Orthographic { .. } => 0.0,
        }
    }

    /// Render only a sub-rectangle of a larger virtual view
    ///
    /// # Arguments
    /// * `full_width`, `full_height` - Size of the whole virtual view
    /// * `x`, `y` - Offset of this sub-view inside the virtual view
    /// * `width`, `height` - Size of this sub-view
    pub fn set_view_offset(&mut self, full_width: f64, full_height: f64, x: f64, y: f64, width: f64, height: f64) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = full_width / full_height;
        }
        self.view = Some(ViewOffset {
            full_width,
            full_height,
            offset_x: x,
            offset_y: y,
            width,
            height,
        });
        self.update_projection_matrix();
    }

    /// Remove the view offset
    pub fn clear_view_offset(&mut self) {
        self.view = None;
        self.update_projection_matrix();
    }

    /// Active view offset
    pub const fn view_offset(&self) -> Option<&ViewOffset> {
        self.view.as_ref()
    }

    /// Recompute the projection matrix and its inverse from the current parameters
    ///
    /// # Mathematical Implementation
    /// The frustum extents at the near plane are derived from the projection
    /// parameters, divided by zoom, then cropped to the view offset when one
    /// is set. Perspective film offset skews the frustum horizontally.
    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective {
                fov,
                aspect,
                near,
                far,
                zoom,
                film_offset,
                ..
            } => {
                let mut top = near * (DEG_TO_RAD * 0.5 * fov).tan() / zoom;
                let mut height = 2.0 * top;
                let mut width = aspect * height;
                let mut left = -0.5 * width;

                if let Some(view) = &self.view {
                    left += view.offset_x * width / view.full_width;
                    top -= view.offset_y * height / view.full_height;
                    width *= view.width / view.full_width;
                    height *= view.height / view.full_height;
                }

                if film_offset != 0.0 {
                    left += near * film_offset / self.film_width();
                }

                Matrix4::make_perspective(left, left + width, top, top - height, near, far, self.coordinate_system)
            }
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
                zoom,
            } => {
                let dx = (right - left) / (2.0 * zoom);
                let dy = (top - bottom) / (2.0 * zoom);
                let cx = (right + left) / 2.0;
                let cy = (top + bottom) / 2.0;

                let mut l = cx - dx;
                let mut r = cx + dx;
                let mut t = cy + dy;
                let mut b = cy - dy;

                if let Some(view) = &self.view {
                    let scale_w = (right - left) / view.full_width / zoom;
                    let scale_h = (top - bottom) / view.full_height / zoom;
                    l += scale_w * view.offset_x;
                    r = l + scale_w * view.width;
                    t -= scale_h * view.offset_y;
                    b = t - scale_h * view.height;
                }

                Matrix4::make_orthographic(l, r, t, b, near, far, self.coordinate_system)
            }
        };
        self.projection_matrix_inverse = self.projection_matrix.invert();
        log::trace!("Camera projection updated: {:?}", self.projection);
    }

    /// Projection matrix as of the last update
    pub const fn projection_matrix(&self) -> &Matrix4 {
        &self.projection_matrix
    }

    /// Inverse projection matrix as of the last update
    pub const fn projection_matrix_inverse(&self) -> &Matrix4 {
        &self.projection_matrix_inverse
    }

    /// View matrix (inverse of the owning node's world matrix)
    pub const fn matrix_world_inverse(&self) -> &Matrix4 {
        &self.matrix_world_inverse
    }

    /// Place the camera at `matrix_world`, refreshing the view matrix
    pub fn set_matrix_world(&mut self, matrix_world: &Matrix4) {
        self.matrix_world_inverse = matrix_world.invert();
    }
}
