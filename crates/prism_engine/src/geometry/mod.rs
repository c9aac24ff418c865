//! Geometry model
//!
//! Typed attribute buffers, indexed geometry with morph targets and groups,
//! and the built-in primitive builders.

pub mod attribute;
#[allow(clippy::module_inception)]
pub mod geometry;
pub mod primitives;

pub use attribute::{AttributeArray, BufferAttribute, ComponentType, UpdateRange, Usage};
pub use geometry::{DrawRange, Geometry, GeometryGroup, WIDE_INDEX_THRESHOLD};
pub use primitives::{box_geometry, plane_geometry, sphere_geometry, sphere_geometry_with, SphereParams};
