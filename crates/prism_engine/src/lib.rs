//! # Prism Engine
//!
//! A retained-mode 3D rendering engine core.
//!
//! ## Features
//!
//! - **Math Kernel**: vectors, matrices, quaternions, bounds and frusta
//! - **Scene Graph**: arena-backed node hierarchy with cameras, lights and meshes
//! - **Geometry**: typed vertex attributes with versioned uploads
//! - **Materials**: shader-variant system with a reference-counted program cache
//! - **Renderer**: sorted render lists, shadows and transmission over a
//!   [`GraphicsDevice`](render::GraphicsDevice), with a headless device for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prism_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut renderer = Renderer::new(HeadlessDevice::new(), RendererConfig::new(640, 480))?;
//!     let mut assets = Assets::new();
//!     let mut scene = Scene::new();
//!
//!     let geometry = assets.add_geometry(box_geometry(1.0, 1.0, 1.0, 1, 1, 1));
//!     let material = assets.add_material(Material::lambert(Color::new(0.8, 0.2, 0.2)));
//!     scene.add(Node::mesh(Mesh::new(geometry, material)).with_position(Vector3::new(0.0, 0.0, -4.0)))?;
//!     let camera = scene.add(Node::camera(Camera::perspective(50.0, 640.0 / 480.0, 0.1, 100.0)))?;
//!
//!     renderer.render(&mut scene, &mut assets, camera)?;
//!     println!("{} draw calls", renderer.info().calls);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod events;
pub mod foundation;

pub mod assets;
pub mod geometry;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{Assets, GeometryHandle, MaterialHandle, RenderTarget, Texture, TextureHandle},
        core::config::{Config, EngineConfig, RendererConfig, ShaderErrorPolicy},
        foundation::math::{Color, ColorSpace, CoordinateSystem, Matrix4, Quaternion, Vector2, Vector3},
        geometry::{box_geometry, plane_geometry, sphere_geometry, BufferAttribute, Geometry},
        render::{
            material::{Blending, Material, MaterialPatch, ShaderParams, Side},
            uniforms::UniformValue,
            GraphicsDevice, HeadlessDevice, RenderError, RenderResult, Renderer,
        },
        scene::{Camera, Fog, Light, Mesh, Node, NodeId, Scene},
    };
}
