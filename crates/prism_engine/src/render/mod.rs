//! # Rendering System
//!
//! The renderer turns a [`Scene`](crate::scene::Scene) and a camera node into
//! device commands. It owns every device object and keeps them in
//! version-keyed caches, so per-frame work is limited to what changed.
//!
//! ## Architecture
//!
//! - **Renderer**: frame loop, classification, passes and draw submission
//! - **Backend**: the [`GraphicsDevice`](backend::GraphicsDevice) seam and the
//!   headless recording device
//! - **Material / Shader**: material model, shader chunks, variant
//!   parameters and the reference-counted program cache
//! - **Caches**: buffers, textures and per-material program references
//! - **Lights / Clipping / Shadows**: per-frame uniform state
//! - **Render lists / State tracker / Info**: sorting, state diffing, stats

pub mod backend;
pub mod caches;
pub mod clipping;
pub mod info;
pub mod lights;
pub mod material;
pub mod render_list;
pub mod renderer;
pub mod shader;
pub mod shadow_map;
pub mod state;
pub mod uniforms;

#[cfg(test)]
mod renderer_tests;

pub use backend::{BackendError, GraphicsDevice, HeadlessDevice};
pub use info::RenderInfo;
pub use renderer::Renderer;
pub use shader::ShaderError;

use thiserror::Error;

use crate::config::ConfigError;
use crate::scene::SceneError;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// A program could not be resolved, compiled or linked
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// An unknown clip-space coordinate system was requested
    #[error("Invalid coordinate system: {0}")]
    InvalidCoordinateSystem(String),

    /// The request cannot be honored by the renderer or device
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A referenced node or asset does not exist
    #[error("Missing resource: {0}")]
    MissingResource(String),

    /// The device reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The renderer configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<BackendError> for RenderError {
    fn from(error: BackendError) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<SceneError> for RenderError {
    fn from(error: SceneError) -> Self {
        match error {
            SceneError::NodeNotFound(id) => Self::MissingResource(format!("node {id:?}")),
            SceneError::UnsupportedOperation(message) => Self::UnsupportedOperation(message),
        }
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
