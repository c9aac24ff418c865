//! Scene graph and transform system
//!
//! Provides retained scene state the renderer consumes each frame. Following
//! Game Engine Architecture Chapter 11.2.7 - Scene Graphs.
//!
//! ## Architecture
//!
//! ```text
//! Scene (background, fog, environment)
//!      ↓
//! SceneGraph (SlotMap<NodeId, Node>)
//!      ↓
//! Node { TRS, matrices, NodeKind::{Group, Mesh, Camera, Light} }
//! ```

pub mod camera;
pub mod light;
pub mod mesh;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod scene_graph;

pub use camera::{Camera, Projection, ViewOffset};
pub use light::{Light, LightKind, LightShadow, LightTarget};
pub use mesh::{DrawMode, Instancing, MaterialSlot, Mesh, Skin};
pub use node::{Layers, Node, NodeId, NodeKind, LAYER_COUNT};
pub use scene::{Background, Fog, Scene};
pub use scene_graph::SceneGraph;

/// Scene graph errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The key does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The requested hierarchy change is not allowed
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
