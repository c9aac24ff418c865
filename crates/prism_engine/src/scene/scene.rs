//! Scene root: the node graph plus whole-scene render settings

use crate::assets::{MaterialHandle, TextureHandle};
use crate::foundation::math::Color;

use super::node::{Node, NodeId};
use super::scene_graph::SceneGraph;
use super::SceneResult;

/// What fills the frame behind everything else
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Solid clear color
    Color(Color),
    /// Full-screen texture
    Texture(TextureHandle),
}

/// Distance fog
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fog {
    /// Linear ramp between `near` and `far`
    Linear {
        /// Fog color
        color: Color,
        /// Start distance
        near: f64,
        /// Full-fog distance
        far: f64,
    },
    /// Exponential squared falloff
    Exp2 {
        /// Fog color
        color: Color,
        /// Density factor
        density: f64,
    },
}

impl Fog {
    /// Fog color
    pub const fn color(&self) -> Color {
        match self {
            Self::Linear { color, .. } | Self::Exp2 { color, .. } => *color,
        }
    }
}

/// Root of everything the renderer draws
#[derive(Debug)]
pub struct Scene {
    graph: SceneGraph,
    root: NodeId,
    /// Backdrop
    pub background: Option<Background>,
    /// Environment map applied to materials without their own
    pub environment: Option<TextureHandle>,
    /// Distance fog
    pub fog: Option<Fog>,
    /// Draw every mesh with this material instead of its own
    pub override_material: Option<MaterialHandle>,
    /// Refresh world matrices at the start of every render
    pub matrix_world_auto_update: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with a group root
    pub fn new() -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::group().with_name("scene"));
        Self {
            graph,
            root,
            background: None,
            environment: None,
            fog: None,
            override_material: None,
            matrix_world_auto_update: true,
        }
    }

    /// Root node
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Node graph
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable node graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Insert `node` and attach it directly under the root
    pub fn add(&mut self, node: Node) -> SceneResult<NodeId> {
        let id = self.graph.insert(node);
        self.graph.add(self.root, id)?;
        Ok(id)
    }

    /// Insert `node` and attach it under `parent`
    pub fn add_to(&mut self, parent: NodeId, node: Node) -> SceneResult<NodeId> {
        let id = self.graph.insert(node);
        if let Err(e) = self.graph.add(parent, id) {
            self.graph.destroy(id)?;
            return Err(e);
        }
        Ok(id)
    }

    /// Node by key
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.get(id)
    }

    /// Mutable node by key
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.get_mut(id)
    }

    /// Refresh every world matrix below the root
    pub fn update_matrix_world(&mut self, force: bool) -> SceneResult<()> {
        self.graph.update_matrix_world(self.root, force)
    }

    /// True when `id` is the root or hangs below it
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.graph.parent(node);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneError;

    #[test]
    fn test_add_hangs_under_root() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group()).unwrap_or_default();
        assert_eq!(scene.graph().parent(a), Some(scene.root()));
        assert!(scene.is_attached(a));
    }

    #[test]
    fn test_add_to_unknown_parent_cleans_up() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group()).unwrap_or_default();
        assert!(scene.graph_mut().destroy(a).is_ok());
        let before = scene.graph().len();
        assert_eq!(scene.add_to(a, Node::group()), Err(SceneError::NodeNotFound(a)));
        assert_eq!(scene.graph().len(), before);
    }

    #[test]
    fn test_fog_color() {
        let fog = Fog::Exp2 {
            color: Color::BLACK,
            density: 0.1,
        };
        assert_eq!(fog.color(), Color::BLACK);
    }
}
