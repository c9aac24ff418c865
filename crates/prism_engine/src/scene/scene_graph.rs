//! Node arena with hierarchy, transform propagation and lifecycle events
//!
//! Following Game Engine Architecture Chapter 11.2.7.4 - Scene Graphs. Nodes
//! live in a [`SlotMap`]; parent and child links are [`NodeId`] keys, so a
//! node has at most one parent and re-adding detaches it first.

use slotmap::SlotMap;

use crate::events::{EventSystem, SceneEvent};
use crate::foundation::math::{Matrix4, Quaternion, Vector3};

use super::node::{Node, NodeId, NodeKind};
use super::{SceneError, SceneResult};

/// Hierarchical node storage
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    events: EventSystem,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a detached node
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        log::trace!("Inserted node {:?}", id);
        id
    }

    /// Number of stored nodes (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes are stored
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node by key
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node by key
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Node by key, or [`SceneError::NodeNotFound`]
    pub fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Mutable node by key, or [`SceneError::NodeNotFound`]
    pub fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Every stored node
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Lifecycle event hub; register handlers here
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of `id` in insertion order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// True when `ancestor` is `id` or one of its ancestors
    fn is_self_or_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        self.events.send(SceneEvent::Removed { node: child, parent });
        self.events.send(SceneEvent::ChildRemoved { parent, child });
    }

    /// Make `child` the last child of `parent`, keeping its local transform
    ///
    /// A child that already has a parent is detached from it first. Adding a
    /// node to itself or to one of its descendants fails with
    /// [`SceneError::UnsupportedOperation`].
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_self_or_ancestor(child, parent) {
            return Err(SceneError::UnsupportedOperation(
                "a node cannot be added to itself or to one of its descendants".to_string(),
            ));
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child);
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.events.send(SceneEvent::Added { node: child, parent });
        self.events.send(SceneEvent::ChildAdded { parent, child });
        self.events.dispatch();
        Ok(())
    }

    /// Detach `child` from `parent`; a no-op when it is not a child of `parent`
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(child)?;
        if !self.node(parent)?.children.contains(&child) {
            log::debug!("Node {:?} is not a child of {:?}; nothing to remove", child, parent);
            return Ok(());
        }
        self.detach(parent, child);
        self.events.dispatch();
        Ok(())
    }

    /// Detach `child` from whatever parent it has
    pub fn remove_from_parent(&mut self, child: NodeId) -> SceneResult<()> {
        match self.node(child)?.parent {
            Some(parent) => self.remove(parent, child),
            None => Ok(()),
        }
    }

    /// Detach every child of `parent`
    pub fn clear(&mut self, parent: NodeId) -> SceneResult<()> {
        let children = self.node(parent)?.children.clone();
        for child in children {
            self.detach(parent, child);
        }
        self.events.dispatch();
        Ok(())
    }

    /// Reparent `child` under `parent`, keeping its world transform
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(child)?;
        self.update_world_matrix(parent, true, false)?;
        let mut m = self.node(parent)?.matrix_world.invert();

        if let Some(old_parent) = self.parent(child) {
            self.update_world_matrix(old_parent, true, false)?;
            m = m.multiply(&self.node(old_parent)?.matrix_world);
        }

        if self.is_self_or_ancestor(child, parent) {
            return Err(SceneError::UnsupportedOperation(
                "a node cannot be attached to itself or to one of its descendants".to_string(),
            ));
        }

        self.node_mut(child)?.apply_matrix4(&m);
        self.remove_from_parent(child)?;
        self.add(parent, child)?;
        self.update_world_matrix(child, false, true)
    }

    /// Remove `id` and its whole subtree from the arena
    pub fn destroy(&mut self, id: NodeId) -> SceneResult<()> {
        self.remove_from_parent(id)?;
        let mut removed = 0;
        for node in self.descendants(id) {
            if self.nodes.remove(node).is_some() {
                removed += 1;
            }
        }
        log::debug!("Destroyed {} node(s) rooted at {:?}", removed, id);
        Ok(())
    }

    /// `root` and all of its descendants, depth-first, children in insertion order
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Visit `root` and every descendant depth-first
    pub fn traverse(&self, root: NodeId, mut visit: impl FnMut(NodeId, &Node)) {
        for id in self.descendants(root) {
            if let Some(node) = self.nodes.get(id) {
                visit(id, node);
            }
        }
    }

    /// Like [`traverse`](Self::traverse) with mutable access
    pub fn traverse_mut(&mut self, root: NodeId, mut visit: impl FnMut(NodeId, &mut Node)) {
        for id in self.descendants(root) {
            if let Some(node) = self.nodes.get_mut(id) {
                visit(id, node);
            }
        }
    }

    /// Visit visible nodes depth-first, skipping hidden subtrees entirely
    pub fn traverse_visible(&self, root: NodeId, mut visit: impl FnMut(NodeId, &Node)) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            visit(id, node);
            stack.extend(node.children.iter().rev());
        }
    }

    /// Visit the ancestors of `id`, nearest first (excluding `id`)
    pub fn traverse_ancestors(&self, id: NodeId, mut visit: impl FnMut(NodeId, &Node)) {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            let Some(node) = self.nodes.get(ancestor) else {
                break;
            };
            visit(ancestor, node);
            current = node.parent;
        }
    }

    /// First node named `name` in depth-first order under `root`
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    fn set_world(&mut self, id: NodeId, parent_world: Option<Matrix4>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.matrix_world = match parent_world {
                Some(parent) => parent.multiply(&node.matrix),
                None => node.matrix,
            };
            if let NodeKind::Camera(camera) = &mut node.kind {
                camera.set_matrix_world(&node.matrix_world);
            }
        }
    }

    fn parent_world(&self, id: NodeId) -> Option<Matrix4> {
        self.parent(id)
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.matrix_world)
    }

    /// Refresh world matrices of `root` and its subtree
    ///
    /// Local matrices are rebuilt from TRS for nodes with
    /// `matrix_auto_update`. Once a node's world matrix changes, every
    /// descendant is forced to recompute. Nodes with
    /// `matrix_world_auto_update == false` (and their subtrees) are skipped.
    pub fn update_matrix_world(&mut self, root: NodeId, force: bool) -> SceneResult<()> {
        self.node(root)?;
        let mut stack = vec![(root, force)];
        while let Some((id, force)) = stack.pop() {
            let parent_world = self.parent_world(id);
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if !node.matrix_world_auto_update {
                continue;
            }
            if node.matrix_auto_update {
                node.update_matrix();
            }
            let mut force_children = force;
            if node.matrix_world_needs_update || force {
                node.matrix_world_needs_update = false;
                force_children = true;
                self.set_world(id, parent_world);
            }
            let children = self.children(id);
            stack.extend(children.iter().rev().map(|&c| (c, force_children)));
        }
        Ok(())
    }

    /// Refresh the world matrix of `id`, optionally its ancestors first and its subtree after
    pub fn update_world_matrix(&mut self, id: NodeId, update_parents: bool, update_children: bool) -> SceneResult<()> {
        if update_parents {
            let mut chain = Vec::new();
            self.traverse_ancestors(id, |ancestor, _| chain.push(ancestor));
            for ancestor in chain.into_iter().rev() {
                self.refresh_single(ancestor);
            }
        }
        self.node(id)?;
        self.refresh_single(id);

        if update_children {
            let children = self.children(id).to_vec();
            for child in children {
                if self.nodes.get(child).is_some_and(|c| c.matrix_world_auto_update) {
                    self.update_world_matrix(child, false, true)?;
                }
            }
        }
        Ok(())
    }

    fn refresh_single(&mut self, id: NodeId) {
        let parent_world = self.parent_world(id);
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.matrix_auto_update {
            node.update_matrix();
        }
        if node.matrix_world_auto_update {
            node.matrix_world_needs_update = false;
            self.set_world(id, parent_world);
        }
    }

    /// Rotate `id` to face a world-space `target`
    ///
    /// Cameras and lights point their -Z axis at the target; other nodes
    /// point +Z at it. The result is expressed relative to the parent's world
    /// rotation.
    pub fn look_at(&mut self, id: NodeId, target: &Vector3) -> SceneResult<()> {
        self.update_world_matrix(id, true, false)?;
        let node = self.node(id)?;
        let position = Vector3::from_matrix_position(&node.matrix_world);
        let rotation = if node.looks_down_negative_z() {
            Matrix4::look_at(&position, target, &node.up)
        } else {
            Matrix4::look_at(target, &position, &node.up)
        };
        let mut q = Quaternion::from_rotation_matrix(&rotation);

        if let Some(parent_world) = self.parent_world(id) {
            let parent_rotation = Quaternion::from_rotation_matrix(&parent_world.extract_rotation());
            q = q.premultiply(&parent_rotation.invert());
        }
        self.node_mut(id)?.set_quaternion(q);
        Ok(())
    }

    /// World position after refreshing the ancestor chain
    pub fn world_position(&mut self, id: NodeId) -> SceneResult<Vector3> {
        self.update_world_matrix(id, true, false)?;
        Ok(Vector3::from_matrix_position(&self.node(id)?.matrix_world))
    }

    /// World rotation after refreshing the ancestor chain
    pub fn world_quaternion(&mut self, id: NodeId) -> SceneResult<Quaternion> {
        self.update_world_matrix(id, true, false)?;
        Ok(self.node(id)?.matrix_world.decompose().1)
    }

    /// World scale after refreshing the ancestor chain
    pub fn world_scale(&mut self, id: NodeId) -> SceneResult<Vector3> {
        self.update_world_matrix(id, true, false)?;
        Ok(self.node(id)?.matrix_world.decompose().2)
    }

    /// Normalized world +Z axis after refreshing the ancestor chain
    pub fn world_direction(&mut self, id: NodeId) -> SceneResult<Vector3> {
        self.update_world_matrix(id, true, false)?;
        let e = self.node(id)?.matrix_world.elements;
        Ok(Vector3::new(e[8], e[9], e[10]).normalize())
    }

    /// Transform a point from the local space of `id` to world space
    pub fn local_to_world(&self, id: NodeId, point: &Vector3) -> SceneResult<Vector3> {
        Ok(point.apply_matrix4(&self.node(id)?.matrix_world))
    }

    /// Transform a world-space point into the local space of `id`
    pub fn world_to_local(&self, id: NodeId, point: &Vector3) -> SceneResult<Vector3> {
        Ok(point.apply_matrix4(&self.node(id)?.matrix_world.invert()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventType};
    use crate::foundation::math::constants::HALF_PI;
    use crate::scene::Camera;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world_invariant_holds(graph: &SceneGraph, root: NodeId) {
        graph.traverse(root, |_, node| {
            let expected = match node.parent() {
                Some(p) => graph.get(p).map(|p| p.matrix_world().multiply(node.matrix())),
                None => Some(*node.matrix()),
            };
            if let Some(expected) = expected {
                assert_relative_eq!(*node.matrix_world(), expected, epsilon = 1e-12);
            }
        });
    }

    #[test]
    fn test_child_of_rotated_parent() {
        let mut graph = SceneGraph::new();
        let mut parent_node = Node::group();
        parent_node.rotate_y(HALF_PI);
        let parent = graph.insert(parent_node);
        let child = graph.insert(Node::group().with_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(graph.add(parent, child).is_ok());
        assert!(graph.update_matrix_world(parent, false).is_ok());

        let world = Vector3::from_matrix_position(graph.get(child).map_or(&Matrix4::ZERO, Node::matrix_world));
        assert_relative_eq!(world, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        world_invariant_holds(&graph, parent);
    }

    #[test]
    fn test_reparent_detaches_first() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::group());
        let b = graph.insert(Node::group());
        let child = graph.insert(Node::group());
        assert!(graph.add(a, child).is_ok());
        assert!(graph.add(b, child).is_ok());
        assert!(graph.children(a).is_empty());
        assert_eq!(graph.children(b), &[child]);
        assert_eq!(graph.parent(child), Some(b));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::group());
        let b = graph.insert(Node::group());
        assert!(graph.add(a, b).is_ok());
        assert!(matches!(graph.add(a, a), Err(SceneError::UnsupportedOperation(_))));
        assert!(matches!(graph.add(b, a), Err(SceneError::UnsupportedOperation(_))));
        assert_eq!(graph.parent(a), None);
    }

    #[test]
    fn test_unknown_node() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::group());
        let gone = graph.insert(Node::group());
        assert!(graph.destroy(gone).is_ok());
        assert_eq!(graph.add(a, gone), Err(SceneError::NodeNotFound(gone)));
    }

    #[test]
    fn test_attach_preserves_world_pose() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::group().with_position(Vector3::new(5.0, 0.0, 0.0)));
        let mut b_node = Node::group().with_position(Vector3::new(0.0, 3.0, 0.0));
        b_node.rotate_z(HALF_PI);
        let b = graph.insert(b_node);
        let child = graph.insert(Node::group().with_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(graph.add(a, child).is_ok());

        let before = graph.world_position(child).unwrap_or_default();
        assert!(graph.attach(b, child).is_ok());
        let after = graph.world_position(child).unwrap_or_default();
        assert_relative_eq!(before, Vector3::new(6.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(after, before, epsilon = 1e-9);
        assert_eq!(graph.parent(child), Some(b));
    }

    #[test]
    fn test_attach_preserves_world_rotation_and_scale() {
        let mut graph = SceneGraph::new();
        let mut old_node = Node::group()
            .with_position(Vector3::new(5.0, 0.0, 0.0))
            .with_scale(Vector3::new(2.0, 1.0, 1.0));
        old_node.rotate_x(HALF_PI);
        let old_parent = graph.insert(old_node);
        let mut new_node = Node::group()
            .with_position(Vector3::new(0.0, 3.0, 0.0))
            .with_scale(Vector3::new(0.5, 0.5, 0.5));
        new_node.rotate_z(HALF_PI);
        let new_parent = graph.insert(new_node);
        let child = graph.insert(Node::group().with_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(graph.add(old_parent, child).is_ok());

        let position = graph.world_position(child).unwrap_or_default();
        let rotation = graph.world_quaternion(child).unwrap_or_default();
        let scale = graph.world_scale(child).unwrap_or_default();
        assert_relative_eq!(position, Vector3::new(7.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            rotation.dot(&Quaternion::from_axis_angle(&Vector3::X, HALF_PI)).abs(),
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(scale, Vector3::new(2.0, 1.0, 1.0), epsilon = 1e-9);

        assert!(graph.attach(new_parent, child).is_ok());
        assert_eq!(graph.parent(child), Some(new_parent));
        assert_relative_eq!(graph.world_position(child).unwrap_or_default(), position, epsilon = 1e-9);
        assert_relative_eq!(
            graph.world_quaternion(child).unwrap_or_default().dot(&rotation).abs(),
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(graph.world_scale(child).unwrap_or_default(), scale, epsilon = 1e-9);
    }

    #[test]
    fn test_add_preserves_local_transform() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Node::group().with_position(Vector3::new(5.0, 0.0, 0.0)));
        let child = graph.insert(Node::group().with_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(graph.add(a, child).is_ok());
        assert_relative_eq!(graph.get(child).map(Node::position).unwrap_or_default(), Vector3::X);
        assert_relative_eq!(
            graph.world_position(child).unwrap_or_default(),
            Vector3::new(6.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_lifecycle_events() {
        let mut graph = SceneGraph::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for event_type in [EventType::Added, EventType::Removed, EventType::ChildAdded, EventType::ChildRemoved] {
            let log = Rc::clone(&log);
            graph.events_mut().register_handler(
                event_type,
                Box::new(move |event: &Event| {
                    log.borrow_mut().push(*event);
                    false
                }),
            );
        }
        let a = graph.insert(Node::group());
        let b = graph.insert(Node::group());
        let child = graph.insert(Node::group());
        assert!(graph.add(a, child).is_ok());
        assert_eq!(log.borrow().len(), 2);
        assert!(graph.add(b, child).is_ok());
        let events = log.borrow().clone();
        assert_eq!(
            events[2..],
            [
                Event::Scene(SceneEvent::Removed { node: child, parent: a }),
                Event::Scene(SceneEvent::ChildRemoved { parent: a, child }),
                Event::Scene(SceneEvent::Added { node: child, parent: b }),
                Event::Scene(SceneEvent::ChildAdded { parent: b, child }),
            ]
        );
    }

    #[test]
    fn test_force_propagates_to_children() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Node::group());
        let child = graph.insert(Node::group().with_position(Vector3::Y));
        assert!(graph.add(parent, child).is_ok());
        assert!(graph.update_matrix_world(parent, false).is_ok());

        if let Some(p) = graph.get_mut(parent) {
            p.set_position(Vector3::new(0.0, 0.0, 4.0));
        }
        assert!(graph.update_matrix_world(parent, false).is_ok());
        let world = graph.get(child).map(|c| Vector3::from_matrix_position(c.matrix_world()));
        assert_eq!(world, Some(Vector3::new(0.0, 1.0, 4.0)));
        world_invariant_holds(&graph, parent);
    }

    #[test]
    fn test_world_auto_update_off_skips_subtree() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Node::group().with_position(Vector3::X));
        let child = graph.insert(Node::group());
        assert!(graph.add(parent, child).is_ok());
        if let Some(c) = graph.get_mut(child) {
            c.matrix_world_auto_update = false;
        }
        assert!(graph.update_matrix_world(parent, true).is_ok());
        assert_eq!(graph.get(child).map(|c| *c.matrix_world()), Some(Matrix4::IDENTITY));
    }

    #[test]
    fn test_look_at_camera_and_object() {
        let mut graph = SceneGraph::new();
        let camera = graph.insert(Node::camera(Camera::perspective(50.0, 1.0, 0.1, 100.0)).with_position(Vector3::new(0.0, 0.0, 5.0)));
        let object = graph.insert(Node::group().with_position(Vector3::new(0.0, 0.0, 5.0)));
        assert!(graph.look_at(camera, &Vector3::ZERO).is_ok());
        assert!(graph.look_at(object, &Vector3::new(5.0, 0.0, 5.0)).is_ok());

        // Camera at +Z looking at the origin keeps the identity rotation.
        let forward = (-Vector3::Z).apply_quaternion(&graph.get(camera).map(Node::quaternion).unwrap_or_default());
        assert_relative_eq!(forward, -Vector3::Z, epsilon = 1e-12);

        let facing = Vector3::Z.apply_quaternion(&graph.get(object).map(Node::quaternion).unwrap_or_default());
        assert_relative_eq!(facing, Vector3::X, epsilon = 1e-12);
    }

    #[test]
    fn test_look_at_compensates_parent_rotation() {
        let mut graph = SceneGraph::new();
        let mut parent_node = Node::group();
        parent_node.rotate_y(HALF_PI);
        let parent = graph.insert(parent_node);
        let child = graph.insert(Node::group());
        assert!(graph.add(parent, child).is_ok());
        assert!(graph.look_at(child, &Vector3::new(0.0, 0.0, 10.0)).is_ok());
        assert!(graph.update_matrix_world(parent, false).is_ok());
        assert_relative_eq!(graph.world_direction(child).unwrap_or_default(), Vector3::Z, epsilon = 1e-9);
    }

    #[test]
    fn test_camera_view_matrix_tracks_world() {
        let mut graph = SceneGraph::new();
        let camera = graph.insert(Node::camera(Camera::perspective(50.0, 1.0, 0.1, 100.0)).with_position(Vector3::new(1.0, 2.0, 3.0)));
        assert!(graph.update_matrix_world(camera, false).is_ok());
        let view = graph.get(camera).and_then(Node::as_camera).map(|c| *c.matrix_world_inverse());
        assert_relative_eq!(
            view.unwrap_or(Matrix4::ZERO),
            Matrix4::make_translation(-1.0, -2.0, -3.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_traversal_order_and_visibility() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::group().with_name("root"));
        let a = graph.insert(Node::group().with_name("a"));
        let b = graph.insert(Node::group().with_name("b"));
        let a1 = graph.insert(Node::group().with_name("a1"));
        assert!(graph.add(root, a).is_ok());
        assert!(graph.add(root, b).is_ok());
        assert!(graph.add(a, a1).is_ok());
        assert_eq!(graph.descendants(root), vec![root, a, a1, b]);
        assert_eq!(graph.find_by_name(root, "a1"), Some(a1));

        if let Some(node) = graph.get_mut(a) {
            node.visible = false;
        }
        let mut seen = Vec::new();
        graph.traverse_visible(root, |id, _| seen.push(id));
        assert_eq!(seen, vec![root, b]);

        let mut ancestors = Vec::new();
        graph.traverse_ancestors(a1, |id, _| ancestors.push(id));
        assert_eq!(ancestors, vec![a, root]);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Node::group());
        let a = graph.insert(Node::group());
        let a1 = graph.insert(Node::group());
        assert!(graph.add(root, a).is_ok());
        assert!(graph.add(a, a1).is_ok());
        assert!(graph.destroy(a).is_ok());
        assert!(!graph.contains(a1));
        assert!(graph.children(root).is_empty());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_local_world_roundtrip() {
        let mut graph = SceneGraph::new();
        let node = graph.insert(Node::group().with_position(Vector3::new(1.0, 2.0, 3.0)).with_scale(Vector3::splat(2.0)));
        assert!(graph.update_matrix_world(node, false).is_ok());
        let world = graph.local_to_world(node, &Vector3::ONE).unwrap_or_default();
        assert_relative_eq!(world, Vector3::new(3.0, 4.0, 5.0), epsilon = 1e-12);
        let local = graph.world_to_local(node, &world).unwrap_or_default();
        assert_relative_eq!(local, Vector3::ONE, epsilon = 1e-12);
    }
}
