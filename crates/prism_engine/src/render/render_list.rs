//! Per-frame render lists
//!
//! Classification pushes one [`RenderItem`] per (mesh, material, group)
//! into one of three buckets. Opaque items draw front-to-back to reject
//! hidden fragments early; transmissive and transparent items draw
//! back-to-front so blending composites correctly.

use std::cmp::Ordering;

use crate::assets::{GeometryHandle, MaterialHandle};
use crate::geometry::GeometryGroup;
use crate::scene::NodeId;

/// One draw collected during classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// Insertion order; final tie-breaker
    pub id: usize,
    /// Mesh node
    pub node: NodeId,
    /// Geometry drawn
    pub geometry: GeometryHandle,
    /// Material drawn with
    pub material: MaterialHandle,
    /// Numeric material id, groups draws sharing state
    pub material_id: u32,
    /// Geometry group for multi-material meshes
    pub group: Option<GeometryGroup>,
    /// Squared camera-space distance
    pub depth: f64,
    /// Node render order
    pub render_order: i32,
    /// Render order inherited from the nearest ordered ancestor group
    pub group_order: i32,
}

/// Which bucket an item lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBucket {
    /// Opaque pass
    Opaque,
    /// Transmission pass
    Transmissive,
    /// Blended pass
    Transparent,
}

/// Opaque order: group order, render order, material id, near to far, insertion
pub fn opaque_order(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(a.material_id.cmp(&b.material_id))
        .then(a.depth.total_cmp(&b.depth))
        .then(a.id.cmp(&b.id))
}

/// Blended order: group order, render order, far to near, insertion
pub fn transparent_order(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(b.depth.total_cmp(&a.depth))
        .then(a.id.cmp(&b.id))
}

/// The three buckets for one frame
#[derive(Debug, Default)]
pub struct RenderLists {
    /// Opaque items
    pub opaque: Vec<RenderItem>,
    /// Items with transmission
    pub transmissive: Vec<RenderItem>,
    /// Blended items
    pub transparent: Vec<RenderItem>,
    next_id: usize,
}

impl RenderLists {
    /// Empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear for a new frame, keeping allocations
    pub fn init(&mut self) {
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
        self.next_id = 0;
    }

    /// Insertion id for the next item
    pub fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an item to a bucket
    pub fn push(&mut self, bucket: RenderBucket, item: RenderItem) {
        match bucket {
            RenderBucket::Opaque => self.opaque.push(item),
            RenderBucket::Transmissive => self.transmissive.push(item),
            RenderBucket::Transparent => self.transparent.push(item),
        }
    }

    /// Sort every bucket
    pub fn sort(&mut self) {
        self.opaque.sort_by(opaque_order);
        self.transmissive.sort_by(transparent_order);
        self.transparent.sort_by(transparent_order);
    }

    /// Items across all buckets
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transmissive.len() + self.transparent.len()
    }

    /// True when nothing was collected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    struct Keys {
        node: NodeId,
        geometry: GeometryHandle,
        material: MaterialHandle,
    }

    fn keys() -> Keys {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let mut geometries: SlotMap<GeometryHandle, ()> = SlotMap::with_key();
        let mut materials: SlotMap<MaterialHandle, ()> = SlotMap::with_key();
        Keys {
            node: nodes.insert(()),
            geometry: geometries.insert(()),
            material: materials.insert(()),
        }
    }

    fn item(keys: &Keys, lists: &mut RenderLists, depth: f64, material_id: u32, render_order: i32) -> RenderItem {
        RenderItem {
            id: lists.next_id(),
            node: keys.node,
            geometry: keys.geometry,
            material: keys.material,
            material_id,
            group: None,
            depth,
            render_order,
            group_order: 0,
        }
    }

    #[test]
    fn test_opaque_front_to_back_within_material() {
        let keys = keys();
        let mut lists = RenderLists::new();
        let far = item(&keys, &mut lists, 100.0, 1, 0);
        let near = item(&keys, &mut lists, 1.0, 1, 0);
        let other_material = item(&keys, &mut lists, 0.5, 2, 0);
        for i in [far, near, other_material] {
            lists.push(RenderBucket::Opaque, i);
        }
        lists.sort();
        let ids: Vec<usize> = lists.opaque.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![near.id, far.id, other_material.id]);
    }

    #[test]
    fn test_transparent_back_to_front() {
        let keys = keys();
        let mut lists = RenderLists::new();
        let near = item(&keys, &mut lists, 1.0, 1, 0);
        let far = item(&keys, &mut lists, 9.0, 2, 0);
        lists.push(RenderBucket::Transparent, near);
        lists.push(RenderBucket::Transparent, far);
        lists.sort();
        assert_eq!(lists.transparent[0].id, far.id);
    }

    #[test]
    fn test_render_order_dominates_depth() {
        let keys = keys();
        let mut lists = RenderLists::new();
        let late = item(&keys, &mut lists, 0.0, 0, 5);
        let early = item(&keys, &mut lists, 50.0, 0, -1);
        lists.push(RenderBucket::Transparent, late);
        lists.push(RenderBucket::Transparent, early);
        lists.sort();
        assert_eq!(lists.transparent[0].id, early.id);
    }

    #[test]
    fn test_ties_fall_back_to_insertion() {
        let keys = keys();
        let mut lists = RenderLists::new();
        let a = item(&keys, &mut lists, 4.0, 3, 0);
        let b = item(&keys, &mut lists, 4.0, 3, 0);
        assert_eq!(opaque_order(&a, &b), Ordering::Less);
        assert_eq!(transparent_order(&b, &a), Ordering::Greater);
        lists.init();
        assert!(lists.is_empty());
        assert_eq!(lists.next_id(), 0);
    }
}
