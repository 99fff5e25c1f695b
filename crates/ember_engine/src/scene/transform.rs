//! Hierarchical placement graph
//!
//! Nodes own a local transformation matrix and are linked by non-owning
//! parent/child relations; entities own their nodes through the graph, the
//! parent never owns the child. The world matrix of a node is the fold of
//! its ancestor chain's local matrices applied root-to-leaf
//! (`parent_world * local`), recomputed on every query — callers that need
//! the result repeatedly within a frame cache it themselves.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

new_key_type! {
    /// Handle to a node in a [`TransformGraph`]
    pub struct TransformId;
}

/// Parenting errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
    /// The requested link would close a cycle through the parent chain
    #[error("re-parenting would create a cycle")]
    CycleDetected,

    /// A handle referred to a removed node
    #[error("stale transform handle")]
    StaleHandle,
}

#[derive(Debug)]
struct TransformNode {
    local: Mat4,
    parent: Option<TransformId>,
    children: Vec<TransformId>,
}

/// Owning storage for a hierarchy of transform nodes
#[derive(Debug, Default)]
pub struct TransformGraph {
    nodes: SlotMap<TransformId, TransformNode>,
}

impl TransformGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Insert an unparented node with the given local matrix
    pub fn insert(&mut self, local: Mat4) -> TransformId {
        self.nodes.insert(TransformNode {
            local,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Insert an unparented node at identity
    pub fn insert_identity(&mut self) -> TransformId {
        self.insert(Mat4::identity())
    }

    /// Remove a node, detaching it from its parent and orphaning children
    pub fn remove(&mut self, id: TransformId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&c| c != id);
            }
        }
        for child in node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
        }
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a handle refers to a live node
    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(id)
    }

    /// The node's local matrix
    pub fn local(&self, id: TransformId) -> Mat4 {
        self.nodes
            .get(id)
            .map(|n| n.local)
            .unwrap_or_else(Mat4::identity)
    }

    /// Replace the node's local matrix
    pub fn set_local(&mut self, id: TransformId, local: Mat4) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local = local;
        }
    }

    /// The node's parent, if any
    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// The node's children (bookkeeping links, not ownership)
    pub fn children(&self, id: TransformId) -> &[TransformId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Link `child` under `parent`, detaching any previous parent first
    ///
    /// A link that would close a cycle (the new parent is the child itself or
    /// one of its descendants) is rejected.
    pub fn set_parent(
        &mut self,
        child: TransformId,
        parent: TransformId,
    ) -> Result<(), TransformError> {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return Err(TransformError::StaleHandle);
        }

        // Walk up from the prospective parent; finding `child` means a cycle
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                log::error!("rejected transform parenting that would create a cycle");
                return Err(TransformError::CycleDetected);
            }
            cursor = self.parent(current);
        }

        self.unparent(child);

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        Ok(())
    }

    /// Detach a node from its parent; a root node is left unchanged
    pub fn unparent(&mut self, child: TransformId) {
        let Some(previous) = self.nodes.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(previous) {
            parent_node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    /// World matrix: ancestor locals composed root-to-leaf
    ///
    /// A node with no parent returns its local matrix unchanged. Recomputed
    /// on every call.
    pub fn world(&self, id: TransformId) -> Mat4 {
        let Some(node) = self.nodes.get(id) else {
            return Mat4::identity();
        };
        match node.parent {
            Some(parent) => self.world(parent) * node.local,
            None => node.local,
        }
    }

    /// Post-multiply a translation onto the node's local matrix
    pub fn translate(&mut self, id: TransformId, offset: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local *= Mat4::translation(offset);
        }
    }

    /// Post-multiply a rotation around X onto the node's local matrix
    pub fn rotate_x(&mut self, id: TransformId, angle: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local *= Mat4::rotation_x(angle);
        }
    }

    /// Post-multiply a rotation around Y onto the node's local matrix
    pub fn rotate_y(&mut self, id: TransformId, angle: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local *= Mat4::rotation_y(angle);
        }
    }

    /// Post-multiply a rotation around Z onto the node's local matrix
    pub fn rotate_z(&mut self, id: TransformId, angle: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local *= Mat4::rotation_z(angle);
        }
    }

    /// Post-multiply a scale onto the node's local matrix
    pub fn scale(&mut self, id: TransformId, factors: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local *= Mat4::scaling(factors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants;
    use approx::assert_relative_eq;

    #[test]
    fn test_root_world_equals_local() {
        let mut graph = TransformGraph::new();
        let local = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        let node = graph.insert(local);
        assert_eq!(graph.world(node), local);
    }

    #[test]
    fn test_chain_composes_parent_first() {
        let mut graph = TransformGraph::new();
        let a = graph.insert(Mat4::translation(Vec3::new(1.0, 0.0, 0.0)));
        let b = graph.insert(Mat4::translation(Vec3::new(0.0, 2.0, 0.0)));
        let c = graph.insert(Mat4::translation(Vec3::new(0.0, 0.0, 3.0)));
        graph.set_parent(b, a).unwrap();
        graph.set_parent(c, b).unwrap();

        let expected = graph.local(a) * graph.local(b) * graph.local(c);
        assert_eq!(graph.world(c), expected);
    }

    #[test]
    fn test_rotation_chain_matches_matrix_product() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Mat4::rotation_y(constants::HALF_PI));
        let child = graph.insert(Mat4::translation(Vec3::new(0.0, 0.0, 1.0)));
        graph.set_parent(child, parent).unwrap();

        // Child offset (0,0,1) rotated a quarter turn around Y lands at (1,0,0)
        let world = graph.world(child);
        let position = crate::foundation::math::utils::translation_of(&world);
        assert_relative_eq!(position, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_unparent_restores_local_world() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Mat4::translation(Vec3::new(5.0, 0.0, 0.0)));
        let child = graph.insert(Mat4::translation(Vec3::new(0.0, 1.0, 0.0)));
        graph.set_parent(child, parent).unwrap();
        assert_ne!(graph.world(child), graph.local(child));

        graph.unparent(child);
        assert_eq!(graph.world(child), graph.local(child));
        assert!(graph.children(parent).is_empty());
    }

    #[test]
    fn test_reparent_moves_child_between_parents() {
        let mut graph = TransformGraph::new();
        let first = graph.insert_identity();
        let second = graph.insert_identity();
        let child = graph.insert_identity();

        graph.set_parent(child, first).unwrap();
        graph.set_parent(child, second).unwrap();

        assert!(graph.children(first).is_empty());
        assert_eq!(graph.children(second), &[child]);
        assert_eq!(graph.parent(child), Some(second));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = TransformGraph::new();
        let a = graph.insert_identity();
        let b = graph.insert_identity();
        let c = graph.insert_identity();
        graph.set_parent(b, a).unwrap();
        graph.set_parent(c, b).unwrap();

        assert_eq!(graph.set_parent(a, c), Err(TransformError::CycleDetected));
        assert_eq!(graph.set_parent(a, a), Err(TransformError::CycleDetected));
        // Existing links unharmed
        assert_eq!(graph.parent(b), Some(a));
    }

    #[test]
    fn test_mutators_touch_local_only() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert_identity();
        let child = graph.insert_identity();
        graph.set_parent(child, parent).unwrap();

        graph.translate(parent, Vec3::new(0.0, 3.0, 0.0));
        // Parent's local moved; child's local untouched, world follows parent
        assert_eq!(graph.local(child), Mat4::identity());
        let world = graph.world(child);
        assert_relative_eq!(
            crate::foundation::math::utils::translation_of(&world),
            Vec3::new(0.0, 3.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_remove_orphans_children() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Mat4::translation(Vec3::new(9.0, 0.0, 0.0)));
        let child = graph.insert_identity();
        graph.set_parent(child, parent).unwrap();

        graph.remove(parent);
        assert!(!graph.contains(parent));
        assert_eq!(graph.parent(child), None);
        assert_eq!(graph.world(child), Mat4::identity());
    }
}
