use crate::types::NodeId;
use glam::Vec3;

/// A single growth node. Created once, immutable thereafter; nodes are
/// never deleted or repositioned.
#[derive(Debug)]
pub struct GrowthNode {
    pub pos: Vec3,
    pub parent: Option<NodeId>,
    /// Direction this node grew in (zero for roots).
    pub direction: Vec3,
    pub children: Vec<NodeId>,
}

/// Append-only arena of growth nodes forming one or more rooted trees.
///
/// Relationships are integer indices rather than references: a parent index
/// always precedes its children, so the graph is acyclic by construction and
/// node order is a topological order.
#[derive(Debug)]
pub struct GrowthGraph {
    pub nodes: Vec<GrowthNode>,
}

impl GrowthNode {
    fn new_root(pos: Vec3) -> Self {
        Self {
            pos,
            parent: None,
            direction: Vec3::ZERO,
            children: Vec::with_capacity(4),
        }
    }

    fn new_child(pos: Vec3, direction: Vec3, parent: NodeId) -> Self {
        Self {
            pos,
            parent: Some(parent),
            direction,
            children: Vec::with_capacity(4),
        }
    }
}

impl GrowthGraph {
    /// Builds a graph containing one root node per supplied position.
    pub fn from_roots(roots: &[Vec3]) -> Self {
        Self {
            nodes: roots.iter().map(|&p| GrowthNode::new_root(p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_child(&mut self, parent: NodeId, pos: Vec3, direction: Vec3) -> NodeId {
        let id: usize = self.nodes.len();
        self.nodes.push(GrowthNode::new_child(pos, direction, parent));
        self.nodes[parent].children.push(id);
        id
    }

    /// Whether `parent` already has a child within `tol` of `pos`. Used to
    /// avoid spawning duplicate children at the same spot.
    pub fn has_child_near(&self, parent: NodeId, pos: Vec3, tol: f32) -> bool {
        self.nodes[parent]
            .children
            .iter()
            .any(|&c| (self.nodes[c].pos - pos).length_squared() < tol * tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_roots_creates_one_root_per_position() {
        let g = GrowthGraph::from_roots(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(g.len(), 2);
        assert!(g.nodes.iter().all(|n| n.parent.is_none()));
        assert!(g.nodes.iter().all(|n| n.direction == Vec3::ZERO));
    }

    #[test]
    fn add_child_appends_and_links_both_ways() {
        let mut g = GrowthGraph::from_roots(&[Vec3::ZERO]);
        let dir = Vec3::new(1.0, 0.0, 0.0);
        let id = g.add_child(0, Vec3::new(2.0, 0.0, 0.0), dir);
        assert_eq!(id, 1);
        assert_eq!(g.nodes[id].parent, Some(0));
        assert_eq!(g.nodes[id].direction, dir);
        assert_eq!(g.nodes[0].children, vec![id]);
    }

    #[test]
    fn parent_indices_always_precede_children() {
        let mut g = GrowthGraph::from_roots(&[Vec3::ZERO]);
        let a = g.add_child(0, Vec3::new(1.0, 0.0, 0.0), Vec3::X);
        let b = g.add_child(a, Vec3::new(2.0, 0.0, 0.0), Vec3::X);
        g.add_child(b, Vec3::new(3.0, 0.0, 0.0), Vec3::X);
        for (id, node) in g.nodes.iter().enumerate() {
            if let Some(p) = node.parent {
                assert!(p < id);
            }
        }
    }

    #[test]
    fn has_child_near_detects_close_children_only() {
        let mut g = GrowthGraph::from_roots(&[Vec3::ZERO]);
        g.add_child(0, Vec3::new(2.0, 0.0, 0.0), Vec3::X);
        assert!(g.has_child_near(0, Vec3::new(2.05, 0.0, 0.0), 0.1));
        assert!(!g.has_child_near(0, Vec3::new(2.5, 0.0, 0.0), 0.1));
    }
}
