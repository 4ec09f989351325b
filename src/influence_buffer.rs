use crate::types::NodeId;
use glam::Vec3;

/// A temporary buffer that accumulates directional influence per node.
///
/// For each `NodeId`, this buffer stores the sum of all incoming direction
/// vectors and the number of contributions that were added, so the
/// **average** pull direction for each node can be queried after the
/// attraction phase.
///
/// Internally, `dir[i]` and `count[i]` correspond to node `i`.
#[derive(Debug)]
pub struct InfluenceBuffer {
    /// Accumulated direction vectors for each node.
    dir: Vec<Vec3>,
    /// Number of contributions for each node.
    pub count: Vec<u32>,
}

impl InfluenceBuffer {
    /// Creates a new buffer with room for `len` nodes, all entries zeroed.
    pub fn with_len(len: usize) -> Self {
        Self {
            dir: vec![Vec3::ZERO; len],
            count: vec![0; len],
        }
    }

    /// Resizes the internal storage to exactly `len` entries and clears
    /// every entry, whether or not the length changed.
    pub fn ensure_len(&mut self, len: usize) {
        if self.dir.len() != len {
            self.dir.resize(len, Vec3::ZERO);
            self.count.resize(len, 0);
        }
        self.clear();
    }

    /// Clears all accumulated influences, keeping the length unchanged.
    pub fn clear(&mut self) {
        for v in &mut self.dir {
            *v = Vec3::ZERO;
        }
        for c in &mut self.count {
            *c = 0;
        }
    }

    /// Adds one directional influence for the given node.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds for the internal arrays.
    #[inline]
    pub fn add(&mut self, id: NodeId, dir: Vec3) {
        self.dir[id] += dir;
        self.count[id] += 1;
    }

    /// Average influence direction for a node, or `Vec3::ZERO` if the node
    /// received no contributions.
    #[inline]
    pub fn avg_dir(&self, id: NodeId) -> Vec3 {
        let c = self.count[id];
        if c == 0 {
            Vec3::ZERO
        } else {
            self.dir[id] / (c as f32)
        }
    }

    /// Whether the given node has received any influences.
    #[inline]
    pub fn is_influenced(&self, id: NodeId) -> bool {
        self.count[id] > 0
    }

    /// Iterator over all influenced node indices, in ascending order.
    pub fn influenced_indices<'a>(&'a self) -> impl Iterator<Item = NodeId> + 'a {
        self.count
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c > 0 { Some(i) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;
    use glam::Vec3;

    #[test]
    fn with_len_initializes_zeroed_state() {
        let len = 5;
        let buf = InfluenceBuffer::with_len(len);

        assert_eq!(buf.dir.len(), len);
        assert_eq!(buf.count.len(), len);

        for v in &buf.dir {
            assert_eq!(*v, Vec3::ZERO);
        }
        for c in &buf.count {
            assert_eq!(*c, 0);
        }
    }

    #[test]
    fn ensure_len_clears_even_when_length_is_unchanged() {
        let mut buf = InfluenceBuffer::with_len(3);
        let id: NodeId = 1;
        buf.add(id, Vec3::new(1.0, 2.0, 0.0));

        assert!(buf.is_influenced(id));

        buf.ensure_len(3);

        assert_eq!(buf.dir.len(), 3);
        assert!(!buf.is_influenced(id));
    }

    #[test]
    fn ensure_len_resizes_and_clears_when_different() {
        let mut buf = InfluenceBuffer::with_len(2);
        buf.add(0, Vec3::new(1.0, 0.0, 0.0));

        buf.ensure_len(4);
        assert_eq!(buf.dir.len(), 4);
        assert_eq!(buf.count.len(), 4);
        assert!(buf.influenced_indices().next().is_none());

        buf.ensure_len(1);
        assert_eq!(buf.dir.len(), 1);
        assert_eq!(buf.count[0], 0);
    }

    #[test]
    fn add_and_avg_dir_work_as_expected() {
        let mut buf = InfluenceBuffer::with_len(2);
        let id: NodeId = 1;

        assert_eq!(buf.avg_dir(id), Vec3::ZERO);
        assert!(!buf.is_influenced(id));

        buf.add(id, Vec3::new(1.0, 0.0, 0.0));
        buf.add(id, Vec3::new(3.0, 0.0, 0.0));

        assert!(buf.is_influenced(id));
        assert_eq!(buf.count[id], 2);
        assert_eq!(buf.avg_dir(id), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn influenced_indices_returns_only_nodes_with_nonzero_count() {
        let mut buf = InfluenceBuffer::with_len(4);
        buf.add(0, Vec3::new(1.0, 0.0, 0.0));
        buf.add(2, Vec3::new(0.0, 1.0, 0.0));

        let ids: Vec<NodeId> = buf.influenced_indices().collect();
        assert_eq!(ids, vec![0, 2]);

        buf.clear();
        let ids_after_clear: Vec<NodeId> = buf.influenced_indices().collect();
        assert!(ids_after_clear.is_empty());
    }
}
