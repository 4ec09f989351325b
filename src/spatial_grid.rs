use crate::error::SimError;
use crate::types::NodeId;
use glam::Vec3;
use std::collections::HashMap;

/// Uniform-grid spatial index over growth node positions.
///
/// Nodes are bucketed by `cell_size` cubes; nearest-in-radius queries only
/// visit the buckets overlapping the query sphere, giving sub-linear average
/// lookup once nodes spread across the domain. Insertion is incremental, so
/// the colonization engine can push new nodes as the graph grows instead of
/// rebuilding each iteration.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    buckets: HashMap<[i32; 3], Vec<NodeId>>,
    positions: Vec<Vec3>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Result<Self, SimError> {
        if cell_size <= 0.0 {
            return Err(SimError::Config(format!(
                "spatial grid cell size must be positive, got {cell_size}"
            )));
        }
        Ok(Self {
            cell_size,
            buckets: HashMap::new(),
            positions: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    fn cell_of(&self, pos: Vec3) -> [i32; 3] {
        [
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        ]
    }

    /// Inserts the next node. Ids must be inserted in ascending order so
    /// the index mirrors the append-only growth graph.
    pub fn insert(&mut self, pos: Vec3) -> NodeId {
        let id = self.positions.len();
        self.positions.push(pos);
        self.buckets.entry(self.cell_of(pos)).or_default().push(id);
        id
    }

    /// Nearest node within `radius` of `pos`, together with the squared
    /// distance. Distance ties are broken by the lowest node id, so the
    /// result does not depend on bucket visit order.
    pub fn nearest_within(&self, pos: Vec3, radius: f32) -> Option<(NodeId, f32)> {
        let r2 = radius * radius;
        let reach = (radius / self.cell_size).ceil() as i32;
        let base = self.cell_of(pos);

        let mut best: Option<(NodeId, f32)> = None;
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let key = [base[0] + dx, base[1] + dy, base[2] + dz];
                    let Some(ids) = self.buckets.get(&key) else {
                        continue;
                    };
                    for &id in ids {
                        let d2 = (self.positions[id] - pos).length_squared();
                        if d2 > r2 {
                            continue;
                        }
                        let better = match best {
                            None => true,
                            Some((bid, bd2)) => d2 < bd2 || (d2 == bd2 && id < bid),
                        };
                        if better {
                            best = Some((id, d2));
                        }
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_cell_size_is_a_config_error() {
        assert!(matches!(
            SpatialGrid::new(0.0).unwrap_err(),
            SimError::Config(_)
        ));
    }

    #[test]
    fn nearest_within_finds_the_closest_node() {
        let mut grid = SpatialGrid::new(5.0).unwrap();
        grid.insert(Vec3::new(0.0, 0.0, 0.0));
        grid.insert(Vec3::new(3.0, 0.0, 0.0));
        grid.insert(Vec3::new(10.0, 0.0, 0.0));

        let (id, d2) = grid.nearest_within(Vec3::new(4.0, 0.0, 0.0), 5.0).unwrap();
        assert_eq!(id, 1);
        assert!((d2 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_within_ignores_nodes_outside_radius() {
        let mut grid = SpatialGrid::new(2.0).unwrap();
        grid.insert(Vec3::new(100.0, 0.0, 0.0));
        assert!(grid.nearest_within(Vec3::ZERO, 5.0).is_none());
    }

    #[test]
    fn nearest_within_crosses_bucket_boundaries() {
        let mut grid = SpatialGrid::new(1.0).unwrap();
        // Node sits in a different bucket than the query point but well
        // inside the radius.
        grid.insert(Vec3::new(2.6, 0.0, 0.0));
        let (id, _) = grid.nearest_within(Vec3::new(0.2, 0.0, 0.0), 3.0).unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn distance_ties_break_toward_the_lowest_id() {
        let mut grid = SpatialGrid::new(4.0).unwrap();
        grid.insert(Vec3::new(-1.0, 0.0, 0.0));
        grid.insert(Vec3::new(1.0, 0.0, 0.0));

        let (id, d2) = grid.nearest_within(Vec3::ZERO, 2.0).unwrap();
        assert_eq!(id, 0);
        assert!((d2 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_coordinates_bucket_correctly() {
        let mut grid = SpatialGrid::new(2.0).unwrap();
        grid.insert(Vec3::new(-3.5, -0.5, -7.2));
        let (id, _) = grid
            .nearest_within(Vec3::new(-3.0, 0.0, -7.0), 2.0)
            .unwrap();
        assert_eq!(id, 0);
    }
}
