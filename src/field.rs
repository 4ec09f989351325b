use crate::error::SimError;

/// How stencil and boundary lookups behave at the edge of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Indices wrap modulo the axis length (toroidal domain).
    Periodic,
    /// The edge value is replicated, approximating a zero-flux boundary.
    Clamped,
}

/// A 2-D or 3-D grid of scalar values with fixed spacing and a boundary
/// handling mode. This is the substrate every engine operates on.
///
/// Values are stored flat in row-major order (`x` fastest). The shape is
/// fixed for the lifetime of the field; values are never clamped
/// implicitly — any flooring or range clamping is explicit policy of the
/// engine applying it.
#[derive(Clone, Debug)]
pub struct Field {
    dims: [usize; 3],
    rank: usize,
    spacing: f32,
    boundary: BoundaryMode,
    data: Vec<f32>,
}

impl Field {
    /// Creates a 2-D field of `width x height` cells filled with `fill`.
    pub fn new_2d(
        width: usize,
        height: usize,
        spacing: f32,
        boundary: BoundaryMode,
        fill: f32,
    ) -> Result<Self, SimError> {
        Self::new([width, height, 1], 2, spacing, boundary, fill)
    }

    /// Creates a 3-D field of `width x height x depth` cells filled with `fill`.
    pub fn new_3d(
        width: usize,
        height: usize,
        depth: usize,
        spacing: f32,
        boundary: BoundaryMode,
        fill: f32,
    ) -> Result<Self, SimError> {
        Self::new([width, height, depth], 3, spacing, boundary, fill)
    }

    fn new(
        dims: [usize; 3],
        rank: usize,
        spacing: f32,
        boundary: BoundaryMode,
        fill: f32,
    ) -> Result<Self, SimError> {
        for (axis, &n) in dims.iter().enumerate().take(rank) {
            if n == 0 {
                return Err(SimError::Config(format!(
                    "field axis {axis} must be non-zero"
                )));
            }
        }
        if spacing <= 0.0 {
            return Err(SimError::Config(format!(
                "field spacing must be positive, got {spacing}"
            )));
        }
        let len = dims[0] * dims[1] * dims[2];
        Ok(Self {
            dims,
            rank,
            spacing,
            boundary,
            data: vec![fill; len],
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// 2 for planar fields, 3 for volumetric ones.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Physical extent of an axis in domain units.
    pub fn extent(&self, axis: usize) -> f32 {
        self.dims[axis] as f32 * self.spacing
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let i = self.idx(x, y, z);
        self.data[i] = value;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Flat index of the cell one step along `axis` from `coord`, honoring
    /// the boundary mode. `dir` must be -1 or +1.
    #[inline]
    pub fn neighbor_index(&self, coord: [usize; 3], axis: usize, dir: i32) -> usize {
        let n = self.dims[axis];
        let c = coord[axis];
        let shifted = match self.boundary {
            BoundaryMode::Periodic => {
                if dir < 0 {
                    if c == 0 { n - 1 } else { c - 1 }
                } else if c + 1 == n {
                    0
                } else {
                    c + 1
                }
            }
            BoundaryMode::Clamped => {
                if dir < 0 {
                    c.saturating_sub(1)
                } else {
                    (c + 1).min(n - 1)
                }
            }
        };
        let mut coord = coord;
        coord[axis] = shifted;
        self.idx(coord[0], coord[1], coord[2])
    }

    /// Whether `other` has the same shape and rank.
    pub fn same_shape(&self, other: &Field) -> bool {
        self.dims == other.dims && self.rank == other.rank
    }

    /// Sum of all cell values, accumulated in f64 to keep the mass
    /// conservation property testable on large grids.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_2d_sets_shape_and_fill() {
        let f = Field::new_2d(4, 3, 1.0, BoundaryMode::Periodic, 0.5).unwrap();
        assert_eq!(f.dims(), [4, 3, 1]);
        assert_eq!(f.rank(), 2);
        assert_eq!(f.len(), 12);
        assert!(f.data().iter().all(|&v| v == 0.5));
    }

    #[test]
    fn zero_axis_is_a_config_error() {
        let err = Field::new_2d(0, 3, 1.0, BoundaryMode::Periodic, 0.0).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));

        let err = Field::new_3d(4, 4, 0, 1.0, BoundaryMode::Clamped, 0.0).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn non_positive_spacing_is_a_config_error() {
        let err = Field::new_2d(4, 4, 0.0, BoundaryMode::Periodic, 0.0).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn periodic_neighbor_wraps_around_both_ends() {
        let f = Field::new_2d(4, 3, 1.0, BoundaryMode::Periodic, 0.0).unwrap();
        // Left of x = 0 wraps to x = 3.
        assert_eq!(f.neighbor_index([0, 1, 0], 0, -1), f.idx(3, 1, 0));
        // Right of x = 3 wraps to x = 0.
        assert_eq!(f.neighbor_index([3, 1, 0], 0, 1), f.idx(0, 1, 0));
        // Above y = 2 wraps to y = 0.
        assert_eq!(f.neighbor_index([2, 2, 0], 1, 1), f.idx(2, 0, 0));
    }

    #[test]
    fn clamped_neighbor_replicates_edges() {
        let f = Field::new_2d(4, 3, 1.0, BoundaryMode::Clamped, 0.0).unwrap();
        assert_eq!(f.neighbor_index([0, 1, 0], 0, -1), f.idx(0, 1, 0));
        assert_eq!(f.neighbor_index([3, 1, 0], 0, 1), f.idx(3, 1, 0));
        // Interior lookups behave normally.
        assert_eq!(f.neighbor_index([1, 1, 0], 0, 1), f.idx(2, 1, 0));
    }

    #[test]
    fn total_and_extrema_track_cell_values() {
        let mut f = Field::new_2d(2, 2, 1.0, BoundaryMode::Periodic, 1.0).unwrap();
        f.set(1, 0, 0, -2.0);
        f.set(0, 1, 0, 5.0);
        assert_eq!(f.total(), 1.0 - 2.0 + 5.0 + 1.0);
        assert_eq!(f.min_value(), -2.0);
        assert_eq!(f.max_value(), 5.0);
    }

    #[test]
    fn same_shape_requires_matching_dims_and_rank() {
        let a = Field::new_2d(4, 4, 1.0, BoundaryMode::Periodic, 0.0).unwrap();
        let b = Field::new_2d(4, 4, 2.0, BoundaryMode::Clamped, 1.0).unwrap();
        let c = Field::new_2d(4, 5, 1.0, BoundaryMode::Periodic, 0.0).unwrap();
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }
}
