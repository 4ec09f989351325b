use crate::types::NodeId;
use glam::Vec3;
use rand::Rng;

/// Volume in which attractor points are sampled.
#[derive(Clone, Copy, Debug)]
pub enum SampleVolume {
    /// Axis-aligned box between `min` and `max`.
    Box { min: Vec3, max: Vec3 },
    /// Solid sphere around `center`.
    Sphere { center: Vec3, radius: f32 },
}

impl SampleVolume {
    /// Draws one point uniformly from the volume.
    ///
    /// Sphere sampling rejects draws from the bounding cube, so the number
    /// of RNG consumptions per point varies but stays deterministic for a
    /// fixed generator state.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec3 {
        match *self {
            SampleVolume::Box { min, max } => Vec3::new(
                rng.random_range(min.x..=max.x),
                rng.random_range(min.y..=max.y),
                rng.random_range(min.z..=max.z),
            ),
            SampleVolume::Sphere { center, radius } => loop {
                let p = Vec3::new(
                    rng.random_range(-radius..=radius),
                    rng.random_range(-radius..=radius),
                    rng.random_range(-radius..=radius),
                );
                if p.length_squared() <= radius * radius {
                    return center + p;
                }
            },
        }
    }

    /// Whether the volume has positive measure.
    pub fn is_valid(&self) -> bool {
        match *self {
            SampleVolume::Box { min, max } => min.x < max.x && min.y < max.y && min.z < max.z,
            SampleVolume::Sphere { radius, .. } => radius > 0.0,
        }
    }
}

/// A target point that guides growth. Transitions alive -> dead permanently
/// once consumed by a nearby node; never resurrected.
#[derive(Debug)]
pub struct Attractor {
    pub pos: Vec3,
    pub alive: bool,
    /// Node this attractor currently pulls on, refreshed each iteration.
    pub owner: Option<NodeId>,
}

#[derive(Debug)]
pub struct AttractorSet {
    pub points: Vec<Attractor>,
}

impl AttractorSet {
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        let points = positions
            .into_iter()
            .map(|pos| Attractor {
                pos,
                alive: true,
                owner: None,
            })
            .collect();

        Self { points }
    }

    pub fn sample(volume: &SampleVolume, count: usize, rng: &mut impl Rng) -> Self {
        let positions = (0..count).map(|_| volume.sample(rng)).collect();
        Self::from_positions(positions)
    }

    pub fn live_count(&self) -> usize {
        self.points.iter().filter(|a| a.alive).count()
    }
}
