//! Space colonization growth engine.
//!
//! Grows a tree-structured node graph toward a cloud of attractor points.
//! Each iteration runs three phases, in the order:
//!
//! 1. *attraction* — each live attractor finds the nearest graph node
//!    within the influence radius and accumulates a pull direction for it.
//! 2. *growth* — every influenced node spawns one child in the averaged
//!    pull direction (plus optional tropism).
//! 3. *kill* — attractors within the kill radius of any node are marked
//!    consumed and stop participating.

use crate::attractor::{AttractorSet, SampleVolume};
use crate::error::SimError;
use crate::graph::GrowthGraph;
use crate::influence_buffer::InfluenceBuffer;
use crate::spatial_grid::SpatialGrid;
use crate::types::NodeId;
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::debug;

/// Configuration for [`SpaceColonizationEngine`]. Validated once at engine
/// construction; no partially-valid engine state is reachable.
#[derive(Clone, Debug)]
pub struct ColonizationConfig {
    pub attractor_count: usize,
    pub influence_radius: f32,
    /// Must not exceed `influence_radius`, otherwise attractors could never
    /// be consumed before going out of reach.
    pub kill_radius: f32,
    pub step_size: f32,
    pub max_iterations: usize,
    /// Run ends after this many consecutive iterations without growth.
    pub stagnation_limit: usize,
    pub volume: SampleVolume,
    /// Constant directional bias added to every growth direction
    /// (e.g. gravity or wind). Zero disables it.
    pub tropism: Vec3,
    pub seed: u64,
    pub roots: Vec<Vec3>,
}

impl Default for ColonizationConfig {
    fn default() -> Self {
        Self {
            attractor_count: 1000,
            influence_radius: 20.0,
            kill_radius: 5.0,
            step_size: 2.0,
            max_iterations: 200,
            stagnation_limit: 10,
            volume: SampleVolume::Box {
                min: Vec3::splat(-50.0),
                max: Vec3::splat(50.0),
            },
            tropism: Vec3::ZERO,
            seed: 0,
            roots: vec![Vec3::ZERO],
        }
    }
}

impl ColonizationConfig {
    fn validate(&self) -> Result<(), SimError> {
        if self.attractor_count == 0 {
            return Err(SimError::Config("attractor_count must be positive".into()));
        }
        if self.influence_radius <= 0.0 {
            return Err(SimError::Config(format!(
                "influence_radius must be positive, got {}",
                self.influence_radius
            )));
        }
        if self.kill_radius <= 0.0 {
            return Err(SimError::Config(format!(
                "kill_radius must be positive, got {}",
                self.kill_radius
            )));
        }
        if self.kill_radius > self.influence_radius {
            return Err(SimError::Config(format!(
                "kill_radius {} exceeds influence_radius {}",
                self.kill_radius, self.influence_radius
            )));
        }
        if self.step_size <= 0.0 {
            return Err(SimError::Config(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if self.max_iterations == 0 {
            return Err(SimError::Config("max_iterations must be positive".into()));
        }
        if self.stagnation_limit == 0 {
            return Err(SimError::Config("stagnation_limit must be positive".into()));
        }
        if !self.volume.is_valid() {
            return Err(SimError::Config(
                "attractor sampling volume has no interior".into(),
            ));
        }
        if self.roots.is_empty() {
            return Err(SimError::Config("at least one root node is required".into()));
        }
        Ok(())
    }
}

/// Why a colonization run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every attractor was consumed.
    AttractorsExhausted,
    /// The iteration budget ran out.
    MaxIterations,
    /// No node was created for `stagnation_limit` consecutive iterations.
    Stagnated,
}

/// Summary of a completed run.
#[derive(Clone, Copy, Debug)]
pub struct RunReport {
    pub iterations: usize,
    pub live_attractors: usize,
    pub termination: Termination,
}

#[derive(Debug)]
pub struct SpaceColonizationEngine {
    config: ColonizationConfig,
    graph: GrowthGraph,
    attractors: AttractorSet,
    grid: SpatialGrid,
    buffer: InfluenceBuffer,
}

impl SpaceColonizationEngine {
    /// Creates an engine with attractors sampled from the configured volume
    /// using the configured seed.
    pub fn new(config: ColonizationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let attractors = AttractorSet::sample(&config.volume, config.attractor_count, &mut rng);
        Self::build(config, attractors)
    }

    /// Creates an engine with a caller-supplied attractor cloud instead of
    /// sampling one; `attractor_count` is ignored in this path.
    pub fn with_attractor_positions(
        config: ColonizationConfig,
        positions: Vec<Vec3>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if positions.is_empty() {
            return Err(SimError::Config(
                "supplied attractor cloud must be non-empty".into(),
            ));
        }
        Self::build(config, AttractorSet::from_positions(positions))
    }

    fn build(config: ColonizationConfig, attractors: AttractorSet) -> Result<Self, SimError> {
        let graph = GrowthGraph::from_roots(&config.roots);
        let mut grid = SpatialGrid::new(config.influence_radius)?;
        for node in &graph.nodes {
            grid.insert(node.pos);
        }
        let buffer = InfluenceBuffer::with_len(graph.len());
        Ok(Self {
            config,
            graph,
            attractors,
            grid,
            buffer,
        })
    }

    pub fn config(&self) -> &ColonizationConfig {
        &self.config
    }

    pub fn graph(&self) -> &GrowthGraph {
        &self.graph
    }

    pub fn attractors(&self) -> &AttractorSet {
        &self.attractors
    }

    /// Runs one attraction/growth/kill iteration and returns the number of
    /// nodes created.
    pub fn iterate(&mut self) -> usize {
        self.attraction_phase();
        let created = self.growth_phase();
        self.kill_phase();
        created
    }

    /// Iterates until every attractor is consumed, the iteration budget is
    /// exhausted, or growth stagnates.
    pub fn run(&mut self) -> RunReport {
        let mut stagnant = 0usize;
        let mut iterations = 0usize;
        let termination = loop {
            if iterations == self.config.max_iterations {
                break Termination::MaxIterations;
            }
            let created = self.iterate();
            iterations += 1;

            if self.attractors.live_count() == 0 {
                break Termination::AttractorsExhausted;
            }
            if created == 0 {
                stagnant += 1;
                if stagnant >= self.config.stagnation_limit {
                    break Termination::Stagnated;
                }
            } else {
                stagnant = 0;
            }
        };

        let report = RunReport {
            iterations,
            live_attractors: self.attractors.live_count(),
            termination,
        };
        debug!(
            iterations = report.iterations,
            nodes = self.graph.len(),
            live_attractors = report.live_attractors,
            termination = ?report.termination,
            "colonization run finished"
        );
        report
    }

    /// Assigns every live attractor to its nearest node within the
    /// influence radius (ties toward the lowest node id) and accumulates
    /// the pull directions.
    ///
    /// Assignment only reads the graph and spatial index, so it is
    /// evaluated in parallel across attractors; accumulation then walks the
    /// attractors in index order so the buffer contents are deterministic.
    fn attraction_phase(&mut self) {
        let grid = &self.grid;
        let radius = self.config.influence_radius;

        self.attractors
            .points
            .par_iter_mut()
            .filter(|a| a.alive)
            .for_each(|a| {
                a.owner = grid.nearest_within(a.pos, radius).map(|(id, _)| id);
            });

        self.buffer.ensure_len(self.graph.len());
        for a in self.attractors.points.iter().filter(|a| a.alive) {
            if let Some(id) = a.owner {
                let dir = (a.pos - self.graph.nodes[id].pos).normalize_or_zero();
                self.buffer.add(id, dir);
            }
        }
    }

    /// Spawns one child per influenced node, in ascending parent index
    /// order, and mirrors each new node into the spatial index.
    fn growth_phase(&mut self) -> usize {
        let mut to_add: Vec<(NodeId, Vec3, Vec3)> = Vec::with_capacity(16);

        for id in self.buffer.influenced_indices() {
            let mut dir = self.buffer.avg_dir(id);
            if dir.length_squared() > 0.0 {
                dir = dir.normalize();
            }

            dir += self.config.tropism;
            dir = dir.normalize_or_zero();
            if dir == Vec3::ZERO {
                continue;
            }

            let new_pos = self.graph.nodes[id].pos + dir * self.config.step_size;

            // Avoid spawning children that are too close to existing ones.
            if self
                .graph
                .has_child_near(id, new_pos, 0.1 * self.config.step_size)
            {
                continue;
            }

            to_add.push((id, new_pos, dir));
        }

        let created = to_add.len();
        for (parent, pos, dir) in to_add {
            self.graph.add_child(parent, pos, dir);
            self.grid.insert(pos);
        }
        created
    }

    /// Marks attractors within the kill radius of any node as consumed.
    /// Runs after growth so attractors near freshly created nodes are
    /// removed before the next iteration.
    fn kill_phase(&mut self) {
        let grid = &self.grid;
        let radius = self.config.kill_radius;

        self.attractors
            .points
            .par_iter_mut()
            .filter(|a| a.alive)
            .for_each(|a| {
                if grid.nearest_within(a.pos, radius).is_some() {
                    a.alive = false;
                    a.owner = None;
                }
            });
    }
}
