//! Agent-based field carving.
//!
//! Independent random-walk agents wander a [`Field`] and lower the cells
//! around their path, carving tunnels or perforations into a scalar field
//! (e.g. a reaction-diffusion output before isosurface extraction). Agents
//! never interact with each other; every carve clamps at an explicit floor,
//! so the order agents run in does not affect the final field.

use crate::error::SimError;
use crate::field::Field;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use tracing::debug;

/// What happens when an agent steps outside the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryBehavior {
    /// Negate the out-of-bounds direction component and mirror the position
    /// back inside.
    Reflect,
    /// Deactivate the agent.
    Kill,
    /// Map the position modulo the domain extents.
    Wrap,
}

/// How a visited cell is lowered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CarveMode {
    /// Subtract `reduction_amount` from the cell, clamped at the floor.
    Subtract,
    /// Multiply the cell by the factor (must be in (0, 1)), clamped at the
    /// floor. Matches the classic multiplicative tunnel carving.
    Scale(f32),
}

/// Configuration for [`TunnellingEngine`]. Validated once at construction.
#[derive(Clone, Debug)]
pub struct TunnellingConfig {
    pub agent_count: usize,
    /// Carve radius around the agent position, in domain units.
    pub tunnel_radius: f32,
    pub reduction_amount: f32,
    pub step_length: f32,
    /// Maximum angular perturbation per step, in radians.
    pub turn_noise: f32,
    pub max_steps: usize,
    pub boundary: BoundaryBehavior,
    pub carve_mode: CarveMode,
    /// Cells are never lowered below this value.
    pub floor: f32,
    pub seed: u64,
}

impl Default for TunnellingConfig {
    fn default() -> Self {
        Self {
            agent_count: 10,
            tunnel_radius: 1.5,
            reduction_amount: 0.3,
            step_length: 1.0,
            turn_noise: 0.5,
            max_steps: 100,
            boundary: BoundaryBehavior::Reflect,
            carve_mode: CarveMode::Subtract,
            floor: f32::MIN,
            seed: 0,
        }
    }
}

impl TunnellingConfig {
    fn validate(&self) -> Result<(), SimError> {
        if self.agent_count == 0 {
            return Err(SimError::Config("agent_count must be positive".into()));
        }
        if self.tunnel_radius <= 0.0 {
            return Err(SimError::Config(format!(
                "tunnel_radius must be positive, got {}",
                self.tunnel_radius
            )));
        }
        if self.reduction_amount <= 0.0 {
            return Err(SimError::Config(format!(
                "reduction_amount must be positive, got {} (a non-positive value performs no carving)",
                self.reduction_amount
            )));
        }
        if self.step_length <= 0.0 {
            return Err(SimError::Config(format!(
                "step_length must be positive, got {}",
                self.step_length
            )));
        }
        if self.turn_noise < 0.0 || !self.turn_noise.is_finite() {
            return Err(SimError::Config(format!(
                "turn_noise must be finite and non-negative, got {}",
                self.turn_noise
            )));
        }
        if self.max_steps == 0 {
            return Err(SimError::Config("max_steps must be positive".into()));
        }
        if let CarveMode::Scale(factor) = self.carve_mode
            && !(factor > 0.0 && factor < 1.0)
        {
            return Err(SimError::Config(format!(
                "scale carve factor must be in (0, 1), got {factor}"
            )));
        }
        Ok(())
    }
}

/// A random-walk actor. Deactivated when its step budget runs out or a
/// kill boundary triggers.
#[derive(Debug)]
pub struct Agent {
    pub pos: Vec3,
    /// Unit heading.
    pub dir: Vec3,
    pub steps_left: usize,
    pub active: bool,
}

#[derive(Debug)]
pub struct TunnellingEngine {
    config: TunnellingConfig,
    field: Field,
    agents: Vec<Agent>,
    /// Per-agent RNG seeds derived from the master seed, so results do not
    /// depend on agent scheduling.
    agent_seeds: Vec<u64>,
}

impl TunnellingEngine {
    /// Takes ownership of the field to carve and spawns the agents at
    /// seeded-random positions with seeded-random headings.
    pub fn new(config: TunnellingConfig, field: Field) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let rank = field.rank();
        let mut agents = Vec::with_capacity(config.agent_count);
        let mut agent_seeds = Vec::with_capacity(config.agent_count);

        for _ in 0..config.agent_count {
            let mut pos = Vec3::ZERO;
            for axis in 0..rank {
                pos[axis] = rng.random_range(0.0..field.extent(axis));
            }
            agents.push(Agent {
                pos,
                dir: random_unit(&mut rng, rank),
                steps_left: config.max_steps,
                active: true,
            });
            agent_seeds.push(rng.random());
        }

        Ok(Self {
            config,
            field,
            agents,
            agent_seeds,
        })
    }

    pub fn config(&self) -> &TunnellingConfig {
        &self.config
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn into_field(self) -> Field {
        self.field
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Steps every agent to completion and returns the number of cell
    /// carves applied.
    pub fn run(&mut self) -> usize {
        let mut carves = 0usize;
        for (agent, &seed) in self.agents.iter_mut().zip(&self.agent_seeds) {
            let mut rng = StdRng::seed_from_u64(seed);
            while agent.active {
                carves += step_agent(&self.config, &mut self.field, agent, &mut rng);
            }
        }
        debug!(
            agents = self.agents.len(),
            carves, "tunnelling run finished"
        );
        carves
    }
}

/// Uniform random unit vector; planar (z = 0) when `rank` is 2.
fn random_unit(rng: &mut StdRng, rank: usize) -> Vec3 {
    let theta = rng.random_range(0.0..TAU);
    if rank == 2 {
        Vec3::new(theta.cos(), theta.sin(), 0.0)
    } else {
        let z: f32 = rng.random_range(-1.0..=1.0);
        let r = (1.0 - z * z).sqrt();
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }
}

/// One agent step: perturb heading, advance, carve, apply the boundary
/// rule. Returns the number of cells carved.
fn step_agent(
    config: &TunnellingConfig,
    field: &mut Field,
    agent: &mut Agent,
    rng: &mut StdRng,
) -> usize {
    if config.turn_noise > 0.0 {
        let angle = rng.random_range(-config.turn_noise..=config.turn_noise);
        let rotation = if field.rank() == 2 {
            Quat::from_rotation_z(angle)
        } else {
            Quat::from_axis_angle(random_unit(rng, 3), angle)
        };
        agent.dir = (rotation * agent.dir).normalize_or_zero();
    }

    agent.pos += agent.dir * config.step_length;
    let carved = carve(config, field, agent.pos);
    apply_boundary(config, field, agent);

    agent.steps_left -= 1;
    if agent.steps_left == 0 {
        agent.active = false;
    }
    carved
}

/// Lowers every cell whose center lies within `tunnel_radius` of `pos`,
/// clamping at the configured floor.
fn carve(config: &TunnellingConfig, field: &mut Field, pos: Vec3) -> usize {
    let spacing = field.spacing();
    let dims = field.dims();
    let rank = field.rank();
    let r = config.tunnel_radius;
    let r2 = r * r;

    let mut lo = [0i64; 3];
    let mut hi = [0i64; 3];
    for axis in 0..3 {
        if axis >= rank {
            lo[axis] = 0;
            hi[axis] = 0;
            continue;
        }
        lo[axis] = (((pos[axis] - r) / spacing - 0.5).floor() as i64).max(0);
        hi[axis] = (((pos[axis] + r) / spacing - 0.5).ceil() as i64).min(dims[axis] as i64 - 1);
    }

    let mut carved = 0usize;
    for z in lo[2]..=hi[2] {
        for y in lo[1]..=hi[1] {
            for x in lo[0]..=hi[0] {
                let center = Vec3::new(
                    (x as f32 + 0.5) * spacing,
                    (y as f32 + 0.5) * spacing,
                    // Planar fields measure distance in the plane only.
                    if rank == 2 {
                        pos.z
                    } else {
                        (z as f32 + 0.5) * spacing
                    },
                );
                if (center - pos).length_squared() > r2 {
                    continue;
                }
                let (x, y, z) = (x as usize, y as usize, z as usize);
                let value = field.get(x, y, z);
                let lowered = match config.carve_mode {
                    CarveMode::Subtract => value - config.reduction_amount,
                    CarveMode::Scale(factor) => value * factor,
                };
                field.set(x, y, z, lowered.max(config.floor));
                carved += 1;
            }
        }
    }
    carved
}

fn apply_boundary(config: &TunnellingConfig, field: &Field, agent: &mut Agent) {
    let rank = field.rank();
    match config.boundary {
        BoundaryBehavior::Wrap => {
            for axis in 0..rank {
                agent.pos[axis] = agent.pos[axis].rem_euclid(field.extent(axis));
            }
        }
        BoundaryBehavior::Kill => {
            for axis in 0..rank {
                let extent = field.extent(axis);
                if agent.pos[axis] < 0.0 || agent.pos[axis] >= extent {
                    agent.active = false;
                    return;
                }
            }
        }
        BoundaryBehavior::Reflect => {
            for axis in 0..rank {
                let extent = field.extent(axis);
                if agent.pos[axis] < 0.0 {
                    agent.pos[axis] = -agent.pos[axis];
                    agent.dir[axis] = -agent.dir[axis];
                } else if agent.pos[axis] > extent {
                    agent.pos[axis] = 2.0 * extent - agent.pos[axis];
                    agent.dir[axis] = -agent.dir[axis];
                }
                // A step longer than the domain can still land outside
                // after one mirror; pin it to the domain in that case.
                agent.pos[axis] = agent.pos[axis].clamp(0.0, extent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BoundaryMode;

    fn cube_field(n: usize, fill: f32) -> Field {
        Field::new_3d(n, n, n, 1.0, BoundaryMode::Clamped, fill).unwrap()
    }

    fn base_config() -> TunnellingConfig {
        TunnellingConfig {
            agent_count: 4,
            tunnel_radius: 1.5,
            reduction_amount: 0.3,
            step_length: 1.0,
            turn_noise: 0.5,
            max_steps: 50,
            boundary: BoundaryBehavior::Wrap,
            seed: 42,
            ..TunnellingConfig::default()
        }
    }

    #[test]
    fn non_positive_reduction_amount_is_rejected() {
        for amount in [0.0, -0.5] {
            let config = TunnellingConfig {
                reduction_amount: amount,
                ..base_config()
            };
            assert!(matches!(
                TunnellingEngine::new(config, cube_field(8, 1.0)).unwrap_err(),
                SimError::Config(_)
            ));
        }
    }

    #[test]
    fn scale_factor_outside_unit_interval_is_rejected() {
        for factor in [0.0, 1.0, 1.5, -0.2] {
            let config = TunnellingConfig {
                carve_mode: CarveMode::Scale(factor),
                ..base_config()
            };
            assert!(TunnellingEngine::new(config, cube_field(8, 1.0)).is_err());
        }
    }

    #[test]
    fn negative_turn_noise_is_rejected() {
        for noise in [-0.1, f32::NEG_INFINITY, f32::NAN] {
            let config = TunnellingConfig {
                turn_noise: noise,
                ..base_config()
            };
            assert!(matches!(
                TunnellingEngine::new(config, cube_field(8, 1.0)).unwrap_err(),
                SimError::Config(_)
            ));
        }
    }

    #[test]
    fn zero_agent_count_and_zero_max_steps_are_rejected() {
        let config = TunnellingConfig {
            agent_count: 0,
            ..base_config()
        };
        assert!(TunnellingEngine::new(config, cube_field(8, 1.0)).is_err());

        let config = TunnellingConfig {
            max_steps: 0,
            ..base_config()
        };
        assert!(TunnellingEngine::new(config, cube_field(8, 1.0)).is_err());
    }

    #[test]
    fn carving_lowers_cells_along_the_path() {
        let mut engine = TunnellingEngine::new(base_config(), cube_field(16, 1.0)).unwrap();
        let carves = engine.run();
        assert!(carves > 0);
        assert!(engine.field().min_value() < 1.0);
    }

    #[test]
    fn no_cell_ever_falls_below_the_configured_floor() {
        let config = TunnellingConfig {
            agent_count: 8,
            reduction_amount: 0.4,
            max_steps: 200,
            floor: 0.2,
            ..base_config()
        };
        let mut engine = TunnellingEngine::new(config, cube_field(12, 1.0)).unwrap();
        engine.run();
        assert!(engine.field().min_value() >= 0.2);
        // Something must still have been carved down to the floor.
        assert!(engine.field().min_value() < 1.0);
    }

    #[test]
    fn scale_mode_multiplies_instead_of_subtracting() {
        let config = TunnellingConfig {
            carve_mode: CarveMode::Scale(0.5),
            floor: 0.0,
            max_steps: 5,
            agent_count: 1,
            turn_noise: 0.0,
            ..base_config()
        };
        let mut engine = TunnellingEngine::new(config, cube_field(16, 0.8)).unwrap();
        engine.run();
        // Carved cells hold 0.8 * 0.5^k for k >= 1; untouched cells hold 0.8.
        let touched: Vec<f32> = engine
            .field()
            .data()
            .iter()
            .copied()
            .filter(|&v| v < 0.8)
            .collect();
        assert!(!touched.is_empty());
        for v in touched {
            assert!(v > 0.0 && v <= 0.4 + 1e-6);
        }
    }

    #[test]
    fn kill_boundary_deactivates_escaping_agents() {
        let config = TunnellingConfig {
            boundary: BoundaryBehavior::Kill,
            step_length: 10.0, // guaranteed to leave an 8-cell domain fast
            max_steps: 1000,
            ..base_config()
        };
        let mut engine = TunnellingEngine::new(config, cube_field(8, 1.0)).unwrap();
        engine.run();
        assert!(engine.agents().iter().all(|a| !a.active));
        // Killed agents stop before exhausting their budget.
        assert!(engine.agents().iter().any(|a| a.steps_left > 0));
    }

    #[test]
    fn wrap_boundary_keeps_positions_inside_the_domain() {
        let config = TunnellingConfig {
            boundary: BoundaryBehavior::Wrap,
            step_length: 3.0,
            max_steps: 40,
            ..base_config()
        };
        let mut engine = TunnellingEngine::new(config, cube_field(8, 1.0)).unwrap();
        engine.run();
        for agent in engine.agents() {
            for axis in 0..3 {
                assert!(agent.pos[axis] >= 0.0 && agent.pos[axis] < 8.0);
            }
        }
    }

    #[test]
    fn reflect_boundary_keeps_positions_inside_the_domain() {
        let config = TunnellingConfig {
            boundary: BoundaryBehavior::Reflect,
            step_length: 2.5,
            max_steps: 60,
            ..base_config()
        };
        let mut engine = TunnellingEngine::new(config, cube_field(8, 1.0)).unwrap();
        engine.run();
        for agent in engine.agents() {
            for axis in 0..3 {
                assert!(agent.pos[axis] >= 0.0 && agent.pos[axis] <= 8.0);
            }
        }
    }

    #[test]
    fn runs_are_deterministic_for_a_fixed_seed() {
        let mut a = TunnellingEngine::new(base_config(), cube_field(12, 1.0)).unwrap();
        let mut b = TunnellingEngine::new(base_config(), cube_field(12, 1.0)).unwrap();
        assert_eq!(a.run(), b.run());
        assert_eq!(a.field().data(), b.field().data());
    }

    #[test]
    fn planar_fields_keep_agents_in_the_plane() {
        let field = Field::new_2d(16, 16, 1.0, BoundaryMode::Clamped, 1.0).unwrap();
        let mut engine = TunnellingEngine::new(base_config(), field).unwrap();
        engine.run();
        for agent in engine.agents() {
            assert_eq!(agent.pos.z, 0.0);
            assert_eq!(agent.dir.z, 0.0);
        }
        assert!(engine.field().min_value() < 1.0);
    }
}
