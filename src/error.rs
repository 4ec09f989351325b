use thiserror::Error;

/// Errors emitted by the simulation engines.
///
/// Every variant is surfaced synchronously at the call that triggers the
/// violating condition (construction, initialization, or a step/run call).
/// Nothing is deferred, and there is no retry logic anywhere in the crate:
/// all computation is deterministic given its inputs.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or mutually inconsistent configuration values, detected
    /// eagerly at construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A caller-supplied field does not match the configured resolution.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    /// Strict-mode stability check failed: the timestep exceeds the
    /// Courant-type bound for the configured diffusion rates.
    #[error("unstable parameters: dt {dt} exceeds stability bound {bound}")]
    UnstableParameters { dt: f32, bound: f32 },

    /// A backend was requested whose runtime prerequisite is unavailable.
    /// This is a hard failure; engines never fall back to another backend.
    #[error("backend unavailable: {0}")]
    Backend(&'static str),
}
