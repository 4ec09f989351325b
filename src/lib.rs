//! Core generative simulation engines for organic 3-D structure synthesis.
//!
//! Main components:
//! - [`field`] — grid substrate shared by the field-based engines.
//! - [`reaction_diffusion`] — Gray-Scott two-species field simulator with
//!   sequential and data-parallel backends.
//! - [`colonization`] — space colonization growth engine producing rooted
//!   node graphs.
//! - [`tunnelling`] — random-walk agents carving a scalar field.
//! - [`attractor`], [`graph`], [`influence_buffer`], [`spatial_grid`] —
//!   building blocks of the colonization engine.
//! - [`error`] — the crate-wide error taxonomy.
//! - [`types`] — shared type aliases and IDs.
//!
//! The engines are independent: each owns its own state, takes an explicit
//! seed, and produces plain fields or graphs for downstream mesh extraction
//! and export stages. Persistence and visualization are the caller's
//! responsibility.

pub mod attractor;
pub mod colonization;
pub mod error;
pub mod field;
pub mod graph;
pub mod influence_buffer;
pub mod reaction_diffusion;
pub mod spatial_grid;
pub mod tunnelling;
pub mod types;
