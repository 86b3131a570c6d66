//! # Pool Core
//!
//! A rigid-body physics engine for realistic billiards simulation.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec3, Quat, Ball, material properties)
//! - `grid`: Uniform spatial grid for the ball-ball broad phase
//! - `forces`: Physical forces (gravity, drag, slide/roll cloth friction)
//! - `collision`: Swept detection and impulse resolution (balls, cushions)
//! - `integrator`: Sub-step advancement, energy decay, resting classification
//! - `materials`: YAML-based material configuration loader
//! - `simulation`: The `World` and per-frame step orchestrator
//!
//! The host drives the core through [`simulation::World`]: build a table,
//! add balls and cushion meshes, apply cue strikes, and call
//! `step(elapsed_seconds)` once per rendered frame.

pub mod collision;
pub mod forces;
pub mod grid;
pub mod integrator;
pub mod materials;
pub mod simulation;
pub mod types;
