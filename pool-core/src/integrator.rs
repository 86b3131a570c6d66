//! Advancing ball state through one sub-step, plus the energy decay and
//! resting classification that bracket the collision passes.
//!
//! ## Why explicit sequential integration?
//!
//! The friction model is not a smooth acceleration: the static regime locks
//! velocity components to zero and the rolling regime snaps near-zero spin.
//! A higher-order integrator buys nothing against discontinuities like that,
//! so each sub-step applies forces to velocities first and then advances
//! positions with the updated velocities (semi-implicit):
//!
//! ```text
//! v += a(state) * dt        (forces, friction regime)
//! prev_pos = pos            (sweep origin for cushion CCD)
//! pos += v * dt
//! ```
//!
//! Sub-step size is chosen by the orchestrator so that no ball moves more
//! than half a radius per step, which keeps this scheme well-behaved.

use crate::forces::TableForces;
use crate::types::{Ball, ClothProperties, Vec3};

/// Fraction of linear velocity kept per second of simulated time, modelling
/// residual rolling resistance beyond the explicit friction regimes.
pub const LINEAR_DECAY_BASE: f64 = 0.99;

/// Fraction of angular velocity kept per second.
pub const ANGULAR_DECAY_BASE: f64 = 0.97;

/// Velocity components below this absolute value snap to zero, preventing
/// denormal drift from the exponential decay.
const VELOCITY_SNAP_EPSILON: f64 = 1e-6;

/// Combined linear speed + rotational proxy below which a ball is declared
/// at rest (m/s).
pub const RESTING_THRESHOLD: f64 = 0.008;

/// Apply forces to every non-resting ball's velocities for one sub-step.
pub fn integrate_forces(
    balls: &mut [Ball],
    forces: &TableForces,
    cloth: &ClothProperties,
    surface_y: f64,
    dt: f64,
) {
    for ball in balls.iter_mut().filter(|b| !b.is_resting) {
        forces.apply(ball, cloth, surface_y, dt);
    }
}

/// Advance every non-resting ball's position by its velocity.
///
/// Also snapshots `prev_pos`, the origin of this sub-step's cushion sweep.
pub fn integrate_positions(balls: &mut [Ball], dt: f64) {
    for ball in balls.iter_mut().filter(|b| !b.is_resting) {
        ball.prev_pos = ball.pos;
        ball.pos += ball.vel * dt;
    }
}

/// Exponential energy decay on all velocity components of non-resting balls,
/// with sub-epsilon components snapped to exactly zero.
pub fn apply_energy_decay(balls: &mut [Ball], dt: f64) {
    let linear_keep = LINEAR_DECAY_BASE.powf(dt);
    let angular_keep = ANGULAR_DECAY_BASE.powf(dt);

    for ball in balls.iter_mut().filter(|b| !b.is_resting) {
        ball.vel = ball.vel * linear_keep;
        ball.angular_vel = ball.angular_vel * angular_keep;

        ball.vel = snap(ball.vel);
        ball.angular_vel = snap(ball.angular_vel);
    }
}

fn snap(v: Vec3) -> Vec3 {
    Vec3::new(
        if v.x.abs() < VELOCITY_SNAP_EPSILON { 0.0 } else { v.x },
        if v.y.abs() < VELOCITY_SNAP_EPSILON { 0.0 } else { v.y },
        if v.z.abs() < VELOCITY_SNAP_EPSILON { 0.0 } else { v.z },
    )
}

/// The resting metric: linear speed plus the surface speed the ball's spin
/// would produce. Spin about every axis counts; a ball with hidden swerve
/// spin still stores energy and must not freeze mid-rotation.
pub fn motion_metric(ball: &Ball) -> f64 {
    ball.speed() + ball.angular_vel.magnitude() * ball.radius
}

/// Classify one ball after a full frame of sub-steps.
///
/// Returns `true` when the ball transitions to resting on this call; the
/// transition zeroes all six velocity components so the resting invariant
/// holds exactly.
pub fn classify_resting(ball: &mut Ball) -> bool {
    if ball.is_resting {
        return false;
    }
    if motion_metric(ball) < RESTING_THRESHOLD {
        ball.sleep();
        return true;
    }
    false
}

// =============================================================================
// Tests
// =============================================================================
