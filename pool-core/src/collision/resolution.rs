//! Collision resolution.
//!
//! Computes post-collision velocities from:
//! - Coefficient of restitution (bounciness)
//! - Friction at the contact (tangential impulse, spin change)
//! - Positional correction (separating interpenetrating bodies)
//!
//! ## Model assumptions
//!
//! - **Cushions as infinite mass**: the rail never moves from a ball impact.
//! - **Instantaneous collisions**: contact deformation is not simulated over
//!   time; the coefficients capture its integrated effect.
//! - **Linear-only ball-ball transfer**: the pair impulse acts along the
//!   contact normal and exchanges no spin. `BALL_IMPACT_DAMPING` compensates
//!   for the energy that spin coupling would carry away in reality.

use crate::collision::geometry::{Cushion, RayHit};
use crate::types::{constants, Ball, Vec3};

/// Factor applied to both balls' horizontal linear and angular velocity on
/// every ball-ball impact, on top of restitution. A tuning knob standing in
/// for the spin-to-spin transfer the impulse model does not carry; without
/// it, chains of near-elastic collisions ring on far too long.
pub const BALL_IMPACT_DAMPING: f64 = 0.97;

/// Outcome of a resolved ball-ball impact.
#[derive(Debug, Clone, Copy)]
pub struct BallImpact {
    /// Closing speed along the contact normal at the moment of impact.
    pub impact_speed: f64,
}

/// Resolve a ball-ball collision at time-of-impact fraction `t`.
///
/// Both balls are rewound to their impact positions, given equal-and-opposite
/// impulses along the contact normal with combined restitution
/// `min(e1, e2)`, damped, and separated so they no longer interpenetrate.
/// Both are woken and stamped with `now`, the absolute simulation time of
/// the sub-step.
///
/// Returns `None` when the contact turns out degenerate (coincident centers)
/// or the pair is already separating along the normal; per the error-handling
/// policy these are no-ops, never failures.
pub fn resolve_ball_ball(b1: &mut Ball, b2: &mut Ball, t: f64, now: f64) -> Option<BallImpact> {
    // Positions at the impact fraction
    let p1 = b1.prev_pos + b1.vel * t;
    let p2 = b2.prev_pos + b2.vel * t;

    let delta = p2 - p1;
    let distance = delta.magnitude();
    if distance < constants::EPSILON {
        return None; // coincident centers: no usable normal
    }
    let normal = delta / distance;

    // Separating along the normal already? Nothing to resolve.
    let closing = (b2.vel - b1.vel).dot(&normal);
    if closing >= 0.0 {
        return None;
    }

    b1.pos = p1;
    b2.pos = p2;

    // Impulse with combined restitution and inverse masses
    let restitution = b1.restitution.min(b2.restitution);
    let inv_mass_sum = b1.inv_mass() + b2.inv_mass();
    let j = -(1.0 + restitution) * closing / inv_mass_sum;
    let impulse = normal * j;

    b1.vel -= impulse * b1.inv_mass();
    b2.vel += impulse * b2.inv_mass();

    // Post-impact damping: horizontal linear + all angular components
    for ball in [&mut *b1, &mut *b2] {
        ball.vel.x *= BALL_IMPACT_DAMPING;
        ball.vel.z *= BALL_IMPACT_DAMPING;
        ball.angular_vel = ball.angular_vel * BALL_IMPACT_DAMPING;
    }

    // Positional correction: split the overlap so the lighter ball moves
    // more (each ball moves in proportion to the *other* ball's mass).
    let overlap = (b1.radius + b2.radius) - distance;
    if overlap > 0.0 {
        let total_mass = b1.mass + b2.mass;
        b1.pos -= normal * (overlap * (b2.mass / total_mass));
        b2.pos += normal * (overlap * (b1.mass / total_mass));
    }

    b1.wake();
    b2.wake();
    b1.last_impact_time = now;
    b2.last_impact_time = now;

    log::trace!(
        "ball {} <-> ball {} impact, closing speed {:.3} m/s",
        b1.id,
        b2.id,
        -closing
    );

    Some(BallImpact {
        impact_speed: -closing,
    })
}

/// Resolve a ball-cushion collision from a narrow-phase hit.
///
/// The velocity is reflected about the face normal scaled by
/// `(1 + restitution)`, a Coulomb-capped friction impulse opposes the
/// tangential component (spinning the ball accordingly), and any residual
/// penetration is pushed out along the normal.
///
/// Returns `false` when the ball is not moving into the surface (already
/// rebounding), which skips the contact entirely.
pub fn resolve_ball_cushion(ball: &mut Ball, cushion: &Cushion, hit: &RayHit, now: f64) -> bool {
    let normal = hit.normal;

    let approach = ball.vel.dot(&normal);
    if approach >= 0.0 {
        return false; // already leaving the surface
    }

    // Reflect the normal component with restitution
    let restitution = cushion.restitution;
    ball.vel -= normal * ((1.0 + restitution) * approach);

    // Friction impulse against the tangential velocity at the contact
    let tangential = ball.vel - normal * ball.vel.dot(&normal);
    let tangential_speed = tangential.magnitude();
    if tangential_speed > constants::EPSILON {
        let tangent_dir = tangential / tangential_speed;

        // Coulomb limit from the normal impulse magnitude
        let normal_impulse = ball.mass * (1.0 + restitution) * (-approach);
        let max_friction = cushion.friction * normal_impulse;
        let stopping = tangential_speed * ball.mass;
        let j = max_friction.min(stopping);

        let friction_impulse = tangent_dir * (-j);
        ball.vel += friction_impulse * ball.inv_mass();

        // The same impulse torques the ball about the contact point
        let r_to_contact = normal * (-ball.radius);
        let angular_impulse = r_to_contact.cross(&friction_impulse);
        ball.angular_vel += angular_impulse / ball.inertia();
    }

    // Push any residual penetration out along the normal
    let depth = ball.radius - (ball.pos - hit.point).dot(&normal);
    if depth > 0.0 {
        ball.pos += normal * depth;
    }
    // Keep the next sweep consistent with the corrected position
    ball.prev_pos = ball.pos;

    ball.wake();
    ball.last_impact_time = now;

    log::trace!(
        "ball {} cushion impact, approach {:.3} m/s",
        ball.id,
        -approach
    );

    true
}

// =============================================================================
// Tests
// =============================================================================
