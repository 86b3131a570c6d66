//! Physical forces acting on the balls.
//!
//! This module implements the per-sub-step force application for billiards:
//!
//! - **Gravity**: Constant downward acceleration
//! - **Drag**: Air resistance opposing motion, proportional to v²
//! - **Cloth friction**: the static / sliding / rolling regime transition
//!
//! ## The slide-to-roll transition
//!
//! A struck ball initially *slides*: its contact point moves relative to the
//! cloth. Coulomb friction opposes that slip, simultaneously slowing the ball
//! and torquing it toward the spin rate of pure rolling. Once slip vanishes
//! the ball *rolls*, and only the much weaker rolling resistance acts:
//!
//! ```text
//! strike ──► sliding (μ ≈ 0.2, fast decel, spin-up)
//!                │ slip → 0
//!                ▼
//!           rolling (μ_r ≈ 0.01, slow decel) ──► static lock
//! ```
//!
//! This transition is what makes travel distance and english realistic.

use crate::types::{constants, Ball, ClothProperties, Vec3};

/// Slip/linear speed below which the ball locks to the cloth (m/s).
pub const STATIC_FRICTION_THRESHOLD: f64 = 0.01;

/// Slip speed below which the contact is treated as pure rolling (m/s).
pub const SLIP_EPSILON: f64 = 1e-4;

/// Fraction of angular velocity kept per second while rolling.
const ROLL_SPIN_DECAY_BASE: f64 = 0.8;

/// Fraction of vertical-axis spin kept per second while the ball is locked
/// to the cloth. Drilling friction kills swerve spin in a couple of seconds.
const VERTICAL_SPIN_DECAY_BASE: f64 = 0.2;

/// Angular velocity components below this snap to exactly zero (rad/s).
const ANGULAR_SNAP_EPSILON: f64 = 1e-3;

/// Squared speed below which drag is skipped (avoids normalizing ~zero).
const MIN_DRAG_SPEED_SQ: f64 = 1e-6;

/// Height above the cloth within which a ball counts as in surface contact (m).
const CONTACT_TOLERANCE: f64 = 1e-3;

/// Complete force model for the table.
///
/// Combines gravity, aerodynamic drag, and cloth friction.
pub struct TableForces {
    /// Air density in kg/m³ (default: sea level at 20°C)
    pub air_density: f64,

    /// Gravity vector (default: -9.81 in Y)
    pub gravity: Vec3,

    /// Enable/disable individual forces (useful for testing)
    pub enable_gravity: bool,
    pub enable_drag: bool,
    pub enable_friction: bool,
}

impl Default for TableForces {
    fn default() -> Self {
        Self {
            air_density: constants::AIR_DENSITY,
            gravity: Vec3::new(0.0, -constants::GRAVITY, 0.0),
            enable_gravity: true,
            enable_drag: true,
            enable_friction: true,
        }
    }
}

impl TableForces {
    /// Create a new force model with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a force model with only gravity (for testing).
    pub fn gravity_only() -> Self {
        Self {
            enable_drag: false,
            enable_friction: false,
            ..Self::default()
        }
    }

    /// Create a force model with friction only (for slide/roll tests).
    pub fn friction_only() -> Self {
        Self {
            enable_gravity: false,
            enable_drag: false,
            ..Self::default()
        }
    }

    /// Apply one sub-step of forces to a ball's velocities.
    ///
    /// `surface_y` is the cloth plane height; friction only acts while the
    /// ball is in contact with it. Resting balls are the caller's concern
    /// (the orchestrator never passes them in).
    pub fn apply(&self, ball: &mut Ball, cloth: &ClothProperties, surface_y: f64, dt: f64) {
        if self.enable_gravity {
            ball.vel += self.gravity * dt;
        }

        if self.enable_drag {
            self.apply_drag(ball, dt);
        }

        if self.enable_friction && Self::in_surface_contact(ball, surface_y) {
            self.apply_cloth_friction(ball, cloth, dt);
        }
    }

    fn in_surface_contact(ball: &Ball, surface_y: f64) -> bool {
        ball.pos.y - ball.radius - surface_y < CONTACT_TOLERANCE
    }

    /// Quadratic air drag: F = 0.5 * ρ * Cd * A * |v|², opposing velocity.
    ///
    /// Skipped below a minimal speed to avoid normalizing a near-zero vector.
    fn apply_drag(&self, ball: &mut Ball, dt: f64) {
        let speed_sq = ball.vel.magnitude_squared();
        if speed_sq < MIN_DRAG_SPEED_SQ {
            return;
        }

        let area = std::f64::consts::PI * ball.radius * ball.radius;
        let drag_force = 0.5 * self.air_density * ball.drag_coefficient * area * speed_sq;
        let drag_acc = drag_force / ball.mass;

        ball.vel += ball.vel.normalized() * (-drag_acc * dt);
    }

    /// Slip velocity of the contact point against the cloth.
    ///
    /// The contact point sits at the bottom of the ball, so spin about the
    /// horizontal axes adds tangential velocity there:
    /// slip = (vx + ωz·r, 0, vz − ωx·r).
    pub fn contact_slip(ball: &Ball) -> Vec3 {
        let r = ball.radius;
        Vec3::new(
            ball.vel.x + ball.angular_vel.z * r,
            0.0,
            ball.vel.z - ball.angular_vel.x * r,
        )
    }

    /// Select and apply the friction regime for this sub-step.
    fn apply_cloth_friction(&self, ball: &mut Ball, cloth: &ClothProperties, dt: f64) {
        let slip = Self::contact_slip(ball);
        let slip_speed = slip.magnitude();
        let horizontal_speed = ball.vel.horizontal_magnitude();

        if slip_speed < STATIC_FRICTION_THRESHOLD && horizontal_speed < STATIC_FRICTION_THRESHOLD {
            // Static: lock the ball to the cloth. Vertical-axis spin moves no
            // mass, so it only drains through drilling friction.
            ball.vel.x = 0.0;
            ball.vel.z = 0.0;
            ball.angular_vel.x = 0.0;
            ball.angular_vel.z = 0.0;
            ball.angular_vel.y *= VERTICAL_SPIN_DECAY_BASE.powf(dt);
            if ball.angular_vel.y.abs() < ANGULAR_SNAP_EPSILON {
                ball.angular_vel.y = 0.0;
            }
        } else if slip_speed > SLIP_EPSILON {
            self.apply_sliding_friction(ball, cloth, slip, slip_speed, dt);
        } else {
            self.apply_rolling_friction(ball, cloth, dt);
        }
    }

    /// Coulomb friction against the slip direction, with the matching torque
    /// that spins the ball toward pure rolling.
    ///
    /// The impulse is capped at the amount that would zero the slip outright
    /// (through the combined linear + angular response), so one long sub-step
    /// cannot overshoot into reverse slip.
    fn apply_sliding_friction(
        &self,
        ball: &mut Ball,
        cloth: &ClothProperties,
        slip: Vec3,
        slip_speed: f64,
        dt: f64,
    ) {
        let mu = ball.friction * cloth.friction_multiplier;
        let normal_force = ball.mass * constants::GRAVITY;

        let inertia = ball.inertia();
        let r = ball.radius;

        // Effective mass seen by a tangential impulse at the contact point
        let eff_mass = 1.0 / (1.0 / ball.mass + r * r / inertia);
        let required_impulse = slip_speed * eff_mass;
        let coulomb_impulse = mu * normal_force * dt;

        let impulse_vec = slip.normalized() * (-required_impulse.min(coulomb_impulse));

        ball.vel += impulse_vec / ball.mass;

        // Torque about the contact: r points from center to contact (straight down)
        let r_to_contact = Vec3::new(0.0, -r, 0.0);
        let angular_impulse = r_to_contact.cross(&impulse_vec);
        ball.angular_vel += angular_impulse / inertia;
    }

    /// Rolling resistance: a small deceleration opposing travel plus gentle
    /// exponential spin decay, with near-zero components snapped to zero.
    fn apply_rolling_friction(&self, ball: &mut Ball, cloth: &ClothProperties, dt: f64) {
        let horizontal = ball.vel.horizontal();
        let h_speed = horizontal.magnitude();

        if h_speed > constants::EPSILON {
            let decel = cloth.rolling_friction * constants::GRAVITY;
            let dv = (decel * dt).min(h_speed);
            ball.vel += horizontal.normalized() * (-dv);
        }

        let keep = ROLL_SPIN_DECAY_BASE.powf(dt);
        ball.angular_vel = ball.angular_vel * keep;

        if ball.angular_vel.x.abs() < ANGULAR_SNAP_EPSILON {
            ball.angular_vel.x = 0.0;
        }
        if ball.angular_vel.y.abs() < ANGULAR_SNAP_EPSILON {
            ball.angular_vel.y = 0.0;
        }
        if ball.angular_vel.z.abs() < ANGULAR_SNAP_EPSILON {
            ball.angular_vel.z = 0.0;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BallProperties;

    fn ball_on_cloth(vel: Vec3, spin: Vec3) -> Ball {
        let props = BallProperties::default();
        let mut ball = Ball::new(0, Vec3::new(0.0, props.radius, 0.0), &props).unwrap();
        ball.wake();
        ball.vel = vel;
        ball.angular_vel = spin;
        ball
    }

    #[test]
    fn test_gravity_only() {
        let forces = TableForces::gravity_only();
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(Vec3::ZERO, Vec3::ZERO);
        // Lift it off the cloth so only gravity acts
        ball.pos.y = 0.5;

        forces.apply(&mut ball, &cloth, 0.0, 0.1);

        assert!(ball.vel.x.abs() < constants::EPSILON);
        assert!(
            (ball.vel.y + constants::GRAVITY * 0.1).abs() < constants::EPSILON,
            "expected free fall, got vy={}",
            ball.vel.y
        );
        assert!(ball.vel.z.abs() < constants::EPSILON);
    }

    #[test]
    fn test_drag_opposes_motion() {
        let forces = TableForces {
            enable_gravity: false,
            enable_friction: false,
            ..TableForces::default()
        };
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO);

        forces.apply(&mut ball, &cloth, 0.0, 0.01);

        assert!(ball.vel.x < 3.0, "drag should slow the ball");
        assert!(ball.vel.x > 2.9, "drag on a billiard ball is small");
        assert!(ball.vel.z.abs() < constants::EPSILON);
    }

    #[test]
    fn test_drag_skipped_near_rest() {
        let forces = TableForces {
            enable_gravity: false,
            enable_friction: false,
            ..TableForces::default()
        };
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(Vec3::new(1e-5, 0.0, 0.0), Vec3::ZERO);

        forces.apply(&mut ball, &cloth, 0.0, 0.01);

        assert_eq!(ball.vel.x, 1e-5, "below threshold, drag must not touch v");
    }

    #[test]
    fn test_static_regime_locks_ball() {
        let forces = TableForces::friction_only();
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(
            Vec3::new(0.005, 0.0, 0.002),
            Vec3::new(0.01, 0.5, 0.01),
        );

        forces.apply(&mut ball, &cloth, 0.0, 0.001);

        assert_eq!(ball.vel.x, 0.0);
        assert_eq!(ball.vel.z, 0.0);
        assert_eq!(ball.angular_vel.x, 0.0);
        assert_eq!(ball.angular_vel.z, 0.0);
        // Vertical-axis spin survives the static lock, minus drilling decay
        assert!(
            ball.angular_vel.y > 0.49 && ball.angular_vel.y < 0.5,
            "swerve spin should decay gently, got {}",
            ball.angular_vel.y
        );
    }

    #[test]
    fn test_sliding_reduces_slip() {
        let forces = TableForces::friction_only();
        let cloth = ClothProperties::default();
        // Struck ball: translating fast, not yet spinning
        let mut ball = ball_on_cloth(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);

        let slip_before = TableForces::contact_slip(&ball).magnitude();
        forces.apply(&mut ball, &cloth, 0.0, 0.001);
        let slip_after = TableForces::contact_slip(&ball).magnitude();

        assert!(
            slip_after < slip_before,
            "sliding friction must reduce slip: {} -> {}",
            slip_before,
            slip_after
        );
    }

    #[test]
    fn test_sliding_spins_ball_toward_rolling() {
        let forces = TableForces::friction_only();
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);

        forces.apply(&mut ball, &cloth, 0.0, 0.001);

        // Rolling forward along +X means spinning about -Z
        assert!(
            ball.angular_vel.z < 0.0,
            "friction should spin the ball toward rolling, got wz={}",
            ball.angular_vel.z
        );
    }

    #[test]
    fn test_sliding_converges_to_rolling_before_stopping() {
        // Launched flat with no spin and zero rolling friction: slip must die
        // out (pure rolling) while the ball is still clearly translating.
        let forces = TableForces::friction_only();
        let mut cloth = ClothProperties::default();
        cloth.rolling_friction = 0.0;

        let mut ball = ball_on_cloth(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);

        let dt = 0.001;
        let mut rolled_at_speed = 0.0;
        for _ in 0..4000 {
            forces.apply(&mut ball, &cloth, 0.0, dt);
            if TableForces::contact_slip(&ball).magnitude() < SLIP_EPSILON {
                rolled_at_speed = ball.vel.horizontal_magnitude();
                break;
            }
        }

        assert!(
            rolled_at_speed > 1.0,
            "ball must reach pure rolling while still moving, speed={}",
            rolled_at_speed
        );
        // Sliding 2/7 of the launch speed away is the classic result for a
        // solid sphere: v_roll = 5/7 * v0.
        assert!(
            (rolled_at_speed - 2.0 * 5.0 / 7.0).abs() < 0.05,
            "rolling onset speed should be ~5/7 of launch, got {}",
            rolled_at_speed
        );
    }

    #[test]
    fn test_rolling_friction_decelerates_slowly() {
        let forces = TableForces::friction_only();
        let cloth = ClothProperties::default();
        // Pure rolling: wz = -vx / r
        let props = BallProperties::default();
        let spin = Vec3::new(0.0, 0.0, -1.0 / props.radius);
        let mut ball = ball_on_cloth(Vec3::new(1.0, 0.0, 0.0), spin);

        forces.apply(&mut ball, &cloth, 0.0, 0.01);

        let expected_dv = cloth.rolling_friction * constants::GRAVITY * 0.01;
        assert!(
            (1.0 - ball.vel.x - expected_dv).abs() < 1e-6,
            "rolling decel should be mu_r * g, got vx={}",
            ball.vel.x
        );
    }

    #[test]
    fn test_airborne_ball_gets_no_friction() {
        let forces = TableForces::friction_only();
        let cloth = ClothProperties::default();
        let mut ball = ball_on_cloth(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        ball.pos.y = 0.2; // well above the cloth

        forces.apply(&mut ball, &cloth, 0.0, 0.01);

        assert_eq!(ball.vel.x, 1.0, "no cloth contact, no friction");
    }
}
