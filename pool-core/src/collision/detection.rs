//! Continuous collision detection.
//!
//! Discrete overlap tests fail at billiard speeds: a hard break sends the cue
//! ball several diameters per frame, straight through anything thin. Both
//! narrow phases here therefore sweep the motion of the sub-step:
//!
//! - **Ball-ball**: the classic swept-spheres quadratic. Solve
//!   `|Δp + Δv·t|² = R²` for the earliest root in `[0, dt]`.
//! - **Ball-cushion**: a segment cast from the ball's previous to current
//!   center against the cushion mesh, gated by a cheap AABB broad phase.
//!
//! Numerical degeneracies (zero relative velocity, negative discriminant,
//! zero-length sweeps) are all "no collision this step" by design: they
//! describe parallel or non-approaching trajectories, and the hot path never
//! aborts the frame.

use crate::collision::geometry::{Aabb, Cushion, RayHit, Sphere};
use crate::types::{constants, Ball};

/// Time of impact for two swept balls within `[0, dt]`.
///
/// Positions are taken from each ball's `prev_pos` (the sub-step sweep
/// origin) so the test covers exactly the motion that was just integrated:
/// `center(t) = prev_pos + vel·t`.
///
/// Returns `None` when the pair is separating, the trajectories never close
/// to contact distance, or the root falls outside the window. A pair already
/// overlapping at the start of the step reports `t = 0`.
pub fn ball_ball_toi(b1: &Ball, b2: &Ball, dt: f64) -> Option<f64> {
    let dp = b2.prev_pos - b1.prev_pos;
    let dv = b2.vel - b1.vel;
    let combined_radius = b1.radius + b2.radius;

    let c = dp.magnitude_squared() - combined_radius * combined_radius;
    if c < 0.0 {
        // Already interpenetrating at the step start; resolve immediately.
        return Some(0.0);
    }

    // Separating or parallel: relative position is not closing.
    if dp.dot(&dv) >= 0.0 {
        return None;
    }

    let a = dv.magnitude_squared();
    if a < constants::EPSILON {
        return None; // no relative motion
    }

    let b = 2.0 * dp.dot(&dv);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None; // closest approach never reaches contact distance
    }

    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    if (0.0..=dt).contains(&t) {
        Some(t)
    } else {
        None
    }
}

/// AABB covering a ball's swept volume over the last sub-step.
fn swept_ball_bounds(ball: &Ball) -> Aabb {
    let start = Sphere::new(ball.prev_pos, ball.radius);
    let end = Sphere::new(ball.pos, ball.radius);
    start.bounds().union(&end.bounds())
}

/// Detect a ball-cushion contact for this sub-step.
///
/// Broad phase: the ball's swept AABB against the cushion's cached,
/// radius-expanded bounds. Narrow phase: a segment cast of the center's
/// motion against the mesh. `max_ball_radius` is the largest radius in play,
/// fixed per world, so every cushion caches one conservative box.
pub fn ball_cushion_hit(ball: &Ball, cushion: &Cushion, max_ball_radius: f64) -> Option<RayHit> {
    if !swept_ball_bounds(ball).intersects(&cushion.bounds(max_ball_radius)) {
        return None;
    }
    cushion.mesh.raycast(ball.prev_pos, ball.pos)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::geometry::TriangleMesh;
    use crate::types::{BallProperties, CushionMaterial, Vec3};

    const R: f64 = 0.028575;

    fn ball_at(id: usize, pos: Vec3, vel: Vec3) -> Ball {
        let props = BallProperties::default();
        let mut b = Ball::new(id, pos, &props).unwrap();
        b.wake();
        b.vel = vel;
        b.prev_pos = pos;
        b
    }

    #[test]
    fn test_head_on_toi() {
        // Gap of 2R between surfaces, closing at 1 m/s
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(4.0 * R, 0.0, 0.0), Vec3::ZERO);

        let t = ball_ball_toi(&b1, &b2, 1.0).expect("should collide");
        // Centers start 4R apart, contact at 2R, closing speed 1
        assert!(
            (t - 2.0 * R).abs() < 1e-9,
            "expected t={}, got {}",
            2.0 * R,
            t
        );
    }

    #[test]
    fn test_separating_pair_never_collides() {
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(3.0 * R, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));

        assert!(ball_ball_toi(&b1, &b2, 1.0).is_none());
    }

    #[test]
    fn test_offset_paths_miss() {
        // Parallel tracks further apart than the contact distance
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(4.0 * R, 0.0, 3.0 * R), Vec3::ZERO);

        assert!(
            ball_ball_toi(&b1, &b2, 1.0).is_none(),
            "paths clear each other, no root"
        );
    }

    #[test]
    fn test_toi_outside_window() {
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);

        // Impact needs ~0.94s, window is 10ms
        assert!(ball_ball_toi(&b1, &b2, 0.01).is_none());
    }

    #[test]
    fn test_zero_relative_velocity() {
        let v = Vec3::new(2.0, 0.0, 0.0);
        let b1 = ball_at(0, Vec3::ZERO, v);
        let b2 = ball_at(1, Vec3::new(4.0 * R, 0.0, 0.0), v);

        assert!(ball_ball_toi(&b1, &b2, 1.0).is_none());
    }

    #[test]
    fn test_overlap_reports_immediate_impact() {
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(R, 0.0, 0.0), Vec3::ZERO);

        assert_eq!(ball_ball_toi(&b1, &b2, 0.01), Some(0.0));
    }

    #[test]
    fn test_high_speed_no_tunneling() {
        // 100 m/s would cross the other ball in a fraction of the window;
        // the swept test still finds the impact.
        let b1 = ball_at(0, Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
        let b2 = ball_at(1, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);

        let t = ball_ball_toi(&b1, &b2, 0.016).expect("swept test must catch this");
        assert!(t > 0.0 && t < 0.016);
    }

    fn wall_cushion() -> Cushion {
        let mesh = TriangleMesh::vertical_panel(1.0, -1.0, 1.0, 1.0, 0.0, 0.1);
        Cushion::new(mesh, &CushionMaterial::default()).unwrap()
    }

    #[test]
    fn test_cushion_sweep_hit() {
        let cushion = wall_cushion();
        let mut ball = ball_at(0, Vec3::new(0.9, R, 0.0), Vec3::new(2.0, 0.0, 0.0));
        // One sub-step later the center has crossed the wall plane
        ball.pos = Vec3::new(1.05, R, 0.0);

        let hit = ball_cushion_hit(&ball, &cushion, R).expect("should hit cushion");
        assert!((hit.point.x - 1.0).abs() < 1e-9);
        assert!(hit.normal.x < 0.0, "normal faces the incoming ball");
    }

    #[test]
    fn test_cushion_broad_phase_rejects_distant_ball() {
        let cushion = wall_cushion();
        let mut ball = ball_at(0, Vec3::new(-0.9, R, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        ball.pos = Vec3::new(-0.95, R, 0.0);

        assert!(ball_cushion_hit(&ball, &cushion, R).is_none());
    }

    #[test]
    fn test_cushion_no_hit_when_not_crossing() {
        let cushion = wall_cushion();
        let mut ball = ball_at(0, Vec3::new(0.9, R, 0.0), Vec3::new(1.0, 0.0, 0.0));
        ball.pos = Vec3::new(0.95, R, 0.0); // inside the expanded bounds, short of the wall

        assert!(ball_cushion_hit(&ball, &cushion, R).is_none());
    }
}
