//! The simulation world and per-frame step orchestrator.
//!
//! `World` owns every ball, cushion, and the spatial grid; nothing in the
//! core is global. The host calls [`World::step`] once per rendered frame
//! with the elapsed seconds (already clamped to something sane by the host)
//! and receives the frame's events back.
//!
//! ## Frame anatomy
//!
//! ```text
//! step(elapsed)
//! ├── idle fast path if every ball is resting
//! ├── sub-step count from peak speed   (no ball moves > radius/2 per step)
//! ├── grid rebuilt from scratch
//! ├── N × sub-step:
//! │     integrate forces → integrate positions → reindex grid
//! │     → ball-ball collisions → ball-cushion collisions → energy decay
//! └── post-step:
//!       table-plane bounce → resting classification
//!       → visual transform sync → pocket capture
//! ```
//!
//! The ordering inside a sub-step is part of the contract: collision passes
//! read velocities the integrator just wrote, and decay must see
//! post-collision velocities. Everything is single-threaded by design.

use crate::collision::detection::{ball_ball_toi, ball_cushion_hit};
use crate::collision::geometry::{Cushion, TriangleMesh};
use crate::collision::resolution::{resolve_ball_ball, resolve_ball_cushion};
use crate::forces::TableForces;
use crate::grid::{SpatialGrid, DEFAULT_CELL_SIZE};
use crate::integrator::{
    apply_energy_decay, classify_resting, integrate_forces, integrate_positions,
};
use crate::types::{
    Ball, BallProperties, ClothProperties, ConfigError, CushionMaterial, SimEvent, TableLayout,
    Vec3,
};

/// Sub-step count bounds. The lower bound keeps slow frames integrating;
/// the upper bound caps worst-case cost on a hard break.
const MIN_SUBSTEPS: u32 = 1;
const MAX_SUBSTEPS: u32 = 16;

/// Vertical impact speed below which a table-plane bounce settles instead
/// of rebounding (m/s).
const FLOOR_SETTLE_SPEED: f64 = 0.05;

/// Table-plane bounces stop after this many impacts regardless of speed.
const MAX_FLOOR_IMPACTS: u32 = 3;

/// The simulation world: all mutable physics state plus static geometry.
pub struct World {
    balls: Vec<Ball>,
    cushions: Vec<Cushion>,
    grid: SpatialGrid,
    layout: TableLayout,
    cloth: ClothProperties,
    forces: TableForces,
    time: f64,
    max_ball_radius: f64,
    min_ball_radius: f64,
}

impl World {
    pub fn new(layout: TableLayout) -> Result<Self, ConfigError> {
        if layout.capture_radius <= 0.0 {
            return Err(ConfigError::NonPositiveCaptureRadius(layout.capture_radius));
        }
        Ok(Self {
            balls: Vec::new(),
            cushions: Vec::new(),
            grid: SpatialGrid::new(DEFAULT_CELL_SIZE),
            layout,
            cloth: ClothProperties::default(),
            forces: TableForces::default(),
            time: 0.0,
            max_ball_radius: 0.0,
            min_ball_radius: f64::INFINITY,
        })
    }

    /// Swap the cloth (affects friction regimes and table-plane bounces).
    pub fn set_cloth(&mut self, cloth: ClothProperties) {
        self.cloth = cloth;
    }

    /// Add a ball at `pos`. Returns its id. Balls are never removed.
    pub fn add_ball(&mut self, pos: Vec3, props: &BallProperties) -> Result<usize, ConfigError> {
        let id = self.balls.len();
        let ball = Ball::new(id, pos, props)?;
        self.max_ball_radius = self.max_ball_radius.max(ball.radius);
        self.min_ball_radius = self.min_ball_radius.min(ball.radius);
        self.balls.push(ball);
        Ok(id)
    }

    /// Add a static cushion from an already world-positioned mesh.
    pub fn add_cushion(
        &mut self,
        mesh: TriangleMesh,
        material: &CushionMaterial,
    ) -> Result<usize, ConfigError> {
        let cushion = Cushion::new(mesh, material)?;
        self.cushions.push(cushion);
        Ok(self.cushions.len() - 1)
    }

    /// Apply the cue-strike impulse to a ball.
    ///
    /// `force` is the impulse magnitude (N·s): the velocity change is
    /// `direction * force / mass` regardless of `spin` or `contact_point`.
    /// `spin` adds directly to angular velocity; an off-center
    /// `contact_point` adds torque-induced spin on top.
    pub fn strike(
        &mut self,
        ball_id: usize,
        direction: Vec3,
        force: f64,
        spin: Vec3,
        contact_point: Option<Vec3>,
    ) -> Result<(), ConfigError> {
        let ball = self
            .balls
            .get_mut(ball_id)
            .ok_or(ConfigError::UnknownBall(ball_id))?;

        let dir = direction.normalized();
        if dir == Vec3::ZERO {
            return Err(ConfigError::ZeroDirection);
        }

        ball.wake();
        let impulse = dir * force;
        ball.vel += impulse * ball.inv_mass();
        ball.angular_vel += spin;

        if let Some(point) = contact_point {
            let r_to_contact = point - ball.pos;
            let angular_impulse = r_to_contact.cross(&impulse);
            ball.angular_vel += angular_impulse / ball.inertia();
        }

        log::debug!(
            "strike ball {}: impulse {:.3} N·s, dv {:.3} m/s",
            ball_id,
            force,
            force * ball.inv_mass()
        );
        Ok(())
    }

    /// Re-spot a ball (cue-ball return, rack reset). The ball is placed
    /// resting; its visual handle and identity are untouched.
    pub fn place_ball(&mut self, ball_id: usize, pos: Vec3) -> Result<(), ConfigError> {
        let ball = self
            .balls
            .get_mut(ball_id)
            .ok_or(ConfigError::UnknownBall(ball_id))?;
        ball.pos = pos;
        ball.sleep();
        ball.cell_key = None;
        Ok(())
    }

    /// Attach the renderer's opaque handle to a ball. The core never
    /// creates, destroys, or interprets it.
    pub fn set_visual(&mut self, ball_id: usize, handle: u64) -> Result<(), ConfigError> {
        let ball = self
            .balls
            .get_mut(ball_id)
            .ok_or(ConfigError::UnknownBall(ball_id))?;
        ball.visual = Some(handle);
        Ok(())
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn ball(&self, id: usize) -> Option<&Ball> {
        self.balls.get(id)
    }

    pub fn all_resting(&self) -> bool {
        self.balls.iter().all(|b| b.is_resting)
    }

    /// Absolute simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Sub-steps needed so no ball travels more than half the smallest
    /// radius per step, clamped to the configured bounds.
    fn substep_count(&self, elapsed: f64) -> u32 {
        let peak = self
            .balls
            .iter()
            .filter(|b| !b.is_resting)
            .map(Ball::speed)
            .fold(0.0_f64, f64::max);

        if peak <= 0.0 || !self.min_ball_radius.is_finite() {
            return MIN_SUBSTEPS;
        }

        let max_travel = self.min_ball_radius * 0.5;
        let needed = (peak * elapsed / max_travel).ceil() as u32;
        needed.clamp(MIN_SUBSTEPS, MAX_SUBSTEPS)
    }

    /// Advance the simulation by `elapsed` seconds and return the frame's
    /// events. Not re-entrant; the host calls this once per frame.
    pub fn step(&mut self, elapsed: f64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if elapsed <= 0.0 || self.balls.is_empty() {
            return events;
        }

        // Idle: nothing moves, nothing to do.
        if self.all_resting() {
            self.time += elapsed;
            return events;
        }

        // Full grid rebuild: resting balls must be indexed too, they are
        // still collision targets for anything moving.
        self.grid.clear();
        for ball in self.balls.iter_mut() {
            ball.cell_key = None;
        }
        for i in 0..self.balls.len() {
            self.grid.update(&mut self.balls[i]);
        }

        let substeps = self.substep_count(elapsed);
        let dt = elapsed / substeps as f64;
        log::trace!("frame {:.4}s in {} sub-steps", elapsed, substeps);

        for _ in 0..substeps {
            integrate_forces(
                &mut self.balls,
                &self.forces,
                &self.cloth,
                self.layout.surface_y,
                dt,
            );
            integrate_positions(&mut self.balls, dt);

            for i in 0..self.balls.len() {
                if !self.balls[i].is_resting {
                    self.grid.update(&mut self.balls[i]);
                }
            }

            self.resolve_ball_ball_pass(dt, &mut events);
            self.resolve_ball_cushion_pass(&mut events);

            apply_energy_decay(&mut self.balls, dt);
            self.time += dt;
        }

        self.post_step(elapsed, &mut events);
        events
    }

    /// Ball-ball CCD over grid-pruned pairs.
    ///
    /// Pairs of moving balls are processed once under the `i < j` invariant;
    /// a resting target is only discoverable from the moving ball's query,
    /// so that pair is processed regardless of id order.
    fn resolve_ball_ball_pass(&mut self, dt: f64, events: &mut Vec<SimEvent>) {
        let now = self.time;
        for i in 0..self.balls.len() {
            if self.balls[i].is_resting {
                continue;
            }
            let candidates = self.grid.collision_candidates(&self.balls[i]);
            for j in candidates {
                if j > i || self.balls[j].is_resting {
                    let (a, b) = pair_mut(&mut self.balls, i, j);
                    if let Some(t) = ball_ball_toi(a, b, dt) {
                        if let Some(impact) = resolve_ball_ball(a, b, t, now) {
                            events.push(SimEvent::BallsCollided {
                                a: i,
                                b: j,
                                impact_speed: impact.impact_speed,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Ball-cushion CCD, cushion by cushion per ball. Within one sub-step at
    /// most one true cushion contact is physically expected per ball, so no
    /// cross-cushion ordering is defined.
    fn resolve_ball_cushion_pass(&mut self, events: &mut Vec<SimEvent>) {
        let now = self.time;
        for i in 0..self.balls.len() {
            if self.balls[i].is_resting {
                continue;
            }
            for (ci, cushion) in self.cushions.iter().enumerate() {
                if let Some(hit) = ball_cushion_hit(&self.balls[i], cushion, self.max_ball_radius) {
                    if resolve_ball_cushion(&mut self.balls[i], cushion, &hit, now) {
                        events.push(SimEvent::CushionHit { ball: i, cushion: ci });
                    }
                }
            }
        }
    }

    /// After all sub-steps: table-plane bounce, resting classification,
    /// visual sync, and pocket capture.
    ///
    /// The floor resolves before classification on purpose: gravity
    /// accumulates downward velocity over the frame's sub-steps, and a ball
    /// rolling on the cloth must shed it here or its motion metric would
    /// never drop below the resting threshold.
    fn post_step(&mut self, elapsed: f64, events: &mut Vec<SimEvent>) {
        let surface_y = self.layout.surface_y;
        let cloth_restitution = self.cloth.restitution;

        for ball in self.balls.iter_mut() {
            if ball.is_resting {
                continue;
            }

            // Table-plane (floor) collision. The cloth bed is not part of
            // the cushion mesh set, so it resolves separately here.
            let rest_height = surface_y + ball.radius;
            if ball.pos.y < rest_height && ball.vel.y < 0.0 {
                let impact_speed = -ball.vel.y;
                ball.pos.y = rest_height;

                if impact_speed < FLOOR_SETTLE_SPEED || ball.floor_impacts >= MAX_FLOOR_IMPACTS {
                    ball.vel.y = 0.0;
                } else {
                    ball.vel.y = impact_speed * cloth_restitution;
                    ball.floor_impacts += 1;
                }
            }

            if classify_resting(ball) {
                log::debug!("ball {} came to rest at {:?}", ball.id, ball.pos);
                events.push(SimEvent::CameToRest { ball: ball.id });
                continue;
            }

            // Visual transform: position is already current, orientation
            // advances from spin. The renderer reads both; the core never
            // touches the visual object itself.
            ball.orientation = ball.orientation.integrated(ball.angular_vel, elapsed);
        }

        // Pocket capture: a horizontal distance test against each center.
        // Only non-resting balls are tested, so a captured (now resting)
        // ball reports exactly once.
        let capture_radius = self.layout.capture_radius;
        for ball in self.balls.iter_mut() {
            if ball.is_resting {
                continue;
            }
            for (pi, pocket) in self.layout.pockets.iter().enumerate() {
                let dx = ball.pos.x - pocket.x;
                let dz = ball.pos.z - pocket.z;
                if (dx * dx + dz * dz).sqrt() < capture_radius {
                    ball.sleep();
                    log::debug!("ball {} pocketed in {}", ball.id, pocket.name);
                    events.push(SimEvent::Pocketed {
                        ball: ball.id,
                        pocket: pi,
                    });
                    break;
                }
            }
        }
    }
}

/// Mutable references to two distinct balls, in call order.
fn pair_mut(balls: &mut [Ball], i: usize, j: usize) -> (&mut Ball, &mut Ball) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = balls.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = balls.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

// =============================================================================
// Tests
// =============================================================================
