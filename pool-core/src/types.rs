//! Core types for the billiards physics simulation.
//!
//! All units are SI:
//! - Position: meters (m)
//! - Velocity: meters per second (m/s)
//! - Angular velocity: radians per second (rad/s)
//! - Mass: kilograms (kg)
//! - Force/impulse: Newtons (N) / Newton-seconds (N·s)

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Vec3 - 3D Vector
// =============================================================================

/// A 3D vector used for positions, velocities, impulses, and spin.
///
/// Coordinate system:
/// - X: horizontal, along the table length
/// - Y: vertical (positive upward, cloth surface near y = 0)
/// - Z: horizontal, along the table width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < 1e-10 {
            Self::ZERO
        } else {
            *self / mag
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Linear interpolation between two vectors
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }

    /// Reflect vector around a normal
    pub fn reflect(&self, normal: &Self) -> Self {
        *self - *normal * 2.0 * self.dot(normal)
    }

    /// The table-plane part of the vector, Y zeroed.
    pub fn horizontal(&self) -> Self {
        Self {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }

    /// Speed in the table plane only.
    pub fn horizontal_magnitude(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }
}

// Operator overloads for Vec3
impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Quat - orientation for renderer sync
// =============================================================================

/// Unit quaternion tracking a ball's visual orientation.
///
/// The physics itself is orientation-free (balls are spheres); the quaternion
/// exists so the host renderer can show the ball rolling. It is advanced from
/// angular velocity once per outer frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Rotation of `angle` radians about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = axis.normalized();
        let half = angle * 0.5;
        let s = half.sin();
        Self {
            w: half.cos(),
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// Renormalize to a unit quaternion (drift accumulates over many frames).
    pub fn normalized(&self) -> Quat {
        let mag = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if mag < 1e-10 {
            Quat::IDENTITY
        } else {
            Quat {
                w: self.w / mag,
                x: self.x / mag,
                y: self.y / mag,
                z: self.z / mag,
            }
        }
    }

    /// Advance the orientation by `angular_vel` over `dt` seconds.
    pub fn integrated(&self, angular_vel: Vec3, dt: f64) -> Quat {
        let angle = angular_vel.magnitude() * dt;
        if angle < 1e-12 {
            return *self;
        }
        Quat::from_axis_angle(angular_vel, angle).mul(self).normalized()
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// =============================================================================
// Ball
// =============================================================================

/// Complete dynamic state of one ball.
///
/// Balls are created once at rack setup and persist for the whole session;
/// pocketing marks them resting and relocates them, it never destroys them.
///
/// Invariants:
/// - `radius > 0`, `mass > 0` (enforced at construction)
/// - `is_resting == true` implies all six velocity components are exactly zero
/// - `prev_pos` holds the position at the start of the current integration
///   step, as the origin of the cushion sweep test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: usize,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Angular velocity in rad/s (right-hand rule).
    pub angular_vel: Vec3,
    pub radius: f64,
    pub mass: f64,
    /// Coefficient of restitution for ball-ball contact.
    pub restitution: f64,
    /// Sliding friction coefficient against the cloth.
    pub friction: f64,
    pub drag_coefficient: f64,
    /// Position at the start of the current integration step (CCD sweep origin).
    pub prev_pos: Vec3,
    pub is_resting: bool,
    /// Consecutive low-energy table-plane impacts; bouncing stops past a cap.
    pub floor_impacts: u32,
    /// Visual orientation for the renderer, integrated from `angular_vel`.
    pub orientation: Quat,
    /// Opaque handle to the ball's visual, owned entirely by the renderer.
    /// The core only carries it so hosts can map state back to their meshes.
    pub visual: Option<u64>,
    /// Last-occupied spatial grid cell, maintained by `SpatialGrid::update`.
    pub cell_key: Option<(i32, i32)>,
    /// Simulation time of the last collision this ball took part in.
    pub last_impact_time: f64,
}

impl Ball {
    /// Create a ball at `pos` from a material record.
    ///
    /// Fails fast on non-positive mass or radius: letting either through
    /// would propagate silently-wrong physics through every impulse divide.
    pub fn new(id: usize, pos: Vec3, props: &BallProperties) -> Result<Self, ConfigError> {
        if props.mass <= 0.0 {
            return Err(ConfigError::NonPositiveMass(props.mass));
        }
        if props.radius <= 0.0 {
            return Err(ConfigError::NonPositiveRadius(props.radius));
        }
        Ok(Self {
            id,
            pos,
            vel: Vec3::ZERO,
            angular_vel: Vec3::ZERO,
            radius: props.radius,
            mass: props.mass,
            restitution: props.restitution,
            friction: props.friction,
            drag_coefficient: props.drag_coefficient,
            prev_pos: pos,
            is_resting: true,
            floor_impacts: 0,
            orientation: Quat::IDENTITY,
            visual: None,
            cell_key: None,
            last_impact_time: 0.0,
        })
    }

    /// Moment of inertia of a solid sphere: I = (2/5) m r².
    pub fn inertia(&self) -> f64 {
        0.4 * self.mass * self.radius * self.radius
    }

    pub fn inv_mass(&self) -> f64 {
        1.0 / self.mass
    }

    pub fn speed(&self) -> f64 {
        self.vel.magnitude()
    }

    /// Kinetic energy (translational + rotational).
    pub fn kinetic_energy(&self) -> f64 {
        let translational = 0.5 * self.mass * self.vel.magnitude_squared();
        let rotational = 0.5 * self.inertia() * self.angular_vel.magnitude_squared();
        translational + rotational
    }

    /// Put the ball to sleep: resting flag set, all six components zeroed.
    /// The sweep origin is synced so a later wake starts from a clean state.
    pub fn sleep(&mut self) {
        self.is_resting = true;
        self.vel = Vec3::ZERO;
        self.angular_vel = Vec3::ZERO;
        self.prev_pos = self.pos;
    }

    /// Clear the resting flag (cue strike or incoming collision).
    pub fn wake(&mut self) {
        self.is_resting = false;
        self.floor_impacts = 0;
    }
}

// =============================================================================
// Material Properties
// =============================================================================

/// Physical properties of a ball, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallProperties {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub restitution: f64,
    pub friction: f64,
    pub drag_coefficient: f64,
}

impl BallProperties {
    /// Aramith Tournament 2 1/4" phenolic ball (common competition set).
    pub fn aramith_tournament() -> Self {
        Self {
            name: "Aramith Tournament".to_string(),
            mass: 0.17,        // 170g, regulation weight
            radius: 0.028575,  // 57.15mm diameter
            restitution: 0.95, // phenolic on phenolic
            friction: 0.2,     // sliding on worsted cloth
            drag_coefficient: 0.45,
        }
    }
}

impl Default for BallProperties {
    fn default() -> Self {
        Self::aramith_tournament()
    }
}

/// Physical properties of the playing cloth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothProperties {
    pub name: String,
    /// Multiplier on the ball's sliding friction coefficient (1.0 = tournament
    /// worsted; nappier club cloth runs higher).
    pub friction_multiplier: f64,
    /// Rolling resistance coefficient for the pure-rolling regime.
    pub rolling_friction: f64,
    /// Restitution of the cloth-over-slate bed for vertical bounces.
    pub restitution: f64,
}

impl ClothProperties {
    /// Simonis 860 worsted tournament cloth.
    pub fn simonis_860() -> Self {
        Self {
            name: "Simonis 860".to_string(),
            friction_multiplier: 1.0,
            rolling_friction: 0.01,
            restitution: 0.5,
        }
    }
}

impl Default for ClothProperties {
    fn default() -> Self {
        Self::simonis_860()
    }
}

/// Physical properties of cushion rubber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CushionMaterial {
    pub name: String,
    pub restitution: f64,
    pub friction: f64,
    pub rolling_friction: f64,
}

impl CushionMaterial {
    /// K-66 profile gum rubber, the common pool-table cushion.
    pub fn k66_profile() -> Self {
        Self {
            name: "K-66 Profile".to_string(),
            restitution: 0.85,
            friction: 0.14,
            rolling_friction: 0.01,
        }
    }
}

impl Default for CushionMaterial {
    fn default() -> Self {
        Self::k66_profile()
    }
}

// =============================================================================
// Table Layout
// =============================================================================

/// One pocket's position on the table plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocketSpec {
    pub name: String,
    pub x: f64,
    pub z: f64,
}

/// Table geometry as this core consumes it: the playing plane, its extents,
/// and pocket capture volumes. Cushion *shapes* are supplied separately as
/// meshes; this record never describes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    pub name: String,
    /// Y coordinate of the cloth; resting balls sit at y = surface_y + radius.
    pub surface_y: f64,
    pub half_length: f64,
    pub half_width: f64,
    /// Horizontal distance from a pocket center at which a ball is captured.
    pub capture_radius: f64,
    pub pockets: Vec<PocketSpec>,
}

impl TableLayout {
    /// A 9-foot tournament table: 2.54m x 1.27m playing field, six pockets.
    pub fn nine_foot() -> Self {
        let hl = 1.27;
        let hw = 0.635;
        let pocket = |name: &str, sx: f64, sz: f64| PocketSpec {
            name: name.to_string(),
            x: sx * hl,
            z: sz * hw,
        };
        Self {
            name: "9ft Tournament".to_string(),
            surface_y: 0.0,
            half_length: hl,
            half_width: hw,
            capture_radius: 0.062,
            pockets: vec![
                pocket("corner-nw", -1.0, -1.0),
                pocket("corner-ne", 1.0, -1.0),
                pocket("corner-sw", -1.0, 1.0),
                pocket("corner-se", 1.0, 1.0),
                pocket("side-n", 0.0, -1.0),
                pocket("side-s", 0.0, 1.0),
            ],
        }
    }

    /// Check if a point (x, z) is within the playing field bounds.
    pub fn is_on_table(&self, x: f64, z: f64) -> bool {
        x.abs() <= self.half_length && z.abs() <= self.half_width
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::nine_foot()
    }
}

// =============================================================================
// Events
// =============================================================================

/// What the simulation reports back to the host each frame.
///
/// The rules engine consumes `Pocketed` and `CameToRest`; renderers and audio
/// typically consume the impact events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    BallsCollided {
        a: usize,
        b: usize,
        impact_speed: f64,
    },
    CushionHit {
        ball: usize,
        cushion: usize,
    },
    Pocketed {
        ball: usize,
        pocket: usize,
    },
    CameToRest {
        ball: usize,
    },
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors that fail fast at construction time.
#[derive(Debug)]
pub enum ConfigError {
    NonPositiveMass(f64),
    NonPositiveRadius(f64),
    NonPositiveCaptureRadius(f64),
    EmptyCushionMesh,
    UnknownBall(usize),
    ZeroDirection,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveMass(m) => write!(f, "ball mass must be > 0, got {}", m),
            ConfigError::NonPositiveRadius(r) => write!(f, "ball radius must be > 0, got {}", r),
            ConfigError::NonPositiveCaptureRadius(r) => {
                write!(f, "pocket capture radius must be > 0, got {}", r)
            }
            ConfigError::EmptyCushionMesh => write!(f, "cushion mesh has no triangles"),
            ConfigError::UnknownBall(id) => write!(f, "no ball with id {}", id),
            ConfigError::ZeroDirection => write!(f, "direction vector has zero length"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// Physical Constants
// =============================================================================

/// Physical constants used in the simulation.
pub mod constants {
    /// Gravitational acceleration (m/s²)
    pub const GRAVITY: f64 = 9.81;

    /// Air density at sea level, 20°C (kg/m³)
    pub const AIR_DENSITY: f64 = 1.204;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a - b, Vec3::new(-3.0, -3.0, -3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(a.dot(&b), 32.0); // 1*4 + 2*5 + 3*6 = 32
    }

    #[test]
    fn test_vec3_cross_product() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert!((z.x).abs() < 1e-10);
        assert!((z.y).abs() < 1e-10);
        assert!((z.z - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_vec3_horizontal() {
        let v = Vec3::new(3.0, 7.0, 4.0);
        assert_eq!(v.horizontal(), Vec3::new(3.0, 0.0, 4.0));
        assert!((v.horizontal_magnitude() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_quat_integration_rotates() {
        // Half a turn about Y at pi rad/s for one second.
        let q = Quat::IDENTITY.integrated(Vec3::new(0.0, std::f64::consts::PI, 0.0), 1.0);
        // cos(pi/2) = 0, sin(pi/2) = 1 along Y
        assert!(q.w.abs() < 1e-10, "w should be ~0, got {}", q.w);
        assert!((q.y - 1.0).abs() < 1e-10, "y should be ~1, got {}", q.y);
    }

    #[test]
    fn test_quat_zero_spin_is_noop() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 0.5), 0.7);
        let q2 = q.integrated(Vec3::ZERO, 0.016);
        assert_eq!(q, q2);
    }

    #[test]
    fn test_ball_construction_rejects_bad_mass() {
        let mut props = BallProperties::default();
        props.mass = 0.0;
        let result = Ball::new(0, Vec3::ZERO, &props);
        assert!(matches!(result, Err(ConfigError::NonPositiveMass(_))));
    }

    #[test]
    fn test_ball_construction_rejects_bad_radius() {
        let mut props = BallProperties::default();
        props.radius = -0.01;
        let result = Ball::new(0, Vec3::ZERO, &props);
        assert!(matches!(result, Err(ConfigError::NonPositiveRadius(_))));
    }

    #[test]
    fn test_ball_sleep_zeroes_all_velocity() {
        let props = BallProperties::default();
        let mut ball = Ball::new(0, Vec3::ZERO, &props).unwrap();
        ball.wake();
        ball.vel = Vec3::new(1.0, 2.0, 3.0);
        ball.angular_vel = Vec3::new(4.0, 5.0, 6.0);

        ball.sleep();

        assert!(ball.is_resting);
        assert_eq!(ball.vel, Vec3::ZERO);
        assert_eq!(ball.angular_vel, Vec3::ZERO);
    }

    #[test]
    fn test_ball_kinetic_energy() {
        let props = BallProperties::default();
        let mut ball = Ball::new(0, Vec3::ZERO, &props).unwrap();
        ball.vel = Vec3::new(2.0, 0.0, 0.0);
        // KE = 0.5 * 0.17 * 4 = 0.34 J (translational only)
        assert!((ball.kinetic_energy() - 0.34).abs() < 1e-9);
    }

    #[test]
    fn test_table_bounds() {
        let table = TableLayout::nine_foot();
        assert!(table.is_on_table(0.0, 0.0));
        assert!(table.is_on_table(1.0, 0.5));
        assert!(!table.is_on_table(2.0, 0.0)); // beyond table length
        assert_eq!(table.pockets.len(), 6);
    }
}
