//! Python bindings for the pool-core billiards physics engine.
//!
//! Provides a simple Python API:
//!
//! ```python
//! from pool_physics import Simulation, Vec3
//!
//! sim = Simulation()
//! cue = sim.add_ball(-0.5, 0.0)
//! obj = sim.add_ball(0.0, 0.0)
//! sim.strike(cue, 1.0, 0.0, 0.0, 0.34)
//!
//! while not sim.all_resting():
//!     events = sim.step(1.0 / 60.0)
//!     for e in events:
//!         print(e)
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use pool_core::collision::geometry::TriangleMesh;
use pool_core::simulation::World;
use pool_core::types::{
    BallProperties, ClothProperties, ConfigError, CushionMaterial, SimEvent, TableLayout,
    Vec3 as CoreVec3,
};

fn config_err(err: ConfigError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// 3D vector for positions, velocities, etc.
#[pyclass]
#[derive(Clone, Copy)]
pub struct Vec3 {
    #[pyo3(get, set)]
    pub x: f64,
    #[pyo3(get, set)]
    pub y: f64,
    #[pyo3(get, set)]
    pub z: f64,
}

#[pymethods]
impl Vec3 {
    #[new]
    fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn __repr__(&self) -> String {
        format!("Vec3({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }

    fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn to_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl From<CoreVec3> for Vec3 {
    fn from(v: CoreVec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3> for CoreVec3 {
    fn from(v: Vec3) -> Self {
        CoreVec3::new(v.x, v.y, v.z)
    }
}

/// Main simulation class.
///
/// Wraps a `pool_core::World`: table setup, cue strikes, frame stepping,
/// and state queries.
#[pyclass]
pub struct Simulation {
    world: World,
    ball_props: BallProperties,
    cushion_material: CushionMaterial,
}

#[pymethods]
impl Simulation {
    /// Create a new simulation on a 9ft table with tournament materials.
    #[new]
    fn new() -> PyResult<Self> {
        let world = World::new(TableLayout::nine_foot()).map_err(config_err)?;
        Ok(Self {
            world,
            ball_props: BallProperties::default(),
            cushion_material: CushionMaterial::default(),
        })
    }

    /// Current simulation time in seconds.
    #[getter]
    fn time(&self) -> f64 {
        self.world.time()
    }

    /// Number of balls in play.
    fn ball_count(&self) -> usize {
        self.world.balls().len()
    }

    /// Add a ball resting on the cloth at table coordinates (x, z).
    ///
    /// Returns the ball id.
    fn add_ball(&mut self, x: f64, z: f64) -> PyResult<usize> {
        let pos = CoreVec3::new(x, self.ball_props.radius, z);
        self.world.add_ball(pos, &self.ball_props).map_err(config_err)
    }

    /// Add a straight vertical rail section from (x0, z0) to (x1, z1),
    /// spanning heights y0..y1. Returns the cushion id.
    ///
    /// Real hosts feed in full profiled cushion meshes; this helper covers
    /// simple tables and experiments.
    #[pyo3(signature = (x0, z0, x1, z1, y0 = 0.0, y1 = 0.06))]
    fn add_rail(
        &mut self,
        x0: f64,
        z0: f64,
        x1: f64,
        z1: f64,
        y0: f64,
        y1: f64,
    ) -> PyResult<usize> {
        let mesh = TriangleMesh::vertical_panel(x0, z0, x1, z1, y0, y1);
        self.world
            .add_cushion(mesh, &self.cushion_material)
            .map_err(config_err)
    }

    /// Strike a ball: direction (dx, dy, dz), impulse magnitude `force`
    /// in N·s, optional spin (rad/s) and world-space contact point.
    #[pyo3(signature = (ball, dx, dy, dz, force, spin = None, contact = None))]
    fn strike(
        &mut self,
        ball: usize,
        dx: f64,
        dy: f64,
        dz: f64,
        force: f64,
        spin: Option<(f64, f64, f64)>,
        contact: Option<(f64, f64, f64)>,
    ) -> PyResult<()> {
        let spin = spin
            .map(|(x, y, z)| CoreVec3::new(x, y, z))
            .unwrap_or(CoreVec3::ZERO);
        let contact = contact.map(|(x, y, z)| CoreVec3::new(x, y, z));
        self.world
            .strike(ball, CoreVec3::new(dx, dy, dz), force, spin, contact)
            .map_err(config_err)
    }

    /// Re-spot a ball (cue-ball return). The ball comes back resting.
    fn place_ball(&mut self, ball: usize, x: f64, z: f64) -> PyResult<()> {
        let pos = CoreVec3::new(x, self.ball_props.radius, z);
        self.world.place_ball(ball, pos).map_err(config_err)
    }

    /// Get ball position as Vec3.
    fn ball_position(&self, ball: usize) -> PyResult<Vec3> {
        self.world
            .ball(ball)
            .map(|b| b.pos.into())
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))
    }

    /// Get ball velocity as Vec3.
    fn ball_velocity(&self, ball: usize) -> PyResult<Vec3> {
        self.world
            .ball(ball)
            .map(|b| b.vel.into())
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))
    }

    /// Get ball angular velocity as Vec3 (rad/s).
    fn ball_spin(&self, ball: usize) -> PyResult<Vec3> {
        self.world
            .ball(ball)
            .map(|b| b.angular_vel.into())
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))
    }

    /// Get ball orientation as a (w, x, y, z) unit quaternion.
    fn ball_orientation(&self, ball: usize) -> PyResult<(f64, f64, f64, f64)> {
        self.world
            .ball(ball)
            .map(|b| (b.orientation.w, b.orientation.x, b.orientation.y, b.orientation.z))
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))
    }

    /// Whether a ball is flagged resting.
    fn is_resting(&self, ball: usize) -> PyResult<bool> {
        self.world
            .ball(ball)
            .map(|b| b.is_resting)
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))
    }

    /// Whether every ball is resting (turn over).
    fn all_resting(&self) -> bool {
        self.world.all_resting()
    }

    /// Swap in a different cloth by its properties.
    fn set_cloth(&mut self, friction_multiplier: f64, rolling_friction: f64, restitution: f64) {
        self.world.set_cloth(ClothProperties {
            name: "custom".to_string(),
            friction_multiplier,
            rolling_friction,
            restitution,
        });
    }

    /// Advance the simulation by dt seconds.
    ///
    /// Returns the frame's events as strings:
    /// `"balls:<a>:<b>"`, `"cushion:<ball>:<cushion>"`,
    /// `"pocket:<ball>:<pocket>"`, `"rest:<ball>"`.
    fn step(&mut self, dt: f64) -> Vec<String> {
        self.world
            .step(dt)
            .into_iter()
            .map(|event| match event {
                SimEvent::BallsCollided { a, b, .. } => format!("balls:{}:{}", a, b),
                SimEvent::CushionHit { ball, cushion } => format!("cushion:{}:{}", ball, cushion),
                SimEvent::Pocketed { ball, pocket } => format!("pocket:{}:{}", ball, pocket),
                SimEvent::CameToRest { ball } => format!("rest:{}", ball),
            })
            .collect()
    }

    /// Run multiple fixed steps at once (more efficient from Python).
    fn step_n(&mut self, dt: f64, steps: usize) -> Vec<String> {
        let mut all = Vec::new();
        for _ in 0..steps {
            all.extend(self.step(dt));
        }
        all
    }

    /// Get one ball's state as a dict for easy inspection.
    fn ball_dict(&self, ball: usize) -> PyResult<PyObject> {
        let b = self
            .world
            .ball(ball)
            .ok_or_else(|| config_err(ConfigError::UnknownBall(ball)))?;
        Python::with_gil(|py| {
            let dict = pyo3::types::PyDict::new_bound(py);
            dict.set_item("id", b.id)?;
            dict.set_item("x", b.pos.x)?;
            dict.set_item("y", b.pos.y)?;
            dict.set_item("z", b.pos.z)?;
            dict.set_item("vx", b.vel.x)?;
            dict.set_item("vy", b.vel.y)?;
            dict.set_item("vz", b.vel.z)?;
            dict.set_item("speed", b.speed())?;
            dict.set_item("resting", b.is_resting)?;
            Ok(dict.into_any().unbind())
        })
    }
}

/// Python module definition.
#[pymodule]
fn pool_physics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Vec3>()?;
    m.add_class::<Simulation>()?;
    Ok(())
}
