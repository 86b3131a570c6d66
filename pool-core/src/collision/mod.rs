//! Collision detection and resolution for the billiards simulation.
//!
//! This module handles:
//! - **Geometry**: bounding boxes, triangle meshes, raycasts, cushions
//! - **Detection**: finding when collisions occur (swept spheres, mesh sweeps)
//! - **Resolution**: computing post-collision velocities and spin
//!
//! ## Swept testing
//!
//! Instead of checking if a ball overlaps a surface (which fails at break
//! speeds), both narrow phases test whether the ball's trajectory crosses
//! the obstacle during the sub-step:
//!
//! ```text
//! Time t=0         Time t=dt
//!    ●────────────────●
//!    Ball            Ball
//!    start           end
//!         \    ↓
//!          \   Cushion
//! ══════════╳═══════════
//!           └─ Collision point
//! ```
//!
//! This detects collisions regardless of ball speed or sub-step size.

pub mod detection;
pub mod geometry;
pub mod resolution;

pub use detection::*;
pub use geometry::*;
pub use resolution::*;
