//! Uniform spatial grid over the table plane.
//!
//! Buckets balls by discretized (x, z) cell so the ball-ball broad phase only
//! examines the 3x3 block of cells around each ball instead of every pair.
//! Cell membership is tracked incrementally: each ball remembers its last
//! cell key, so a ball that stays inside its cell costs one comparison per
//! sub-step.

use std::collections::{HashMap, HashSet};

use crate::types::Ball;

/// Default cell edge, sized relative to the regulation ball radius.
/// About 10x the radius: big enough that slow balls rarely change cells,
/// small enough that a 3x3 block holds few candidates.
pub const DEFAULT_CELL_SIZE: f64 = 0.3;

/// Maps discretized (cellX, cellZ) keys to the set of ball ids in that cell.
///
/// This is the only place ball-to-cell membership lives; the ball's
/// `cell_key` field is a cache of the last key written by [`SpatialGrid::update`].
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<(i32, i32), HashSet<usize>>,
}

impl SpatialGrid {
    /// Cell size is fixed for the life of the grid.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 {
                cell_size
            } else {
                DEFAULT_CELL_SIZE
            },
            cells: HashMap::new(),
        }
    }

    fn key_for(&self, x: f64, z: f64) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Re-index one ball from its current position.
    ///
    /// Fast path: the key is unchanged and nothing happens. Otherwise the
    /// ball moves from its old cell (pruning the cell if it empties) into
    /// the new one, and the new key is written back onto the ball.
    pub fn update(&mut self, ball: &mut Ball) {
        let key = self.key_for(ball.pos.x, ball.pos.z);
        if ball.cell_key == Some(key) {
            return;
        }

        if let Some(old_key) = ball.cell_key {
            if let Some(set) = self.cells.get_mut(&old_key) {
                set.remove(&ball.id);
                if set.is_empty() {
                    self.cells.remove(&old_key);
                }
            }
        }

        self.cells.entry(key).or_default().insert(ball.id);
        ball.cell_key = Some(key);
    }

    /// Ids of all non-resting balls in the 3x3 block of cells around `ball`,
    /// excluding `ball` itself. No ordering guarantee.
    ///
    /// `balls` is the world's ball slice, indexed by id, used to filter
    /// resting balls out of the candidate set.
    pub fn nearby(&self, ball: &Ball, balls: &[Ball]) -> Vec<usize> {
        let (cx, cz) = match ball.cell_key {
            Some(key) => key,
            None => self.key_for(ball.pos.x, ball.pos.z),
        };

        let mut out = Vec::new();
        for dx in -1..=1 {
            for dz in -1..=1 {
                if let Some(set) = self.cells.get(&(cx + dx, cz + dz)) {
                    for &id in set {
                        if id == ball.id {
                            continue;
                        }
                        if balls.get(id).map_or(false, |b| !b.is_resting) {
                            out.push(id);
                        }
                    }
                }
            }
        }
        out
    }

    /// Ids of all balls, resting included, in the 3x3 block around `ball`,
    /// excluding `ball` itself.
    ///
    /// The collision pass uses this instead of [`SpatialGrid::nearby`]: a
    /// moving ball must be able to strike a sleeping one and wake it, so
    /// resting balls stay visible as collision *targets* even though they
    /// never originate queries of their own.
    pub fn collision_candidates(&self, ball: &Ball) -> Vec<usize> {
        let (cx, cz) = match ball.cell_key {
            Some(key) => key,
            None => self.key_for(ball.pos.x, ball.pos.z),
        };

        let mut out = Vec::new();
        for dx in -1..=1 {
            for dz in -1..=1 {
                if let Some(set) = self.cells.get(&(cx + dx, cz + dz)) {
                    out.extend(set.iter().copied().filter(|&id| id != ball.id));
                }
            }
        }
        out
    }

    /// Drop every cell mapping. Ball `cell_key` caches must be cleared by
    /// the caller (the orchestrator does both together each frame).
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    #[cfg(test)]
    fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BallProperties, Vec3};

    fn make_balls(positions: &[(f64, f64)]) -> Vec<Ball> {
        let props = BallProperties::default();
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, z))| {
                let mut b = Ball::new(i, Vec3::new(x, 0.028575, z), &props).unwrap();
                b.wake();
                b
            })
            .collect()
    }

    #[test]
    fn test_update_is_noop_within_cell() {
        let mut grid = SpatialGrid::new(0.3);
        let mut balls = make_balls(&[(0.05, 0.05)]);

        grid.update(&mut balls[0]);
        let key = balls[0].cell_key;

        // Move within the same cell
        balls[0].pos.x = 0.1;
        grid.update(&mut balls[0]);

        assert_eq!(balls[0].cell_key, key);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn test_update_moves_between_cells_and_prunes() {
        let mut grid = SpatialGrid::new(0.3);
        let mut balls = make_balls(&[(0.05, 0.05)]);

        grid.update(&mut balls[0]);
        assert_eq!(grid.cell_count(), 1);

        // Move far enough to land in a different cell
        balls[0].pos.x = 1.0;
        grid.update(&mut balls[0]);

        assert_eq!(grid.cell_count(), 1, "old cell should be pruned");
        assert_eq!(balls[0].cell_key, Some((3, 0)));
    }

    #[test]
    fn test_nearby_excludes_self_and_resting() {
        let mut grid = SpatialGrid::new(0.3);
        let mut balls = make_balls(&[(0.0, 0.0), (0.1, 0.0), (0.2, 0.1)]);
        balls[2].sleep();

        for i in 0..balls.len() {
            let mut b = balls[i].clone();
            grid.update(&mut b);
            balls[i] = b;
        }

        let near = grid.nearby(&balls[0], &balls);
        assert!(near.contains(&1));
        assert!(!near.contains(&0), "must exclude the query ball");
        assert!(!near.contains(&2), "must exclude resting balls");
    }

    #[test]
    fn test_collision_candidates_include_resting() {
        let mut grid = SpatialGrid::new(0.3);
        let mut balls = make_balls(&[(0.0, 0.0), (0.1, 0.0)]);
        balls[1].sleep();

        for i in 0..balls.len() {
            let mut b = balls[i].clone();
            grid.update(&mut b);
            balls[i] = b;
        }

        let candidates = grid.collision_candidates(&balls[0]);
        assert!(
            candidates.contains(&1),
            "a sleeping ball must stay targetable by a moving one"
        );
    }

    #[test]
    fn test_nearby_spans_adjacent_cells() {
        let mut grid = SpatialGrid::new(0.3);
        // Two balls in adjacent cells, one two cells away
        let mut balls = make_balls(&[(0.0, 0.0), (0.35, 0.0), (0.95, 0.0)]);

        for i in 0..balls.len() {
            let mut b = balls[i].clone();
            grid.update(&mut b);
            balls[i] = b;
        }

        let near = grid.nearby(&balls[0], &balls);
        assert!(near.contains(&1), "adjacent cell should be found");
        assert!(!near.contains(&2), "two cells away is out of range");
    }

    #[test]
    fn test_clear_empties_grid() {
        let mut grid = SpatialGrid::new(0.3);
        let mut balls = make_balls(&[(0.0, 0.0), (1.0, 1.0)]);
        for b in balls.iter_mut() {
            grid.update(b);
        }
        assert_eq!(grid.cell_count(), 2);

        grid.clear();
        assert_eq!(grid.cell_count(), 0);
    }

    /// Brute-force cross-check: nearby() must return exactly the non-resting
    /// balls whose (x, z) falls in the 9 cells centered on the query ball.
    #[test]
    fn test_nearby_matches_brute_force() {
        let cell = 0.3;
        let mut grid = SpatialGrid::new(cell);

        // Deterministic pseudo-random scatter over a few cells
        let mut positions = Vec::new();
        let mut seed: u64 = 42;
        for _ in 0..40 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = ((seed >> 16) % 2000) as f64 / 1000.0 - 1.0;
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let z = ((seed >> 16) % 1200) as f64 / 1000.0 - 0.6;
            positions.push((x, z));
        }
        let mut balls = make_balls(&positions);
        // Sprinkle a few resting balls in
        balls[5].sleep();
        balls[17].sleep();
        balls[31].sleep();

        for i in 0..balls.len() {
            let mut b = balls[i].clone();
            grid.update(&mut b);
            balls[i] = b;
        }

        let cell_of = |x: f64, z: f64| -> (i32, i32) {
            ((x / cell).floor() as i32, (z / cell).floor() as i32)
        };

        for query in &balls {
            let mut got = grid.nearby(query, &balls);
            got.sort_unstable();

            let (qx, qz) = cell_of(query.pos.x, query.pos.z);
            let mut want: Vec<usize> = balls
                .iter()
                .filter(|b| {
                    if b.id == query.id || b.is_resting {
                        return false;
                    }
                    let (bx, bz) = cell_of(b.pos.x, b.pos.z);
                    (bx - qx).abs() <= 1 && (bz - qz).abs() <= 1
                })
                .map(|b| b.id)
                .collect();
            want.sort_unstable();

            assert_eq!(got, want, "mismatch for ball {}", query.id);
        }
    }
}
