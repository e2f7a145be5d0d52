//! Static arena geometry: bounds, obstacles and spawn search

use rand::Rng;
use serde::Serialize;

use super::constants::arena::{
    HEIGHT, SPAWN_ATTEMPTS, SPAWN_CLEARANCE, SPAWN_MARGIN, SPAWN_MIN_SEPARATION, WIDTH,
};
use super::physics::PhysicsSystem;

/// Obstacle material (only affects rendering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Wall,
    Crate,
}

/// Axis-aligned obstacle rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub const fn new(x: f64, y: f64, w: f64, h: f64, kind: ObstacleKind) -> Self {
        Self { x, y, w, h, kind }
    }
}

const DEFAULT_LAYOUT: [Obstacle; 12] = [
    // Center cross
    Obstacle::new(18.0, 13.0, 4.0, 1.0, ObstacleKind::Wall),
    Obstacle::new(19.0, 11.0, 1.0, 5.0, ObstacleKind::Wall),
    // Corner blocks
    Obstacle::new(5.0, 5.0, 2.0, 2.0, ObstacleKind::Crate),
    Obstacle::new(33.0, 5.0, 2.0, 2.0, ObstacleKind::Crate),
    Obstacle::new(5.0, 23.0, 2.0, 2.0, ObstacleKind::Crate),
    Obstacle::new(33.0, 23.0, 2.0, 2.0, ObstacleKind::Crate),
    // Side walls
    Obstacle::new(12.0, 8.0, 1.0, 4.0, ObstacleKind::Wall),
    Obstacle::new(27.0, 8.0, 1.0, 4.0, ObstacleKind::Wall),
    Obstacle::new(12.0, 18.0, 1.0, 4.0, ObstacleKind::Wall),
    Obstacle::new(27.0, 18.0, 1.0, 4.0, ObstacleKind::Wall),
    // Horizontal barriers
    Obstacle::new(8.0, 15.0, 3.0, 1.0, ObstacleKind::Crate),
    Obstacle::new(29.0, 15.0, 3.0, 1.0, ObstacleKind::Crate),
];

/// Immutable collision field. The obstacle set never changes after construction.
#[derive(Debug, Clone, Serialize)]
pub struct Arena {
    width: f64,
    height: f64,
    obstacles: Vec<Obstacle>,
}

impl Arena {
    /// Standard 40x30 arena
    pub fn new() -> Self {
        Self::with_obstacles(WIDTH, HEIGHT, DEFAULT_LAYOUT.to_vec())
    }

    /// Custom geometry
    pub fn with_obstacles(width: f64, height: f64, obstacles: Vec<Obstacle>) -> Self {
        Self {
            width,
            height,
            obstacles,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// True if a circle at (x, y) leaves the arena or touches any obstacle
    pub fn is_blocked(&self, x: f64, y: f64, radius: f64) -> bool {
        if PhysicsSystem::out_of_bounds(x, y, radius, self.width, self.height) {
            return true;
        }

        self.obstacles
            .iter()
            .any(|obs| PhysicsSystem::circle_rect_overlap(x, y, radius, obs))
    }

    /// Rejection-sample a free spawn point away from `existing` positions.
    ///
    /// Falls back to the margin corner once the attempt budget is spent, so
    /// this always terminates even in a congested arena.
    pub fn spawn_point<R: Rng>(&self, rng: &mut R, existing: &[(f64, f64)]) -> (f64, f64) {
        let span_x = (self.width - SPAWN_MARGIN * 2.0).max(0.0);
        let span_y = (self.height - SPAWN_MARGIN * 2.0).max(0.0);

        for _ in 0..SPAWN_ATTEMPTS {
            let x = SPAWN_MARGIN + rng.gen::<f64>() * span_x;
            let y = SPAWN_MARGIN + rng.gen::<f64>() * span_y;

            // Rounded first so the returned point is the one that was validated
            let (x, y) = ((x * 10.0).round() / 10.0, (y * 10.0).round() / 10.0);

            if self.is_blocked(x, y, SPAWN_CLEARANCE) {
                continue;
            }

            let too_close = existing
                .iter()
                .any(|&(ex, ey)| PhysicsSystem::distance(x, y, ex, ey) < SPAWN_MIN_SEPARATION);
            if too_close {
                continue;
            }

            return (x, y);
        }

        (SPAWN_MARGIN, SPAWN_MARGIN)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Reference formula, written out independently of `PhysicsSystem`
    fn clamped_distance_hit(cx: f64, cy: f64, r: f64, o: &Obstacle) -> bool {
        let nx = cx.max(o.x).min(o.x + o.w);
        let ny = cy.max(o.y).min(o.y + o.h);
        (cx - nx).powi(2) + (cy - ny).powi(2) <= r * r
    }

    proptest! {
        #[test]
        fn prop_is_blocked_matches_clamped_distance(
            cx in 0.0f64..100.0,
            cy in 0.0f64..100.0,
            r in 0.0f64..5.0,
            ox in 0.0f64..90.0,
            oy in 0.0f64..90.0,
            ow in 0.1f64..10.0,
            oh in 0.1f64..10.0,
        ) {
            let obstacle = Obstacle::new(ox, oy, ow, oh, ObstacleKind::Crate);
            let arena = Arena::with_obstacles(100.0, 100.0, vec![obstacle]);

            let in_bounds = cx - r >= 0.0 && cx + r <= 100.0 && cy - r >= 0.0 && cy + r <= 100.0;
            let expected = !in_bounds || clamped_distance_hit(cx, cy, r, &obstacle);

            prop_assert_eq!(arena.is_blocked(cx, cy, r), expected);
        }

        #[test]
        fn prop_spawn_point_is_never_blocked(seed in any::<u64>()) {
            let arena = Arena::new();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (x, y) = arena.spawn_point(&mut rng, &[]);
            prop_assert!(!arena.is_blocked(x, y, SPAWN_CLEARANCE));
        }
    }

    #[test]
    fn test_default_layout_is_fixed() {
        let arena = Arena::new();
        assert_eq!(arena.width(), 40.0);
        assert_eq!(arena.height(), 30.0);
        assert_eq!(arena.obstacles().len(), 12);
    }

    #[test]
    fn test_bounds_block() {
        let arena = Arena::with_obstacles(10.0, 10.0, Vec::new());
        assert!(arena.is_blocked(-1.0, 5.0, 0.0));
        assert!(arena.is_blocked(0.2, 5.0, 0.5));
        assert!(!arena.is_blocked(0.5, 5.0, 0.5));
        assert!(!arena.is_blocked(5.0, 5.0, 0.5));
    }

    #[test]
    fn test_spawn_points_keep_separation() {
        let arena = Arena::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut placed: Vec<(f64, f64)> = Vec::new();

        for _ in 0..6 {
            let p = arena.spawn_point(&mut rng, &placed);
            for &(x, y) in &placed {
                assert!(PhysicsSystem::distance(p.0, p.1, x, y) >= SPAWN_MIN_SEPARATION);
            }
            placed.push(p);
        }
    }

    #[test]
    fn test_spawn_falls_back_when_congested() {
        // One obstacle covering the whole interior
        let arena = Arena::with_obstacles(
            20.0,
            20.0,
            vec![Obstacle::new(0.0, 0.0, 20.0, 20.0, ObstacleKind::Wall)],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(arena.spawn_point(&mut rng, &[]), (SPAWN_MARGIN, SPAWN_MARGIN));
    }

    #[test]
    fn test_spawn_is_seed_deterministic() {
        let arena = Arena::new();
        let a = arena.spawn_point(&mut ChaCha8Rng::seed_from_u64(99), &[]);
        let b = arena.spawn_point(&mut ChaCha8Rng::seed_from_u64(99), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_arena_serializes_geometry() {
        let json = serde_json::to_value(Arena::new()).unwrap();
        assert_eq!(json["width"], 40.0);
        assert_eq!(json["obstacles"][0]["kind"], "wall");
        assert_eq!(json["obstacles"][2]["kind"], "crate");
    }
}
