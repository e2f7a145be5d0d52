//! Collision geometry and stepping helpers

use super::arena::Obstacle;

/// Stateless geometry queries shared by the arena and the engine
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit vector for a heading in degrees (0 = +x, 90 = +y)
    pub fn heading_vector(degrees: f64) -> (f64, f64) {
        let rad = degrees.to_radians();
        (rad.cos(), rad.sin())
    }

    /// Normalize a direction vector; `None` for zero-length or non-finite input
    pub fn normalize(dx: f64, dy: f64) -> Option<(f64, f64)> {
        let len = dx.hypot(dy);
        if !len.is_finite() || len <= f64::EPSILON {
            return None;
        }
        Some((dx / len, dy / len))
    }

    /// Advance a point along a direction
    pub fn step(x: f64, y: f64, dx: f64, dy: f64, distance: f64) -> (f64, f64) {
        (x + dx * distance, y + dy * distance)
    }

    /// Check overlap between two circles (touching does not count)
    pub fn circles_overlap(x1: f64, y1: f64, r1: f64, x2: f64, y2: f64, r2: f64) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined_radius = r1 + r2;
        dx * dx + dy * dy < combined_radius * combined_radius
    }

    /// Circle vs axis-aligned rectangle. The circle center is clamped to the
    /// rectangle and the squared distance compared to radius²; touching counts.
    ///
    /// Degenerate rectangles (negative size, NaN) never panic.
    pub fn circle_rect_overlap(cx: f64, cy: f64, radius: f64, rect: &Obstacle) -> bool {
        let nearest_x = cx.max(rect.x).min(rect.x + rect.w);
        let nearest_y = cy.max(rect.y).min(rect.y + rect.h);
        let dx = cx - nearest_x;
        let dy = cy - nearest_y;
        dx * dx + dy * dy <= radius * radius
    }

    /// Check if a circle pokes outside `[0, width] x [0, height]`
    pub fn out_of_bounds(x: f64, y: f64, radius: f64, width: f64, height: f64) -> bool {
        x - radius < 0.0 || x + radius > width || y - radius < 0.0 || y + radius > height
    }

    /// Euclidean distance
    pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        (x2 - x1).hypot(y2 - y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::ObstacleKind;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Obstacle {
        Obstacle {
            x,
            y,
            w,
            h,
            kind: ObstacleKind::Wall,
        }
    }

    #[test]
    fn test_heading_vector_cardinals() {
        let (x, y) = PhysicsSystem::heading_vector(0.0);
        assert!((x - 1.0).abs() < 1e-12 && y.abs() < 1e-12);

        let (x, y) = PhysicsSystem::heading_vector(90.0);
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_rejects_degenerate() {
        assert!(PhysicsSystem::normalize(0.0, 0.0).is_none());
        assert!(PhysicsSystem::normalize(f64::NAN, 1.0).is_none());

        let (x, y) = PhysicsSystem::normalize(3.0, 4.0).unwrap();
        assert!((x - 0.6).abs() < 1e-12);
        assert!((y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_circles_touching_do_not_overlap() {
        assert!(!PhysicsSystem::circles_overlap(0.0, 0.0, 0.5, 1.0, 0.0, 0.5));
        assert!(PhysicsSystem::circles_overlap(0.0, 0.0, 0.5, 0.99, 0.0, 0.5));
    }

    #[test]
    fn test_circle_rect_touching_counts() {
        let r = rect(2.0, 2.0, 1.0, 1.0);
        assert!(PhysicsSystem::circle_rect_overlap(1.5, 2.5, 0.5, &r));
        assert!(!PhysicsSystem::circle_rect_overlap(1.4, 2.5, 0.5, &r));
        // center inside the rectangle
        assert!(PhysicsSystem::circle_rect_overlap(2.5, 2.5, 0.0, &r));
    }

    #[test]
    fn test_circle_rect_degenerate_rect_does_not_panic() {
        // negative width collapses to the left edge
        let inverted = rect(20.0, 10.0, -2.0, 2.0);
        assert!(PhysicsSystem::circle_rect_overlap(18.0, 11.0, 0.5, &inverted));
        assert!(!PhysicsSystem::circle_rect_overlap(25.0, 11.0, 0.5, &inverted));

        let nan = rect(f64::NAN, 10.0, 2.0, f64::NAN);
        let _ = PhysicsSystem::circle_rect_overlap(5.0, 5.0, 0.5, &nan);
    }

    #[test]
    fn test_out_of_bounds_edges() {
        assert!(!PhysicsSystem::out_of_bounds(0.5, 0.5, 0.5, 10.0, 10.0));
        assert!(PhysicsSystem::out_of_bounds(0.4, 5.0, 0.5, 10.0, 10.0));
        assert!(PhysicsSystem::out_of_bounds(5.0, 9.6, 0.5, 10.0, 10.0));
    }
}
