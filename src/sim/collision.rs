//! Collision primitives for the tile arena
//!
//! Projectiles can cross a whole tile in one tick at high speed, so hit
//! tests against obstacles and entities use the previous-position segment
//! rather than point overlap.

use glam::Vec2;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Slab test: does the segment `a -> b` intersect the box?
///
/// Returns the entry parameter t in [0, 1] so callers can order multiple
/// hits along a piercing projectile's path.
pub fn segment_hits_aabb(a: Vec2, b: Vec2, aabb: &Aabb) -> Option<f32> {
    let dir = b - a;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..2 {
        let (origin, delta, lo, hi) = if axis == 0 {
            (a.x, dir.x, aabb.min.x, aabb.max.x)
        } else {
            (a.y, dir.y, aabb.min.y, aabb.max.y)
        };

        if delta.abs() < f32::EPSILON {
            // Parallel to this slab; miss unless origin lies within it
            if origin < lo || origin > hi {
                return None;
            }
        } else {
            let inv = 1.0 / delta;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
    }

    Some(t_min)
}

/// Circle vs AABB overlap (enemy bodies pressing into obstacles).
pub fn circle_overlaps_aabb(center: Vec2, radius: f32, aabb: &Aabb) -> bool {
    let closest = center.clamp(aabb.min, aabb.max);
    center.distance_squared(closest) <= radius * radius
}

/// Circle vs circle overlap (projectile vs entity bodies).
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0))
    }

    #[test]
    fn test_segment_through_box() {
        let t = segment_hits_aabb(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), &unit_box());
        let t = t.expect("segment crossing the box must hit");
        assert!((t - 0.4).abs() < 1e-4); // enters at x = -1, 40% along
    }

    #[test]
    fn test_segment_misses_box() {
        assert!(segment_hits_aabb(Vec2::new(-5.0, 3.0), Vec2::new(5.0, 3.0), &unit_box()).is_none());
        // Stops short of the box
        assert!(segment_hits_aabb(Vec2::new(-5.0, 0.0), Vec2::new(-2.0, 0.0), &unit_box()).is_none());
    }

    #[test]
    fn test_segment_starting_inside() {
        let t = segment_hits_aabb(Vec2::ZERO, Vec2::new(5.0, 0.0), &unit_box());
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_diagonal_segment() {
        let t = segment_hits_aabb(Vec2::new(-3.0, -3.0), Vec2::new(3.0, 3.0), &unit_box());
        assert!(t.is_some());
    }

    #[test]
    fn test_degenerate_vertical_segment() {
        // Zero x-delta, origin inside the x slab
        let t = segment_hits_aabb(Vec2::new(0.5, -4.0), Vec2::new(0.5, 4.0), &unit_box());
        assert!(t.is_some());
        // Zero x-delta, origin outside the x slab
        assert!(segment_hits_aabb(Vec2::new(2.0, -4.0), Vec2::new(2.0, 4.0), &unit_box()).is_none());
    }

    #[test]
    fn test_circle_aabb_overlap() {
        assert!(circle_overlaps_aabb(Vec2::new(1.5, 0.0), 0.6, &unit_box()));
        assert!(!circle_overlaps_aabb(Vec2::new(2.0, 2.0), 0.5, &unit_box()));
        // Corner graze
        assert!(circle_overlaps_aabb(Vec2::new(1.3, 1.3), 0.5, &unit_box()));
    }

    #[test]
    fn test_hit_ordering_along_segment() {
        let near = Aabb::from_center(Vec2::new(-2.0, 0.0), Vec2::splat(0.5));
        let far = Aabb::from_center(Vec2::new(2.0, 0.0), Vec2::splat(0.5));
        let a = Vec2::new(-5.0, 0.0);
        let b = Vec2::new(5.0, 0.0);
        let t_near = segment_hits_aabb(a, b, &near).unwrap();
        let t_far = segment_hits_aabb(a, b, &far).unwrap();
        assert!(t_near < t_far);
    }
}
