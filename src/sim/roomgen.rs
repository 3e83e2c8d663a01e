//! Seeded procedural room generation
//!
//! Arena dimensions and spawn counts scale slowly with depth; barricades
//! are laid down in three deterministic passes (room perimeters with gate
//! openings, corridor lines with gaps, scattered destructible clutter).
//! Identical (seed, depth, variant) always reproduces the identical room -
//! the test suite locks this down.

use std::collections::HashSet;

use glam::Vec2;

use super::rng::SimRng;
use super::state::{Arena, Obstacle};
use crate::consts::{CENTER_EXCLUSION_RADIUS, OBSTACLE_BASE_HP, TILE_SIZE};

/// Arena dimensions (in tiles) and enemy spawn-point count for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPlan {
    pub width: u32,
    pub height: u32,
    pub spawn_count: u32,
}

/// Barricade layout variants. Selection is caller policy, never rolled
/// internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutVariant {
    /// Balanced mix of rooms, corridors and clutter
    #[default]
    Normal,
    /// Many mostly-destructible tiles
    SoftMany,
    /// Few, mostly-indestructible tiles
    HardSparse,
}

struct VariantParams {
    rooms: (i32, i32),
    corridors: (i32, i32),
    clusters: (i32, i32),
    /// Probability that a placed tile is destructible
    destructible_bias: f32,
}

impl LayoutVariant {
    fn params(self) -> VariantParams {
        match self {
            LayoutVariant::Normal => VariantParams {
                rooms: (1, 2),
                corridors: (2, 3),
                clusters: (3, 5),
                destructible_bias: 0.5,
            },
            LayoutVariant::SoftMany => VariantParams {
                rooms: (1, 2),
                corridors: (2, 4),
                clusters: (6, 9),
                destructible_bias: 0.85,
            },
            LayoutVariant::HardSparse => VariantParams {
                rooms: (0, 1),
                corridors: (1, 2),
                clusters: (2, 3),
                destructible_bias: 0.15,
            },
        }
    }
}

/// Room dimensions grow slowly and cyclically with depth; spawn count grows
/// linearly.
pub fn generate_room(rng: &mut SimRng, depth: u32) -> RoomPlan {
    let width = 28 + depth % 6;
    let height = 16 + depth % 4;
    let spawn_count = (3 + depth / 2).min(12);
    // Reserve one draw per room so future tuning can jitter dimensions
    // without shifting the downstream stream layout
    let _ = rng.next_f32();
    RoomPlan {
        width,
        height,
        spawn_count,
    }
}

/// Accumulates tiles with position-keyed de-duplication; first placement
/// wins, later overlapping placements are silently dropped.
struct TileSet {
    seen: HashSet<(i32, i32)>,
    tiles: Vec<((i32, i32), bool)>,
    cols: i32,
    rows: i32,
    center: Vec2,
}

impl TileSet {
    fn place(&mut self, x: i32, y: i32, destructible: bool) {
        // Keep a one-tile walkable border and the center exclusion zone
        if x < 1 || x >= self.cols - 1 || y < 1 || y >= self.rows - 1 {
            return;
        }
        if tile_center(x, y).distance(self.center) < CENTER_EXCLUSION_RADIUS {
            return;
        }
        if self.seen.insert((x, y)) {
            self.tiles.push(((x, y), destructible));
        }
    }
}

fn tile_center(x: i32, y: i32) -> Vec2 {
    Vec2::new((x as f32 + 0.5) * TILE_SIZE, (y as f32 + 0.5) * TILE_SIZE)
}

/// Build the room's obstacle set. Obstacle ids are assigned by the caller.
pub fn generate_barricades(
    rng: &mut SimRng,
    arena: &Arena,
    variant: LayoutVariant,
) -> Vec<Obstacle> {
    let params = variant.params();
    let cols = (arena.width / TILE_SIZE) as i32;
    let rows = (arena.height / TILE_SIZE) as i32;
    let mut tiles = TileSet {
        seen: HashSet::new(),
        tiles: Vec::new(),
        cols,
        rows,
        center: arena.center(),
    };

    // Pass 1: rectangular room perimeters with gate openings
    let room_count = rng.range_i32(params.rooms.0, params.rooms.1);
    for _ in 0..room_count {
        place_room_perimeter(rng, &mut tiles, params.destructible_bias);
    }

    // Pass 2: straight corridor lines with periodic gaps
    let corridor_count = rng.range_i32(params.corridors.0, params.corridors.1);
    for _ in 0..corridor_count {
        place_corridor(rng, &mut tiles, params.destructible_bias);
    }

    // Pass 3: scattered destructible clutter clusters
    let cluster_count = rng.range_i32(params.clusters.0, params.clusters.1);
    for _ in 0..cluster_count {
        place_cluster(rng, &mut tiles);
    }

    tiles
        .tiles
        .into_iter()
        .map(|((x, y), destructible)| {
            Obstacle::new(0, tile_center(x, y), destructible, OBSTACLE_BASE_HP)
        })
        .collect()
}

fn place_room_perimeter(rng: &mut SimRng, tiles: &mut TileSet, bias: f32) {
    let w = rng.range_i32(5, 8);
    let h = rng.range_i32(4, 7);
    let x0 = rng.range_i32(1, (tiles.cols - w - 1).max(1));
    let y0 = rng.range_i32(1, (tiles.rows - h - 1).max(1));

    // Perimeter cells in a stable clockwise order
    let mut perimeter = Vec::new();
    for x in x0..x0 + w {
        perimeter.push((x, y0));
    }
    for y in y0 + 1..y0 + h {
        perimeter.push((x0 + w - 1, y));
    }
    for x in (x0..x0 + w - 1).rev() {
        perimeter.push((x, y0 + h - 1));
    }
    for y in (y0 + 1..y0 + h - 1).rev() {
        perimeter.push((x0, y));
    }

    // Punch 1-2 gates, each two tiles wide
    let gate_count = rng.range_i32(1, 2) as usize;
    let mut gates: HashSet<usize> = HashSet::new();
    for _ in 0..gate_count {
        let at = rng.range_i32(0, perimeter.len() as i32 - 1) as usize;
        gates.insert(at);
        gates.insert((at + 1) % perimeter.len());
    }

    for (i, &(x, y)) in perimeter.iter().enumerate() {
        if gates.contains(&i) {
            continue;
        }
        let destructible = rng.chance(bias);
        tiles.place(x, y, destructible);
    }
}

fn place_corridor(rng: &mut SimRng, tiles: &mut TileSet, bias: f32) {
    let vertical = rng.chance(0.5);
    let gap_every = rng.range_i32(4, 6);
    if vertical {
        let x = rng.range_i32(2, tiles.cols - 3);
        for y in 1..tiles.rows - 1 {
            if y % gap_every == 0 {
                continue;
            }
            tiles.place(x, y, rng.chance(bias));
            // Occasional side-branch tile
            if rng.chance(0.12) {
                let side = if rng.chance(0.5) { 1 } else { -1 };
                tiles.place(x + side, y, true);
            }
        }
    } else {
        let y = rng.range_i32(2, tiles.rows - 3);
        for x in 1..tiles.cols - 1 {
            if x % gap_every == 0 {
                continue;
            }
            tiles.place(x, y, rng.chance(bias));
            if rng.chance(0.12) {
                let side = if rng.chance(0.5) { 1 } else { -1 };
                tiles.place(x, y + side, true);
            }
        }
    }
}

fn place_cluster(rng: &mut SimRng, tiles: &mut TileSet) {
    let mut x = rng.range_i32(2, tiles.cols - 3);
    let mut y = rng.range_i32(2, tiles.rows - 3);
    let size = rng.range_i32(2, 4);
    for _ in 0..size {
        tiles.place(x, y, true);
        // Drunken step to an adjacent tile
        match rng.range_i32(0, 3) {
            0 => x += 1,
            1 => x -= 1,
            2 => y += 1,
            _ => y -= 1,
        }
    }
}

/// Deterministically place enemy spawn points: off obstacle tiles, outside
/// the center exclusion zone, inside the border. Falls back to fewer points
/// when the room is too cluttered to fit them all.
pub fn spawn_points(
    rng: &mut SimRng,
    arena: &Arena,
    count: u32,
    obstacles: &[Obstacle],
) -> Vec<Vec2> {
    let cols = (arena.width / TILE_SIZE) as i32;
    let rows = (arena.height / TILE_SIZE) as i32;
    let occupied: HashSet<(i32, i32)> = obstacles
        .iter()
        .map(|o| {
            (
                (o.pos.x / TILE_SIZE).floor() as i32,
                (o.pos.y / TILE_SIZE).floor() as i32,
            )
        })
        .collect();

    let center = arena.center();
    let mut taken = HashSet::new();
    let mut points = Vec::new();
    let mut attempts = 0;
    while points.len() < count as usize && attempts < count * 30 {
        attempts += 1;
        let x = rng.range_i32(1, cols - 2);
        let y = rng.range_i32(1, rows - 2);
        if occupied.contains(&(x, y)) || taken.contains(&(x, y)) {
            continue;
        }
        let pos = tile_center(x, y);
        // Enemies never spawn on top of the player's entry point
        if pos.distance(center) < CENTER_EXCLUSION_RADIUS * 1.2 {
            continue;
        }
        taken.insert((x, y));
        points.push(pos);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_for(depth: u32) -> Arena {
        let mut rng = SimRng::new(1);
        let plan = generate_room(&mut rng, depth);
        Arena {
            width: plan.width as f32 * TILE_SIZE,
            height: plan.height as f32 * TILE_SIZE,
        }
    }

    #[test]
    fn test_room_plan_scales_with_depth() {
        let mut rng = SimRng::new(0);
        let shallow = generate_room(&mut rng, 0);
        let deep = generate_room(&mut rng, 9);
        assert_eq!(shallow.width, 28);
        assert_eq!(shallow.spawn_count, 3);
        assert_eq!(deep.width, 28 + 9 % 6);
        assert_eq!(deep.spawn_count, 3 + 9 / 2);
    }

    #[test]
    fn test_generation_is_deterministic() {
        for variant in [
            LayoutVariant::Normal,
            LayoutVariant::SoftMany,
            LayoutVariant::HardSparse,
        ] {
            let arena = arena_for(4);
            let a = generate_barricades(&mut SimRng::new(777), &arena, variant);
            let b = generate_barricades(&mut SimRng::new(777), &arena, variant);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                assert_eq!(x.pos, y.pos);
                assert_eq!(x.destructible, y.destructible);
                assert_eq!(x.hp, y.hp);
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let arena = arena_for(4);
        let a = generate_barricades(&mut SimRng::new(1), &arena, LayoutVariant::Normal);
        let b = generate_barricades(&mut SimRng::new(2), &arena, LayoutVariant::Normal);
        let same = a.len() == b.len()
            && a.iter().zip(&b).all(|(x, y)| x.pos == y.pos);
        assert!(!same, "distinct seeds should give distinct layouts");
    }

    #[test]
    fn test_center_exclusion_zone_is_clear() {
        let arena = arena_for(7);
        let center = arena.center();
        let tiles = generate_barricades(&mut SimRng::new(99), &arena, LayoutVariant::SoftMany);
        for ob in &tiles {
            assert!(
                ob.pos.distance(center) >= CENTER_EXCLUSION_RADIUS,
                "obstacle {:?} inside exclusion zone",
                ob.pos
            );
        }
    }

    #[test]
    fn test_no_duplicate_positions() {
        let arena = arena_for(3);
        let tiles = generate_barricades(&mut SimRng::new(5), &arena, LayoutVariant::SoftMany);
        let mut seen = HashSet::new();
        for ob in &tiles {
            let key = (
                (ob.pos.x / TILE_SIZE).floor() as i32,
                (ob.pos.y / TILE_SIZE).floor() as i32,
            );
            assert!(seen.insert(key), "duplicate tile at {key:?}");
        }
    }

    #[test]
    fn test_variant_bias() {
        let arena = arena_for(6);
        let soft = generate_barricades(&mut SimRng::new(11), &arena, LayoutVariant::SoftMany);
        let hard = generate_barricades(&mut SimRng::new(11), &arena, LayoutVariant::HardSparse);
        let soft_ratio =
            soft.iter().filter(|o| o.destructible).count() as f32 / soft.len() as f32;
        let hard_ratio =
            hard.iter().filter(|o| o.destructible).count() as f32 / hard.len().max(1) as f32;
        assert!(soft.len() > hard.len());
        assert!(soft_ratio > hard_ratio);
    }

    #[test]
    fn test_spawn_points_respect_geometry() {
        let arena = arena_for(8);
        let mut rng = SimRng::new(31);
        let obstacles = generate_barricades(&mut rng, &arena, LayoutVariant::Normal);
        let spawns = spawn_points(&mut rng, &arena, 6, &obstacles);
        assert!(!spawns.is_empty());
        let center = arena.center();
        for s in &spawns {
            assert!(s.distance(center) >= CENTER_EXCLUSION_RADIUS);
            assert!(arena.contains(*s, 0.0));
            for ob in &obstacles {
                assert!(ob.pos.distance(*s) > 1.0);
            }
        }
    }
}
