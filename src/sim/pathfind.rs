//! Grid-based pathfinding service
//!
//! Rasterizes the arena's obstacles into a walkability grid and answers
//! shortest-path queries with 4-directional A* (Manhattan heuristic, unit
//! edge cost). The grid is rebuilt wholesale on a cooldown owned by the
//! tick orchestrator and swapped, never mutated in place.
//!
//! Tie-breaking among equal f-scores is scan-order and intentionally loose:
//! callers may rely on path *length* optimality but not on which of several
//! equally short paths is returned.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec2;

use super::collision::Aabb;
use super::state::{Arena, Obstacle};

/// Manhattan radius searched for a walkable stand-in when the goal cell
/// itself is blocked.
const GOAL_RETARGET_RADIUS: i32 = 3;

/// A cell index into the walkability grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

/// Rasterized walkability grid over the arena.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
    pub tile_size: f32,
    walkable: Vec<bool>,
}

impl Grid {
    /// Rasterize the arena: a cell is unwalkable if any obstacle's bounding
    /// box overlaps it.
    pub fn build(arena: &Arena, obstacles: &[Obstacle], tile_size: f32) -> Self {
        let cols = (arena.width / tile_size).ceil() as i32;
        let rows = (arena.height / tile_size).ceil() as i32;
        let mut walkable = vec![true; (cols * rows) as usize];

        for ob in obstacles {
            let bb = ob.aabb();
            let x0 = (bb.min.x / tile_size).floor() as i32;
            let x1 = (bb.max.x / tile_size).floor() as i32;
            let y0 = (bb.min.y / tile_size).floor() as i32;
            let y1 = (bb.max.y / tile_size).floor() as i32;
            for y in y0.max(0)..=y1.min(rows - 1) {
                for x in x0.max(0)..=x1.min(cols - 1) {
                    let cell = Aabb::new(
                        Vec2::new(x as f32 * tile_size, y as f32 * tile_size),
                        Vec2::new((x + 1) as f32 * tile_size, (y + 1) as f32 * tile_size),
                    );
                    // Strict overlap: an obstacle flush against a cell edge
                    // does not block that neighbor
                    let overlaps = bb.min.x < cell.max.x
                        && bb.max.x > cell.min.x
                        && bb.min.y < cell.max.y
                        && bb.max.y > cell.min.y;
                    if overlaps {
                        walkable[(y * cols + x) as usize] = false;
                    }
                }
            }
        }

        Self {
            cols,
            rows,
            tile_size,
            walkable,
        }
    }

    pub fn in_bounds(&self, cell: GridCell) -> bool {
        cell.x >= 0 && cell.x < self.cols && cell.y >= 0 && cell.y < self.rows
    }

    pub fn is_walkable(&self, cell: GridCell) -> bool {
        self.in_bounds(cell) && self.walkable[(cell.y * self.cols + cell.x) as usize]
    }

    /// Continuous position to containing cell; `None` outside the arena.
    pub fn world_to_grid(&self, pos: Vec2) -> Option<GridCell> {
        let cell = GridCell {
            x: (pos.x / self.tile_size).floor() as i32,
            y: (pos.y / self.tile_size).floor() as i32,
        };
        self.in_bounds(cell).then_some(cell)
    }

    /// Cell index to its center in world coordinates.
    pub fn grid_to_world(&self, cell: GridCell) -> Vec2 {
        Vec2::new(
            (cell.x as f32 + 0.5) * self.tile_size,
            (cell.y as f32 + 0.5) * self.tile_size,
        )
    }

    fn idx(&self, cell: GridCell) -> usize {
        (cell.y * self.cols + cell.x) as usize
    }

    /// When the goal cell is blocked, retarget to the nearest walkable cell
    /// within a small Manhattan radius.
    fn retarget_goal(&self, goal: GridCell) -> Option<GridCell> {
        if self.is_walkable(goal) {
            return Some(goal);
        }
        for radius in 1..=GOAL_RETARGET_RADIUS {
            let mut best: Option<GridCell> = None;
            for dy in -radius..=radius {
                let dx_span = radius - dy.abs();
                for dx in [-dx_span, dx_span] {
                    let cand = GridCell {
                        x: goal.x + dx,
                        y: goal.y + dy,
                    };
                    if self.is_walkable(cand) && best.is_none() {
                        best = Some(cand);
                    }
                    if dx_span == 0 {
                        break;
                    }
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// Shortest path from `start` to `goal` as world-space waypoints
    /// (cell centers, start cell excluded, goal included).
    ///
    /// Returns `None` when the start is unwalkable or the goal (after
    /// retargeting) is unreachable. Callers treat that as "hold position or
    /// pick a fallback behavior", never as an error.
    pub fn find_path(&self, start: GridCell, goal: GridCell) -> Option<Vec<Vec2>> {
        if !self.is_walkable(start) {
            return None;
        }
        let goal = self.retarget_goal(goal)?;
        if start == goal {
            return Some(Vec::new());
        }

        let n = (self.cols * self.rows) as usize;
        let mut g_score = vec![u32::MAX; n];
        let mut came_from = vec![usize::MAX; n];
        let mut heap: BinaryHeap<Reverse<(u32, u32, i32, i32)>> = BinaryHeap::new();
        let mut push_counter = 0u32;

        let h = |c: GridCell| ((c.x - goal.x).abs() + (c.y - goal.y).abs()) as u32;

        g_score[self.idx(start)] = 0;
        heap.push(Reverse((h(start), push_counter, start.x, start.y)));

        while let Some(Reverse((_, _, cx, cy))) = heap.pop() {
            let current = GridCell { x: cx, y: cy };
            if current == goal {
                // Walk back through parents to the start
                let mut cells = vec![current];
                let mut at = self.idx(current);
                while came_from[at] != usize::MAX {
                    at = came_from[at];
                    let cell = GridCell {
                        x: at as i32 % self.cols,
                        y: at as i32 / self.cols,
                    };
                    cells.push(cell);
                }
                cells.pop(); // drop the start cell
                cells.reverse();
                return Some(cells.iter().map(|&c| self.grid_to_world(c)).collect());
            }

            let g = g_score[self.idx(current)];
            for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                let next = GridCell {
                    x: current.x + dx,
                    y: current.y + dy,
                };
                if !self.is_walkable(next) {
                    continue;
                }
                let tentative = g + 1;
                let ni = self.idx(next);
                if tentative < g_score[ni] {
                    g_score[ni] = tentative;
                    came_from[ni] = self.idx(current);
                    push_counter += 1;
                    heap.push(Reverse((tentative + h(next), push_counter, next.x, next.y)));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Build a grid straight from an ASCII map: `#` blocked, `.` walkable.
    fn grid_from_map(map: &[&str]) -> Grid {
        let rows = map.len() as i32;
        let cols = map[0].len() as i32;
        let mut walkable = Vec::with_capacity((rows * cols) as usize);
        for row in map {
            for ch in row.chars() {
                walkable.push(ch != '#');
            }
        }
        Grid {
            cols,
            rows,
            tile_size: 32.0,
            walkable,
        }
    }

    /// Brute-force BFS shortest path length, for cross-checking A*.
    fn bfs_len(grid: &Grid, start: GridCell, goal: GridCell) -> Option<usize> {
        let mut visited = vec![false; (grid.cols * grid.rows) as usize];
        let mut queue = VecDeque::new();
        visited[grid.idx(start)] = true;
        queue.push_back((start, 0usize));
        while let Some((cell, dist)) = queue.pop_front() {
            if cell == goal {
                return Some(dist);
            }
            for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                let next = GridCell {
                    x: cell.x + dx,
                    y: cell.y + dy,
                };
                if grid.is_walkable(next) && !visited[grid.idx(next)] {
                    visited[grid.idx(next)] = true;
                    queue.push_back((next, dist + 1));
                }
            }
        }
        None
    }

    #[test]
    fn test_path_matches_bfs_length() {
        let grid = grid_from_map(&[
            "..........",
            "..######..",
            "..#....#..",
            "..#.##.#..",
            "....##....",
            "..........",
        ]);
        let start = GridCell { x: 0, y: 0 };
        let goal = GridCell { x: 9, y: 5 };
        let path = grid.find_path(start, goal).expect("connected fixture");
        let expected = bfs_len(&grid, start, goal).unwrap();
        assert_eq!(path.len(), expected);
    }

    #[test]
    fn test_path_cells_are_4_adjacent() {
        let grid = grid_from_map(&["....", ".##.", "....", "...."]);
        let start = GridCell { x: 0, y: 0 };
        let goal = GridCell { x: 3, y: 3 };
        let path = grid.find_path(start, goal).unwrap();
        let mut prev = grid.grid_to_world(start);
        for point in path {
            let step = (point - prev).abs();
            assert!(
                (step.x == grid.tile_size && step.y == 0.0)
                    || (step.x == 0.0 && step.y == grid.tile_size),
                "non-adjacent step {prev:?} -> {point:?}"
            );
            prev = point;
        }
    }

    #[test]
    fn test_unwalkable_start_fails() {
        let grid = grid_from_map(&["#...", "....", "....", "...."]);
        assert!(grid
            .find_path(GridCell { x: 0, y: 0 }, GridCell { x: 3, y: 3 })
            .is_none());
    }

    #[test]
    fn test_blocked_goal_retargets_nearby() {
        let grid = grid_from_map(&["....", "....", "..#.", "...."]);
        let path = grid
            .find_path(GridCell { x: 0, y: 0 }, GridCell { x: 2, y: 2 })
            .expect("retarget to a neighbor of the blocked goal");
        assert!(!path.is_empty());
        // Final waypoint is adjacent to the requested goal
        let end = *path.last().unwrap();
        let goal_center = grid.grid_to_world(GridCell { x: 2, y: 2 });
        assert!((end - goal_center).length() <= grid.tile_size * 1.01);
    }

    #[test]
    fn test_fully_enclosed_goal_fails() {
        let grid = grid_from_map(&[
            ".........",
            ".#######.",
            ".#######.",
            ".#######.",
            ".#######.",
            ".#######.",
            ".#######.",
            ".#######.",
            ".........",
        ]);
        // Center of the 7x7 block: the nearest walkable cell is Manhattan
        // distance 4 away, outside the retarget radius
        assert!(grid
            .find_path(GridCell { x: 0, y: 0 }, GridCell { x: 4, y: 4 })
            .is_none());
    }

    #[test]
    fn test_retarget_radius_reaches_into_small_block() {
        let grid = grid_from_map(&[
            ".........",
            "..#####..",
            "..#####..",
            "..#####..",
            "..#####..",
            "..#####..",
            ".........",
        ]);
        // Center of a 5x5 block: (4,0) is exactly Manhattan distance 3
        // from the goal, so retargeting succeeds
        assert!(grid
            .find_path(GridCell { x: 0, y: 0 }, GridCell { x: 4, y: 3 })
            .is_some());
    }

    #[test]
    fn test_same_cell_returns_empty_path() {
        let grid = grid_from_map(&["..", ".."]);
        let cell = GridCell { x: 1, y: 1 };
        assert_eq!(grid.find_path(cell, cell), Some(Vec::new()));
    }

    #[test]
    fn test_world_grid_round_trip() {
        let grid = grid_from_map(&["....", "....", "....", "...."]);
        let cell = GridCell { x: 2, y: 1 };
        let center = grid.grid_to_world(cell);
        assert_eq!(grid.world_to_grid(center), Some(cell));
        assert_eq!(grid.world_to_grid(Vec2::new(-1.0, 0.0)), None);
    }

    #[test]
    fn test_build_marks_obstacle_cells() {
        use crate::consts::{OBSTACLE_BASE_HP, TILE_SIZE};
        let arena = Arena {
            width: TILE_SIZE * 4.0,
            height: TILE_SIZE * 4.0,
        };
        let obstacles = vec![Obstacle::new(
            1,
            Vec2::new(TILE_SIZE * 1.5, TILE_SIZE * 1.5),
            true,
            OBSTACLE_BASE_HP,
        )];
        let grid = Grid::build(&arena, &obstacles, TILE_SIZE);
        assert!(!grid.is_walkable(GridCell { x: 1, y: 1 }));
        assert!(grid.is_walkable(GridCell { x: 3, y: 3 }));
    }
}
