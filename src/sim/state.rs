//! Per-room combat state and core entity types
//!
//! Everything here lives for exactly one room: created on room entry from
//! the run state, discarded on room exit. Entities carry capability flags
//! rather than forming a class hierarchy; the AI controller composes
//! behavior from the flags.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::enemy;
use super::pathfind::Grid;
use super::rng::SimRng;
use super::roomgen::{self, LayoutVariant};
use super::weapons::{ArsenalState, EffectiveWeapon, effective_weapon};
use crate::consts::*;
use crate::run::RunState;

/// Axis-aligned arena rectangle, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Inside the arena, expanded by `margin` on every side.
    pub fn contains(&self, pos: Vec2, margin: f32) -> bool {
        pos.x >= -margin
            && pos.x <= self.width + margin
            && pos.y >= -margin
            && pos.y <= self.height + margin
    }

    /// Clamp a point into the playable interior.
    pub fn clamp(&self, pos: Vec2, inset: f32) -> Vec2 {
        Vec2::new(
            pos.x.clamp(inset, self.width - inset),
            pos.y.clamp(inset, self.height - inset),
        )
    }
}

/// A barricade tile. Destructible ones track hit points and leave both
/// collision and the next grid rebuild when destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    /// Tile center in world coordinates
    pub pos: Vec2,
    pub destructible: bool,
    pub hp: i32,
    /// Last time an enemy chipped this tile (contact damage throttle)
    #[serde(skip)]
    pub last_chipped_at: f32,
}

impl Obstacle {
    pub fn new(id: u32, pos: Vec2, destructible: bool, hp: i32) -> Self {
        Self {
            id,
            pos,
            destructible,
            hp,
            last_chipped_at: f32::MIN,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(TILE_SIZE * 0.5))
    }
}

/// Capability tag set. Enemy "type" is a composition of these flags, not a
/// class hierarchy; new archetypes add flag combinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapFlags {
    pub enemy: bool,
    pub shooter: bool,
    pub sniper: bool,
    pub machine_gunner: bool,
    pub rocketeer: bool,
    pub runner: bool,
    pub boss: bool,
    /// Immune to death; accumulates a damage counter instead
    pub dummy: bool,
}

impl CapFlags {
    /// Ranged archetypes keep a preferred distance band instead of the
    /// melee movement-mode roulette.
    pub fn ranged(&self) -> bool {
        self.shooter || self.sniper || self.machine_gunner || self.rocketeer
    }
}

/// Ground-enemy movement mode, re-rolled on a dwell timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveMode {
    Chase,
    /// Sinusoidal perpendicular strafe at 1.5x base speed
    Zigzag { freq: f32, amp: f32, phase: f32 },
    Wander { dir: Vec2 },
    Flee,
    /// Waypoint-following when line of sight is blocked
    PathFollow,
}

/// Sniper attack sub-state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SniperPhase {
    Cooldown,
    /// Movement frozen, target line re-tracked until the timer fires
    Aiming,
}

/// An AI-controlled combatant (or target dummy).
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub flags: CapFlags,
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub speed: f32,
    pub radius: f32,

    // Movement state machine
    pub mode: MoveMode,
    pub mode_until: f32,
    pub path: Vec<Vec2>,
    pub path_index: usize,
    pub path_queried_at: f32,
    pub stuck_anchor: Vec2,
    pub stuck_check_at: f32,

    // Attack cadence
    pub next_attack_at: f32,
    pub burst_remaining: u32,
    pub burst_index: u32,
    pub next_burst_shot_at: f32,
    pub sniper_phase: SniperPhase,
    pub phase_until: f32,
    /// Frozen at aim start, re-tracked while aiming
    pub aim_target: Vec2,

    /// Damage counter for dummies (never dies, keeps score)
    pub dummy_damage: i64,
}

impl Enemy {
    pub fn body(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(self.radius))
    }
}

/// Transient fire-and-forget entity.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    /// Position at the previous tick, for tunneling-safe segment checks
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub damage: i32,
    /// Owner side determines which collision group this can damage
    pub from_player: bool,
    pub kind: ProjectileKind,
    /// Zero means no blast on detonation/hit
    pub blast_radius: f32,
    pub aoe_damage: i32,
    pub traveled: f32,
    /// Targets already damaged by this projectile (at most once each)
    pub hit_ids: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileKind {
    /// Stops at the first obstacle; `pierce_budget` extra entity hits
    Ballistic { pierce_budget: u32 },
    /// Detonates on proximity to the target point, on overshooting it, or
    /// on contact
    Rocket { target: Vec2, max_travel: f32 },
    /// Pierces all enemies and obstacles, damaging each entity once and
    /// obstacles not at all
    Rail,
}

/// The player combatant.
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub arsenal: ArsenalState,
    pub dash_charges: u32,
    pub dash_capacity: u32,
    pub dash_regen_secs: f32,
    /// When the next dash charge finishes regenerating
    pub dash_regen_done_at: f32,
    pub ability_ready_at: f32,
}

/// Complete per-room simulation state.
#[derive(Debug, Clone)]
pub struct CombatState {
    /// Room-level seed, derived from the run seed and depth
    pub seed: u32,
    pub depth: u32,
    pub rng: SimRng,
    pub time_ticks: u64,
    pub arena: Arena,
    pub obstacles: Vec<Obstacle>,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub grid: Grid,
    pub grid_built_at: f32,
    /// Obstacles changed since the last grid build
    pub grid_dirty: bool,
    pub player: Player,
    /// Effective stats of the active weapon, re-derived on switch
    pub active_weapon: EffectiveWeapon,
    next_id: u32,
}

impl CombatState {
    /// Build a populated room from the run state. Reads seed, difficulty,
    /// depth, equipped weapon/build and dash configuration; the run state
    /// itself is only lent to the combat core for the room's lifetime.
    pub fn new_room(run: &RunState, variant: LayoutVariant, boss_room: bool) -> Self {
        // Each room gets its own deterministic stream so replaying a room
        // at the same depth reproduces it exactly
        let seed = run.seed.wrapping_add(run.depth.wrapping_mul(0x9E37_79B9));
        let mut rng = SimRng::new(seed);

        let plan = roomgen::generate_room(&mut rng, run.depth);
        let arena = Arena {
            width: plan.width as f32 * TILE_SIZE,
            height: plan.height as f32 * TILE_SIZE,
        };

        let mut next_id = 1u32;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let mut obstacles = roomgen::generate_barricades(&mut rng, &arena, variant);
        for ob in &mut obstacles {
            ob.id = alloc();
        }

        let spawn_count = if boss_room { 1 } else { plan.spawn_count };
        let spawns = roomgen::spawn_points(&mut rng, &arena, spawn_count, &obstacles);

        let mut enemies = Vec::with_capacity(spawns.len());
        for spawn in spawns {
            let enemy = if boss_room {
                enemy::spawn_boss(alloc(), spawn, run.depth, run.difficulty, &mut rng)
            } else {
                enemy::spawn_for_depth(alloc(), spawn, run.depth, run.difficulty, &mut rng)
            };
            enemies.push(enemy);
        }

        let weapon_id = run.equipped_weapon.clone();
        let build = run.build_for(&weapon_id);
        let active_weapon = effective_weapon(&weapon_id, &build);
        let arsenal = ArsenalState::new(&weapon_id, &active_weapon);

        let player = Player {
            pos: arena.center(),
            vel: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            arsenal,
            dash_charges: run.dash_capacity,
            dash_capacity: run.dash_capacity,
            dash_regen_secs: run.dash_regen_secs,
            dash_regen_done_at: 0.0,
            ability_ready_at: 0.0,
        };

        let grid = Grid::build(&arena, &obstacles, TILE_SIZE);

        log::info!(
            "room depth={} {}x{} tiles, {} obstacles, {} enemies{}",
            run.depth,
            plan.width,
            plan.height,
            obstacles.len(),
            enemies.len(),
            if boss_room { " (boss)" } else { "" },
        );

        Self {
            seed,
            depth: run.depth,
            rng,
            time_ticks: 0,
            arena,
            obstacles,
            enemies,
            projectiles: Vec::new(),
            grid,
            grid_built_at: 0.0,
            grid_dirty: false,
            player,
            active_weapon,
            next_id,
        }
    }

    /// Simulation clock in seconds.
    pub fn time_secs(&self) -> f32 {
        self.time_ticks as f32 * SIM_DT
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Switch the active weapon, cancelling reload and charge.
    pub fn switch_weapon(&mut self, id: &str, run: &RunState) {
        if self.player.arsenal.active == id {
            return;
        }
        let build = run.build_for(id);
        let eff = effective_weapon(id, &build);
        self.player.arsenal.switch_weapon(id, &eff);
        self.active_weapon = eff;
    }

    /// Keep entity iteration order stable for determinism.
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
        self.projectiles.sort_by_key(|p| p.id);
    }

    /// True once every non-dummy enemy is gone.
    pub fn room_cleared(&self) -> bool {
        self.enemies.iter().all(|e| e.flags.dummy)
    }
}
