//! Enemy AI controller
//!
//! Behavior is composed from capability flags, never from a type
//! hierarchy. Movement and attack cadence run as independent state
//! machines: every "burst", "cooldown" and "aim" is a comparison of the
//! simulation clock against a stored deadline.

use glam::Vec2;

use super::collision::segment_hits_aabb;
use super::pathfind::Grid;
use super::rng::SimRng;
use super::state::{CapFlags, Enemy, MoveMode, Obstacle, SniperPhase};
use crate::consts::VELOCITY_SMOOTHING;
use crate::run::Difficulty;

/// Maximum distance at which ranged enemies acquire the player.
pub const LOCK_RANGE: f32 = 620.0;

/// Movement-mode dwell window for melee types (seconds).
const DWELL_MIN: f32 = 0.9;
const DWELL_MAX: f32 = 2.2;

/// Preferred-range band for shooters and machine gunners.
const RANGED_NEAR: f32 = 160.0;
const RANGED_FAR: f32 = 300.0;
/// Snipers hold much further out.
const SNIPER_NEAR: f32 = 320.0;
const SNIPER_FAR: f32 = 520.0;

/// Waypoint arrival radius while path-following.
const ARRIVAL_RADIUS: f32 = 12.0;
/// Stuck detection: displacement below this over the check window forces a
/// path re-query.
const STUCK_WINDOW: f32 = 0.5;
const STUCK_EPSILON: f32 = 4.0;
/// A held path goes stale after this long without a re-query.
const PATH_STALE_SECS: f32 = 1.2;
/// Minimum gap between A* queries for one enemy.
const REQUERY_THROTTLE: f32 = 0.25;

const SNIPER_AIM_SECS: f32 = 1.0;
const SNIPER_COOLDOWN_SECS: f32 = 2.5;

/// One enemy shot released this tick; the orchestrator turns these into
/// projectiles.
#[derive(Debug, Clone, Copy)]
pub struct EnemyShot {
    pub dir: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub rocket: bool,
}

fn base_enemy(id: u32, pos: Vec2, flags: CapFlags, hp: i32, damage: i32, speed: f32) -> Enemy {
    Enemy {
        id,
        pos,
        vel: Vec2::ZERO,
        flags,
        health: hp,
        max_health: hp,
        damage,
        speed,
        radius: 12.0,
        mode: MoveMode::Chase,
        mode_until: 0.0,
        path: Vec::new(),
        path_index: 0,
        path_queried_at: f32::MIN,
        stuck_anchor: pos,
        stuck_check_at: 0.0,
        next_attack_at: 0.0,
        burst_remaining: 0,
        burst_index: 0,
        next_burst_shot_at: 0.0,
        sniper_phase: SniperPhase::Cooldown,
        phase_until: 0.0,
        aim_target: pos,
        dummy_damage: 0,
    }
}

fn scale(hp: i32, depth: u32, difficulty: Difficulty) -> i32 {
    let depth_mult = 1.0 + depth as f32 * 0.06;
    (hp as f32 * depth_mult * difficulty.enemy_hp_mult()).round() as i32
}

fn scale_dmg(dmg: i32, difficulty: Difficulty) -> i32 {
    (dmg as f32 * difficulty.enemy_damage_mult()).round().max(1.0) as i32
}

pub fn spawn_melee(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(30, depth, diff), scale_dmg(10, diff), 95.0)
}

pub fn spawn_runner(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        runner: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(18, depth, diff), scale_dmg(8, diff), 150.0)
}

pub fn spawn_shooter(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        shooter: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(24, depth, diff), scale_dmg(7, diff), 80.0)
}

pub fn spawn_machine_gunner(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        machine_gunner: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(34, depth, diff), scale_dmg(4, diff), 70.0)
}

pub fn spawn_rocketeer(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        rocketeer: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(28, depth, diff), scale_dmg(14, diff), 65.0)
}

pub fn spawn_sniper(id: u32, pos: Vec2, depth: u32, diff: Difficulty) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        sniper: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, scale(20, depth, diff), scale_dmg(35, diff), 60.0)
}

pub fn spawn_boss(id: u32, pos: Vec2, depth: u32, diff: Difficulty, rng: &mut SimRng) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        boss: true,
        ..Default::default()
    };
    let mut boss = base_enemy(id, pos, flags, scale(400, depth, diff), scale_dmg(12, diff), 75.0);
    boss.radius = 24.0;
    // Desynchronize the wobble between encounters
    boss.aim_target = pos + Vec2::new(rng.next_f32(), rng.next_f32());
    boss
}

/// Standing damage-test fixture: immune to death, tallies damage taken.
pub fn spawn_dummy(id: u32, pos: Vec2) -> Enemy {
    let flags = CapFlags {
        enemy: true,
        dummy: true,
        ..Default::default()
    };
    base_enemy(id, pos, flags, 1, 0, 0.0)
}

/// Depth-weighted archetype mix for normal rooms.
pub fn spawn_for_depth(
    id: u32,
    pos: Vec2,
    depth: u32,
    diff: Difficulty,
    rng: &mut SimRng,
) -> Enemy {
    let roll = rng.next_f32();
    // Deeper rooms shift weight from melee toward ranged archetypes
    let ranged_share = (0.25 + depth as f32 * 0.03).min(0.6);
    if roll < ranged_share {
        match rng.range_i32(0, 3) {
            0 => spawn_shooter(id, pos, depth, diff),
            1 => spawn_machine_gunner(id, pos, depth, diff),
            2 => spawn_rocketeer(id, pos, depth, diff),
            _ => spawn_sniper(id, pos, depth, diff),
        }
    } else if roll < ranged_share + 0.25 {
        spawn_runner(id, pos, depth, diff)
    } else {
        spawn_melee(id, pos, depth, diff)
    }
}

/// True when no obstacle blocks the straight line between two points.
pub fn line_of_sight(from: Vec2, to: Vec2, obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .all(|ob| segment_hits_aabb(from, to, &ob.aabb()).is_none())
}

/// Advance one enemy's movement state machine and update its velocity.
/// Position integration happens in the tick orchestrator.
pub fn update_movement(
    e: &mut Enemy,
    player_pos: Vec2,
    grid: &Grid,
    obstacles: &[Obstacle],
    now: f32,
    rng: &mut SimRng,
) {
    if e.flags.dummy {
        return;
    }
    // Aiming snipers freeze in place
    if e.flags.sniper && e.sniper_phase == SniperPhase::Aiming {
        e.vel += (Vec2::ZERO - e.vel) * VELOCITY_SMOOTHING;
        return;
    }

    let to_player = player_pos - e.pos;
    let dist = to_player.length();
    let dir = to_player.normalize_or_zero();
    let los = line_of_sight(e.pos, player_pos, obstacles);

    let target_vel = if !los {
        path_follow_velocity(e, player_pos, grid, now)
    } else {
        e.path.clear();
        if e.flags.boss {
            // Continuous drift with a perpendicular sinusoidal wobble
            let wobble = (now * 1.7).sin();
            (dir + dir.perp() * wobble * 0.6).normalize_or_zero() * e.speed
        } else if e.flags.ranged() {
            ranged_band_velocity(e, dir, dist, now, rng)
        } else {
            melee_mode_velocity(e, dir, now, rng)
        }
    };

    // Low-pass filter to avoid abrupt direction snaps
    e.vel += (target_vel - e.vel) * VELOCITY_SMOOTHING;
}

/// Wander biased toward the archetype's preferred distance band.
fn ranged_band_velocity(e: &mut Enemy, dir: Vec2, dist: f32, now: f32, rng: &mut SimRng) -> Vec2 {
    let (near, far) = if e.flags.sniper {
        (SNIPER_NEAR, SNIPER_FAR)
    } else {
        (RANGED_NEAR, RANGED_FAR)
    };

    if dist < near {
        return -dir * e.speed;
    }
    if dist > far {
        return dir * e.speed;
    }

    // Inside the band: lazy sideways wander, re-rolled on the dwell timer
    if now >= e.mode_until {
        e.mode_until = now + rng.range_f32(DWELL_MIN, DWELL_MAX);
        let side = if rng.chance(0.5) { 1.0 } else { -1.0 };
        e.mode = MoveMode::Wander {
            dir: dir.perp() * side,
        };
    }
    match e.mode {
        MoveMode::Wander { dir } => dir * e.speed * 0.5,
        _ => Vec2::ZERO,
    }
}

/// Melee movement-mode roulette: chase, zig-zag strafe, wander, or flee.
fn melee_mode_velocity(e: &mut Enemy, dir: Vec2, now: f32, rng: &mut SimRng) -> Vec2 {
    if now >= e.mode_until || matches!(e.mode, MoveMode::PathFollow) {
        e.mode_until = now + rng.range_f32(DWELL_MIN, DWELL_MAX);
        let roll = rng.next_f32();
        e.mode = if roll < 0.35 {
            MoveMode::Chase
        } else if roll < 0.65 {
            MoveMode::Zigzag {
                freq: rng.range_f32(3.0, 7.0),
                amp: rng.range_f32(0.4, 0.9),
                phase: rng.range_f32(0.0, std::f32::consts::TAU),
            }
        } else if roll < 0.85 {
            let angle = rng.range_f32(0.0, std::f32::consts::TAU);
            MoveMode::Wander {
                dir: Vec2::new(angle.cos(), angle.sin()),
            }
        } else {
            MoveMode::Flee
        };
    }

    match e.mode {
        MoveMode::Chase => dir * e.speed,
        MoveMode::Zigzag { freq, amp, phase } => {
            let sway = (now * freq + phase).sin() * amp;
            (dir + dir.perp() * sway).normalize_or_zero() * e.speed * 1.5
        }
        MoveMode::Wander { dir } => dir * e.speed * 0.7,
        MoveMode::Flee => -dir * e.speed,
        MoveMode::PathFollow => dir * e.speed,
    }
}

/// Follow grid waypoints toward the player while line of sight is blocked.
fn path_follow_velocity(e: &mut Enemy, player_pos: Vec2, grid: &Grid, now: f32) -> Vec2 {
    e.mode = MoveMode::PathFollow;

    // Stuck detection: negligible displacement over the window while LOS
    // stays blocked invalidates the current path
    if now >= e.stuck_check_at {
        if !e.path.is_empty() && e.pos.distance(e.stuck_anchor) < STUCK_EPSILON {
            e.path.clear();
        }
        e.stuck_anchor = e.pos;
        e.stuck_check_at = now + STUCK_WINDOW;
    }

    // Re-query when the path is exhausted or stale, throttled so an
    // unreachable player does not trigger a search every tick
    let exhausted = e.path.is_empty() || e.path_index >= e.path.len();
    let stale = now - e.path_queried_at > PATH_STALE_SECS;
    if (exhausted || stale) && now - e.path_queried_at > REQUERY_THROTTLE {
        e.path_queried_at = now;
        e.path_index = 0;
        e.path = match (grid.world_to_grid(e.pos), grid.world_to_grid(player_pos)) {
            (Some(start), Some(goal)) => grid.find_path(start, goal).unwrap_or_default(),
            // No path is not an error: hold position and wait for the next
            // rebuild or for the player to move
            _ => Vec::new(),
        };
    }

    while e.path_index < e.path.len() && e.pos.distance(e.path[e.path_index]) < ARRIVAL_RADIUS {
        e.path_index += 1;
    }

    match e.path.get(e.path_index) {
        Some(&waypoint) => (waypoint - e.pos).normalize_or_zero() * e.speed,
        None => Vec2::ZERO,
    }
}

/// Advance one enemy's attack cadence and return any shots released this
/// tick. Independent of movement.
pub fn update_attack(
    e: &mut Enemy,
    player_pos: Vec2,
    obstacles: &[Obstacle],
    now: f32,
    rng: &mut SimRng,
) -> Vec<EnemyShot> {
    if e.flags.dummy {
        return Vec::new();
    }
    let dist = e.pos.distance(player_pos);
    let dir = (player_pos - e.pos).normalize_or_zero();

    if e.flags.sniper {
        return sniper_attack(e, player_pos, obstacles, now);
    }
    if e.flags.boss {
        if now >= e.next_attack_at {
            e.next_attack_at = now + 1.4;
            // Fixed 3-way aimed burst: center plus symmetric offsets
            return [-0.3f32, 0.0, 0.3]
                .iter()
                .map(|&offset| EnemyShot {
                    dir: rotate(dir, offset),
                    speed: 300.0,
                    damage: e.damage,
                    rocket: false,
                })
                .collect();
        }
        return Vec::new();
    }

    // Remaining cadences need the player in lock range with clear sight
    let engaged = dist <= LOCK_RANGE && line_of_sight(e.pos, player_pos, obstacles);

    if e.flags.shooter {
        return burst_attack(e, dir, now, engaged, 2, 0.25, 1.6, 320.0, 0.0, rng);
    }
    if e.flags.machine_gunner {
        // Longer burst with a walking spread across it
        return burst_attack(e, dir, now, engaged, 8, 0.12, 2.4, 380.0, 0.04, rng);
    }
    if e.flags.rocketeer && engaged && now >= e.next_attack_at {
        e.next_attack_at = now + 2.8;
        return vec![EnemyShot {
            dir,
            speed: 260.0,
            damage: e.damage,
            rocket: true,
        }];
    }

    Vec::new()
}

/// Shared fixed-size-burst cadence: fire `count` shots at `gap` intervals,
/// then cool down for `interval`.
#[allow(clippy::too_many_arguments)]
fn burst_attack(
    e: &mut Enemy,
    dir: Vec2,
    now: f32,
    engaged: bool,
    count: u32,
    gap: f32,
    interval: f32,
    speed: f32,
    walk_step: f32,
    rng: &mut SimRng,
) -> Vec<EnemyShot> {
    if e.burst_remaining == 0 {
        if engaged && now >= e.next_attack_at {
            e.burst_remaining = count;
            e.burst_index = 0;
            e.next_burst_shot_at = now;
        } else {
            return Vec::new();
        }
    }

    let mut shots = Vec::new();
    while e.burst_remaining > 0 && now >= e.next_burst_shot_at {
        let walk = (e.burst_index as f32 - count as f32 / 2.0) * walk_step;
        let jitter = (rng.next_f32() - 0.5) * 0.05;
        shots.push(EnemyShot {
            dir: rotate(dir, walk + jitter),
            speed,
            damage: e.damage,
            rocket: false,
        });
        e.burst_remaining -= 1;
        e.burst_index += 1;
        e.next_burst_shot_at += gap;
        if e.burst_remaining == 0 {
            e.next_attack_at = now + interval;
        }
    }
    shots
}

/// Sniper cadence: Cooldown -> Aiming (frozen, re-tracked) -> one
/// high-damage, high-speed shot -> Cooldown. Aiming starts only with a
/// clear sight line, like the other ranged cadences.
fn sniper_attack(
    e: &mut Enemy,
    player_pos: Vec2,
    obstacles: &[Obstacle],
    now: f32,
) -> Vec<EnemyShot> {
    match e.sniper_phase {
        SniperPhase::Cooldown => {
            if now >= e.phase_until
                && e.pos.distance(player_pos) <= LOCK_RANGE
                && line_of_sight(e.pos, player_pos, obstacles)
            {
                e.sniper_phase = SniperPhase::Aiming;
                e.phase_until = now + SNIPER_AIM_SECS;
                e.aim_target = player_pos;
            }
            Vec::new()
        }
        SniperPhase::Aiming => {
            // The target line tracks the player until the shot releases
            e.aim_target = player_pos;
            if now >= e.phase_until {
                e.sniper_phase = SniperPhase::Cooldown;
                e.phase_until = now + SNIPER_COOLDOWN_SECS;
                let dir = (e.aim_target - e.pos).normalize_or_zero();
                return vec![EnemyShot {
                    dir,
                    speed: 1400.0,
                    damage: e.damage,
                    rocket: false,
                }];
            }
            Vec::new()
        }
    }
}

fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
