//! Deepshot - combat simulation core for a top-down run-based shooter
//!
//! Core modules:
//! - `run`: Long-lived run state (health, gold, depth, weapon builds)
//! - `sim`: Deterministic per-room simulation (room generation,
//!   pathfinding, weapons, enemy AI, tick resolution)
//!
//! Rendering, input polling, UI panels and save transport live outside this
//! crate; they consume [`sim::HudSnapshot`] values and feed
//! [`sim::TickInput`]s once per tick.

pub mod run;
pub mod sim;

pub use run::{Difficulty, NextScene, RunState};
pub use sim::{CombatState, HudSnapshot, RoomOutcome, TickInput};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Obstacle/pathfinding tile edge length in world units
    pub const TILE_SIZE: f32 = 32.0;

    /// Radius around the arena center kept free of obstacles so the
    /// player never spawns boxed in
    pub const CENTER_EXCLUSION_RADIUS: f32 = 120.0;

    /// Hit points of a freshly placed destructible obstacle
    pub const OBSTACLE_BASE_HP: i32 = 30;

    /// Minimum time between pathfinding grid rebuilds (seconds)
    pub const GRID_REBUILD_COOLDOWN: f32 = 1.2;

    /// Player defaults
    pub const PLAYER_MAX_HEALTH: i32 = 100;
    pub const PLAYER_SPEED: f32 = 170.0;
    pub const PLAYER_RADIUS: f32 = 12.0;

    /// Dash defaults
    pub const DASH_CHARGES: u32 = 2;
    pub const DASH_REGEN_SECS: f32 = 3.0;
    pub const DASH_DISTANCE: f32 = 110.0;

    /// Spread heat ramps while fire is held and cools on release
    /// (fraction per second)
    pub const HEAT_RAMP_PER_SEC: f32 = 0.7;
    pub const HEAT_COOL_PER_SEC: f32 = 1.2;

    /// Railgun charge window (seconds)
    pub const CHARGE_MAX_SECS: f32 = 1.5;

    /// Enemy contact damage to destructible obstacles is throttled to at
    /// most one application per this interval (seconds)
    pub const OBSTACLE_CHIP_INTERVAL: f32 = 0.25;

    /// Exponential smoothing factor applied to enemy velocities each tick
    pub const VELOCITY_SMOOTHING: f32 = 0.12;

    /// Gold rewards
    pub const GOLD_PER_KILL: u32 = 5;
    pub const GOLD_PER_BOSS: u32 = 25;

    /// Projectiles beyond this margin outside the arena are removed
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 64.0;
}
