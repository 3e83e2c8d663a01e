//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod enemy;
pub mod pathfind;
pub mod rng;
pub mod roomgen;
pub mod state;
pub mod tick;
pub mod weapons;

pub use collision::{Aabb, circle_overlaps_aabb, segment_hits_aabb};
pub use pathfind::{Grid, GridCell};
pub use rng::SimRng;
pub use roomgen::{LayoutVariant, RoomPlan, generate_barricades, generate_room, spawn_points};
pub use state::{
    Arena, CapFlags, CombatState, Enemy, MoveMode, Obstacle, Player, Projectile, ProjectileKind,
};
pub use tick::{HudSnapshot, RoomOutcome, TickInput, tick};
pub use weapons::{ArsenalState, EffectiveWeapon, WeaponBuild, WeaponDef, effective_weapon};
