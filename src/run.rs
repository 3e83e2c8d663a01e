//! Long-lived run state
//!
//! Owned by the progression layer and lent to the combat core for the
//! duration of a room. This is also the persistence shape: the whole
//! struct serializes to a flat record, and reloading reconstructs an
//! equivalent PRNG stream from the stored seed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::{DASH_CHARGES, DASH_REGEN_SECS, PLAYER_MAX_HEALTH};
use crate::sim::rng::SimRng;
use crate::sim::weapons::WeaponBuild;

/// Boss rooms recur after this many normal-room clears.
pub const ROOMS_PER_CYCLE: u32 = 3;

/// Difficulty setting, mapping to enemy stat multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn enemy_hp_mult(self) -> f32 {
        match self {
            Difficulty::Easy => 0.8,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    pub fn enemy_damage_mult(self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.25,
        }
    }
}

/// Scene intent reported back to the progression layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextScene {
    Hub,
    Combat,
    Boss,
}

/// Everything that outlives a single room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub health: i32,
    pub max_health: i32,
    pub gold: u32,
    /// Strictly increasing across the run
    pub depth: u32,
    /// Normal rooms cleared since the last boss; resets on boss entry
    pub rooms_cleared_in_cycle: u32,
    pub difficulty: Difficulty,
    pub seed: u32,
    pub owned_weapons: Vec<String>,
    pub equipped_weapon: String,
    pub builds: HashMap<String, WeaponBuild>,
    pub dash_capacity: u32,
    pub dash_regen_secs: f32,
    /// Set by the first lethal hit; later hits cannot re-trigger death
    pub dead: bool,
}

impl RunState {
    pub fn new(seed: u32, difficulty: Difficulty) -> Self {
        Self {
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            gold: 0,
            depth: 1,
            rooms_cleared_in_cycle: 0,
            difficulty,
            seed,
            owned_weapons: vec!["pistol".to_string()],
            equipped_weapon: "pistol".to_string(),
            builds: HashMap::new(),
            dash_capacity: DASH_CHARGES,
            dash_regen_secs: DASH_REGEN_SECS,
            dead: false,
        }
    }

    /// Derive the run's PRNG stream from the stored seed. Reloading a
    /// persisted run reconstructs an equivalent stream.
    pub fn rng(&self) -> SimRng {
        SimRng::new(self.seed)
    }

    /// Build for a weapon id, defaulting to an empty build.
    pub fn build_for(&self, weapon_id: &str) -> WeaponBuild {
        self.builds.get(weapon_id).cloned().unwrap_or_default()
    }

    /// Apply damage, clamping health into [0, max]. Returns true only for
    /// the single call that transitions the run to dead.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.health = (self.health - amount.max(0)).clamp(0, self.max_health);
        if self.health == 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Heal, clamped to max health. Healing never revives.
    pub fn heal(&mut self, amount: i32) {
        if !self.dead {
            self.health = (self.health + amount.max(0)).clamp(0, self.max_health);
        }
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold += amount;
    }

    /// Record a cleared combat room and report where to go next: every
    /// third clear in the cycle routes to the boss room and resets the
    /// counter.
    pub fn progress_after_combat(&mut self) -> NextScene {
        self.depth += 1;
        self.rooms_cleared_in_cycle += 1;
        if self.rooms_cleared_in_cycle >= ROOMS_PER_CYCLE {
            self.rooms_cleared_in_cycle = 0;
            NextScene::Boss
        } else {
            NextScene::Combat
        }
    }

    /// Record a defeated boss; the cycle starts over with normal rooms.
    pub fn progress_after_boss(&mut self) -> NextScene {
        self.depth += 1;
        self.rooms_cleared_in_cycle = 0;
        NextScene::Combat
    }

    /// Player death routes back to the hub.
    pub fn on_player_death(&mut self) -> NextScene {
        NextScene::Hub
    }
}
