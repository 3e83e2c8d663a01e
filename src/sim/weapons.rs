//! Weapon catalog, modification system, and per-weapon fire state
//!
//! Catalog entries are immutable. A [`WeaponBuild`] (three regular mod
//! slots plus one core slot) is applied to a base definition to derive an
//! [`EffectiveWeapon`] value; the catalog is never mutated.
//!
//! Fire state (ammo per weapon, reload, railgun charge, spread heat) lives
//! in [`ArsenalState`] and advances once per simulation tick.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::SimRng;
use crate::consts::{CHARGE_MAX_SECS, HEAT_COOL_PER_SEC, HEAT_RAMP_PER_SEC};

/// Fire interval floor enforced by rate-of-fire mods (seconds)
const MIN_FIRE_INTERVAL: f32 = 0.05;

/// Static weapon catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct WeaponDef {
    pub id: &'static str,
    pub damage: i32,
    /// Seconds between shots
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub pellets: u32,
    /// Base spread cone in degrees (full angle)
    pub spread_deg: f32,
    /// Cone width under fully sustained fire
    pub max_spread_deg: f32,
    pub magazine: u32,
    pub single_fire: bool,
    pub is_laser: bool,
    pub is_railgun: bool,
    pub is_rocket: bool,
    /// Zero means no blast
    pub blast_radius: f32,
    /// Splash damage dealt inside the blast radius (rockets only)
    pub aoe_damage: i32,
    /// Explicit reload duration; `None` falls back to a kind-based default
    pub reload_secs: Option<f32>,
}

/// The immutable weapon catalog. The first entry doubles as the fallback
/// for unknown identifiers.
pub const CATALOG: &[WeaponDef] = &[
    WeaponDef {
        id: "pistol",
        damage: 10,
        fire_interval: 0.28,
        projectile_speed: 520.0,
        pellets: 1,
        spread_deg: 3.0,
        max_spread_deg: 9.0,
        magazine: 12,
        single_fire: true,
        is_laser: false,
        is_railgun: false,
        is_rocket: false,
        blast_radius: 0.0,
        aoe_damage: 0,
        reload_secs: None,
    },
    WeaponDef {
        id: "smg",
        damage: 6,
        fire_interval: 0.09,
        projectile_speed: 480.0,
        pellets: 1,
        spread_deg: 6.0,
        max_spread_deg: 20.0,
        magazine: 30,
        single_fire: false,
        is_laser: false,
        is_railgun: false,
        is_rocket: false,
        blast_radius: 0.0,
        aoe_damage: 0,
        reload_secs: None,
    },
    WeaponDef {
        id: "shotgun",
        damage: 7,
        fire_interval: 0.8,
        projectile_speed: 430.0,
        pellets: 6,
        spread_deg: 28.0,
        max_spread_deg: 40.0,
        magazine: 5,
        single_fire: false,
        is_laser: false,
        is_railgun: false,
        is_rocket: false,
        blast_radius: 0.0,
        aoe_damage: 0,
        reload_secs: Some(1.4),
    },
    WeaponDef {
        id: "rifle",
        damage: 18,
        fire_interval: 0.45,
        projectile_speed: 640.0,
        pellets: 1,
        spread_deg: 2.0,
        max_spread_deg: 7.0,
        magazine: 8,
        single_fire: true,
        is_laser: false,
        is_railgun: false,
        is_rocket: false,
        blast_radius: 0.0,
        aoe_damage: 0,
        reload_secs: None,
    },
    WeaponDef {
        id: "rocket",
        damage: 30,
        fire_interval: 1.1,
        projectile_speed: 300.0,
        pellets: 1,
        spread_deg: 1.0,
        max_spread_deg: 1.0,
        magazine: 3,
        single_fire: true,
        is_laser: false,
        is_railgun: false,
        is_rocket: true,
        blast_radius: 90.0,
        aoe_damage: 15,
        reload_secs: Some(1.8),
    },
    WeaponDef {
        id: "railgun",
        damage: 25,
        fire_interval: 0.9,
        projectile_speed: 900.0,
        pellets: 1,
        spread_deg: 5.0,
        max_spread_deg: 5.0,
        magazine: 4,
        single_fire: true,
        is_laser: false,
        is_railgun: true,
        is_rocket: false,
        blast_radius: 0.0,
        aoe_damage: 0,
        reload_secs: Some(1.6),
    },
];

/// Resolve a weapon identifier, degrading to the first catalog entry for
/// unknown ids rather than failing the tick.
pub fn lookup(id: &str) -> &'static WeaponDef {
    CATALOG.iter().find(|w| w.id == id).unwrap_or(&CATALOG[0])
}

/// Core (special-effect) slot applied after regular mods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreKind {
    /// One extra target beyond the primary before removal
    Pierce,
    /// Detonation on the primary hit: 80% direct, splash to neighbors
    Blast,
    /// Railgun may be held at full charge instead of force-firing
    Hold,
    /// Shotgun-only stat boost; a no-op on any other base weapon
    Overdrive,
}

/// Per-weapon chosen modifications: three regular slots and one core slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponBuild {
    pub mods: [Option<String>; 3],
    pub core: Option<String>,
}

/// Fully-resolved weapon stats after applying a build to a base definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveWeapon {
    pub id: &'static str,
    pub damage: i32,
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub pellets: u32,
    pub spread_deg: f32,
    pub max_spread_deg: f32,
    pub magazine: u32,
    pub single_fire: bool,
    pub is_laser: bool,
    pub is_railgun: bool,
    pub is_rocket: bool,
    pub blast_radius: f32,
    pub aoe_damage: i32,
    pub reload_secs: f32,
    pub core: Option<CoreKind>,
}

impl EffectiveWeapon {
    fn from_def(def: &'static WeaponDef) -> Self {
        Self {
            id: def.id,
            damage: def.damage,
            fire_interval: def.fire_interval,
            projectile_speed: def.projectile_speed,
            pellets: def.pellets,
            spread_deg: def.spread_deg,
            max_spread_deg: def.max_spread_deg,
            magazine: def.magazine,
            single_fire: def.single_fire,
            is_laser: def.is_laser,
            is_railgun: def.is_railgun,
            is_rocket: def.is_rocket,
            blast_radius: def.blast_radius,
            aoe_damage: def.aoe_damage,
            reload_secs: def.reload_secs.unwrap_or_else(|| default_reload(def)),
            core: None,
        }
    }

    /// True when sustained-fire heat applies to this weapon.
    pub fn uses_heat(&self) -> bool {
        !self.single_fire && !self.is_railgun && !self.is_laser
    }
}

/// Kind-based reload fallback for catalog entries without an explicit value.
fn default_reload(def: &WeaponDef) -> f32 {
    if def.is_railgun || def.is_rocket {
        1.6
    } else {
        1.1
    }
}

/// Apply one regular mod. Unknown identifiers are a no-op.
fn apply_mod(eff: &mut EffectiveWeapon, id: &str) {
    match id {
        "damage_up" => eff.damage = (eff.damage as f32 * 1.1).floor() as i32,
        "choke" => eff.spread_deg = (eff.spread_deg * 0.8).floor(),
        "rapid" => eff.fire_interval = (eff.fire_interval * 0.85).max(MIN_FIRE_INTERVAL),
        "big_mag" => eff.magazine += 4,
        _ => {}
    }
}

/// Apply the core slot. The `overdrive` core is gated on the base weapon's
/// identity, not on the mod identity: anywhere but the shotgun it resolves
/// to no core at all.
fn apply_core(eff: &mut EffectiveWeapon, id: &str) {
    match id {
        "pierce" => eff.core = Some(CoreKind::Pierce),
        "blast" => {
            eff.core = Some(CoreKind::Blast);
            if eff.blast_radius == 0.0 {
                eff.blast_radius = 60.0;
            }
        }
        "hold" => eff.core = Some(CoreKind::Hold),
        "overdrive" => {
            if eff.id == "shotgun" {
                eff.core = Some(CoreKind::Overdrive);
                eff.pellets += 2;
                eff.damage = (eff.damage as f32 * 1.15).floor() as i32;
            }
        }
        _ => {}
    }
}

/// Derive the effective weapon for a base id and build: ordered regular
/// mods first, then the single core.
pub fn effective_weapon(base_id: &str, build: &WeaponBuild) -> EffectiveWeapon {
    let mut eff = EffectiveWeapon::from_def(lookup(base_id));
    for slot in build.mods.iter().flatten() {
        apply_mod(&mut eff, slot);
    }
    if let Some(core) = &build.core {
        apply_core(&mut eff, core);
    }
    eff
}

/// One projectile's worth of launch parameters produced by a fire command.
#[derive(Debug, Clone, Copy)]
pub struct Shot {
    pub dir: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub rail: bool,
}

/// In-progress magazine reload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reload {
    pub until: f32,
    pub duration: f32,
}

/// Per-weapon fire state for the player. Ammo is keyed by weapon id so
/// switching weapons preserves each magazine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArsenalState {
    pub active: String,
    pub ammo: HashMap<String, u32>,
    pub reload: Option<Reload>,
    /// Simulation time the railgun charge began, if charging
    pub charge_started: Option<f32>,
    /// Sustained-fire spread heat in [0, 1]
    pub heat: f32,
    pub last_shot_at: f32,
}

impl ArsenalState {
    pub fn new(active: &str, eff: &EffectiveWeapon) -> Self {
        let mut ammo = HashMap::new();
        ammo.insert(active.to_string(), eff.magazine);
        Self {
            active: active.to_string(),
            ammo,
            reload: None,
            charge_started: None,
            heat: 0.0,
            last_shot_at: f32::MIN,
        }
    }

    /// Rounds left in the active weapon's magazine. A weapon never seen
    /// before starts with a full magazine.
    pub fn ammo_in_active(&self, eff: &EffectiveWeapon) -> u32 {
        *self.ammo.get(&self.active).unwrap_or(&eff.magazine)
    }

    /// Switching the active weapon cancels any in-progress reload and any
    /// in-progress charge. No partial credit.
    pub fn switch_weapon(&mut self, id: &str, eff_new: &EffectiveWeapon) {
        if self.active == id {
            return;
        }
        self.reload = None;
        self.charge_started = None;
        self.heat = 0.0;
        self.active = id.to_string();
        self.ammo
            .entry(id.to_string())
            .or_insert(eff_new.magazine);
    }

    /// Charge progress in [0, 1], or `None` when not charging.
    pub fn charge_t(&self, now: f32) -> Option<f32> {
        self.charge_started
            .map(|t0| ((now - t0) / CHARGE_MAX_SECS).clamp(0.0, 1.0))
    }

    /// Current spread cone in radians, after heat widening (or charge
    /// narrowing for the railgun).
    pub fn current_spread(&self, eff: &EffectiveWeapon, now: f32) -> f32 {
        let deg = if eff.is_railgun {
            let t = self.charge_t(now).unwrap_or(0.0);
            eff.spread_deg * (1.0 - t)
        } else if eff.uses_heat() {
            eff.spread_deg + (eff.max_spread_deg - eff.spread_deg) * self.heat
        } else {
            eff.spread_deg
        };
        deg.to_radians()
    }

    fn start_reload(&mut self, eff: &EffectiveWeapon, now: f32) {
        if self.reload.is_none() {
            self.reload = Some(Reload {
                until: now + eff.reload_secs,
                duration: eff.reload_secs,
            });
        }
    }

    fn spend_round(&mut self, eff: &EffectiveWeapon) -> bool {
        let ammo = self
            .ammo
            .entry(self.active.clone())
            .or_insert(eff.magazine);
        if *ammo == 0 {
            return false;
        }
        *ammo -= 1;
        true
    }

    /// Advance the weapon state machine by one tick and return any shots
    /// released this tick.
    ///
    /// Transition order: reload completion, heat, then the fire command.
    /// Firing at zero ammo never goes negative; it starts a reload instead.
    pub fn tick_weapon(
        &mut self,
        eff: &EffectiveWeapon,
        fire_held: bool,
        aim_dir: Vec2,
        now: f32,
        dt: f32,
        rng: &mut SimRng,
    ) -> Vec<Shot> {
        // Finish a due reload: refill to the effective magazine size
        if let Some(reload) = self.reload {
            if now >= reload.until {
                self.ammo.insert(self.active.clone(), eff.magazine);
                self.reload = None;
            }
        }

        // Heat ramps while held, cools when released
        if eff.uses_heat() {
            if fire_held {
                self.heat = (self.heat + HEAT_RAMP_PER_SEC * dt).min(1.0);
            } else {
                self.heat = (self.heat - HEAT_COOL_PER_SEC * dt).max(0.0);
            }
        }

        if self.reload.is_some() {
            return Vec::new();
        }

        let aim_dir = aim_dir.normalize_or_zero();
        if aim_dir == Vec2::ZERO {
            return Vec::new();
        }

        if eff.is_railgun {
            return self.tick_railgun(eff, fire_held, aim_dir, now, rng);
        }

        if !fire_held || now - self.last_shot_at < eff.fire_interval {
            return Vec::new();
        }

        if self.ammo_in_active(eff) == 0 {
            self.start_reload(eff, now);
            return Vec::new();
        }

        self.spend_round(eff);
        self.last_shot_at = now;
        self.volley(eff, aim_dir, now, rng)
    }

    /// Charge-and-release state machine. Reaching full charge force-fires
    /// unless the build carries the hold core.
    fn tick_railgun(
        &mut self,
        eff: &EffectiveWeapon,
        fire_held: bool,
        aim_dir: Vec2,
        now: f32,
        rng: &mut SimRng,
    ) -> Vec<Shot> {
        match self.charge_started {
            None => {
                if fire_held
                    && now - self.last_shot_at >= eff.fire_interval
                    && self.ammo_in_active(eff) > 0
                {
                    self.charge_started = Some(now);
                } else if fire_held && self.ammo_in_active(eff) == 0 {
                    self.start_reload(eff, now);
                }
                Vec::new()
            }
            Some(_) => {
                let t = self.charge_t(now).unwrap_or(0.0);
                let at_max = t >= 1.0;
                let force_fire = at_max && eff.core != Some(CoreKind::Hold);
                if !fire_held || force_fire {
                    self.charge_started = None;
                    if !self.spend_round(eff) {
                        self.start_reload(eff, now);
                        return Vec::new();
                    }
                    self.last_shot_at = now;
                    // Damage and speed scale linearly with hold duration
                    let scale = 1.0 + 2.0 * t;
                    let spread = (eff.spread_deg * (1.0 - t)).to_radians();
                    let jitter = (rng.next_f32() - 0.5) * spread;
                    let dir = rotate(aim_dir, jitter);
                    return vec![Shot {
                        dir,
                        speed: eff.projectile_speed * scale,
                        damage: (eff.damage as f32 * scale).floor() as i32,
                        rail: true,
                    }];
                }
                Vec::new()
            }
        }
    }

    /// Distribute `pellets` shots across the current spread cone. A single
    /// pellet gets one randomized offset inside the cone instead.
    fn volley(
        &self,
        eff: &EffectiveWeapon,
        aim_dir: Vec2,
        now: f32,
        rng: &mut SimRng,
    ) -> Vec<Shot> {
        let spread = self.current_spread(eff, now);
        let mut shots = Vec::with_capacity(eff.pellets as usize);

        if eff.pellets <= 1 {
            let offset = (rng.next_f32() - 0.5) * spread;
            shots.push(Shot {
                dir: rotate(aim_dir, offset),
                speed: eff.projectile_speed,
                damage: eff.damage,
                rail: false,
            });
            return shots;
        }

        let step = spread / (eff.pellets - 1).max(1) as f32;
        for i in 0..eff.pellets {
            let base = -spread / 2.0 + step * i as f32;
            let jitter = (rng.next_f32() - 0.5) * step * 0.3;
            shots.push(Shot {
                dir: rotate(aim_dir, base + jitter),
                speed: eff.projectile_speed,
                damage: eff.damage,
                rail: false,
            });
        }
        shots
    }
}

fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
