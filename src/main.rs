//! Deepshot headless runner
//!
//! Drives a full run without rendering: seeds the run from the command
//! line, pilots the player with a trivial bot, and logs room outcomes.
//!
//! Usage: `deepshot [seed] [max_rooms]`

use std::env;

use glam::Vec2;

use deepshot::consts::SIM_DT;
use deepshot::run::{Difficulty, NextScene, RunState};
use deepshot::sim::{CombatState, LayoutVariant, RoomOutcome, TickInput, tick};

/// Two minutes of simulated time per room before giving up.
const TICKS_PER_ROOM_CAP: u32 = 60 * 120;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let seed: u32 = match args.next() {
        Some(s) => s.parse()?,
        None => 0xDEE9,
    };
    let max_rooms: u32 = match args.next() {
        Some(s) => s.parse()?,
        None => 10,
    };

    let mut run = RunState::new(seed, Difficulty::Normal);
    log::info!("starting run seed={seed} max_rooms={max_rooms}");

    let mut next = NextScene::Combat;
    for _ in 0..max_rooms {
        let boss = next == NextScene::Boss;
        let mut state = CombatState::new_room(&run, LayoutVariant::Normal, boss);

        let mut outcome = RoomOutcome::InProgress;
        for _ in 0..TICKS_PER_ROOM_CAP {
            let input = bot_input(&state);
            outcome = tick(&mut state, &mut run, &input, SIM_DT);
            if outcome != RoomOutcome::InProgress {
                break;
            }
        }

        match outcome {
            RoomOutcome::Cleared => {
                let hud = state.snapshot(&run);
                log::info!(
                    "depth {} cleared: hp {}/{}, gold {}",
                    run.depth,
                    hud.health,
                    hud.max_health,
                    hud.gold
                );
                next = if boss {
                    run.progress_after_boss()
                } else {
                    run.progress_after_combat()
                };
            }
            RoomOutcome::PlayerDead => {
                run.on_player_death();
                log::info!("died at depth {} with {} gold", run.depth, run.gold);
                break;
            }
            RoomOutcome::InProgress => {
                log::info!("room timed out at depth {}", run.depth);
                break;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

/// Minimal pilot: orbit the room center, aim at the nearest live enemy and
/// hold fire, shockwave anything that gets close, leave once clear.
fn bot_input(state: &CombatState) -> TickInput {
    let t = state.time_secs();
    let orbit = state.arena.center() + Vec2::new((t * 0.7).cos(), (t * 0.7).sin()) * 100.0;
    let move_dir = (orbit - state.player.pos).normalize_or_zero();

    let nearest = state
        .enemies
        .iter()
        .filter(|e| !e.flags.dummy)
        .min_by(|a, b| {
            a.pos
                .distance_squared(state.player.pos)
                .total_cmp(&b.pos.distance_squared(state.player.pos))
        });

    match nearest {
        Some(e) => TickInput {
            move_dir,
            aim: e.pos,
            fire_held: true,
            ability_pressed: e.pos.distance(state.player.pos) < 80.0,
            ..Default::default()
        },
        None => TickInput {
            move_dir,
            interact_pressed: true,
            ..Default::default()
        },
    }
}
