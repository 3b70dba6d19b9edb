//! Seeded random play-through that checks state invariants after every step.

use anyhow::{bail, Context, Result};
use pet_core::{validate_state, GameState, Need, UpgradeKind};
use pet_econ::ACCESSORIES;
use pet_runtime::{CareAction, ManualClock, StateStore};
use persistence::MemoryStore;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const CARE: [CareAction; 4] = [
    CareAction::Nourish,
    CareAction::Rain,
    CareAction::Sleep,
    CareAction::MinigameWin,
];

#[derive(Debug)]
pub struct SoakReport {
    pub steps: u64,
    pub reopens: u64,
    pub state: GameState,
}

/// Run `steps` random interactions against an in-memory save.
pub fn soak(steps: u64, seed: u64) -> Result<SoakReport> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let clock = ManualClock::new(0);
    let gateway = MemoryStore::new();
    let mut store = StateStore::open(gateway.clone(), clock.clone());
    let mut reopens = 0;

    for step in 0..steps {
        let before = store.snapshot().clone();
        match rng.gen_range(0..12) {
            0 => {
                let need = Need::ALL[rng.gen_range(0..Need::ALL.len())];
                store.adjust_need(need, rng.gen_range(-60..=60));
            }
            1 => {
                store.grant_xp(rng.gen_range(0.0..400.0));
            }
            2 | 3 => {
                store.click();
            }
            4 => {
                store.add_dewdrops(rng.gen_range(0.0..5_000.0));
            }
            5 => {
                let kind = UpgradeKind::ALL[rng.gen_range(0..UpgradeKind::ALL.len())];
                store.buy_listed_upgrade(kind);
            }
            6 => {
                let id = ACCESSORIES[rng.gen_range(0..ACCESSORIES.len())].id;
                let _ = store.buy_listed_accessory(id);
            }
            7 => {
                let id = ACCESSORIES[rng.gen_range(0..ACCESSORIES.len())].id;
                let _ = store.equip_owned(id);
            }
            8 => {
                store.perform(CARE[rng.gen_range(0..CARE.len())]);
            }
            9 => {
                clock.advance(rng.gen_range(0..7_200_000));
                drop(store);
                store = StateStore::open(gateway.clone(), clock.clone());
                reopens += 1;
            }
            _ => {
                clock.advance(rng.gen_range(0..90_000));
                store.tick();
            }
        }

        let s = store.snapshot();
        validate_state(s).with_context(|| format!("invariant broken at step {step}"))?;
        if s.level < before.level {
            bail!("level went down at step {step}: {} -> {}", before.level, s.level);
        }
        for kind in UpgradeKind::ALL {
            if s.upgrades.level(kind) < before.upgrades.level(kind) {
                bail!("{kind} went down at step {step}");
            }
        }
        debug!(step, level = s.level, dewdrops = s.dewdrops, "soak step");
    }

    Ok(SoakReport {
        steps,
        reopens,
        state: store.into_state(),
    })
}
