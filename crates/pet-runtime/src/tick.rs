//! Live degradation clock: one transition per cadence while a session runs.

use pet_core::decay::{decay_points, deduct_needs, elapsed_ms, recover_sleep, sleep_gain};
use pet_core::GameState;
use std::time::Duration;

/// Cadence of the live clock.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Advance a live state to `now_ms`.
///
/// Auto-gather pays `autoGather` dewdrops per call and grants no XP. Sleep
/// recovery or need decay is applied only once at least one whole point is
/// due, and only then is `last_timestamp` moved to `now_ms`, so partial
/// progress carries over to the next call.
pub fn tick(state: &GameState, now_ms: i64) -> GameState {
    let mut next = state.clone();
    if next.upgrades.auto_gather > 0 {
        next.dewdrops += f64::from(next.upgrades.auto_gather);
    }
    let elapsed = elapsed_ms(next.last_timestamp, now_ms);
    if next.is_sleeping {
        let gain = sleep_gain(elapsed);
        if gain >= 1 {
            recover_sleep(&mut next, gain);
            next.last_timestamp = now_ms;
        }
    } else {
        let points = decay_points(elapsed, next.upgrades.resilience);
        if points >= 1 {
            deduct_needs(&mut next, points);
            next.last_timestamp = now_ms;
        }
    }
    next
}
