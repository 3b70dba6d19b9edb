//! Offline catch-up applied once when a saved state is loaded.

use pet_core::decay::{
    auto_gather_income, decay_points, deduct_needs, elapsed_ms, recover_sleep, sleep_gain,
};
use pet_core::GameState;
use tracing::info;

/// Collapse everything that happened between the saved `last_timestamp` and
/// `now_ms` into one transition.
///
/// Uses the same arithmetic as [`crate::tick::tick`], judged by the sleeping
/// flag as saved (toggles are not replayed). Passive income accrues whether
/// sleeping or not. The anchor is always moved to `now_ms`.
pub fn reconcile(mut state: GameState, now_ms: i64) -> GameState {
    let elapsed = elapsed_ms(state.last_timestamp, now_ms);
    let income = auto_gather_income(elapsed, state.upgrades.auto_gather);
    state.dewdrops += income;
    if state.is_sleeping {
        recover_sleep(&mut state, sleep_gain(elapsed));
    } else {
        let points = decay_points(elapsed, state.upgrades.resilience);
        deduct_needs(&mut state, points);
    }
    state.last_timestamp = now_ms;
    info!(elapsed_ms = elapsed, income, "offline catch-up applied");
    state
}
