//! Elapsed-time arithmetic shared by the live clock and the offline catch-up.
//!
//! Both paths must produce identical results for the same elapsed time, so
//! all quantities are computed in integer milliseconds.

use crate::{GameState, Need, NEED_MAX};

/// One need point is lost every 45 seconds without resilience.
pub const BASE_DECAY_INTERVAL_MS: i64 = 45_000;
/// Each resilience level stretches the interval by 20% of the base.
pub const RESILIENCE_STEP_MS: i64 = 9_000;
/// One sleep point is recovered every 2 seconds while sleeping.
pub const SLEEP_RECOVERY_MS: i64 = 2_000;
/// Auto-gather pays out once per second.
pub const AUTO_GATHER_PERIOD_MS: i64 = 1_000;

/// Time since `last_ms`, never negative (clock skew reads as zero).
pub fn elapsed_ms(last_ms: i64, now_ms: i64) -> i64 {
    now_ms.saturating_sub(last_ms).max(0)
}

/// Milliseconds per need point at the given resilience level:
/// `45000 * (1 + 0.2 * resilience)`.
pub fn decay_interval_ms(resilience: u32) -> i64 {
    BASE_DECAY_INTERVAL_MS.saturating_add(RESILIENCE_STEP_MS.saturating_mul(i64::from(resilience)))
}

/// Whole need points lost over `elapsed_ms`.
pub fn decay_points(elapsed_ms: i64, resilience: u32) -> i64 {
    elapsed_ms.max(0) / decay_interval_ms(resilience)
}

/// Whole sleep points recovered over `elapsed_ms`.
pub fn sleep_gain(elapsed_ms: i64) -> i64 {
    elapsed_ms.max(0) / SLEEP_RECOVERY_MS
}

/// Dewdrops produced by auto-gather over `elapsed_ms`.
pub fn auto_gather_income(elapsed_ms: i64, auto_gather: u32) -> f64 {
    let periods = elapsed_ms.max(0) / AUTO_GATHER_PERIOD_MS;
    periods as f64 * f64::from(auto_gather)
}

/// Subtract `points` from all four needs, each floored at zero on its own.
pub fn deduct_needs(state: &mut GameState, points: i64) {
    let points = points.clamp(0, i64::from(NEED_MAX)) as u8;
    for need in Need::ALL {
        let value = state.need(need).saturating_sub(points);
        state.set_need(need, value);
    }
}

/// Add `points` to sleep, capped at 100. Reaching the cap wakes the pet.
pub fn recover_sleep(state: &mut GameState, points: i64) {
    let total = (i64::from(state.sleep) + points.max(0)).min(i64::from(NEED_MAX));
    state.sleep = total as u8;
    if state.sleep == NEED_MAX {
        state.is_sleeping = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_grows_with_resilience() {
        assert_eq!(decay_interval_ms(0), 45_000);
        assert_eq!(decay_interval_ms(1), 54_000);
        assert_eq!(decay_interval_ms(3), 72_000);
    }

    #[test]
    fn ten_minutes_awake_costs_thirteen_points() {
        assert_eq!(decay_points(600_000, 0), 13);
        assert_eq!(decay_points(44_999, 0), 0);
        assert_eq!(decay_points(-5_000, 0), 0);
    }

    #[test]
    fn needs_floor_independently() {
        let mut s = GameState::new("t", 0);
        s.minerals = 5;
        s.hydration = 50;
        deduct_needs(&mut s, 13);
        assert_eq!(s.minerals, 0);
        assert_eq!(s.hydration, 37);
        assert_eq!(s.happiness, 87);
        assert_eq!(s.sleep, 87);
    }

    #[test]
    fn full_sleep_wakes_up() {
        let mut s = GameState::new("t", 0);
        s.sleep = 40;
        s.is_sleeping = true;
        recover_sleep(&mut s, sleep_gain(600_000));
        assert_eq!(s.sleep, 100);
        assert!(!s.is_sleeping);

        s.sleep = 10;
        s.is_sleeping = true;
        recover_sleep(&mut s, 5);
        assert_eq!(s.sleep, 15);
        assert!(s.is_sleeping);
    }

    #[test]
    fn income_counts_whole_seconds() {
        assert_eq!(auto_gather_income(2_999, 3), 6.0);
        assert_eq!(auto_gather_income(-1, 3), 0.0);
    }
}
