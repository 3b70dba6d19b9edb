//! Experience curve and evolution stages.
//!
//! Every XP grant goes through [`normalize`] so that `level` and `evolution`
//! are never set independently of `xp`.

/// Hard level cap. XP keeps accumulating past it as a prestige counter.
pub const MAX_LEVEL: u8 = 15;
/// First level of the second evolution stage.
pub const SECOND_STAGE_LEVEL: u8 = 6;
/// First level of the third evolution stage.
pub const THIRD_STAGE_LEVEL: u8 = 11;

const XP_BASE: f64 = 100.0;
const XP_EXPONENT: f64 = 1.4;

/// Normalized progression triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    /// XP carried inside the current level.
    pub xp: f64,
    /// Level in [1, MAX_LEVEL].
    pub level: u8,
    /// Evolution stage in {1, 2, 3}.
    pub evolution: u8,
}

/// XP needed to go from `level` to `level + 1`: `100 * level^1.4`.
pub fn xp_to_next(level: u8) -> f64 {
    XP_BASE * f64::from(level).powf(XP_EXPONENT)
}

/// Evolution stage for a level.
pub fn evolution_for_level(level: u8) -> u8 {
    if level >= THIRD_STAGE_LEVEL {
        3
    } else if level >= SECOND_STAGE_LEVEL {
        2
    } else {
        1
    }
}

/// Fold surplus XP into levels.
///
/// Consumes `xp_to_next(level)` per level gained and stops at [`MAX_LEVEL`],
/// where the remainder is kept uncapped. The output is a fixed point:
/// normalizing it again returns it unchanged. Non-finite or negative XP is
/// treated as zero and an out-of-range level is clamped into [1, MAX_LEVEL].
pub fn normalize(xp: f64, level: u8) -> Progress {
    let mut level = level.clamp(1, MAX_LEVEL);
    let mut xp = if xp.is_finite() { xp.max(0.0) } else { 0.0 };
    while level < MAX_LEVEL {
        let needed = xp_to_next(level);
        if xp < needed {
            break;
        }
        xp -= needed;
        level += 1;
    }
    Progress {
        xp,
        level,
        evolution: evolution_for_level(level),
    }
}
