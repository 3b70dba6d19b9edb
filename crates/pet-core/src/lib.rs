#![deny(warnings)]

//! Core domain model and invariants for the Dropli pet simulation.
//!
//! This crate defines the serializable game state shared by every other
//! crate, the progression curve, the elapsed-time decay arithmetic, and
//! validation helpers that check the state invariants.

pub mod decay;
pub mod progression;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use progression::{evolution_for_level, normalize, xp_to_next, Progress, MAX_LEVEL};

/// Upper bound of every need.
pub const NEED_MAX: u8 = 100;

/// Display name given to a freshly created pet.
pub const DEFAULT_NAME: &str = "Dropli";

/// One of the four bounded vitality stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Need {
    /// Nourishment.
    Minerals,
    /// Water level.
    Hydration,
    /// Mood.
    Happiness,
    /// Rest. Recovers instead of decaying while sleeping.
    Sleep,
}

impl Need {
    /// All needs in display order.
    pub const ALL: [Need; 4] = [Need::Minerals, Need::Hydration, Need::Happiness, Need::Sleep];

    /// Stable snapshot field name.
    pub fn as_str(self) -> &'static str {
        match self {
            Need::Minerals => "minerals",
            Need::Hydration => "hydration",
            Need::Happiness => "happiness",
            Need::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Need {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minerals" | "purity" => Ok(Need::Minerals),
            "hydration" => Ok(Need::Hydration),
            "happiness" => Ok(Need::Happiness),
            "sleep" | "social" => Ok(Need::Sleep),
            other => Err(ParseError::UnknownNeed(other.to_string())),
        }
    }
}

/// Body slot an accessory is worn in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Hat,
    Face,
    Neck,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Hat, Slot::Face, Slot::Neck];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Hat => "hat",
            Slot::Face => "face",
            Slot::Neck => "neck",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hat" => Ok(Slot::Hat),
            "face" => Ok(Slot::Face),
            "neck" => Ok(Slot::Neck),
            other => Err(ParseError::UnknownSlot(other.to_string())),
        }
    }
}

/// Purchasable permanent upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    /// Extra dewdrops per click.
    ClickPower,
    /// Dewdrops produced every second without interaction.
    AutoGather,
    /// Slows need decay by 20% of the base interval per level.
    Resilience,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [
        UpgradeKind::ClickPower,
        UpgradeKind::AutoGather,
        UpgradeKind::Resilience,
    ];

    /// Stable snapshot field name.
    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeKind::ClickPower => "clickPower",
            UpgradeKind::AutoGather => "autoGather",
            UpgradeKind::Resilience => "resilience",
        }
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UpgradeKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clickPower" | "click-power" => Ok(UpgradeKind::ClickPower),
            "autoGather" | "auto-gather" => Ok(UpgradeKind::AutoGather),
            "resilience" => Ok(UpgradeKind::Resilience),
            other => Err(ParseError::UnknownUpgrade(other.to_string())),
        }
    }
}

/// Errors produced when parsing identifiers from text.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown need: {0}")]
    UnknownNeed(String),
    #[error("unknown accessory slot: {0}")]
    UnknownSlot(String),
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
}

/// Purchased upgrade counters. They only ever increase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrades {
    pub click_power: u32,
    pub auto_gather: u32,
    pub resilience: u32,
}

impl Upgrades {
    /// Owned level of an upgrade.
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::ClickPower => self.click_power,
            UpgradeKind::AutoGather => self.auto_gather,
            UpgradeKind::Resilience => self.resilience,
        }
    }

    /// Raise an upgrade by one level.
    pub fn increment(&mut self, kind: UpgradeKind) {
        let counter = match kind {
            UpgradeKind::ClickPower => &mut self.click_power,
            UpgradeKind::AutoGather => &mut self.auto_gather,
            UpgradeKind::Resilience => &mut self.resilience,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Accessory ids currently worn, one per slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipped {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neck: Option<String>,
}

impl Equipped {
    /// Accessory worn in `slot`, if any.
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Hat => self.hat.as_deref(),
            Slot::Face => self.face.as_deref(),
            Slot::Neck => self.neck.as_deref(),
        }
    }

    /// Mutable access to a slot.
    pub fn slot_mut(&mut self, slot: Slot) -> &mut Option<String> {
        match slot {
            Slot::Hat => &mut self.hat,
            Slot::Face => &mut self.face,
            Slot::Neck => &mut self.neck,
        }
    }

    /// Iterate over occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|id| (slot, id)))
    }
}

/// The single persistent pet aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Owner-chosen display label.
    pub name: String,
    /// Need in [0, 100].
    pub minerals: u8,
    /// Need in [0, 100].
    pub hydration: u8,
    /// Need in [0, 100].
    pub happiness: u8,
    /// Need in [0, 100].
    pub sleep: u8,
    /// XP inside the current level; unbounded only at the level cap.
    pub xp: f64,
    /// Level in [1, 15].
    pub level: u8,
    /// Evolution stage derived from `level`.
    pub evolution: u8,
    /// Epoch milliseconds anchor for elapsed-time effects.
    pub last_timestamp: i64,
    /// Currency balance (>= 0).
    pub dewdrops: f64,
    /// While set, sleep recovers and needs do not decay.
    pub is_sleeping: bool,
    /// Owned accessory ids.
    pub inventory: BTreeSet<String>,
    /// Worn accessories.
    pub equipped: Equipped,
    /// Purchased upgrades.
    pub upgrades: Upgrades,
}

impl GameState {
    /// Fresh pet with full needs, anchored at `now_ms`.
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            name: name.into(),
            minerals: NEED_MAX,
            hydration: NEED_MAX,
            happiness: NEED_MAX,
            sleep: NEED_MAX,
            xp: 0.0,
            level: 1,
            evolution: 1,
            last_timestamp: now_ms,
            dewdrops: 0.0,
            is_sleeping: false,
            inventory: BTreeSet::new(),
            equipped: Equipped::default(),
            upgrades: Upgrades::default(),
        }
    }

    /// Current value of a need.
    pub fn need(&self, need: Need) -> u8 {
        match need {
            Need::Minerals => self.minerals,
            Need::Hydration => self.hydration,
            Need::Happiness => self.happiness,
            Need::Sleep => self.sleep,
        }
    }

    /// Overwrite a need, capped at [`NEED_MAX`].
    pub fn set_need(&mut self, need: Need, value: u8) {
        let value = value.min(NEED_MAX);
        match need {
            Need::Minerals => self.minerals = value,
            Need::Hydration => self.hydration = value,
            Need::Happiness => self.happiness = value,
            Need::Sleep => self.sleep = value,
        }
    }

    /// Whether `id` is in the inventory.
    pub fn owns(&self, id: &str) -> bool {
        self.inventory.contains(id)
    }

    /// Current progression triple.
    pub fn progress(&self) -> Progress {
        Progress {
            xp: self.xp,
            level: self.level,
            evolution: self.evolution,
        }
    }

    /// Replace xp, level and evolution together.
    pub fn set_progress(&mut self, p: Progress) {
        self.xp = p.xp;
        self.level = p.level;
        self.evolution = p.evolution;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, 0)
    }
}

/// Validation errors for state invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A need exceeded 100.
    #[error("{need} = {value} is outside [0, 100]")]
    NeedOutOfRange { need: Need, value: u8 },
    /// Level outside [1, 15].
    #[error("level {0} is outside [1, 15]")]
    LevelOutOfRange(u8),
    /// Stored evolution disagrees with the level.
    #[error("evolution {found} does not match level {level} (expected {expected})")]
    EvolutionMismatch { level: u8, found: u8, expected: u8 },
    /// XP is negative or non-finite.
    #[error("xp must be finite and non-negative")]
    InvalidXp,
    /// XP reached the next threshold without levelling.
    #[error("xp {xp} at level {level} should have levelled up")]
    UnnormalizedXp { xp: f64, level: u8 },
    /// Currency is negative or non-finite.
    #[error("dewdrop balance must be finite and non-negative")]
    InvalidBalance,
    /// A worn accessory is not in the inventory.
    #[error("equipped accessory not owned: {0}")]
    EquippedNotOwned(String),
}

/// Validate needs are within bounds.
pub fn validate_needs(state: &GameState) -> Result<(), ValidationError> {
    for need in Need::ALL {
        let value = state.need(need);
        if value > NEED_MAX {
            return Err(ValidationError::NeedOutOfRange { need, value });
        }
    }
    Ok(())
}

/// Validate xp, level and evolution are mutually consistent.
pub fn validate_progress(state: &GameState) -> Result<(), ValidationError> {
    if !(1..=MAX_LEVEL).contains(&state.level) {
        return Err(ValidationError::LevelOutOfRange(state.level));
    }
    let expected = evolution_for_level(state.level);
    if state.evolution != expected {
        return Err(ValidationError::EvolutionMismatch {
            level: state.level,
            found: state.evolution,
            expected,
        });
    }
    if !state.xp.is_finite() || state.xp < 0.0 {
        return Err(ValidationError::InvalidXp);
    }
    if state.level < MAX_LEVEL && state.xp >= xp_to_next(state.level) {
        return Err(ValidationError::UnnormalizedXp {
            xp: state.xp,
            level: state.level,
        });
    }
    Ok(())
}

/// Validate the whole state.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    validate_needs(state)?;
    validate_progress(state)?;
    if !state.dewdrops.is_finite() || state.dewdrops < 0.0 {
        return Err(ValidationError::InvalidBalance);
    }
    for (_, id) in state.equipped.iter() {
        if !state.owns(id) {
            return Err(ValidationError::EquippedNotOwned(id.to_string()));
        }
    }
    Ok(())
}
