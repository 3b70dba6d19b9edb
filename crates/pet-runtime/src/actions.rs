//! Care actions offered by the home screen, composed from the store API.

use crate::clock::Clock;
use crate::store::StateStore;
use pet_core::Need;
use persistence::PersistenceGateway;
use std::fmt;
use std::str::FromStr;

/// A compound interaction with the pet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CareAction {
    /// +15 minerals, 10 XP.
    Nourish,
    /// +15 hydration, 15 XP.
    Rain,
    /// Toggle sleep; 10 XP when going to bed.
    Sleep,
    /// Minigame prize: 20 XP, +10 happiness, 50 dewdrops.
    MinigameWin,
}

impl CareAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CareAction::Nourish => "nourish",
            CareAction::Rain => "rain",
            CareAction::Sleep => "sleep",
            CareAction::MinigameWin => "win",
        }
    }
}

impl fmt::Display for CareAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CareAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nourish" | "feed" => Ok(CareAction::Nourish),
            "rain" => Ok(CareAction::Rain),
            "sleep" => Ok(CareAction::Sleep),
            "win" | "minigame-win" => Ok(CareAction::MinigameWin),
            other => Err(format!("unknown care action: {other}")),
        }
    }
}

impl<G: PersistenceGateway, C: Clock> StateStore<G, C> {
    /// Perform a care action. Returns true if anything changed.
    pub fn perform(&mut self, action: CareAction) -> bool {
        match action {
            CareAction::Nourish => {
                let fed = self.adjust_need(Need::Minerals, 15);
                self.grant_xp(10.0) || fed
            }
            CareAction::Rain => {
                let watered = self.adjust_need(Need::Hydration, 15);
                self.grant_xp(15.0) || watered
            }
            CareAction::Sleep => {
                let going_to_bed = !self.snapshot().is_sleeping;
                let toggled = self.toggle_sleep();
                if going_to_bed {
                    self.grant_xp(10.0);
                }
                toggled
            }
            CareAction::MinigameWin => self.on_win(),
        }
    }

    /// Reward wired to every minigame's win callback.
    pub fn on_win(&mut self) -> bool {
        let xp = self.grant_xp(20.0);
        let happy = self.adjust_need(Need::Happiness, 10);
        let paid = self.add_dewdrops(50.0);
        xp || happy || paid
    }
}
