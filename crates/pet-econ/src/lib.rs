#![deny(warnings)]

//! Shop economy for the Dropli pet: prices, catalog and reward rates.
//!
//! This module provides validated utilities for:
//! - Upgrade price curves that grow geometrically with the owned level
//! - The accessory catalog with slots and unlock levels
//! - Dewdrop yield and XP reward rates for interactions

use pet_core::{Slot, UpgradeKind};
use serde::Serialize;
use thiserror::Error;

/// XP granted per dewdrop produced by a click.
pub const CLICK_XP_RATE: f64 = 0.5;
/// XP granted per dewdrop earned outside of clicks (e.g. minigame prizes).
pub const DEWDROP_XP_RATE: f64 = 0.2;
/// XP granted per dewdrop spent in the shop.
pub const PURCHASE_XP_RATE: f64 = 0.05;

/// Errors produced by catalog and pricing helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// No accessory with this id is sold.
    #[error("unknown accessory: {0}")]
    UnknownAccessory(String),
    /// The accessory needs a higher pet level.
    #[error("{id} unlocks at level {required} (current level {level})")]
    Locked { id: String, required: u8, level: u8 },
    /// The accessory is not in the inventory.
    #[error("accessory not owned: {0}")]
    NotOwned(String),
    /// Prices must be finite and non-negative.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
}

/// Dewdrops produced by one click.
///
/// Example:
/// assert_eq!(click_yield(0), 1.0);
/// assert_eq!(click_yield(4), 5.0);
pub fn click_yield(click_power: u32) -> f64 {
    1.0 + f64::from(click_power)
}

/// XP for a click that produced `power` dewdrops.
pub fn click_xp(power: f64) -> f64 {
    power * CLICK_XP_RATE
}

/// XP for earning `amount` dewdrops.
pub fn dewdrop_xp(amount: f64) -> f64 {
    amount * DEWDROP_XP_RATE
}

/// XP for spending `cost` dewdrops.
pub fn purchase_xp(cost: f64) -> f64 {
    cost * PURCHASE_XP_RATE
}

/// Check a price is usable. Returns it unchanged when valid.
pub fn validate_price(cost: f64) -> Result<f64, EconError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(EconError::InvalidPrice(cost));
    }
    Ok(cost)
}

/// Whether `balance` covers `cost`. Invalid prices are never affordable.
pub fn can_afford(balance: f64, cost: f64) -> bool {
    validate_price(cost).is_ok() && balance >= cost
}

/// Price curve of one upgrade.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct UpgradeListing {
    pub kind: UpgradeKind,
    /// Price of the first level.
    pub base_cost: f64,
    /// Growth factor applied per owned level.
    pub multiplier: f64,
}

/// Upgrade price curves.
pub static UPGRADES: [UpgradeListing; 3] = [
    UpgradeListing {
        kind: UpgradeKind::ClickPower,
        base_cost: 50.0,
        multiplier: 1.6,
    },
    UpgradeListing {
        kind: UpgradeKind::AutoGather,
        base_cost: 150.0,
        multiplier: 1.8,
    },
    UpgradeListing {
        kind: UpgradeKind::Resilience,
        base_cost: 300.0,
        multiplier: 2.0,
    },
];

/// Price curve for `kind`.
pub fn upgrade_listing(kind: UpgradeKind) -> &'static UpgradeListing {
    match kind {
        UpgradeKind::ClickPower => &UPGRADES[0],
        UpgradeKind::AutoGather => &UPGRADES[1],
        UpgradeKind::Resilience => &UPGRADES[2],
    }
}

/// Price of the next level when `owned` levels are already bought:
/// `floor(base_cost * multiplier^owned)`.
///
/// Example:
/// assert_eq!(upgrade_cost(UpgradeKind::ClickPower, 0), 50.0);
/// assert_eq!(upgrade_cost(UpgradeKind::ClickPower, 1), 80.0);
pub fn upgrade_cost(kind: UpgradeKind, owned: u32) -> f64 {
    let l = upgrade_listing(kind);
    (l.base_cost * l.multiplier.powf(f64::from(owned))).floor()
}

/// A cosmetic item sold in the shop.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AccessoryListing {
    pub id: &'static str,
    pub slot: Slot,
    pub cost: f64,
    /// Minimum pet level to buy it.
    pub unlock_level: u8,
}

/// Accessory catalog, cheapest first.
pub static ACCESSORIES: [AccessoryListing; 5] = [
    AccessoryListing {
        id: "freckles",
        slot: Slot::Face,
        cost: 15_000.0,
        unlock_level: 1,
    },
    AccessoryListing {
        id: "glasses",
        slot: Slot::Face,
        cost: 20_000.0,
        unlock_level: 3,
    },
    AccessoryListing {
        id: "scarf",
        slot: Slot::Neck,
        cost: 25_000.0,
        unlock_level: 5,
    },
    AccessoryListing {
        id: "cap",
        slot: Slot::Hat,
        cost: 35_000.0,
        unlock_level: 7,
    },
    AccessoryListing {
        id: "tophat",
        slot: Slot::Hat,
        cost: 50_000.0,
        unlock_level: 10,
    },
];

/// Look up an accessory by id.
pub fn accessory(id: &str) -> Result<&'static AccessoryListing, EconError> {
    ACCESSORIES
        .iter()
        .find(|a| a.id == id)
        .ok_or_else(|| EconError::UnknownAccessory(id.to_string()))
}

/// Fail with [`EconError::Locked`] when `level` is below the unlock level.
pub fn check_unlocked(listing: &AccessoryListing, level: u8) -> Result<(), EconError> {
    if level < listing.unlock_level {
        return Err(EconError::Locked {
            id: listing.id.to_string(),
            required: listing.unlock_level,
            level,
        });
    }
    Ok(())
}

/// Accessories purchasable at `level`.
pub fn unlocked_accessories(level: u8) -> impl Iterator<Item = &'static AccessoryListing> {
    ACCESSORIES.iter().filter(move |a| a.unlock_level <= level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_prices_match_catalog() {
        assert_eq!(upgrade_cost(UpgradeKind::ClickPower, 0), 50.0);
        assert_eq!(upgrade_cost(UpgradeKind::ClickPower, 1), 80.0);
        assert_eq!(upgrade_cost(UpgradeKind::AutoGather, 0), 150.0);
        assert_eq!(upgrade_cost(UpgradeKind::AutoGather, 2), 486.0);
        assert_eq!(upgrade_cost(UpgradeKind::Resilience, 3), 2_400.0);
    }

    #[test]
    fn reward_rates() {
        assert_eq!(click_yield(2), 3.0);
        assert_eq!(click_xp(3.0), 1.5);
        assert_eq!(dewdrop_xp(100.0), 20.0);
        assert_eq!(purchase_xp(50.0), 2.5);
    }

    #[test]
    fn catalog_lookup_and_locks() {
        let scarf = accessory("scarf").unwrap();
        assert_eq!(scarf.slot, Slot::Neck);
        assert_eq!(
            check_unlocked(scarf, 4),
            Err(EconError::Locked {
                id: "scarf".to_string(),
                required: 5,
                level: 4
            })
        );
        assert!(check_unlocked(scarf, 5).is_ok());
        assert_eq!(
            accessory("monocle").unwrap_err(),
            EconError::UnknownAccessory("monocle".to_string())
        );
        assert_eq!(unlocked_accessories(1).count(), 1);
        assert_eq!(unlocked_accessories(15).count(), ACCESSORIES.len());
    }

    #[test]
    fn affordability() {
        assert!(can_afford(50.0, 50.0));
        assert!(!can_afford(40.0, 50.0));
        assert!(!can_afford(100.0, -1.0));
        assert!(!can_afford(100.0, f64::NAN));
    }

    proptest! {
        #[test]
        fn prices_never_decrease(owned in 0u32..20) {
            for kind in UpgradeKind::ALL {
                prop_assert!(upgrade_cost(kind, owned + 1) >= upgrade_cost(kind, owned));
            }
        }
    }
}
