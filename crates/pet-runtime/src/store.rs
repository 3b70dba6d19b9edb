//! The single owner of the live game state and its mutation API.

use crate::clock::Clock;
use crate::reconcile::reconcile;
use crate::tick;
use pet_core::{normalize, GameState, Need, Slot, UpgradeKind, DEFAULT_NAME, NEED_MAX};
use pet_econ::{self as econ, EconError};
use persistence::PersistenceGateway;
use tracing::{debug, error, info, warn};

/// What caused a state change.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Tick,
    NeedAdjusted(Need),
    XpGranted,
    Clicked,
    DewdropsAdded,
    SleepToggled,
    UpgradePurchased(UpgradeKind),
    AccessoryPurchased(String),
    AccessoryToggled(Slot),
    Renamed,
}

/// Level gained by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelUp {
    pub from: u8,
    pub to: u8,
    /// The evolution stage increased as well.
    pub evolved: bool,
}

/// Notification delivered to subscribers after every change.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreEvent {
    pub transition: Transition,
    pub level_up: Option<LevelUp>,
}

/// Result of a shop purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    InsufficientFunds,
    AlreadyOwned,
    /// Price was negative or not a number.
    Rejected,
}

/// Handle returned by [`StateStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&GameState, &StoreEvent) + Send>;

/// Owns the canonical [`GameState`].
///
/// Every mutation computes a new state from the current one and installs it
/// in one step. Installing a changed state persists it through the gateway
/// and notifies subscribers; calls that change nothing do neither. No
/// operation fails: bad input is clamped or ignored and save errors are
/// logged.
pub struct StateStore<G, C> {
    state: GameState,
    gateway: G,
    clock: C,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<G: PersistenceGateway, C: Clock> StateStore<G, C> {
    /// Load, catch up and persist the saved state, or create a new pet.
    pub fn open(gateway: G, clock: C) -> Self {
        Self::open_with_name(gateway, clock, DEFAULT_NAME)
    }

    /// Like [`StateStore::open`], naming a newly created pet `name`.
    pub fn open_with_name(gateway: G, clock: C, name: &str) -> Self {
        let now = clock.now_ms();
        let state = match gateway.load(now) {
            Ok(Some(saved)) => {
                info!(name = %saved.name, level = saved.level, "loaded saved state");
                reconcile(saved, now)
            }
            Ok(None) => {
                info!(name, "no save found, creating a new pet");
                GameState::new(name, now)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable save");
                GameState::new(name, now)
            }
        };
        let mut store = Self {
            state,
            gateway,
            clock,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        store.persist();
        store
    }

    /// Current state.
    pub fn snapshot(&self) -> &GameState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Register a callback run after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&GameState, &StoreEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Run the live degradation clock once.
    pub fn tick(&mut self) -> bool {
        let next = tick::tick(&self.state, self.clock.now_ms());
        self.commit(next, Transition::Tick)
    }

    /// Add `delta` to a need, clamped into [0, 100]. Re-anchors the clock.
    pub fn adjust_need(&mut self, need: Need, delta: i64) -> bool {
        let mut next = self.state.clone();
        let value = i64::from(next.need(need))
            .saturating_add(delta)
            .clamp(0, i64::from(NEED_MAX));
        next.set_need(need, value as u8);
        next.last_timestamp = self.clock.now_ms();
        self.commit(next, Transition::NeedAdjusted(need))
    }

    /// Grant XP through the progression curve. Negative or non-finite
    /// amounts are ignored.
    pub fn grant_xp(&mut self, amount: f64) -> bool {
        let mut next = self.state.clone();
        if !add_xp(&mut next, amount) {
            return false;
        }
        self.commit(next, Transition::XpGranted)
    }

    /// Tap the pet: earn `1 + clickPower` dewdrops and half that in XP.
    pub fn click(&mut self) -> bool {
        let mut next = self.state.clone();
        let power = econ::click_yield(next.upgrades.click_power);
        next.dewdrops += power;
        add_xp(&mut next, econ::click_xp(power));
        self.commit(next, Transition::Clicked)
    }

    /// Earn dewdrops plus 20% of them as XP. Negative or non-finite amounts
    /// are ignored.
    pub fn add_dewdrops(&mut self, amount: f64) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            debug!(amount, "ignoring invalid dewdrop amount");
            return false;
        }
        let mut next = self.state.clone();
        next.dewdrops += amount;
        add_xp(&mut next, econ::dewdrop_xp(amount));
        self.commit(next, Transition::DewdropsAdded)
    }

    /// Fall asleep or wake up. Re-anchors the clock.
    pub fn toggle_sleep(&mut self) -> bool {
        let mut next = self.state.clone();
        next.is_sleeping = !next.is_sleeping;
        next.last_timestamp = self.clock.now_ms();
        self.commit(next, Transition::SleepToggled)
    }

    /// Buy one level of an upgrade at `cost`.
    pub fn buy_upgrade(&mut self, kind: UpgradeKind, cost: f64) -> PurchaseOutcome {
        if econ::validate_price(cost).is_err() {
            return PurchaseOutcome::Rejected;
        }
        if !econ::can_afford(self.state.dewdrops, cost) {
            return PurchaseOutcome::InsufficientFunds;
        }
        let mut next = self.state.clone();
        next.dewdrops -= cost;
        next.upgrades.increment(kind);
        add_xp(&mut next, econ::purchase_xp(cost));
        self.commit(next, Transition::UpgradePurchased(kind));
        PurchaseOutcome::Purchased
    }

    /// Buy an accessory at `cost` unless it is already owned.
    pub fn buy_accessory(&mut self, id: &str, cost: f64) -> PurchaseOutcome {
        if econ::validate_price(cost).is_err() {
            return PurchaseOutcome::Rejected;
        }
        if self.state.owns(id) {
            return PurchaseOutcome::AlreadyOwned;
        }
        if !econ::can_afford(self.state.dewdrops, cost) {
            return PurchaseOutcome::InsufficientFunds;
        }
        let mut next = self.state.clone();
        next.dewdrops -= cost;
        next.inventory.insert(id.to_string());
        add_xp(&mut next, econ::purchase_xp(cost));
        self.commit(next, Transition::AccessoryPurchased(id.to_string()));
        PurchaseOutcome::Purchased
    }

    /// Equip `id` in `slot`, or unequip it if it is already worn there.
    /// Ownership is the caller's concern.
    pub fn toggle_accessory(&mut self, id: &str, slot: Slot) -> bool {
        let mut next = self.state.clone();
        let worn = next.equipped.slot_mut(slot);
        if worn.as_deref() == Some(id) {
            *worn = None;
        } else {
            *worn = Some(id.to_string());
        }
        self.commit(next, Transition::AccessoryToggled(slot))
    }

    /// Change the display name. Blank names are ignored.
    pub fn rename(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let mut next = self.state.clone();
        next.name = name.to_string();
        self.commit(next, Transition::Renamed)
    }

    /// Buy the next level of an upgrade at its catalog price.
    pub fn buy_listed_upgrade(&mut self, kind: UpgradeKind) -> PurchaseOutcome {
        let cost = econ::upgrade_cost(kind, self.state.upgrades.level(kind));
        self.buy_upgrade(kind, cost)
    }

    /// Buy a catalog accessory, enforcing its unlock level.
    pub fn buy_listed_accessory(&mut self, id: &str) -> Result<PurchaseOutcome, EconError> {
        let listing = econ::accessory(id)?;
        if let Err(e) = econ::check_unlocked(listing, self.state.level) {
            warn!(error = %e, "accessory purchase refused");
            return Err(e);
        }
        Ok(self.buy_accessory(listing.id, listing.cost))
    }

    /// Toggle an owned catalog accessory in its own slot.
    pub fn equip_owned(&mut self, id: &str) -> Result<Slot, EconError> {
        let listing = econ::accessory(id)?;
        if !self.state.owns(id) {
            return Err(EconError::NotOwned(id.to_string()));
        }
        self.toggle_accessory(listing.id, listing.slot);
        Ok(listing.slot)
    }

    /// Release the store, returning the final state.
    pub fn into_state(self) -> GameState {
        self.state
    }

    fn commit(&mut self, next: GameState, transition: Transition) -> bool {
        if next == self.state {
            return false;
        }
        let level_up = (next.level > self.state.level).then(|| LevelUp {
            from: self.state.level,
            to: next.level,
            evolved: next.evolution > self.state.evolution,
        });
        self.state = next;
        debug!(?transition, "state transition");
        if let Some(up) = level_up {
            info!(from = up.from, to = up.to, evolved = up.evolved, "level up");
        }
        self.persist();
        let event = StoreEvent {
            transition,
            level_up,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &event);
        }
        true
    }

    fn persist(&mut self) {
        if let Err(e) = self.gateway.save(&self.state) {
            error!(error = %e, "failed to persist state");
        }
    }
}

fn add_xp(state: &mut GameState, amount: f64) -> bool {
    if !amount.is_finite() || amount < 0.0 {
        debug!(amount, "ignoring invalid xp grant");
        return false;
    }
    state.set_progress(normalize(state.xp + amount, state.level));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pet_core::validate_state;
    use persistence::{encode_snapshot, MemoryStore};
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn fresh() -> (StateStore<MemoryStore, ManualClock>, MemoryStore, ManualClock) {
        let gateway = MemoryStore::new();
        let clock = ManualClock::new(1_000_000);
        let store = StateStore::open(gateway.clone(), clock.clone());
        (store, gateway, clock)
    }

    fn saved(state: &GameState) -> MemoryStore {
        MemoryStore::with_payload(encode_snapshot(state).unwrap())
    }

    #[test]
    fn first_open_creates_and_saves() {
        let (store, gateway, _) = fresh();
        assert_eq!(store.snapshot().name, DEFAULT_NAME);
        assert_eq!(store.snapshot().last_timestamp, 1_000_000);
        assert_eq!(gateway.writes(), 1);
    }

    #[test]
    fn open_catches_up_offline_time() {
        let mut old = GameState::new("Old", 0);
        old.upgrades.auto_gather = 1;
        let gateway = saved(&old);
        let store = StateStore::open(gateway.clone(), ManualClock::new(600_000));
        let s = store.snapshot();
        assert_eq!(s.minerals, 87);
        assert_eq!(s.dewdrops, 600.0);
        assert_eq!(s.last_timestamp, 600_000);
        assert_eq!(gateway.writes(), 1);
        assert!(gateway.payload().unwrap().contains("\"lastTimestamp\":600000"));
    }

    #[test]
    fn unreadable_save_starts_over() {
        let gateway = MemoryStore::with_payload("{broken");
        let store = StateStore::open(gateway.clone(), ManualClock::new(5));
        assert_eq!(store.snapshot(), &GameState::new(DEFAULT_NAME, 5));
        assert!(gateway.payload().unwrap().starts_with('{'));
        assert_eq!(gateway.writes(), 1);
    }

    #[test]
    fn adjust_need_clamps_and_reanchors() {
        let (mut store, _, clock) = fresh();
        clock.advance(30_000);
        store.adjust_need(Need::Hydration, -250);
        assert_eq!(store.snapshot().hydration, 0);
        assert_eq!(store.snapshot().last_timestamp, 1_030_000);
        store.adjust_need(Need::Hydration, i64::MAX);
        assert_eq!(store.snapshot().hydration, 100);
    }

    #[test]
    fn add_dewdrops_grants_a_fifth_as_xp() {
        let (mut store, gateway, _) = fresh();
        assert!(store.add_dewdrops(100.0));
        assert_eq!(store.snapshot().dewdrops, 100.0);
        assert_eq!(store.snapshot().xp, 20.0);
        assert_eq!(gateway.writes(), 2);
        assert!(!store.add_dewdrops(-5.0));
        assert!(!store.add_dewdrops(f64::INFINITY));
        assert_eq!(gateway.writes(), 2);
    }

    #[test]
    fn click_uses_click_power() {
        let (mut store, _, _) = fresh();
        store.click();
        assert_eq!(store.snapshot().dewdrops, 1.0);
        assert_eq!(store.snapshot().xp, 0.5);

        let mut rich = GameState::new("t", 0);
        rich.upgrades.click_power = 2;
        let mut store = StateStore::open(saved(&rich), ManualClock::new(0));
        store.click();
        assert_eq!(store.snapshot().dewdrops, 3.0);
        assert_eq!(store.snapshot().xp, 1.5);
    }

    #[test]
    fn upgrade_without_funds_is_a_no_op() {
        let mut s = GameState::new("t", 0);
        s.dewdrops = 40.0;
        let gateway = saved(&s);
        let mut store = StateStore::open(gateway.clone(), ManualClock::new(0));
        let before = store.snapshot().clone();
        assert_eq!(
            store.buy_upgrade(UpgradeKind::ClickPower, 50.0),
            PurchaseOutcome::InsufficientFunds
        );
        assert_eq!(store.snapshot(), &before);
        assert_eq!(gateway.writes(), 1);
        assert_eq!(
            store.buy_upgrade(UpgradeKind::ClickPower, -1.0),
            PurchaseOutcome::Rejected
        );
    }

    #[test]
    fn upgrade_purchase_spends_and_rewards() {
        let (mut store, _, _) = fresh();
        store.add_dewdrops(200.0);
        assert_eq!(
            store.buy_listed_upgrade(UpgradeKind::ClickPower),
            PurchaseOutcome::Purchased
        );
        let s = store.snapshot();
        assert_eq!(s.dewdrops, 150.0);
        assert_eq!(s.upgrades.click_power, 1);
        assert_eq!(s.xp, 40.0 + 2.5);
    }

    #[test]
    fn accessories_buy_once_and_toggle() {
        let mut s = GameState::new("t", 0);
        s.dewdrops = 40_000.0;
        let mut store = StateStore::open(saved(&s), ManualClock::new(0));
        assert_eq!(store.buy_listed_accessory("freckles"), Ok(PurchaseOutcome::Purchased));
        assert_eq!(store.snapshot().dewdrops, 25_000.0);
        assert_eq!(store.buy_accessory("freckles", 0.0), PurchaseOutcome::AlreadyOwned);
        assert!(matches!(
            store.buy_listed_accessory("tophat"),
            Err(EconError::Locked { required: 10, .. })
        ));
        assert!(store.equip_owned("glasses").is_err());

        assert_eq!(store.equip_owned("freckles"), Ok(Slot::Face));
        assert_eq!(store.snapshot().equipped.face.as_deref(), Some("freckles"));
        store.toggle_accessory("freckles", Slot::Face);
        assert_eq!(store.snapshot().equipped.face, None);
    }

    #[test]
    fn sleep_toggle_reanchors() {
        let (mut store, _, clock) = fresh();
        clock.advance(44_000);
        store.toggle_sleep();
        assert!(store.snapshot().is_sleeping);
        assert_eq!(store.snapshot().last_timestamp, 1_044_000);
    }

    #[test]
    fn tick_saves_only_on_change() {
        let (mut store, gateway, clock) = fresh();
        clock.advance(1_000);
        assert!(!store.tick());
        assert_eq!(gateway.writes(), 1);
        clock.advance(44_000);
        assert!(store.tick());
        assert_eq!(store.snapshot().minerals, 99);
        assert_eq!(gateway.writes(), 2);
    }

    #[test]
    fn rename_ignores_blank() {
        let (mut store, _, _) = fresh();
        assert!(!store.rename("   "));
        assert!(store.rename("  Gotita "));
        assert_eq!(store.snapshot().name, "Gotita");
    }

    #[test]
    fn subscribers_see_level_ups() {
        let (mut store, _, _) = fresh();
        let seen: Arc<Mutex<Vec<StoreEvent>>> = Arc::default();
        let sink = seen.clone();
        let id = store.subscribe(move |_, e| sink.lock().unwrap().push(e.clone()));

        store.grant_xp(150.0);
        let to_six: f64 = (2..6).map(pet_core::xp_to_next).sum();
        store.grant_xp(to_six);
        assert!(store.unsubscribe(id));
        store.grant_xp(1.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0].level_up,
            Some(LevelUp { from: 1, to: 2, evolved: false })
        );
        assert_eq!(seen[1].transition, Transition::XpGranted);
        assert_eq!(
            seen[1].level_up,
            Some(LevelUp { from: 2, to: 6, evolved: true })
        );
    }

    #[derive(Clone, Debug)]
    enum Op {
        Adjust(usize, i64),
        Xp(f64),
        Click,
        Earn(f64),
        Sleep,
        Upgrade(usize, f64),
        Accessory(usize),
        Equip(usize),
        Advance(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4, -150i64..150).prop_map(|(n, d)| Op::Adjust(n, d)),
            (-50.0f64..5_000.0).prop_map(Op::Xp),
            Just(Op::Click),
            (-50.0f64..20_000.0).prop_map(Op::Earn),
            Just(Op::Sleep),
            (0usize..3, -10.0f64..500.0).prop_map(|(k, c)| Op::Upgrade(k, c)),
            (0usize..5).prop_map(Op::Accessory),
            (0usize..5).prop_map(Op::Equip),
            (0i64..600_000).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(ops in proptest::collection::vec(op(), 1..60)) {
            let (mut store, _, clock) = fresh();
            let mut level = store.snapshot().level;
            let mut upgrades = store.snapshot().upgrades.clone();
            for op in ops {
                match op {
                    Op::Adjust(n, d) => { store.adjust_need(Need::ALL[n], d); }
                    Op::Xp(x) => { store.grant_xp(x); }
                    Op::Click => { store.click(); }
                    Op::Earn(a) => { store.add_dewdrops(a); }
                    Op::Sleep => { store.toggle_sleep(); }
                    Op::Upgrade(k, c) => { store.buy_upgrade(UpgradeKind::ALL[k], c); }
                    Op::Accessory(i) => { let _ = store.buy_listed_accessory(econ::ACCESSORIES[i].id); }
                    Op::Equip(i) => { let _ = store.equip_owned(econ::ACCESSORIES[i].id); }
                    Op::Advance(ms) => { clock.advance(ms); store.tick(); }
                }
                let s = store.snapshot();
                prop_assert!(validate_state(s).is_ok(), "{:?}", validate_state(s));
                prop_assert!(s.level >= level);
                for kind in UpgradeKind::ALL {
                    prop_assert!(s.upgrades.level(kind) >= upgrades.level(kind));
                }
                level = s.level;
                upgrades = s.upgrades.clone();
            }
        }
    }
}
