//! Async event loop owning the store: UI commands and the periodic tick are
//! applied one at a time, in arrival order, on a single task.

use crate::actions::CareAction;
use crate::clock::Clock;
use crate::store::{PurchaseOutcome, StateStore};
use crate::tick::TICK_INTERVAL;
use pet_core::{GameState, Need, Slot, UpgradeKind};
use persistence::PersistenceGateway;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

/// A mutation requested by a presentation collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    AdjustNeed(Need, i64),
    GrantXp(f64),
    Click,
    AddDewdrops(f64),
    ToggleSleep,
    BuyUpgrade(UpgradeKind, f64),
    BuyAccessory(String, f64),
    ToggleAccessory(String, Slot),
    Rename(String),
    Care(CareAction),
}

impl<G: PersistenceGateway, C: Clock> StateStore<G, C> {
    /// Apply a command. Returns true if the state changed.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::AdjustNeed(need, delta) => self.adjust_need(need, delta),
            Command::GrantXp(amount) => self.grant_xp(amount),
            Command::Click => self.click(),
            Command::AddDewdrops(amount) => self.add_dewdrops(amount),
            Command::ToggleSleep => self.toggle_sleep(),
            Command::BuyUpgrade(kind, cost) => {
                self.buy_upgrade(kind, cost) == PurchaseOutcome::Purchased
            }
            Command::BuyAccessory(id, cost) => {
                self.buy_accessory(&id, cost) == PurchaseOutcome::Purchased
            }
            Command::ToggleAccessory(id, slot) => self.toggle_accessory(&id, slot),
            Command::Rename(name) => self.rename(&name),
            Command::Care(action) => self.perform(action),
        }
    }
}

/// Handle to a running session.
///
/// Dropping the handle (or calling [`SessionHandle::stop`]) closes the
/// command channel, which stops the timer and ends the task.
pub struct SessionHandle<G, C> {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<GameState>,
    task: JoinHandle<StateStore<G, C>>,
}

impl<G, C> SessionHandle<G, C> {
    /// Queue a command. Returns false once the session has ended.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> GameState {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.snapshots.clone()
    }

    /// Stop the clock after all queued commands ran, returning the store.
    pub async fn stop(self) -> Result<StateStore<G, C>, JoinError> {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        task.await
    }
}

/// Start the loop on the current tokio runtime. The clock ticks once per
/// [`TICK_INTERVAL`], the first tick one interval after the start.
pub fn spawn_session<G, C>(store: StateStore<G, C>) -> SessionHandle<G, C>
where
    G: PersistenceGateway + 'static,
    C: Clock + 'static,
{
    let (commands, rx) = mpsc::unbounded_channel();
    let (tx, snapshots) = watch::channel(store.snapshot().clone());
    let task = tokio::spawn(run(store, TICK_INTERVAL, rx, tx));
    SessionHandle {
        commands,
        snapshots,
        task,
    }
}

async fn run<G, C>(
    mut store: StateStore<G, C>,
    cadence: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<GameState>,
) -> StateStore<G, C>
where
    G: PersistenceGateway,
    C: Clock,
{
    let mut ticker = time::interval_at(Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(?cadence, "session started");
    loop {
        // Queued commands run before a tick that became due at the same time.
        let changed = tokio::select! {
            biased;
            command = commands.recv() => {
                let Some(command) = command else { break };
                store.apply(command)
            }
            _ = ticker.tick() => store.tick(),
        };
        if changed {
            snapshots.send_replace(store.snapshot().clone());
        }
    }
    info!("session stopped");
    store
}
