#![deny(warnings)]

//! Runtime for the pet simulation: the state store, the live degradation
//! clock, offline catch-up and the session event loop.
//!
//! Start-up order is load, catch up, persist, then tick:
//!
//! ```no_run
//! use pet_runtime::{spawn_session, StateStore, SystemClock};
//! use persistence::JsonFileStore;
//!
//! # async fn demo() {
//! let store = StateStore::open(JsonFileStore::in_dir("saves"), SystemClock);
//! let session = spawn_session(store);
//! // ... send commands ...
//! let _store = session.stop().await;
//! # }
//! ```

pub mod actions;
pub mod clock;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tick;

pub use actions::CareAction;
pub use clock::{Clock, ManualClock, SystemClock};
pub use reconcile::reconcile;
pub use session::{spawn_session, Command, SessionHandle};
pub use store::{LevelUp, PurchaseOutcome, StateStore, StoreEvent, SubscriptionId, Transition};
pub use tick::{tick, TICK_INTERVAL};
