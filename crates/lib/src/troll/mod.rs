//! The reaction engine bound to one target contact.
//!
//! `Troll` owns the shared state (resolved target, cached asset) and the messenger
//! handle. Setup populates the state once; the reactor reads it for every inbound
//! update; the orchestrator in `run` supervises the background tasks.

mod policy;
mod presence;
mod reactor;
mod run;
mod setup;
mod state;

pub use policy::{Coin, DispatchPolicy, RateLimit, ThreadCoin};
pub use presence::PRESENCE_INTERVAL;
pub use reactor::Reaction;
pub use run::Phase;
pub use setup::{AssetError, AssetOutcome, SetupError, SetupReport};
pub use state::StateStore;

use crate::channels::{Messenger, TransportError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Anything that ends a run.
#[derive(Debug, thiserror::Error)]
pub enum TrollError {
    #[error("setup: {0}")]
    Setup(#[from] SetupError),
    #[error("answer sticker: {0}")]
    Reply(#[source] TransportError),
    #[error("revoke message: {0}")]
    Revoke(#[source] TransportError),
    #[error("update stream closed")]
    UpdatesClosed,
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    #[error("already started")]
    AlreadyStarted,
    #[error("cancelled")]
    Cancelled,
}

pub struct Troll {
    address: String,
    collection: String,
    messenger: Arc<dyn Messenger>,
    store: StateStore,
    coin: Box<dyn Coin>,
    policy: Option<Box<dyn DispatchPolicy>>,
    presence_interval: Duration,
    started: AtomicBool,
    phase: watch::Sender<Phase>,
}

impl Troll {
    /// `address` is the target to resolve; `collection` names the sticker set whose last sticker is cached.
    pub fn new(
        address: impl Into<String>,
        collection: impl Into<String>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            address: address.into(),
            collection: collection.into(),
            messenger,
            store: StateStore::new(),
            coin: Box::new(ThreadCoin),
            policy: None,
            presence_interval: PRESENCE_INTERVAL,
            started: AtomicBool::new(false),
            phase,
        }
    }

    pub fn with_coin(mut self, coin: impl Coin + 'static) -> Self {
        self.coin = Box::new(coin);
        self
    }

    /// Install a gate the reactor asks before each dispatch. None by default.
    pub fn with_policy(mut self, policy: impl DispatchPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn with_presence_interval(mut self, interval: Duration) -> Self {
        self.presence_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}
