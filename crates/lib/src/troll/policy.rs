//! Randomness and the optional dispatch gate consulted by the reactor.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Source of the uniform random bit that picks a reaction.
pub trait Coin: Send + Sync {
    fn flip(&self) -> bool;
}

/// Thread-local PRNG from `rand`. Not cryptographically secure and does not need to be:
/// the bit only varies which reaction the contact sees.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadCoin;

impl Coin for ThreadCoin {
    fn flip(&self) -> bool {
        rand::random()
    }
}

/// Gate asked before every dispatch when installed. `false` skips the reaction.
pub trait DispatchPolicy: Send + Sync {
    fn permit(&self) -> bool;
}

/// One action per `every`, burst of one.
#[derive(Debug)]
pub struct RateLimit {
    every: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimit {
    pub fn every(every: Duration) -> Self {
        Self {
            every,
            last: Mutex::new(None),
        }
    }
}

impl DispatchPolicy for RateLimit {
    fn permit(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(prev) if now.duration_since(prev) < self.every => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
