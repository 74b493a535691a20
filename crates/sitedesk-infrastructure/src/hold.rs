//! A two-sided gate for pausing a store operation mid-flight.
//!
//! Lets a test drive the supersession races deterministically: park a
//! fetch inside the store, perform competing operations, then release
//! the parked fetch and assert its result was discarded.

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Gate held by a test; the paired [`HoldGate`] lives inside the store.
///
/// Semaphores are used on both sides so neither signal is lost when it
/// fires before the other side starts waiting.
#[derive(Clone)]
pub struct Hold {
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

/// The store-side half of a [`Hold`].
#[derive(Clone)]
pub struct HoldGate {
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

impl Hold {
    pub fn new() -> (Hold, HoldGate) {
        let entered = Arc::new(Semaphore::new(0));
        let release = Arc::new(Semaphore::new(0));
        (
            Hold {
                entered: entered.clone(),
                release: release.clone(),
            },
            HoldGate { entered, release },
        )
    }

    /// Waits until the gated operation has been entered.
    pub async fn entered(&self) {
        self.entered
            .acquire()
            .await
            .expect("hold semaphore closed")
            .forget();
    }

    /// Lets the gated operation proceed.
    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

impl HoldGate {
    /// Signals entry and parks until released.
    pub async fn pass(&self) {
        self.entered.add_permits(1);
        self.release
            .acquire()
            .await
            .expect("hold semaphore closed")
            .forget();
    }
}
