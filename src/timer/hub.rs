use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::client::{Subscriber, Subscription};
use crate::timer::registry::TimerRegistry;
use crate::timer::state::Snapshot;
use crate::utils::TimerError;
use crate::utils::error::require_timer_id;

/// The registry shared by every connection and the sweeper.
///
/// Cloning is cheap and every clone sees the same timers. Each method holds
/// the lock for one registry operation only and never across an await.
#[derive(Debug, Clone, Default)]
pub struct TimerHub {
    registry: Arc<Mutex<TimerRegistry>>,
}

impl TimerHub {
    /// Period of the expiry sweep.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores poisoning. Each operation touches a single timer.
    fn registry(&self) -> MutexGuard<'_, TimerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn timer_count(&self) -> usize {
        self.registry().len()
    }

    pub fn snapshot(&self, id: &str) -> Result<Snapshot, TimerError> {
        self.registry().snapshot(id, Instant::now())
    }

    pub fn start(&self, id: &str, duration: i64) -> Result<Snapshot, TimerError> {
        self.registry().start(id, duration, Instant::now())
    }

    pub fn reset(&self, id: &str) -> Result<Snapshot, TimerError> {
        self.registry().reset(id, Instant::now())
    }

    /// Subscribes a new connection to `id`.
    ///
    /// The subscriber stays attached until the returned `Subscription` is
    /// dropped; a background task then detaches it and broadcasts the new
    /// count. Must be called from within a Tokio runtime.
    pub fn subscribe(&self, id: &str) -> Result<Subscription, TimerError> {
        let id = require_timer_id(id)?;
        let (subscriber, receiver) = Subscriber::channel();
        let subscription = Subscription::new(subscriber.id.clone(), id, receiver);

        self.registry()
            .subscribe(id, subscriber.clone(), Instant::now())?;
        info!(timer = %id, subscriber = %subscriber.id, "subscribed");

        let hub = self.clone();
        let timer_id = id.to_string();
        tokio::spawn(async move {
            subscriber.closed().await;
            if hub.unsubscribe(&timer_id, &subscriber.id) {
                info!(timer = %timer_id, subscriber = %subscriber.id, "unsubscribed");
            }
        });

        Ok(subscription)
    }

    pub(crate) fn unsubscribe(&self, id: &str, subscriber_id: &str) -> bool {
        self.registry().unsubscribe(id, subscriber_id, Instant::now())
    }

    /// Runs one expiry pass. Returns how many timers stopped.
    pub fn sweep(&self) -> usize {
        self.registry().sweep(Instant::now()).len()
    }

    /// Sweeps every `SWEEP_INTERVAL` for as long as the task is alive.
    pub async fn run_sweeper(self) {
        let mut ticker = tokio::time::interval(Self::SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let expired = self.sweep();
            if expired > 0 {
                debug!(expired, "sweep stopped expired timers");
            }
        }
    }
}
