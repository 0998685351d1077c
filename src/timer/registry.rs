//! Timer registry
//!
//! The registry owns every timer, keyed by the caller-supplied id, and is the
//! only place timer state changes. Timers are created on first reference and
//! never removed.
//!
//! Every operation takes the current instant from the caller, so the whole
//! state machine can be driven with synthetic time. The API is synchronous
//! and meant to sit behind one lock (see `TimerHub`); each call is a single
//! read-modify-write followed by a fan-out that never blocks.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::Subscriber;
use crate::timer::state::{Snapshot, Timer};
use crate::utils::TimerError;
use crate::utils::error::require_timer_id;

#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<String, Timer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Timer> {
        self.timers.get(id)
    }

    /// Returns the timer for `id`, creating a stopped one without subscribers
    /// if it does not exist yet.
    pub fn get_or_create(&mut self, id: &str) -> Result<&mut Timer, TimerError> {
        let id = require_timer_id(id)?;
        Ok(self.timers.entry(id.to_string()).or_insert_with(|| {
            debug!(timer = %id, "creating timer");
            Timer::new()
        }))
    }

    pub fn snapshot(&mut self, id: &str, now: Instant) -> Result<Snapshot, TimerError> {
        Ok(self.get_or_create(id)?.snapshot_at(now))
    }

    /// Starts or restarts the countdown of `id` for `duration` seconds and
    /// broadcasts the new state.
    pub fn start(&mut self, id: &str, duration: i64, now: Instant) -> Result<Snapshot, TimerError> {
        let id = require_timer_id(id)?;
        let seconds = u64::try_from(duration)
            .ok()
            .filter(|seconds| *seconds > 0)
            .ok_or_else(|| TimerError::invalid_duration("must be a positive integer"))?;
        let ends_at = now
            .checked_add(Duration::from_secs(seconds))
            .ok_or_else(|| TimerError::invalid_duration("too large"))?;

        let timer = self.get_or_create(id)?;
        timer.start(ends_at, seconds);
        info!(timer = %id, seconds, "timer started");

        Ok(timer.broadcast_at(now))
    }

    /// Stops `id` and clears its configured duration, then broadcasts.
    pub fn reset(&mut self, id: &str, now: Instant) -> Result<Snapshot, TimerError> {
        let timer = self.get_or_create(id)?;
        timer.reset();
        info!(timer = %id, "timer reset");

        Ok(timer.broadcast_at(now))
    }

    pub fn broadcast(&mut self, id: &str, now: Instant) -> Result<Snapshot, TimerError> {
        Ok(self.get_or_create(id)?.broadcast_at(now))
    }

    /// Attaches `subscriber` to `id`.
    ///
    /// The new subscriber first gets the current snapshot on its own, then
    /// everyone (itself included) gets a broadcast carrying the new count.
    pub fn subscribe(
        &mut self,
        id: &str,
        subscriber: Subscriber,
        now: Instant,
    ) -> Result<Snapshot, TimerError> {
        let timer = self.get_or_create(id)?;
        let subscriber_id = subscriber.id.clone();
        timer.add_subscriber(subscriber.clone());
        subscriber.push(timer.snapshot_at(now));
        debug!(timer = %id, subscriber = %subscriber_id, "subscriber attached");

        Ok(timer.broadcast_at(now))
    }

    /// Detaches a subscriber after its connection closed. Broadcasts only if
    /// it was still attached, so a repeated close is a no-op.
    pub fn unsubscribe(&mut self, id: &str, subscriber_id: &str, now: Instant) -> bool {
        let Some(timer) = self.timers.get_mut(id) else {
            return false;
        };
        if !timer.remove_subscriber(subscriber_id) {
            return false;
        }
        debug!(timer = %id, subscriber = %subscriber_id, "subscriber detached");
        timer.broadcast_at(now);
        true
    }

    /// Stops every running timer whose end instant is at or before `now` and
    /// broadcasts each one. Returns the ids that expired.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let mut expired = Vec::new();
        for (id, timer) in self.timers.iter_mut() {
            if timer.expire_at(now) {
                info!(timer = %id, "timer expired");
                timer.broadcast_at(now);
                expired.push(id.clone());
            }
        }
        expired
    }
}
