use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::client::{Subscriber, SubscriberId};

/// Point-in-time display state of a timer, as sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub time_left: u64,
    pub is_running: bool,
    pub max_duration: u64,
    #[serde(rename = "usersCount")]
    pub subscriber_count: usize,
}

/// Where a timer is in its countdown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Countdown {
    /// Never started, or reset.
    #[default]
    Idle,
    Running { ends_at: Instant },
    /// Stopped by the sweep. The end instant is kept.
    Expired { ended_at: Instant },
}

#[derive(Debug, Default)]
pub struct Timer {
    countdown: Countdown,
    max_duration: u64,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn end_time(&self) -> Option<Instant> {
        match self.countdown {
            Countdown::Idle => None,
            Countdown::Running { ends_at } => Some(ends_at),
            Countdown::Expired { ended_at } => Some(ended_at),
        }
    }

    /// The stored running flag. It stays set past the end instant until a sweep runs.
    pub fn is_marked_running(&self) -> bool {
        matches!(self.countdown, Countdown::Running { .. })
    }

    /// Time remaining while effectively running: marked running and ending
    /// strictly after `now`. Every reported running state derives from this.
    fn remaining_at(&self, now: Instant) -> Option<Duration> {
        match self.countdown {
            Countdown::Running { ends_at } if ends_at > now => Some(ends_at - now),
            _ => None,
        }
    }

    pub fn is_running_at(&self, now: Instant) -> bool {
        self.remaining_at(now).is_some()
    }

    pub fn max_duration(&self) -> u64 {
        self.max_duration
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscriber(&self, id: &str) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn snapshot_at(&self, now: Instant) -> Snapshot {
        let remaining = self.remaining_at(now);
        Snapshot {
            time_left: remaining.map_or(0, |left| left.as_secs()),
            is_running: remaining.is_some(),
            max_duration: self.max_duration,
            subscriber_count: self.subscribers.len(),
        }
    }

    /// Starts, or restarts, the countdown.
    pub(crate) fn start(&mut self, ends_at: Instant, seconds: u64) {
        self.countdown = Countdown::Running { ends_at };
        self.max_duration = seconds;
    }

    pub(crate) fn reset(&mut self) {
        self.countdown = Countdown::Idle;
        self.max_duration = 0;
    }

    /// Flips a running timer whose end instant has passed to expired.
    /// Returns whether anything changed.
    pub(crate) fn expire_at(&mut self, now: Instant) -> bool {
        match self.countdown {
            Countdown::Running { ends_at } if ends_at <= now => {
                self.countdown = Countdown::Expired { ended_at: ends_at };
                true
            }
            _ => false,
        }
    }

    pub(crate) fn add_subscriber(&mut self, subscriber: Subscriber) {
        self.subscribers.insert(subscriber.id.clone(), subscriber);
    }

    pub(crate) fn remove_subscriber(&mut self, id: &str) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Pushes the current snapshot to every subscriber.
    ///
    /// Subscribers whose connection is gone are dropped and the rest receive
    /// a corrected snapshot, until one pass delivers to everyone left.
    /// Returns the snapshot of that last pass.
    pub(crate) fn broadcast_at(&mut self, now: Instant) -> Snapshot {
        loop {
            let snapshot = self.snapshot_at(now);
            let dropped: Vec<SubscriberId> = self
                .subscribers
                .values()
                .filter(|subscriber| !subscriber.push(snapshot))
                .map(|subscriber| subscriber.id.clone())
                .collect();

            if dropped.is_empty() {
                return snapshot;
            }

            for id in dropped {
                warn!(subscriber = %id, "delivery failed, dropping subscriber");
                self.subscribers.remove(&id);
            }
        }
    }
}
