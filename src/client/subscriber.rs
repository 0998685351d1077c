use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::timer::Snapshot;

pub type SubscriberId = String;

/// Registry-side handle of one push connection.
///
/// Writes never block: the channel is unbounded, so a slow reader only grows
/// its own queue. A failed write means the reading side is gone.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Unique identifier for the subscriber (a UUID).
    pub id: SubscriberId,
    sender: UnboundedSender<Snapshot>,
}

impl Subscriber {
    pub fn new(sender: UnboundedSender<Snapshot>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
        }
    }

    /// Creates a subscriber together with the receiving end its transport reads from.
    pub fn channel() -> (Self, UnboundedReceiver<Snapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Queues `snapshot` for delivery. Returns `false` once the connection is gone.
    pub fn push(&self, snapshot: Snapshot) -> bool {
        self.sender.send(snapshot).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves when the transport drops the receiving end.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

/// Transport-side end of a subscription to one timer.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub timer_id: String,
    receiver: UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub fn new(
        id: SubscriberId,
        timer_id: impl Into<String>,
        receiver: UnboundedReceiver<Snapshot>,
    ) -> Self {
        Self {
            id,
            timer_id: timer_id.into(),
            receiver,
        }
    }

    /// Waits for the next snapshot pushed to this subscriber.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }
}
