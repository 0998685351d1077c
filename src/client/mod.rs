//! The `client` module defines the subscriber side of a timer.
//!
//! A [`Subscriber`] is the handle the registry keeps for one open push
//! connection. The transport holds the matching [`Subscription`] and reads
//! snapshots from it; dropping the subscription is the close signal.

pub mod subscriber;
pub use subscriber::{Subscriber, SubscriberId, Subscription};
