//! Timer state and fan-out.
//!
//! - `state`: one timer's countdown, its subscribers and the snapshot it reports
//! - `registry`: the id → timer map and the start/reset/subscribe/sweep operations
//! - `hub`: the shared, lock-guarded registry handed to transports and the sweeper
//! - `duration`: conversion of loosely typed duration input into seconds

pub mod duration;
pub mod hub;
pub mod registry;
pub mod state;

pub use hub::TimerHub;
pub use registry::TimerRegistry;
pub use state::{Countdown, Snapshot, Timer};

#[cfg(test)]
mod tests;
