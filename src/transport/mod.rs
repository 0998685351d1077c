//! The `transport` module connects clients to the timer hub.
//!
//! - `http`: axum routes for start/reset commands and Server-Sent Events
//! - `websocket`: a WebSocket listener speaking the JSON protocol in `message`
//! - `message`: request bodies and WebSocket frames

pub mod http;
pub mod message;
pub mod websocket;
