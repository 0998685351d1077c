//! # countcast
//!
//! `countcast` is a minimalist, in-memory countdown broadcaster built with Rust.
//! Clients follow a named timer over Server-Sent Events or WebSockets, and any
//! client can start or reset that timer for everyone following it.
//!
//! ## Core Modules
//!
//! - `timer`: timer state, the registry, the shared hub and the expiry sweep.
//! - `client`: the subscriber handle kept per open connection.
//! - `config`: loading and merging server configuration.
//! - `transport`: the HTTP/SSE routes and the WebSocket server.
//! - `utils`: the error type and logging setup.

pub mod client;
pub mod config;
pub mod timer;
pub mod transport;
pub mod utils;
