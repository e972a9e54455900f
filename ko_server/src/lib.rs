//! HTTP/WebSocket server for the knockout bracket engine.
//!
//! Exposes bracket seeding, match resolution, and standings over a REST API,
//! with live notification delivery over WebSocket connections.

pub mod api;
pub mod config;
pub mod hub;
pub mod logging;
pub mod metrics;
