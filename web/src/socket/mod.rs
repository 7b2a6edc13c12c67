//! Websocket HTTP handlers for the web layer.
//!
//! This module only adapts axum sockets to the `ws` crate. Group membership,
//! fan-out and frame rendering live there so the domain event handler can use
//! them without depending on `web`.

pub mod handler;
