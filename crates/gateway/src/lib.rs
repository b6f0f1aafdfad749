//! Gateway: the broker's HTTP/WebSocket surface and the process-wide
//! queue registry behind it.
//!
//! Lifecycle:
//! 1. Build one [`state::Registry`] for the process
//! 2. For each configured endpoint, assemble a router (optionally wrapped
//!    in a Basic-auth gate) sharing that registry
//! 3. Bind plain or TLS listeners and serve until shutdown
//!
//! Queue semantics live in `hopper-queue`; everything here translates
//! requests and frames into registry operations and engine outcomes into
//! `{success, message, payload}` envelopes and status codes.

pub mod auth;
pub mod http;
pub mod server;
pub mod state;
pub mod ws;
