//! HTTP endpoints outside the RPC protocol
//!
//! Currently only the `/health` liveness probe.

pub mod handlers;
