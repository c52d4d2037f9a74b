//! Business domains exposed over RPC
//!
//! Each domain pairs a service trait holding the business logic with a
//! handler that adapts it to its protocol binding.

pub mod user;
