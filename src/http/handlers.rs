//! Plain HTTP handlers served next to the RPC procedures

pub const HEALTH_PATH: &str = "/health";

/// Liveness probe; answers while the process is serving, whatever the state
/// of the business services.
pub async fn health() -> &'static str {
    "OK"
}
