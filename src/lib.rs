use std::sync::Arc;

use axum::{middleware, routing::get, Router};

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;
pub mod server;

use rpc::user_v1::{user_service_router, UserServiceHandler};

#[derive(Clone)]
pub struct AppState {
    pub user_handler: Arc<dyn UserServiceHandler>,
}

impl AppState {
    pub fn new(user_handler: Arc<dyn UserServiceHandler>) -> Self {
        Self { user_handler }
    }
}

/// Builds the request router: RPC procedures plus the liveness probe.
///
/// The route table is fixed once built; unmatched paths get the default 404.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(http::handlers::HEALTH_PATH, get(http::handlers::health))
        .merge(user_service_router(state.user_handler))
        .layer(middleware::from_fn(logging::request_logging_middleware))
}
