//! Protocol binding for `user.v1.UserService`

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    response::Response,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use super::{serve_unary, RpcError, RpcRequest, RpcResponse};

pub const SAY_HELLO_PROCEDURE: &str = "/user.v1.UserService/SayHello";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SayHelloRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SayHelloResponse {
    pub message: String,
}

/// Server-side contract for `user.v1.UserService`.
#[async_trait]
pub trait UserServiceHandler: Send + Sync {
    async fn say_hello(
        &self,
        request: RpcRequest<SayHelloRequest>,
    ) -> Result<RpcResponse<SayHelloResponse>, RpcError>;
}

/// Routes every `user.v1.UserService` procedure to `handler`.
pub fn user_service_router(handler: Arc<dyn UserServiceHandler>) -> Router {
    Router::new()
        .route(SAY_HELLO_PROCEDURE, post(say_hello))
        .with_state(handler)
}

async fn say_hello(
    State(handler): State<Arc<dyn UserServiceHandler>>,
    request: Request,
) -> Response {
    serve_unary(
        SAY_HELLO_PROCEDURE,
        request,
        |call: RpcRequest<SayHelloRequest>| async move { handler.say_hello(call).await },
    )
    .await
}
