//! Adapter between `user.v1.UserService` calls and [`UserService`]

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use super::service::UserService;
use crate::{
    errors::AppError,
    rpc::{
        user_v1::{SayHelloRequest, SayHelloResponse, UserServiceHandler},
        Code, RpcError, RpcRequest, RpcResponse,
    },
};

pub struct UserHandler {
    service: Arc<dyn UserService>,
}

impl UserHandler {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl UserServiceHandler for UserHandler {
    async fn say_hello(
        &self,
        request: RpcRequest<SayHelloRequest>,
    ) -> Result<RpcResponse<SayHelloResponse>, RpcError> {
        let (context, message) = request.into_parts();

        let message = self
            .service
            .say_hello(&context, &message.name)
            .await
            .map_err(|err| to_rpc_error(context.procedure(), err))?;

        Ok(RpcResponse::new(SayHelloResponse { message }))
    }
}

/// Protocol code for each domain failure.
pub fn error_code(err: &AppError) -> Code {
    match err {
        AppError::InvalidArgument { .. } => Code::InvalidArgument,
        AppError::NotFound { .. } => Code::NotFound,
        AppError::Canceled => Code::Canceled,
        AppError::Internal { .. } => Code::Internal,
    }
}

fn to_rpc_error(procedure: &str, err: AppError) -> RpcError {
    let code = error_code(&err);
    match code {
        Code::Internal => error!(procedure, error = %err, "call failed with internal error"),
        _ => warn!(procedure, code = %code, error = %err, "call failed"),
    }
    RpcError::new(code, err.to_string())
}
