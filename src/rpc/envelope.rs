use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::context::CallContext;

/// A decoded unary call: the request message plus its call context.
#[derive(Debug)]
pub struct RpcRequest<T> {
    context: CallContext,
    message: T,
}

impl<T> RpcRequest<T> {
    pub fn new(context: CallContext, message: T) -> Self {
        Self { context, message }
    }

    pub fn into_parts(self) -> (CallContext, T) {
        (self.context, self.message)
    }
}

/// A successful unary response message.
#[derive(Debug)]
pub struct RpcResponse<T> {
    message: T,
}

impl<T> RpcResponse<T> {
    pub fn new(message: T) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &T {
        &self.message
    }
}

impl<T: Serialize> IntoResponse for RpcResponse<T> {
    fn into_response(self) -> Response {
        Json(self.message).into_response()
    }
}
