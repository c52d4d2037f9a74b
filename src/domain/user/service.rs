use async_trait::async_trait;
use tracing::info;

use crate::{context::CallContext, errors::AppError};

pub const DEFAULT_NAME: &str = "World";

#[async_trait]
pub trait UserService: Send + Sync {
    async fn say_hello(&self, ctx: &CallContext, name: &str) -> Result<String, AppError>;
}

/// Stateless greeter; safe to share across any number of concurrent calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreetingService;

impl GreetingService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserService for GreetingService {
    async fn say_hello(&self, ctx: &CallContext, name: &str) -> Result<String, AppError> {
        if ctx.is_cancelled() {
            return Err(AppError::Canceled);
        }

        let name = if name.is_empty() { DEFAULT_NAME } else { name };
        let message = format!("Hello, {name}!");

        info!(
            procedure = ctx.procedure(),
            name = %name,
            message = %message,
            "say hello called"
        );

        Ok(message)
    }
}
