//! Per-call context carrying cancellation and an optional deadline

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context handed to business services for a single call.
///
/// Cancellation is cooperative: services may poll [`CallContext::is_cancelled`]
/// or await [`CallContext::cancelled`] to stop early.
#[derive(Debug, Clone)]
pub struct CallContext {
    procedure: &'static str,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(procedure: &'static str) -> Self {
        Self {
            procedure,
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn procedure(&self) -> &'static str {
        self.procedure
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    pub(crate) fn cancel(&self) {
        self.cancellation.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn parent_cancellation_reaches_call() {
        let parent = CancellationToken::new();
        let context = CallContext::new("/test.v1.Test/Call").with_cancellation(parent.child_token());
        assert!(!context.is_cancelled());

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), context.cancelled())
            .await
            .expect("cancellation observed");
        assert!(context.is_cancelled());
    }

    #[test]
    fn cancelling_one_call_leaves_parent_running() {
        let parent = CancellationToken::new();
        let context = CallContext::new("/test.v1.Test/Call").with_cancellation(parent.child_token());

        context.cancel();
        assert!(context.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
