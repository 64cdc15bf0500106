//! The remote code-execution collaborator.

use crate::error::InteractionError;
use async_trait::async_trait;
use proctor_core::execution::ExecutionResult;

/// State of a submitted run.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Queued or still running.
    Pending,
    Finished(ExecutionResult),
}

/// A sandbox that runs a complete program (solution plus test harness)
/// asynchronously: `submit` returns a token, `poll` reports progress.
///
/// Waiting, backoff and the overall deadline are the caller's concern.
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    async fn submit(&self, source_code: &str) -> Result<String, InteractionError>;

    async fn poll(&self, token: &str) -> Result<PollStatus, InteractionError>;

    /// Checks that the sandbox answers at all.
    async fn health(&self) -> Result<(), InteractionError> {
        Ok(())
    }
}
