//! Hand-off of regeneration work.
//!
//! A [`Dispatcher`] accepts a [`RegenerationTask`] keyed by agenda token and
//! promises to run [`Regenerator::regenerate`] for it at least once. Running a
//! task twice is harmless because regeneration replaces the whole schedule set.

pub mod queue;

pub use queue::{QueueStats, RegenerationQueue};

use crate::agenda::Token;
use crate::error::ApiError;
use crate::orchestrator::{RegenerationSummary, Regenerator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Regeneration request for one agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationTask {
    pub token: Token,
    /// Delivery attempt, starting at 0.
    pub attempt: usize,
}

impl RegenerationTask {
    pub fn new(token: Token) -> Self {
        Self { token, attempt: 0 }
    }

    pub fn retried(&self) -> Self {
        Self {
            token: self.token.clone(),
            attempt: self.attempt + 1,
        }
    }
}

pub trait Dispatcher: Send + Sync {
    /// Accept `task` for eventual execution. An error means the task was not
    /// accepted and will never run.
    fn dispatch(&self, task: RegenerationTask) -> Result<(), ApiError>;
}

/// How regeneration tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the caller's thread, before `dispatch` returns.
    #[default]
    Inline,
    /// On the tokio worker pool of a [`RegenerationQueue`].
    Queue,
}

/// Settings of the dispatch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    /// Worker tasks pulling from the queue.
    pub workers: usize,
    /// Pending tasks allowed before `dispatch` is refused.
    pub max_queue_size: usize,
    /// Extra attempts for runs that failed with a retryable error.
    pub max_retry_attempts: usize,
    pub retry_delay_ms: u64,
    /// How often idle workers and waiters re-check the queue.
    pub poll_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Inline,
            workers: 2,
            max_queue_size: 1024,
            max_retry_attempts: 3,
            retry_delay_ms: 500,
            poll_interval_ms: 100,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("dispatch.workers must be at least 1".to_string());
        }
        if self.max_queue_size == 0 {
            return Err("dispatch.max_queue_size must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("dispatch.poll_interval_ms must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Runs each task synchronously inside `dispatch`.
///
/// A failed run is not a dispatch failure: the agenda stays processing and
/// the outcome is kept for [`take_outcome`](Self::take_outcome).
pub struct InlineDispatcher {
    regenerator: Arc<Regenerator>,
    last_outcome: Mutex<Option<Result<RegenerationSummary, ApiError>>>,
}

impl InlineDispatcher {
    pub fn new(regenerator: Arc<Regenerator>) -> Self {
        Self {
            regenerator,
            last_outcome: Mutex::new(None),
        }
    }

    /// Outcome of the most recent run, if not taken yet.
    pub fn take_outcome(&self) -> Option<Result<RegenerationSummary, ApiError>> {
        self.last_outcome.lock().take()
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: RegenerationTask) -> Result<(), ApiError> {
        let outcome = self.regenerator.regenerate(&task.token);
        if let Err(err) = &outcome {
            error!(token = %task.token, error = %err, "Inline regeneration failed");
        }
        *self.last_outcome.lock() = Some(outcome);
        Ok(())
    }
}
