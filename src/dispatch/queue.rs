//! Regeneration Queue
//!
//! FIFO of regeneration tasks drained by a pool of tokio workers. At most one
//! task per agenda token is pending at a time; later requests for the same
//! token join the pending one. Runs execute on the blocking pool because
//! enumeration is CPU bound.

use crate::agenda::Token;
use crate::dispatch::{DispatchConfig, Dispatcher, RegenerationTask};
use crate::error::ApiError;
use crate::orchestrator::{RegenerationSummary, Regenerator};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

type Waiter = oneshot::Sender<Result<RegenerationSummary, ApiError>>;

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Tasks waiting for a worker
    pub pending: usize,
    /// Tasks currently running
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    /// Requests folded into an already pending task
    pub deduplicated: usize,
    pub retried: usize,
}

#[derive(Default)]
struct PendingTasks {
    order: VecDeque<RegenerationTask>,
    /// Waiters per pending token. A token is pending iff it has an entry.
    waiters: HashMap<Token, Vec<Waiter>>,
}

struct Shared {
    pending: Mutex<PendingTasks>,
    notify: Notify,
    config: DispatchConfig,
    regenerator: Arc<Regenerator>,
    running: RwLock<bool>,
    stats: RwLock<QueueStats>,
}

impl Shared {
    /// Queue `task`, or attach `waiters` to the task already pending for the
    /// same token. Returns whether a new task was queued.
    fn push(&self, task: RegenerationTask, waiters: Vec<Waiter>) -> Result<bool, ApiError> {
        let mut pending = self.pending.lock();

        if let Some(existing) = pending.waiters.get_mut(&task.token) {
            existing.extend(waiters);
            self.stats.write().deduplicated += 1;
            debug!(token = %task.token, "Regeneration already pending, request merged");
            return Ok(false);
        }

        if pending.order.len() >= self.config.max_queue_size {
            warn!(
                queue_size = pending.order.len(),
                max_size = self.config.max_queue_size,
                "Regeneration queue is full, refusing task"
            );
            return Err(ApiError::Dispatch("Regeneration queue is full".to_string()));
        }

        pending.waiters.insert(task.token.clone(), waiters);
        debug!(
            token = %task.token,
            attempt = task.attempt,
            queue_size = pending.order.len() + 1,
            "Enqueued regeneration task"
        );
        pending.order.push_back(task);
        self.stats.write().pending += 1;
        drop(pending);

        self.notify.notify_one();
        Ok(true)
    }

    fn pop(&self) -> Option<(RegenerationTask, Vec<Waiter>)> {
        let mut pending = self.pending.lock();
        let task = pending.order.pop_front()?;
        let waiters = pending.waiters.remove(&task.token).unwrap_or_default();
        let mut stats = self.stats.write();
        stats.pending = stats.pending.saturating_sub(1);
        stats.processing += 1;
        Some((task, waiters))
    }

    fn is_idle(&self) -> bool {
        let pending = self.pending.lock();
        pending.order.is_empty() && self.stats.read().processing == 0
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }
}

/// Worker pool that runs regeneration tasks off the caller's thread.
pub struct RegenerationQueue {
    shared: Arc<Shared>,
    workers: RwLock<Vec<JoinHandle<()>>>,
}

impl RegenerationQueue {
    pub fn new(regenerator: Arc<Regenerator>, config: DispatchConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(PendingTasks::default()),
                notify: Notify::new(),
                config,
                regenerator,
                running: RwLock::new(false),
                stats: RwLock::new(QueueStats::default()),
            }),
            workers: RwLock::new(Vec::new()),
        }
    }

    /// Queue a task. Returns false when it joined a task already pending for
    /// the same agenda.
    pub fn enqueue(&self, task: RegenerationTask) -> Result<bool, ApiError> {
        self.shared.push(task, Vec::new())
    }

    /// Queue a regeneration for `token` and wait for the run that serves it.
    pub async fn enqueue_and_wait(
        &self,
        token: Token,
        timeout: Option<Duration>,
    ) -> Result<RegenerationSummary, ApiError> {
        let (tx, rx) = oneshot::channel();
        self.shared.push(RegenerationTask::new(token), vec![tx])?;
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, rx)
                .await
                .map_err(|_| ApiError::Dispatch("Timeout waiting for regeneration".to_string()))?
                .map_err(|_| ApiError::Dispatch("Completion channel closed".to_string()))?,
            None => rx
                .await
                .map_err(|_| ApiError::Dispatch("Completion channel closed".to_string()))?,
        }
    }

    /// Spawn the workers on the current tokio runtime.
    pub fn start(&self) -> Result<(), ApiError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ApiError::Dispatch(format!("No tokio runtime: {}", e)))?;

        let mut running = self.shared.running.write();
        if *running {
            return Ok(());
        }
        *running = true;
        drop(running);

        let mut workers = self.workers.write();
        for worker_id in 0..self.shared.config.workers {
            let shared = Arc::clone(&self.shared);
            workers.push(runtime.spawn(Self::worker_loop(worker_id, shared)));
        }

        info!(worker_count = workers.len(), "Started regeneration queue workers");
        Ok(())
    }

    /// Stop the workers after their current task. Pending tasks stay queued.
    pub async fn stop(&self) -> Result<(), ApiError> {
        let mut running = self.shared.running.write();
        if !*running {
            return Ok(());
        }
        *running = false;
        drop(running);
        self.shared.notify.notify_waiters();

        let workers = std::mem::take(&mut *self.workers.write());
        for handle in workers {
            let _ = handle.await;
        }

        info!("Stopped regeneration queue workers");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.shared.running.read()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats.read().clone()
    }

    /// Wait until nothing is pending or running.
    pub async fn wait_for_idle(&self, timeout: Option<Duration>) -> Result<(), ApiError> {
        let start = Instant::now();
        loop {
            if self.shared.is_idle() {
                return Ok(());
            }
            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return Err(ApiError::Dispatch(
                        "Timeout waiting for regeneration queue to drain".to_string(),
                    ));
                }
            }
            sleep(self.shared.poll_interval()).await;
        }
    }

    async fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
        debug!(worker_id, "Worker started");

        while *shared.running.read() {
            let Some((task, waiters)) = shared.pop() else {
                tokio::select! {
                    _ = shared.notify.notified() => {}
                    _ = sleep(shared.poll_interval()) => {}
                }
                continue;
            };

            let regenerator = Arc::clone(&shared.regenerator);
            let token = task.token.clone();
            let outcome = tokio::task::spawn_blocking(move || regenerator.regenerate(&token))
                .await
                .unwrap_or_else(|e| {
                    Err(ApiError::Dispatch(format!("Regeneration task panicked: {}", e)))
                });

            let should_retry = match &outcome {
                Ok(_) => false,
                Err(err) => {
                    task.attempt < shared.config.max_retry_attempts && err.is_retryable()
                }
            };

            if should_retry {
                warn!(
                    worker_id,
                    token = %task.token,
                    attempt = task.attempt + 1,
                    "Retrying regeneration"
                );
                sleep(Duration::from_millis(shared.config.retry_delay_ms)).await;
                // Still counted as processing until the retry is queued, so
                // wait_for_idle never sees a gap.
                let retried = shared.push(task.retried(), waiters);
                let mut stats = shared.stats.write();
                stats.processing = stats.processing.saturating_sub(1);
                match retried {
                    Ok(_) => stats.retried += 1,
                    Err(err) => {
                        stats.failed += 1;
                        error!(worker_id, token = %task.token, error = %err, "Retry could not be queued");
                    }
                }
                continue;
            }

            {
                let mut stats = shared.stats.write();
                stats.processing = stats.processing.saturating_sub(1);
                match &outcome {
                    Ok(_) => stats.completed += 1,
                    Err(err) => {
                        stats.failed += 1;
                        error!(
                            worker_id,
                            token = %task.token,
                            attempt = task.attempt,
                            error = %err,
                            "Regeneration failed permanently"
                        );
                    }
                }
            }
            for tx in waiters {
                let _ = tx.send(outcome.clone());
            }
        }

        debug!(worker_id, "Worker stopped");
    }
}

impl Dispatcher for RegenerationQueue {
    fn dispatch(&self, task: RegenerationTask) -> Result<(), ApiError> {
        self.enqueue(task).map(|_| ())
    }
}
