//! Per-agenda single flight for regeneration runs.

use crate::agenda::Token;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out one lock per agenda token so two regeneration runs for the same
/// agenda never overlap. Runs for different agendas proceed in parallel.
#[derive(Debug, Default)]
pub struct AgendaLockManager {
    locks: Mutex<HashMap<Token, Arc<Mutex<()>>>>,
}

impl AgendaLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `token`; call `lock()` on it to enter the critical section.
    pub fn lock_for(&self, token: &Token) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(token.clone()).or_default())
    }

    /// Drop handles nobody else holds.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
