//! Access gateway: who may request schedule generation.

use crate::error::ApiError;
use std::collections::HashSet;

/// The party asking for a combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Session(String),
}

impl Caller {
    pub fn from_session(session: Option<String>) -> Self {
        match session {
            Some(id) if !id.trim().is_empty() => Caller::Session(id),
            _ => Caller::Anonymous,
        }
    }
}

/// Opaque allow/deny boundary checked before a combine is accepted.
pub trait AccessGateway: Send + Sync {
    fn authorize(&self, caller: &Caller) -> Result<(), ApiError>;
}

/// Lets every caller through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessGateway for AllowAll {
    fn authorize(&self, _caller: &Caller) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Only callers holding an active admin session.
#[derive(Debug, Clone, Default)]
pub struct AdminSessions {
    sessions: HashSet<String>,
}

impl AdminSessions {
    pub fn new(sessions: impl IntoIterator<Item = String>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
        }
    }
}

impl AccessGateway for AdminSessions {
    fn authorize(&self, caller: &Caller) -> Result<(), ApiError> {
        match caller {
            Caller::Session(id) if self.sessions.contains(id) => Ok(()),
            Caller::Session(_) => Err(ApiError::Unauthorized(
                "session is not an active admin session".to_string(),
            )),
            Caller::Anonymous => Err(ApiError::Unauthorized(
                "an admin session is required".to_string(),
            )),
        }
    }
}
