//! Configuration System
//!
//! Layered configuration: built-in defaults, the global file
//! `~/.config/timetabler/config.toml`, the workspace files
//! `config/config.toml` and `config/{TIMETABLER_ENV}.toml`, then
//! `TIMETABLER__SECTION__KEY` environment variables.

use crate::access::{AccessGateway, AdminSessions, AllowAll};
use crate::dispatch::DispatchConfig;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::orchestrator::{DEFAULT_MAX_CANDIDATE_COURSES, DEFAULT_PARALLEL_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetablerConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

/// Where agendas and schedules are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Sled database directory, relative to the workspace unless absolute
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sled,
            path: PathBuf::from(".timetabler/store"),
        }
    }
}

/// Course catalog document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("catalog.json"),
        }
    }
}

/// Enumeration limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Combine requests with more candidate courses are rejected
    pub max_candidate_courses: usize,
    /// Remainder pool size from which the search is sharded across threads
    pub parallel_threshold: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_candidate_courses: DEFAULT_MAX_CANDIDATE_COURSES,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Who may request generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// When set, only callers holding one of `admin_sessions` may combine
    pub require_admin: bool,
    pub admin_sessions: Vec<String>,
}

impl AccessConfig {
    pub fn gateway(&self) -> Arc<dyn AccessGateway> {
        if self.require_admin {
            Arc::new(AdminSessions::new(self.admin_sessions.iter().cloned()))
        } else {
            Arc::new(AllowAll)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Storage(String),
    Catalog(String),
    Generation(String),
    Dispatch(String),
    Access(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Catalog(msg) => write!(f, "Catalog: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Dispatch(msg) => write!(f, "Dispatch: {}", msg),
            ValidationError::Access(msg) => write!(f, "Access: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl TimetablerConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.backend == StorageBackend::Sled && self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("Store path cannot be empty".to_string()));
        }
        if self.catalog.path.as_os_str().is_empty() {
            errors.push(ValidationError::Catalog("Catalog path cannot be empty".to_string()));
        }
        if self.generation.max_candidate_courses == 0 {
            errors.push(ValidationError::Generation(
                "max_candidate_courses must be at least 1".to_string(),
            ));
        }
        if let Err(e) = self.dispatch.validate() {
            errors.push(ValidationError::Dispatch(e));
        }
        if self.access.require_admin && self.access.admin_sessions.is_empty() {
            errors.push(ValidationError::Access(
                "require_admin is set but no admin_sessions are configured".to_string(),
            ));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Like [`validate`](Self::validate), folded into one [`ApiError`].
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Make relative storage, catalog and log paths absolute under `workspace`.
    pub fn resolve_paths(&mut self, workspace: &Path) {
        if self.storage.path.is_relative() {
            self.storage.path = workspace.join(&self.storage.path);
        }
        if self.catalog.path.is_relative() {
            self.catalog.path = workspace.join(&self.catalog.path);
        }
        self.logging.resolve_file(workspace);
    }
}
