//! Workspace initialization
//!
//! Writes a default `config/config.toml` and an empty course catalog so a
//! fresh directory can be used as a timetabler workspace.

use crate::catalog::InMemoryCatalog;
use crate::config::TimetablerConfig;
use crate::error::{ApiError, StorageError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written or left alone by [`initialize_workspace`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitSummary {
    pub created: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub fn config_file(workspace_root: &Path) -> PathBuf {
    workspace_root.join("config").join("config.toml")
}

/// Render the default configuration as TOML.
pub fn default_config_toml() -> Result<String, ApiError> {
    toml::to_string_pretty(&TimetablerConfig::default())
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize config: {}", e)))
}

/// Write the default config file and an empty catalog under `workspace_root`.
///
/// Existing files are kept unless `force` is set.
pub fn initialize_workspace(workspace_root: &Path, force: bool) -> Result<InitSummary, ApiError> {
    let mut summary = InitSummary::default();

    let config_path = config_file(workspace_root);
    write_unless_present(&config_path, &default_config_toml()?, force, &mut summary)?;

    let catalog_path = workspace_root.join(TimetablerConfig::default().catalog.path);
    let catalog = serde_json::to_string_pretty(&InMemoryCatalog::new()).map_err(|e| {
        StorageError::Encode {
            what: "catalog",
            message: e.to_string(),
        }
    })?;
    write_unless_present(&catalog_path, &catalog, force, &mut summary)?;

    info!(
        workspace = %workspace_root.display(),
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        "Initialized workspace"
    );
    Ok(summary)
}

fn write_unless_present(
    path: &Path,
    contents: &str,
    force: bool,
    summary: &mut InitSummary,
) -> Result<(), ApiError> {
    if path.exists() && !force {
        summary.skipped.push(path.to_path_buf());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::IoError)?;
    }
    std::fs::write(path, contents).map_err(StorageError::IoError)?;
    summary.created.push(path.to_path_buf());
    Ok(())
}
