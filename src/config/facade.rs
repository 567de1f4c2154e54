//! Loader facade over the layered sources.

use super::merge::builder_with_defaults;
use super::sources::{env, global_file, workspace_file};
use super::TimetablerConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds a [`TimetablerConfig`] from defaults, files and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the full layered configuration for `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<TimetablerConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);

        let config: TimetablerConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load one explicit file over the defaults. Environment still applies.
    pub fn load_from_file(path: &Path) -> Result<TimetablerConfig, ConfigError> {
        let builder = builder_with_defaults()?.add_source(File::from(path.to_path_buf()));
        let builder = env::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
