//! Merge rules: built-in defaults applied beneath every other source.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// A builder seeded with the defaults every key falls back to.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("storage.backend", "sled")?
        .set_default("storage.path", ".timetabler/store")?
        .set_default("catalog.path", "catalog.json")?
        .set_default("dispatch.mode", "inline")
}
