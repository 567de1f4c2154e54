//! Layered configuration loading against real files and environment.

use crate::integration::test_utils::with_isolated_env;
use std::path::PathBuf;
use tempfile::TempDir;
use timetabler::config::{ConfigLoader, StorageBackend};
use timetabler::dispatch::DispatchMode;

fn write(path: PathBuf, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_environment_file_overlays_workspace_file() {
    let dir = TempDir::new().unwrap();
    let ws = dir.path().join("ws");
    write(
        ws.join("config").join("config.toml"),
        "[storage]\nbackend = \"memory\"\n\n[dispatch]\nworkers = 3\n",
    );
    write(
        ws.join("config").join("staging.toml"),
        "[dispatch]\nmode = \"queue\"\n",
    );

    let config = with_isolated_env(&dir, &[("TIMETABLER_ENV", "staging")], || {
        ConfigLoader::load(&ws).unwrap()
    });
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.dispatch.mode, DispatchMode::Queue);
    assert_eq!(config.dispatch.workers, 3);
}

#[test]
fn test_admin_sessions_from_environment_list() {
    let dir = TempDir::new().unwrap();
    let config = with_isolated_env(
        &dir,
        &[
            ("TIMETABLER__ACCESS__REQUIRE_ADMIN", "true"),
            ("TIMETABLER__ACCESS__ADMIN_SESSIONS", "alpha,beta"),
        ],
        || ConfigLoader::load(dir.path()).unwrap(),
    );
    assert!(config.access.require_admin);
    assert_eq!(config.access.admin_sessions, vec!["alpha", "beta"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_logging_section_is_loaded_and_resolved() {
    let dir = TempDir::new().unwrap();
    let ws = dir.path().join("ws");
    write(
        ws.join("config").join("config.toml"),
        "[logging]\nlevel = \"debug\"\nformat = \"json\"\noutput = \"file\"\n\n[logging.modules]\nsled = \"warn\"\n",
    );

    let mut config = with_isolated_env(&dir, &[], || ConfigLoader::load(&ws).unwrap());
    config.resolve_paths(&ws);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(
        config.logging.modules.get("sled").map(String::as_str),
        Some("warn")
    );
    assert_eq!(config.logging.file, ws.join(".timetabler").join("timetabler.log"));
    assert!(config.storage.path.starts_with(&ws));
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.toml");
    write(file.clone(), "[dispatch]\nworkers = 0\n\n[logging]\noutput = \"syslog\"\n");

    let config = with_isolated_env(&dir, &[], || ConfigLoader::load_from_file(&file).unwrap());
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
}
