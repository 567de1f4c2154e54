//! CLI route tests: parse real argument lists and run them against a workspace.

use crate::integration::test_utils::*;
use clap::Parser;
use std::path::Path;
use tempfile::TempDir;
use timetabler::cli::{Cli, RunContext};
use timetabler::ApiError;

const CATALOG: &str = r#"{
  "terms": {
    "2016-1": [
      { "id": 1, "slots": [ { "start": 10, "end": 12 } ] },
      { "id": 2, "slots": [ { "start": 13, "end": 15 } ] },
      { "id": 3, "slots": [ { "start": 10, "end": 12 } ] }
    ]
  }
}"#;

fn workspace(config_toml: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("catalog.json"), CATALOG).unwrap();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config").join("config.toml"), config_toml).unwrap();
    dir
}

fn run(ctx: &RunContext, args: &[&str]) -> Result<String, ApiError> {
    let mut argv = vec!["timetabler"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    ctx.execute(&cli.command)
}

fn context(root: &Path, session: Option<&str>) -> RunContext {
    RunContext::new(root.to_path_buf(), None, session.map(str::to_string)).unwrap()
}

fn create_worked_agenda(ctx: &RunContext) -> String {
    run(
        ctx,
        &[
            "agenda", "create", "--term", "2016-1", "--courses", "1,2,3", "--mandatory", "1",
            "--per-schedule", "2",
        ],
    )
    .unwrap()
}

#[test]
fn test_create_combine_and_list_schedules() {
    let dir = workspace("");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let token = create_worked_agenda(&ctx);

        let out = run(&ctx, &["combine", &token, "--show"]).unwrap();
        assert!(out.contains("Schedules: 1"));
        assert!(out.contains("1 schedule(s)"));

        let json = run(&ctx, &["schedules", &token, "--format", "json"]).unwrap();
        let schedules: serde_json::Value = serde_json::from_str(&json).unwrap();
        let schedules = schedules.as_array().unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0]["course_ids"], serde_json::json!([1, 2]));

        let shown = run(&ctx, &["agenda", "show", &token, "--format", "json"]).unwrap();
        let agenda: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(agenda["state"], "idle");
        assert!(agenda["combined_at"].is_string());
    });
}

#[test]
fn test_blocked_mandatory_surfaces_and_keeps_schedules() {
    let dir = workspace("");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let token = create_worked_agenda(&ctx);
        run(&ctx, &["combine", &token]).unwrap();

        run(&ctx, &["agenda", "set", &token, "--leave", "9-11"]).unwrap();
        let err = run(&ctx, &["combine", &token]).unwrap_err();
        assert!(matches!(err, ApiError::MandatoryBlocked(_)));

        let shown = run(&ctx, &["agenda", "show", &token, "--format", "json"]).unwrap();
        let agenda: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(agenda["state"], "processing");

        let listed = run(&ctx, &["schedules", &token]).unwrap();
        assert!(listed.contains("1 schedule(s)"));
    });
}

#[test]
fn test_invalid_agenda_is_reported() {
    let dir = workspace("");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let token = run(&ctx, &["agenda", "create", "--term", "2016-1", "--courses", "1,9"]).unwrap();

        let err = run(&ctx, &["combine", &token]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(run(&ctx, &["schedules", &token]).unwrap().contains("No schedules."));
    });
}

#[test]
fn test_queue_mode_runs_to_completion() {
    let dir = workspace(
        "[dispatch]\nmode = \"queue\"\nworkers = 1\nretry_delay_ms = 5\npoll_interval_ms = 5\n",
    );
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let token = create_worked_agenda(&ctx);

        let out = run(&ctx, &["combine", &token]).unwrap();
        assert!(out.contains("1 schedule(s)"));
    });
}

#[test]
fn test_admin_session_required_when_configured() {
    let dir = workspace("[access]\nrequire_admin = true\nadmin_sessions = [\"s3cret\"]\n");
    with_isolated_env(&dir, &[], || {
        let anonymous = context(dir.path(), None);
        let token = create_worked_agenda(&anonymous);
        let err = run(&anonymous, &["combine", &token]).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        drop(anonymous);

        let admin = context(dir.path(), Some("s3cret"));
        assert!(run(&admin, &["combine", &token]).is_ok());
    });
}

#[test]
fn test_generate_does_not_touch_the_store() {
    let dir = workspace("[storage]\nbackend = \"memory\"\n");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let out = run(
            &ctx,
            &[
                "generate", "--term", "2016-1", "--mandatory", "1", "--per-schedule", "2",
                "--format", "json",
            ],
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["combinations"], serde_json::json!([[1, 2]]));

        let agendas = run(&ctx, &["agenda", "list", "--format", "json"]).unwrap();
        let agendas: serde_json::Value = serde_json::from_str(&agendas).unwrap();
        assert_eq!(agendas.as_array().map(|a| a.len()), Some(0));
    });
}

#[test]
fn test_generate_applies_candidate_limit() {
    let dir = workspace("[storage]\nbackend = \"memory\"\n\n[generation]\nmax_candidate_courses = 2\n");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let err = run(&ctx, &["generate", "--term", "2016-1", "--per-schedule", "1"]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let out = run(
            &ctx,
            &[
                "generate", "--term", "2016-1", "--courses", "1,2", "--per-schedule", "1",
                "--format", "json",
            ],
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["count"], 2);
    });
}

#[test]
fn test_delete_unknown_agenda_fails() {
    let dir = workspace("[storage]\nbackend = \"memory\"\n");
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let err = run(&ctx, &["agenda", "delete", "missing"]).unwrap_err();
        assert!(matches!(err, ApiError::AgendaNotFound(_)));
    });
}

#[test]
fn test_init_writes_defaults_and_config_prints_them() {
    let dir = TempDir::new().unwrap();
    with_isolated_env(&dir, &[], || {
        let ctx = context(dir.path(), None);
        let out = run(&ctx, &["init"]).unwrap();
        assert!(out.contains("Created"));
        assert!(dir.path().join("config").join("config.toml").exists());
        assert!(run(&ctx, &["init"]).unwrap().contains("Kept existing"));

        let rendered = run(&ctx, &["config"]).unwrap();
        let value: toml::Value = toml::from_str(&rendered).unwrap();
        assert_eq!(value["dispatch"]["mode"].as_str(), Some("inline"));
        assert_eq!(value["storage"]["backend"].as_str(), Some("sled"));
    });
}
