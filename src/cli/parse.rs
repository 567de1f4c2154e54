//! CLI parse: clap types for timetabler. No behavior; definitions only.

use crate::interval::Interval;
use crate::leave::Leave;
use crate::types::CourseId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Timetabler CLI - enumerate every conflict-free course schedule
#[derive(Parser)]
#[command(name = "timetabler")]
#[command(about = "Generate every conflict-free course schedule for an agenda")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Admin session id presented to the access gateway
    #[arg(long, global = true, env = "TIMETABLER_SESSION")]
    pub session: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config/config.toml and an empty catalog.json
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Manage agendas
    Agenda {
        #[command(subcommand)]
        command: AgendaCommands,
    },
    /// Validate an agenda and regenerate its schedules
    Combine {
        /// Agenda token
        token: String,
        /// Print the generated schedules afterwards
        #[arg(long)]
        show: bool,
    },
    /// List the schedules generated for an agenda
    Schedules {
        /// Agenda token
        token: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Enumerate combinations for a catalog term without storing anything
    Generate {
        /// Academic degree term in the catalog
        #[arg(long)]
        term: String,
        /// Candidate course ids (default: every course of the term)
        #[arg(long, value_delimiter = ',')]
        courses: Vec<CourseId>,
        /// Mandatory course ids; blanks and junk are dropped
        #[arg(long, value_delimiter = ',')]
        mandatory: Vec<String>,
        /// Blocked interval, e.g. "mon 08:00-10:00" or "480-600"; repeatable
        #[arg(long = "leave", value_parser = parse_leave)]
        leaves: Vec<Leave>,
        /// Courses per schedule
        #[arg(long, default_value = "1")]
        per_schedule: u32,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum AgendaCommands {
    /// Create an agenda and print its token
    Create {
        /// Academic degree term in the catalog
        #[arg(long)]
        term: String,
        /// Candidate course ids
        #[arg(long, value_delimiter = ',')]
        courses: Vec<CourseId>,
        /// Mandatory course ids; blanks and junk are dropped
        #[arg(long, value_delimiter = ',')]
        mandatory: Vec<String>,
        /// Blocked interval, e.g. "mon 08:00-10:00" or "480-600"; repeatable
        #[arg(long = "leave", value_parser = parse_leave)]
        leaves: Vec<Leave>,
        /// Courses per schedule
        #[arg(long, default_value = "1")]
        per_schedule: u32,
    },
    /// Show one agenda
    Show {
        token: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List agendas
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Change an agenda's courses or constraints
    Set {
        token: String,
        #[arg(long, value_delimiter = ',')]
        courses: Option<Vec<CourseId>>,
        #[arg(long, value_delimiter = ',')]
        mandatory: Option<Vec<String>>,
        /// Replaces every leave; repeatable
        #[arg(long = "leave", value_parser = parse_leave)]
        leaves: Vec<Leave>,
        /// Remove every leave
        #[arg(long, conflicts_with = "leaves")]
        clear_leaves: bool,
        #[arg(long)]
        per_schedule: Option<u32>,
    },
    /// Delete an agenda and its schedules
    Delete { token: String },
}

fn parse_leave(raw: &str) -> Result<Leave, String> {
    let interval: Interval = raw.parse()?;
    if interval.start >= interval.end {
        return Err(format!("leave must end after it starts, got '{}'", raw.trim()));
    }
    Ok(Leave::new(interval.start, interval.end))
}
