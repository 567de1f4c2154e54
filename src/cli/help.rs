//! Command names used in logs.

use crate::cli::parse::{AgendaCommands, Commands};

/// Dotted command name, e.g. "agenda.create".
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Agenda { command } => format!("agenda.{}", agenda_command_name(command)),
        Commands::Combine { .. } => "combine".to_string(),
        Commands::Schedules { .. } => "schedules".to_string(),
        Commands::Generate { .. } => "generate".to_string(),
        Commands::Init { .. } => "init".to_string(),
        Commands::Config => "config".to_string(),
    }
}

pub fn agenda_command_name(command: &AgendaCommands) -> &'static str {
    match command {
        AgendaCommands::Create { .. } => "create",
        AgendaCommands::Show { .. } => "show",
        AgendaCommands::List { .. } => "list",
        AgendaCommands::Set { .. } => "set",
        AgendaCommands::Delete { .. } => "delete",
    }
}
