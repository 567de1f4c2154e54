//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; the route table calls into the orchestrator and store.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{AgendaCommands, Cli, Commands};
pub use presentation::{
    format_agenda_json, format_agenda_list_json, format_agenda_list_text, format_agenda_text,
    format_combinations_json, format_combinations_text, format_schedules_json,
    format_schedules_text, format_summary_text,
};
pub use route::RunContext;
