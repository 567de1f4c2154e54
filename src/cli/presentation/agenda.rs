//! Agenda presentation: show and list formatters.

use super::to_json;
use crate::agenda::Agenda;
use crate::error::ApiError;
use crate::interval::format_minute;
use comfy_table::Table;
use serde_json::json;

fn agenda_value(agenda: &Agenda) -> serde_json::Value {
    json!({
        "token": agenda.token,
        "term": agenda.term,
        "course_ids": agenda.course_ids(),
        "mandatory_course_ids": agenda.mandatory_course_ids(),
        "leaves": agenda.leaves,
        "courses_per_schedule": agenda.courses_per_schedule,
        "state": agenda.state(),
        "combined_at": agenda.combined_at().map(|t| t.to_rfc3339()),
    })
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a u64>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_agenda_text(agenda: &Agenda) -> String {
    let mut s = format!(
        "Agenda {}\n  Term: {}\n  Courses: {}\n  Mandatory: {}\n  Courses per schedule: {}\n  State: {:?}",
        agenda.token,
        agenda.term,
        join_ids(agenda.course_ids()),
        join_ids(agenda.mandatory_course_ids()),
        agenda.courses_per_schedule,
        agenda.state(),
    );
    match agenda.combined_at() {
        Some(at) => s.push_str(&format!("\n  Combined at: {}", at.to_rfc3339())),
        None => s.push_str("\n  Combined at: never"),
    }
    if agenda.leaves.is_empty() {
        s.push_str("\n  Leaves: none");
    } else {
        s.push_str(&format!("\n  Leaves ({}):", agenda.leaves.len()));
        for leave in &agenda.leaves {
            s.push_str(&format!(
                "\n    - {} to {}",
                format_minute(leave.starts_at),
                format_minute(leave.ends_at)
            ));
        }
    }
    s
}

pub fn format_agenda_json(agenda: &Agenda) -> Result<String, ApiError> {
    to_json(&agenda_value(agenda))
}

pub fn format_agenda_list_text(agendas: &[Agenda]) -> String {
    if agendas.is_empty() {
        return "No agendas.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Token", "Term", "Courses", "Per schedule", "State", "Combined at"]);
    for agenda in agendas {
        table.add_row(vec![
            agenda.token.to_string(),
            agenda.term.clone(),
            agenda.course_ids().len().to_string(),
            agenda.courses_per_schedule.to_string(),
            format!("{:?}", agenda.state()),
            agenda
                .combined_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

pub fn format_agenda_list_json(agendas: &[Agenda]) -> Result<String, ApiError> {
    let values: Vec<serde_json::Value> = agendas.iter().map(agenda_value).collect();
    to_json(&values)
}
