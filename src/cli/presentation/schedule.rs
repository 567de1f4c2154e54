//! Schedule presentation: stored schedules, ad hoc combinations, run summaries.

use super::to_json;
use crate::error::ApiError;
use crate::orchestrator::RegenerationSummary;
use crate::schedule::Schedule;
use crate::types::CourseId;
use comfy_table::Table;
use serde_json::json;

fn join_ids(ids: &[CourseId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_schedules_text(schedules: &[Schedule]) -> String {
    if schedules.is_empty() {
        return "No schedules.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["#", "Schedule", "Courses"]);
    for schedule in schedules {
        table.add_row(vec![
            (schedule.position + 1).to_string(),
            schedule.id.to_string(),
            join_ids(&schedule.course_ids),
        ]);
    }
    format!("{}\n{} schedule(s)", table, schedules.len())
}

pub fn format_schedules_json(schedules: &[Schedule]) -> Result<String, ApiError> {
    to_json(schedules)
}

pub fn format_combinations_text(combinations: &[Vec<CourseId>]) -> String {
    if combinations.is_empty() {
        return "No valid combination.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["#", "Courses"]);
    for (i, ids) in combinations.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), join_ids(ids)]);
    }
    format!("{}\n{} combination(s)", table, combinations.len())
}

pub fn format_combinations_json(combinations: &[Vec<CourseId>]) -> Result<String, ApiError> {
    to_json(&json!({ "count": combinations.len(), "combinations": combinations }))
}

pub fn format_summary_text(summary: &RegenerationSummary) -> String {
    format!(
        "Combined agenda {}\n  Mandatory: {}\n  Remainder: {}\n  Blocked: {}\n  Schedules: {} (replaced {})\n  Combined at: {}\n  Took: {} ms",
        summary.token,
        summary.mandatory,
        summary.remainder,
        summary.blocked,
        summary.schedules,
        summary.replaced,
        summary.combined_at.to_rfc3339(),
        summary.duration_ms,
    )
}
