//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Validation(violations) => {
            let mut out = String::from("Agenda is invalid:");
            for violation in violations {
                out.push_str(&format!("\n  - {}", violation));
            }
            out
        }
        ApiError::MandatoryBlocked(_) => format!(
            "{}\nThe agenda stays processing until its leaves or mandatory courses change.",
            e
        ),
        other => other.to_string(),
    }
}
