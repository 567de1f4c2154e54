//! CLI presentation: text and json formatters per command family.

mod agenda;
mod schedule;

pub use agenda::{
    format_agenda_json, format_agenda_list_json, format_agenda_list_text, format_agenda_text,
};
pub use schedule::{
    format_combinations_json, format_combinations_text, format_schedules_json,
    format_schedules_text, format_summary_text,
};

use crate::error::{ApiError, StorageError};
use serde::Serialize;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ApiError::StorageError(StorageError::Encode {
            what: "output",
            message: e.to_string(),
        })
    })
}
