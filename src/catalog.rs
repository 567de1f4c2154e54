//! Course catalog providers.
//!
//! The catalog is read-only from the engine's point of view and is queried once
//! per regeneration for the agenda's term.

use crate::course::Course;
use crate::error::ApiError;
use crate::types::TermId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Supplies the raw candidate courses of an academic degree term.
pub trait CourseCatalog: Send + Sync {
    fn courses(&self, term: &str) -> Result<Vec<Course>, ApiError>;
}

/// Catalog held in memory, keyed by term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    terms: HashMap<TermId, Vec<Course>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, term: impl Into<TermId>, courses: Vec<Course>) -> Self {
        self.insert_term(term, courses);
        self
    }

    pub fn insert_term(&mut self, term: impl Into<TermId>, courses: Vec<Course>) {
        self.terms.insert(term.into(), courses);
    }

    pub fn terms(&self) -> impl Iterator<Item = &TermId> {
        self.terms.keys()
    }
}

impl CourseCatalog for InMemoryCatalog {
    fn courses(&self, term: &str) -> Result<Vec<Course>, ApiError> {
        self.terms
            .get(term)
            .cloned()
            .ok_or_else(|| ApiError::Catalog(format!("Unknown term: {}", term)))
    }
}

/// Catalog loaded once from a JSON document:
///
/// ```json
/// { "terms": { "2016-1": [ { "id": 1, "slots": [ { "start": 600, "end": 720 } ] } ] } }
/// ```
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    inner: InMemoryCatalog,
}

impl JsonCatalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ApiError::Catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_slice(&bytes).map_err(|e| match e {
            ApiError::Catalog(msg) => ApiError::Catalog(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!(path = %path.display(), terms = catalog.inner.terms.len(), "Loaded course catalog");
        Ok(catalog)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ApiError> {
        let inner: InMemoryCatalog = serde_json::from_slice(bytes)
            .map_err(|e| ApiError::Catalog(format!("Invalid catalog document: {}", e)))?;
        Ok(Self { inner })
    }

    pub fn as_in_memory(&self) -> &InMemoryCatalog {
        &self.inner
    }
}

impl CourseCatalog for JsonCatalog {
    fn courses(&self, term: &str) -> Result<Vec<Course>, ApiError> {
        self.inner.courses(term)
    }
}
