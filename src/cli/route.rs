//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::access::Caller;
use crate::agenda::validation::validate_against_catalog;
use crate::agenda::{normalize_course_ids, Agenda, Token};
use crate::catalog::{CourseCatalog, JsonCatalog};
use crate::cli::command_name;
use crate::cli::parse::{AgendaCommands, Commands};
use crate::cli::presentation::{
    format_agenda_json, format_agenda_list_json, format_agenda_list_text, format_agenda_text,
    format_combinations_json, format_combinations_text, format_schedules_json,
    format_schedules_text, format_summary_text,
};
use crate::config::{ConfigLoader, StorageBackend, TimetablerConfig};
use crate::dispatch::{DispatchMode, Dispatcher, InlineDispatcher, RegenerationQueue};
use crate::enumerator::generate_parallel;
use crate::error::{ApiError, StorageError};
use crate::init::{initialize_workspace, InitSummary};
use crate::leave::Leave;
use crate::orchestrator::{CombineService, Regenerator};
use crate::partition::CoursePartition;
use crate::store::{AgendaStore, MemoryAgendaStore, SledAgendaStore};
use crate::types::CourseId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace, configuration and store.
pub struct RunContext {
    config: TimetablerConfig,
    workspace_root: PathBuf,
    store: Arc<dyn AgendaStore>,
    caller: Caller,
}

impl RunContext {
    /// Load configuration for `workspace_root` (or from `config_path`) and
    /// open the configured store.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        session: Option<String>,
    ) -> Result<Self, ApiError> {
        let mut config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.resolve_paths(&workspace_root);
        config.ensure_valid()?;

        let store: Arc<dyn AgendaStore> = match config.storage.backend {
            StorageBackend::Sled => {
                std::fs::create_dir_all(&config.storage.path)
                    .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
                Arc::new(SledAgendaStore::new(&config.storage.path)?)
            }
            StorageBackend::Memory => Arc::new(MemoryAgendaStore::new()),
        };

        Ok(Self {
            config,
            workspace_root,
            store,
            caller: Caller::from_session(session),
        })
    }

    pub fn config(&self) -> &TimetablerConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command);
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Init { force } => {
                let summary = initialize_workspace(&self.workspace_root, *force)?;
                Ok(format_init_summary(&summary))
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
            Commands::Agenda { command } => self.handle_agenda_command(command),
            Commands::Combine { token, show } => self.handle_combine(&Token::from(token.as_str()), *show),
            Commands::Schedules { token, format } => {
                let token = Token::from(token.as_str());
                self.store.require_agenda(&token)?;
                let schedules = self.store.list_schedules(&token)?;
                if format == "json" {
                    format_schedules_json(&schedules)
                } else {
                    Ok(format_schedules_text(&schedules))
                }
            }
            Commands::Generate {
                term,
                courses,
                mandatory,
                leaves,
                per_schedule,
                format,
            } => self.handle_generate(term, courses, mandatory, leaves, *per_schedule, format),
        }
    }

    fn handle_agenda_command(&self, command: &AgendaCommands) -> Result<String, ApiError> {
        match command {
            AgendaCommands::Create {
                term,
                courses,
                mandatory,
                leaves,
                per_schedule,
            } => {
                let mut agenda = Agenda::new(term.as_str());
                agenda.set_course_ids(courses.iter().copied());
                agenda.set_mandatory_course_ids(mandatory);
                agenda.leaves = leaves.clone();
                agenda.courses_per_schedule = *per_schedule;
                self.store.put_agenda(&agenda)?;
                info!(token = %agenda.token, term = %agenda.term, "Created agenda");
                Ok(agenda.token.to_string())
            }
            AgendaCommands::Show { token, format } => {
                let agenda = self.store.require_agenda(&Token::from(token.as_str()))?;
                if format == "json" {
                    format_agenda_json(&agenda)
                } else {
                    Ok(format_agenda_text(&agenda))
                }
            }
            AgendaCommands::List { format } => {
                let agendas = self.store.list_agendas()?;
                if format == "json" {
                    format_agenda_list_json(&agendas)
                } else {
                    Ok(format_agenda_list_text(&agendas))
                }
            }
            AgendaCommands::Set {
                token,
                courses,
                mandatory,
                leaves,
                clear_leaves,
                per_schedule,
            } => {
                let mut agenda = self.store.require_agenda(&Token::from(token.as_str()))?;
                if let Some(courses) = courses {
                    agenda.set_course_ids(courses.iter().copied());
                }
                if let Some(mandatory) = mandatory {
                    agenda.set_mandatory_course_ids(mandatory);
                }
                if *clear_leaves {
                    agenda.leaves.clear();
                } else if !leaves.is_empty() {
                    agenda.leaves = leaves.clone();
                }
                if let Some(per_schedule) = per_schedule {
                    agenda.courses_per_schedule = *per_schedule;
                }
                self.store.put_agenda(&agenda)?;
                Ok(format_agenda_text(&agenda))
            }
            AgendaCommands::Delete { token } => {
                let token = Token::from(token.as_str());
                if self.store.delete_agenda(&token)? {
                    Ok(format!("Deleted agenda {}", token))
                } else {
                    Err(ApiError::AgendaNotFound(token))
                }
            }
        }
    }

    fn catalog(&self) -> Result<Arc<dyn CourseCatalog>, ApiError> {
        Ok(Arc::new(JsonCatalog::load(&self.config.catalog.path)?))
    }

    fn regenerator(&self, catalog: Arc<dyn CourseCatalog>) -> Arc<Regenerator> {
        Arc::new(
            Regenerator::new(Arc::clone(&self.store), catalog)
                .with_parallel_threshold(self.config.generation.parallel_threshold),
        )
    }

    fn combine_service(
        &self,
        catalog: Arc<dyn CourseCatalog>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> CombineService {
        CombineService::new(Arc::clone(&self.store), catalog, dispatcher)
            .with_gateway(self.config.access.gateway())
            .with_max_candidate_courses(self.config.generation.max_candidate_courses)
    }

    /// Validate, mark processing and run the regeneration to completion.
    fn handle_combine(&self, token: &Token, show: bool) -> Result<String, ApiError> {
        let mut agenda = self.store.require_agenda(token)?;
        let catalog = self.catalog()?;
        let regenerator = self.regenerator(Arc::clone(&catalog));
        let mut summary = None;

        match self.config.dispatch.mode {
            DispatchMode::Inline => {
                let dispatcher = Arc::new(InlineDispatcher::new(regenerator));
                let service = self.combine_service(catalog, dispatcher.clone());
                service.authorize(&self.caller)?;
                service.try_combine(&mut agenda)?;
                match dispatcher.take_outcome() {
                    Some(Ok(outcome)) => summary = Some(outcome),
                    Some(Err(err)) => return Err(err),
                    None => {}
                }
            }
            DispatchMode::Queue => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| ApiError::Dispatch(format!("Failed to start runtime: {}", e)))?;
                let queue = Arc::new(RegenerationQueue::new(
                    regenerator,
                    self.config.dispatch.clone(),
                ));
                let service = self.combine_service(catalog, queue.clone());
                runtime.block_on(async {
                    queue.start()?;
                    let accepted = service
                        .authorize(&self.caller)
                        .and_then(|_| service.try_combine(&mut agenda));
                    if accepted.is_ok() {
                        queue.wait_for_idle(None).await?;
                    }
                    queue.stop().await?;
                    accepted
                })?;
            }
        }

        let agenda = self.store.require_agenda(token)?;
        if agenda.is_processing() {
            warn!(token = %token, "Regeneration did not complete");
            return Err(ApiError::Dispatch(format!(
                "Regeneration of agenda {} did not complete; it is still processing",
                token
            )));
        }

        let schedules = self.store.list_schedules(token)?;
        let mut out = match summary {
            Some(summary) => format_summary_text(&summary),
            None => format!(
                "Combined agenda {}: {} schedule(s) at {}",
                token,
                schedules.len(),
                agenda
                    .combined_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default()
            ),
        };
        if show {
            out.push('\n');
            out.push_str(&format_schedules_text(&schedules));
        }
        Ok(out)
    }

    /// Enumerate against the catalog without touching the store.
    fn handle_generate(
        &self,
        term: &str,
        courses: &[CourseId],
        mandatory: &[String],
        leaves: &[Leave],
        per_schedule: u32,
        format: &str,
    ) -> Result<String, ApiError> {
        let mut agenda = Agenda::new(term);
        let offered = self.catalog()?.courses(term)?;
        if courses.is_empty() {
            agenda.set_course_ids(offered.iter().map(|c| c.id));
        } else {
            agenda.set_course_ids(courses.iter().copied());
        }
        agenda.set_mandatory_ids(normalize_course_ids(mandatory));
        agenda.leaves = leaves.to_vec();
        agenda.courses_per_schedule = per_schedule;
        agenda.validate().map_err(ApiError::Validation)?;

        let offered_ids: HashSet<CourseId> = offered.iter().map(|c| c.id).collect();
        let violations = validate_against_catalog(
            &agenda,
            &offered_ids,
            self.config.generation.max_candidate_courses,
        );
        if !violations.is_empty() {
            return Err(ApiError::Validation(violations));
        }

        let candidates: Vec<_> = offered
            .into_iter()
            .filter(|c| agenda.course_ids().contains(&c.id))
            .collect();
        let partition =
            CoursePartition::new(&candidates, &agenda.effective_mandatory_ids(), &agenda.leaves);
        let (mandatory, remainder) = partition.into_candidates()?;
        let combinations: Vec<Vec<CourseId>> = generate_parallel(
            &mandatory,
            &remainder,
            &agenda.leaves,
            per_schedule as usize,
            self.config.generation.parallel_threshold,
        )
        .into_iter()
        .map(|combination| combination.into_iter().map(|c| c.id).collect())
        .collect();

        if format == "json" {
            format_combinations_json(&combinations)
        } else {
            Ok(format_combinations_text(&combinations))
        }
    }
}

fn format_init_summary(summary: &InitSummary) -> String {
    let mut lines = Vec::new();
    for path in &summary.created {
        lines.push(format!("Created {}", path.display()));
    }
    for path in &summary.skipped {
        lines.push(format!("Kept existing {}", path.display()));
    }
    lines.join("\n")
}
