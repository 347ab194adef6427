//! Runs one or both validation methods across a batch of candidate files.
//!
//! The orchestrator owns the inputs of a run and a small state machine:
//!
//! ```text
//! Idle -> Loaded -> Running -> Completed | Failed
//! ```
//!
//! Results are built per file and published only once that file is done, so
//! an observer that cancels mid-run never sees partial state.

mod result;
mod scorer;

pub use result::{
    rank_files, BusinessOutcome, BusinessStatistics, BusinessValidation, CombinedReport,
    OverallSummary, RankedFile, ValidationRun,
};
pub use scorer::{BusinessScorer, CharacterScorer, FileScorer};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::accuracy::{aligner, FieldAccuracyAggregator};
use crate::business::BusinessRuleEngine;
use crate::error::{InputError, RunError};
use crate::loader::ReferenceTemplate;
use crate::models::config::ValidationConfig;
use crate::models::record::RecordSet;
use crate::report::{text, FieldTable};

/// Which validation methods a run applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationMethod {
    /// Character accuracy against reference data.
    #[default]
    #[serde(rename = "character_level")]
    Character,
    /// Business arithmetic on the candidates alone.
    #[serde(rename = "business_logic")]
    Business,
    /// Both, plus a combined score per file.
    #[serde(rename = "both")]
    Both,
}

impl ValidationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMethod::Character => "character_level",
            ValidationMethod::Business => "business_logic",
            ValidationMethod::Both => "both",
        }
    }

    /// Parse a method name (`character`, `business_logic`, `both`, ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" | "character_level" | "char" => Some(ValidationMethod::Character),
            "business" | "business_logic" => Some(ValidationMethod::Business),
            "both" | "combined" => Some(ValidationMethod::Both),
            _ => None,
        }
    }

    pub fn includes_character(&self) -> bool {
        matches!(self, ValidationMethod::Character | ValidationMethod::Both)
    }

    pub fn includes_business(&self) -> bool {
        matches!(self, ValidationMethod::Business | ValidationMethod::Both)
    }

    /// Reference data is needed whenever character scoring runs.
    pub fn requires_reference(&self) -> bool {
        self.includes_character()
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Loaded,
    Running,
    Completed,
    /// The last run finished but every file failed every method it ran.
    Failed,
}

/// Receives per-file results as a run progresses.
///
/// Called from worker threads when the run is parallel.
pub trait RunObserver: Sync {
    /// A file finished; `completed` counts finished files so far.
    fn on_file_completed(&self, _report: &CombinedReport, _completed: usize, _total: usize) {}

    /// Checked before each file starts. Returning false cancels the run.
    fn should_continue(&self) -> bool {
        true
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

enum CandidateInput {
    Loaded(RecordSet),
    Failed(String),
}

/// Holds the inputs of a validation run and executes it.
pub struct ValidationOrchestrator {
    config: ValidationConfig,
    method: ValidationMethod,
    reference: Option<RecordSet>,
    candidates: BTreeMap<String, CandidateInput>,
    state: RunState,
}

impl ValidationOrchestrator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            method: ValidationMethod::default(),
            reference: None,
            candidates: BTreeMap::new(),
            state: RunState::Idle,
        }
    }

    pub fn with_method(mut self, method: ValidationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn set_method(&mut self, method: ValidationMethod) {
        self.method = method;
    }

    pub fn method(&self) -> ValidationMethod {
        self.method
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Number of candidate files loaded, usable or not.
    pub fn file_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Add a candidate file. An empty record set is kept as an input failure.
    pub fn load_candidate(&mut self, file_id: impl Into<String>, records: RecordSet) -> Result<(), InputError> {
        let file_id = file_id.into();
        if records.is_empty() {
            let message = InputError::NoRecords(file_id.clone()).to_string();
            return self.record_input_failure(file_id, message);
        }

        self.insert_candidate(file_id.clone(), CandidateInput::Loaded(records))?;
        info!("Loaded candidate {}", file_id);
        Ok(())
    }

    /// Add a candidate that could not be read. It still gets a result.
    pub fn record_input_failure(
        &mut self,
        file_id: impl Into<String>,
        error: impl fmt::Display,
    ) -> Result<(), InputError> {
        let file_id = file_id.into();
        let message = error.to_string();
        warn!("Input failure for {}: {}", file_id, message);
        self.insert_candidate(file_id, CandidateInput::Failed(message))
    }

    fn insert_candidate(&mut self, file_id: String, input: CandidateInput) -> Result<(), InputError> {
        if self.candidates.contains_key(&file_id) {
            return Err(InputError::DuplicateFile(file_id));
        }
        let max = self.config.run.max_files;
        if self.candidates.len() >= max {
            return Err(InputError::TooManyFiles {
                count: self.candidates.len() + 1,
                max,
            });
        }

        self.candidates.insert(file_id, input);
        self.state = RunState::Loaded;
        Ok(())
    }

    /// Set the reference data, replacing any previous reference.
    pub fn load_reference(&mut self, reference: RecordSet) -> Result<(), InputError> {
        if reference.is_empty() {
            return Err(InputError::EmptyReference);
        }
        info!("Reference loaded: {} lines", reference.len());
        self.reference = Some(reference);
        Ok(())
    }

    /// Check the run preconditions without changing state.
    pub fn can_run(&self) -> Result<(), RunError> {
        if self.candidates.is_empty() {
            return Err(RunError::NotLoaded);
        }
        if self.method.requires_reference() && self.reference.is_none() {
            return Err(RunError::MissingReference {
                method: self.method.to_string(),
            });
        }
        Ok(())
    }

    /// Blank reference skeleton over the loaded candidates.
    pub fn reference_template(&self) -> ReferenceTemplate {
        ReferenceTemplate::from_candidates(self.candidates.values().filter_map(|c| match c {
            CandidateInput::Loaded(records) => Some(records),
            CandidateInput::Failed(_) => None,
        }))
    }

    /// Drop every input and return to `Idle`.
    pub fn reset(&mut self) {
        self.reference = None;
        self.candidates.clear();
        self.state = RunState::Idle;
    }

    pub fn run(&mut self) -> Result<ValidationRun, RunError> {
        self.run_with_observer(&NoopObserver)
    }

    /// Run the configured method over every loaded candidate.
    ///
    /// A rejected precondition or a cancellation leaves the orchestrator
    /// `Loaded`. Per-file failures never abort the run.
    pub fn run_with_observer(&mut self, observer: &dyn RunObserver) -> Result<ValidationRun, RunError> {
        self.can_run()?;
        self.state = RunState::Running;
        info!(
            "Starting {} validation of {} files",
            self.method,
            self.candidates.len()
        );

        match self.evaluate(observer) {
            Ok(run) => {
                self.state = if run.all_failed() {
                    error!("Every file failed validation");
                    RunState::Failed
                } else {
                    RunState::Completed
                };
                info!("Validation completed");
                Ok(run)
            }
            Err(e) => {
                warn!("{}", e);
                self.state = RunState::Loaded;
                Err(e)
            }
        }
    }

    fn build_scorers(&self) -> Vec<Box<dyn FileScorer + '_>> {
        let mut scorers: Vec<Box<dyn FileScorer + '_>> = Vec::new();

        if self.method.includes_character() {
            if let Some(reference) = &self.reference {
                let loaded = self.candidates.values().filter_map(|c| match c {
                    CandidateInput::Loaded(records) => Some(records),
                    CandidateInput::Failed(_) => None,
                });
                let lines = aligner::union_lines(std::iter::once(reference).chain(loaded));
                info!("Processing {} unique lines", lines.len());

                let aggregator = FieldAccuracyAggregator::new()
                    .with_fields(self.config.character.measured_fields.iter().cloned());
                scorers.push(Box::new(CharacterScorer::new(aggregator, reference, lines)));
            }
        }

        if self.method.includes_business() {
            let engine = BusinessRuleEngine::with_settings(self.config.business.clone());
            scorers.push(Box::new(BusinessScorer::new(engine)));
        }

        scorers
    }

    fn evaluate(&self, observer: &dyn RunObserver) -> Result<ValidationRun, RunError> {
        let scorers = self.build_scorers();
        let weights = self.config.combined;
        let entries: Vec<(&String, &CandidateInput)> = self.candidates.iter().collect();
        let total = entries.len();
        let completed = AtomicUsize::new(0);

        let evaluate_file = |&(file_id, input): &(&String, &CandidateInput)| -> Option<CombinedReport> {
            if !observer.should_continue() {
                debug!("Skipping {}: run cancelled", file_id);
                return None;
            }

            let report = match input {
                CandidateInput::Failed(message) => CombinedReport::input_failure(file_id.clone(), message.clone()),
                CandidateInput::Loaded(records) => {
                    let mut report = CombinedReport::new(file_id.clone());
                    for scorer in &scorers {
                        debug!("Running {} on {}", scorer.name(), file_id);
                        scorer.score(records, &mut report);
                    }
                    report.compute_combined(weights.character_weight, weights.business_weight);
                    report
                }
            };

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            observer.on_file_completed(&report, done, total);
            Some(report)
        };

        let slots: Vec<Option<CombinedReport>> = if self.config.run.parallel {
            entries.par_iter().map(evaluate_file).collect()
        } else {
            entries.iter().map(evaluate_file).collect()
        };

        let finished = slots.iter().filter(|s| s.is_some()).count();
        if finished < total {
            return Err(RunError::Cancelled {
                completed: finished,
                total,
            });
        }

        let files: BTreeMap<String, CombinedReport> = slots
            .into_iter()
            .flatten()
            .map(|report| (report.file_id.clone(), report))
            .collect();

        Ok(self.assemble(files))
    }

    fn assemble(&self, files: BTreeMap<String, CombinedReport>) -> ValidationRun {
        let business_statistics = self
            .method
            .includes_business()
            .then(|| BusinessStatistics::from_files(files.values()));

        let overall_summary = match (&business_statistics, self.method) {
            (Some(stats), ValidationMethod::Both) => Some(OverallSummary::from_files(&files, stats)),
            _ => None,
        };

        let field_table = match (&self.reference, self.method.includes_character()) {
            (Some(reference), true) => Some(FieldTable::build(reference, &files)),
            _ => None,
        };

        let mut run = ValidationRun {
            method_used: self.method,
            files_processed: files.len(),
            reference_lines: self.reference.as_ref().map(RecordSet::len),
            ranking: rank_files(&files, self.method),
            files,
            business_statistics,
            overall_summary,
            field_table,
            detailed_report: String::new(),
        };
        run.detailed_report = text::render(&run);
        run
    }
}
