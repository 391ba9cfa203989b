//! Generation pipeline.
//!
//! Drives the remote generator through P propositions x [flat, threeQuarter]
//! units, strictly one call at a time. Per-unit failures are logged and
//! skipped; only setup problems abort a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{ImageGenerator, ImagePart};
use crate::config::GeneratorConfig;
use crate::domain::{
    GeneratedArtifact, GenerationRequest, GenerationResult, ProgressEvent, ProgressSink,
    RunState, ViewKind,
};

use super::aggregator::ResultAggregator;
use super::cancel::CancelToken;
use super::prompt::{build_prompt, enrich_description, three_quarter_from_flat_prompt};
use super::timeout::{call_with_cancel, RemoteError};

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid settings: {0}")]
    InvalidConfig(String),

    #[error("Failed to prepare output location '{path}': {reason}")]
    Setup { path: String, reason: String },

    #[error("Generation cancelled after {saved} artifact(s)")]
    Cancelled { saved: usize },
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Job folder name; generated from the event label when absent
    pub output_id: Option<String>,

    /// Stops the run at its next suspension point
    pub cancel: CancelToken,
}

/// A unit that produced no artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub view_kind: ViewKind,
    pub proposition_index: u32,
    pub reason: UnitFailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFailureReason {
    /// Timeout or provider error
    Remote(RemoteError),

    /// The provider answered without any image part
    NoImage,

    /// Images came back but none could be written
    NotSaved(String),
}

/// Outcome of a completed run, with per-unit diagnostics
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: GenerationResult,

    /// Units that were attempted but produced nothing, in order
    pub failures: Vec<UnitFailure>,

    /// Three-quarter units skipped because their flat unit failed
    pub skipped: Vec<u32>,
}

/// What a unit hands to the rest of the run
enum UnitOutcome {
    /// Images were saved; carries the first one, which seeds the oblique view
    Rendered(ImagePart),
    Failed(UnitFailureReason),
}

/// The run's cancel token fired during a unit
struct Interrupted;

/// Run-scoped mutable state, owned by one `generate` call
struct Run<'a> {
    output_id: String,
    job_dir: PathBuf,
    total: u32,
    current: u32,
    state: RunState,
    artifacts: Vec<GeneratedArtifact>,
    failures: Vec<UnitFailure>,
    skipped: Vec<u32>,
    sink: &'a dyn ProgressSink,
}

impl<'a> Run<'a> {
    /// Count one attempted unit and announce it
    fn begin_unit(&mut self, view_kind: ViewKind, proposition: u32, propositions: u32) {
        self.current = (self.current + 1).min(self.total);
        let message = match view_kind {
            ViewKind::Flat => format!(
                "Proposition {}/{}: generating flat view",
                proposition, propositions
            ),
            ViewKind::ThreeQuarter => format!(
                "Proposition {}/{}: generating three-quarter view",
                proposition, propositions
            ),
        };
        self.sink.emit(ProgressEvent::progress(
            self.current,
            self.total,
            view_kind,
            proposition,
            message,
        ));
    }

    fn transition(&mut self, next: RunState) {
        let from = self.state.clone();
        if self.state.advance(next) {
            debug!(?from, to = ?self.state, "Run state changed");
        }
    }
}

/// Sequential image generation pipeline
pub struct GenerationPipeline {
    generator: Arc<dyn ImageGenerator>,
    storage: Arc<dyn crate::storage::Storage>,
    config: GeneratorConfig,
    aggregator: ResultAggregator,
}

impl GenerationPipeline {
    /// Create a pipeline from its collaborators and settings
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<dyn crate::storage::Storage>,
        config: GeneratorConfig,
    ) -> Self {
        let aggregator = ResultAggregator::new(config.access_url_template.clone());
        Self {
            generator,
            storage,
            config,
            aggregator,
        }
    }

    /// Run the whole plan for `request`, streaming events to `sink`
    ///
    /// Pass [`crate::domain::NoopSink`] when progress is not needed.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        sink: &dyn ProgressSink,
    ) -> Result<GenerationResult, GenerationError> {
        self.generate_with(request, sink, RunOptions::default())
            .await
            .map(|report| report.result)
    }

    /// Run the whole plan, stopping early when `cancel` fires
    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerationResult, GenerationError> {
        let options = RunOptions {
            cancel: cancel.clone(),
            ..Default::default()
        };
        self.generate_with(request, sink, options)
            .await
            .map(|report| report.result)
    }

    /// Run with explicit options, returning per-unit diagnostics
    #[instrument(skip_all, fields(event = %request.event_label))]
    pub async fn generate_with(
        &self,
        request: GenerationRequest,
        sink: &dyn ProgressSink,
        options: RunOptions,
    ) -> Result<RunReport, GenerationError> {
        let total = self.config.total_units();
        let output_id = options
            .output_id
            .unwrap_or_else(|| output_id_for(&request.event_label));
        let job_dir = PathBuf::from(&output_id);

        let mut run = Run {
            output_id,
            job_dir,
            total,
            current: 0,
            state: RunState::Idle,
            artifacts: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            sink,
        };

        if let Err(e) = self.prepare(&request, &run.job_dir).await {
            error!(error = %e, "Run setup failed");
            run.transition(RunState::Failed {
                error: e.to_string(),
            });
            sink.emit(ProgressEvent::error(0, total, e.to_string()));
            return Err(e);
        }

        run.transition(RunState::Running);
        info!(
            output_id = %run.output_id,
            total,
            generator = self.generator.name(),
            "Starting generation run"
        );
        sink.emit(ProgressEvent::start(
            total,
            format!(
                "Generating {} view(s) for '{}'",
                total, request.event_label
            ),
        ));

        let cancel = &options.cancel;
        let started = Instant::now();
        let description = enrich_description(&request);
        let inputs = input_parts(&request);

        for index in 0..self.config.propositions_count {
            if cancel.is_cancelled() {
                return Err(self.cancel_run(&mut run));
            }

            let proposition = index + 1;
            let flat_prompt = build_prompt(&description, ViewKind::Flat, index);

            run.begin_unit(ViewKind::Flat, proposition, self.config.propositions_count);
            let flat = self
                .run_unit(&mut run, ViewKind::Flat, proposition, &flat_prompt, &inputs, cancel)
                .await;

            match flat {
                Err(Interrupted) => return Err(self.cancel_run(&mut run)),
                Ok(UnitOutcome::Rendered(flat_image)) => {
                    if !cancel.sleep(self.config.inter_call_delay()).await {
                        return Err(self.cancel_run(&mut run));
                    }

                    run.begin_unit(
                        ViewKind::ThreeQuarter,
                        proposition,
                        self.config.propositions_count,
                    );
                    let seed = [flat_image];
                    let oblique = self
                        .run_unit(
                            &mut run,
                            ViewKind::ThreeQuarter,
                            proposition,
                            three_quarter_from_flat_prompt(),
                            &seed,
                            cancel,
                        )
                        .await;

                    if let Err(Interrupted) = oblique {
                        return Err(self.cancel_run(&mut run));
                    }
                }
                Ok(UnitOutcome::Failed(_)) => {
                    info!(proposition, "Flat view missing, skipping three-quarter view");
                    run.skipped.push(proposition);
                }
            }

            let is_last = proposition == self.config.propositions_count;
            if !is_last && !cancel.sleep(self.config.inter_call_delay()).await {
                return Err(self.cancel_run(&mut run));
            }
        }

        let result = self
            .aggregator
            .aggregate(&run.artifacts, &request.event_label, &run.output_id);

        run.transition(RunState::Completed);
        info!(
            output_id = %run.output_id,
            artifacts = run.artifacts.len(),
            failed_units = run.failures.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            succeeded = result.succeeded,
            "Generation run completed"
        );
        sink.emit(ProgressEvent::complete(total, result.summary_message.clone()));

        Ok(RunReport {
            result,
            failures: run.failures,
            skipped: run.skipped,
        })
    }

    /// Validate settings and request, then create the job folder
    async fn prepare(&self, request: &GenerationRequest, job_dir: &Path) -> Result<(), GenerationError> {
        self.config
            .validate()
            .map_err(|e| GenerationError::InvalidConfig(format!("{:#}", e)))?;
        request.validate(self.config.max_reference_images)?;

        self.storage
            .ensure_directory(job_dir)
            .await
            .map_err(|e| GenerationError::Setup {
                path: job_dir.display().to_string(),
                reason: format!("{:#}", e),
            })
    }

    /// Generate and persist one unit.
    ///
    /// Only cancellation surfaces as `Err`; every other failure is recorded
    /// on the run and returned as `UnitOutcome::Failed`.
    async fn run_unit(
        &self,
        run: &mut Run<'_>,
        view_kind: ViewKind,
        proposition: u32,
        prompt: &str,
        images: &[ImagePart],
        cancel: &CancelToken,
    ) -> Result<UnitOutcome, Interrupted> {
        let unit_start = Instant::now();
        let call = self.generator.generate_content(prompt, images);
        let response = call_with_cancel(call, self.config.call_timeout(), cancel).await;
        let duration_ms = unit_start.elapsed().as_millis() as u64;

        let reason = match response {
            Err(RemoteError::Cancelled) => return Err(Interrupted),
            Err(e) => {
                warn!(
                    view = %view_kind,
                    proposition,
                    duration_ms,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Unit failed"
                );
                UnitFailureReason::Remote(e)
            }
            Ok(response) if !response.has_images() => {
                warn!(
                    view = %view_kind,
                    proposition,
                    text = %response.text_parts.join(" "),
                    "Provider returned no image"
                );
                UnitFailureReason::NoImage
            }
            Ok(response) => {
                match self
                    .save_images(run, view_kind, proposition, response.image_parts)
                    .await
                {
                    Ok(first) => {
                        debug!(view = %view_kind, proposition, duration_ms, "Unit completed");
                        return Ok(UnitOutcome::Rendered(first));
                    }
                    Err(reason) => reason,
                }
            }
        };

        run.failures.push(UnitFailure {
            view_kind,
            proposition_index: proposition,
            reason: reason.clone(),
        });
        Ok(UnitOutcome::Failed(reason))
    }

    /// Write every image part and record the artifact.
    ///
    /// Returns the first saved image, or the failure reason when nothing
    /// could be written.
    async fn save_images(
        &self,
        run: &mut Run<'_>,
        view_kind: ViewKind,
        proposition: u32,
        parts: Vec<ImagePart>,
    ) -> Result<ImagePart, UnitFailureReason> {
        let stem = format!(
            "{}_{}_prop{}_{}",
            self.config.product_category,
            view_kind.as_str(),
            proposition,
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        );

        let mut saved = Vec::new();
        let mut first: Option<ImagePart> = None;
        let mut last_error = String::new();

        for (k, part) in parts.into_iter().enumerate() {
            let file_name = if k == 0 {
                format!("{}.{}", stem, part.extension())
            } else {
                format!("{}_{}.{}", stem, k + 1, part.extension())
            };

            match self
                .storage
                .write_file(&run.job_dir.join(&file_name), &part.data)
                .await
            {
                Ok(()) => {
                    info!(file = %file_name, "Saved image");
                    saved.push(file_name);
                    first.get_or_insert(part);
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to save image");
                    last_error = format!("{:#}", e);
                }
            }
        }

        match first {
            Some(image) => {
                run.artifacts
                    .push(GeneratedArtifact::new(view_kind, proposition, saved));
                Ok(image)
            }
            None => Err(UnitFailureReason::NotSaved(last_error)),
        }
    }

    fn cancel_run(&self, run: &mut Run<'_>) -> GenerationError {
        warn!(output_id = %run.output_id, current = run.current, "Generation cancelled");
        run.transition(RunState::Cancelled);
        let err = GenerationError::Cancelled {
            saved: run.artifacts.len(),
        };
        run.sink
            .emit(ProgressEvent::error(run.current, run.total, err.to_string()));
        err
    }
}

/// Images sent with every flat-view call: references, then image attachments
fn input_parts(request: &GenerationRequest) -> Vec<ImagePart> {
    request
        .reference_images
        .iter()
        .map(|r| ImagePart::new(r.data.clone(), r.mime_type.clone()))
        .chain(
            request
                .supplementary_files
                .iter()
                .filter(|f| f.is_image())
                .map(|f| ImagePart::new(f.content.clone(), f.media_type.clone())),
        )
        .collect()
}

/// Job folder name: `<slug>_<YYYYmmdd_HHMMSS>_<8 hex>`
pub fn output_id_for(event_label: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        slugify(event_label),
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

fn slugify(label: &str) -> String {
    let mut slug = String::new();
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= 40 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "job".to_string()
    } else {
        slug.to_string()
    }
}
