// Pipeline interactor - Drives one task from resolution to its terminal event

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{ClipExecutor, Concatenator, StreamResolver, StreamSource};
use crate::error::{ClipperError, ClipperResult};
use crate::output::{remove_best_effort, OutputVerifier};
use crate::registry::TaskRegistry;

/// Everything the pipeline needs to run one accepted task
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub request: ClipRequest,
    /// Reserved, sanitized base file name
    pub base: String,
}

/// Files a task has created so far; deleted if the task fails
#[derive(Debug, Default)]
struct Artifacts(Vec<PathBuf>);

impl Artifacts {
    fn track(&mut self, path: PathBuf) {
        self.0.push(path);
    }

    async fn remove_all(self) {
        for path in self.0.iter().rev() {
            remove_best_effort(path).await;
        }
    }
}

/// Orchestrates resolver, clip executor, concatenator and verifier for a task
pub struct PipelineInteractor {
    registry: Arc<TaskRegistry>,
    resolver: Arc<StreamResolver>,
    executor: Arc<ClipExecutor>,
    concatenator: Arc<Concatenator>,
    verifier: OutputVerifier,
    output_dir: PathBuf,
}

impl PipelineInteractor {
    /// Create new pipeline interactor with injected components
    pub fn new(
        registry: Arc<TaskRegistry>,
        resolver: Arc<StreamResolver>,
        executor: Arc<ClipExecutor>,
        concatenator: Arc<Concatenator>,
        verifier: OutputVerifier,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            registry,
            resolver,
            executor,
            concatenator,
            verifier,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Run the task to completion. Exactly one terminal event is published,
    /// and on failure every file the task created is removed first.
    pub async fn execute(&self, context: &TaskContext) -> Option<TaskOutcome> {
        let task_id = &context.task_id;
        let mut artifacts = Artifacts::default();

        let result = AssertUnwindSafe(self.run(context, &mut artifacts))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "task panicked".to_string());
                Err(ClipperError::Internal { message })
            });

        match result {
            Ok((outcome, message)) => {
                info!(task_id = %task_id, files = ?outcome.files, "Task complete");
                self.publish(ProgressEvent::complete(task_id.clone(), &outcome, message));
                Some(outcome)
            }
            Err(e) => {
                match &e {
                    ClipperError::EngineFailure { diagnostics, .. } => {
                        error!(task_id = %task_id, "Task failed: {} | {}", e, diagnostics)
                    }
                    _ => error!(task_id = %task_id, "Task failed: {}", e),
                }
                artifacts.remove_all().await;
                self.publish(ProgressEvent::error(task_id.clone(), e.user_message()));
                None
            }
        }
    }

    async fn run(
        &self,
        context: &TaskContext,
        artifacts: &mut Artifacts,
    ) -> ClipperResult<(TaskOutcome, String)> {
        match context.request.mode {
            ClipMode::Single => self.run_single(context, artifacts).await,
            ClipMode::Multi => self.run_multi(context, artifacts).await,
        }
    }

    async fn run_single(
        &self,
        context: &TaskContext,
        artifacts: &mut Artifacts,
    ) -> ClipperResult<(TaskOutcome, String)> {
        let task_id = &context.task_id;
        let request = &context.request;
        let format = request.output_format;
        let interval = request.intervals.first().ok_or_else(|| ClipperError::Internal {
            message: "single task without an interval".to_string(),
        })?;

        let source = self.resolve_with_milestones(context).await?;

        let filename = single_output_name(&context.base, format.extension());
        let output = self.output_dir.join(&filename);
        let activity = if format.is_audio_only() {
            "Extracting audio..."
        } else {
            "Trimming video..."
        };
        self.emit(task_id, TaskState::Trimming, milestones::CLIP_START, activity);

        artifacts.track(output.clone());
        self.executor
            .clip(
                &source,
                interval,
                format,
                &output,
                ProgressBand::single(),
                &mut |percent: u8| self.emit(task_id, TaskState::Trimming, percent, activity),
            )
            .await?;

        self.emit(task_id, TaskState::Cleaning, milestones::VERIFY, "Verifying output...");
        self.verifier.verify(&output).await?;

        Ok((
            TaskOutcome {
                primary: filename.clone(),
                files: vec![filename],
            },
            "Done! File ready for download".to_string(),
        ))
    }

    /// Single mode reports each resolved track as its own milestone
    async fn resolve_with_milestones(&self, context: &TaskContext) -> ClipperResult<StreamSource> {
        let task_id = &context.task_id;
        let request = &context.request;
        let constraint = request.format_constraint();

        if constraint.format.is_audio_only() {
            self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_START, "Getting audio stream URL...");
            let primary = self.resolver.resolve_primary(&request.source_ref, &constraint).await?;
            self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_VIDEO, "Audio stream URL ready");
            return Ok(StreamSource { primary, audio: None });
        }

        self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_START, "Getting video stream URL...");
        let primary = self.resolver.resolve_primary(&request.source_ref, &constraint).await?;

        self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_VIDEO, "Getting audio stream URL...");
        let audio = self.resolver.resolve_audio(&request.source_ref).await;

        let message = if audio.is_some() {
            "Stream URLs ready"
        } else {
            "No separate audio track, continuing with video only"
        };
        self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_AUDIO, message);

        Ok(StreamSource { primary, audio })
    }

    async fn run_multi(
        &self,
        context: &TaskContext,
        artifacts: &mut Artifacts,
    ) -> ClipperResult<(TaskOutcome, String)> {
        let task_id = &context.task_id;
        let request = &context.request;
        let format = request.output_format;
        let extension = format.extension();
        let count = request.intervals.len();

        self.emit(task_id, TaskState::Downloading, milestones::RESOLVE_START, "Getting stream URLs...");
        let source = self
            .resolver
            .resolve(&request.source_ref, &request.format_constraint())
            .await?;

        let mut names = Vec::with_capacity(count);
        let mut paths = Vec::with_capacity(count);

        for (index, interval) in request.intervals.iter().enumerate() {
            let part = index + 1;
            let band = ProgressBand::multi_slot(index, count);
            let activity = format!("Processing clip {}/{} ({})", part, count, interval.label());
            self.emit(task_id, TaskState::Trimming, band.start.round() as u8, activity.clone());

            let name = if request.concatenate {
                intermediate_name(task_id, part, extension)
            } else {
                part_output_name(&context.base, part, extension)
            };
            let path = self.output_dir.join(&name);
            artifacts.track(path.clone());

            self.executor
                .clip(
                    &source,
                    interval,
                    format,
                    &path,
                    band,
                    &mut |percent: u8| self.emit(task_id, TaskState::Trimming, percent, activity.as_str()),
                )
                .await
                .map_err(|e| e.with_stage(format!("FFmpeg clip of part {}", part)))?;

            names.push(name);
            paths.push(path);
        }

        if !request.concatenate {
            let primary = names.first().cloned().ok_or_else(|| ClipperError::Internal {
                message: "multi task without intervals".to_string(),
            })?;
            let message = format!("Done! {} files ready for download", names.len());
            return Ok((TaskOutcome { primary, files: names }, message));
        }

        self.emit(
            task_id,
            TaskState::Trimming,
            milestones::MERGE,
            format!("Merging {} clips...", count),
        );

        let merged_name = single_output_name(&context.base, extension);
        let merged = self.output_dir.join(&merged_name);
        let manifest = self.output_dir.join(manifest_name(task_id));
        artifacts.track(manifest.clone());
        artifacts.track(merged.clone());

        self.concatenator.concat(&paths, &manifest, &merged).await?;

        Ok((
            TaskOutcome {
                primary: merged_name.clone(),
                files: vec![merged_name],
            },
            "Done! Merged file ready".to_string(),
        ))
    }

    fn emit(&self, task_id: &TaskId, state: TaskState, percent: u8, message: impl Into<String>) {
        self.publish(ProgressEvent::new(task_id.clone(), state, percent, message));
    }

    fn publish(&self, event: ProgressEvent) {
        if let Err(e) = self.registry.publish(event) {
            warn!("Progress event dropped: {}", e);
        }
    }
}
