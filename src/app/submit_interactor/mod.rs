// Submit interactor - Accepts requests and supervises their execution

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::adapters::toml_config::ClipperConfig;
use crate::app::pipeline_interactor::{PipelineInteractor, TaskContext};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::{delivered_output_names, generate_task_id, sanitize_filename};
use crate::engine::{EngineConfig, StreamResolver, VideoInfo};
use crate::error::{ClipperError, ClipperResult};
use crate::output::sweep_stale_intermediates;
use crate::ports::ProcessPort;
use crate::registry::{OutputReservations, Subscription, TaskRegistry, TaskSnapshot};

/// Admission and housekeeping policy
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPolicy {
    pub max_intervals: usize,
    pub max_concurrent_tasks: usize,
    pub task_retention: Duration,
    pub stale_temp_age: Duration,
}

impl SubmitPolicy {
    pub fn from_config(config: &ClipperConfig) -> Self {
        Self {
            max_intervals: config.max_intervals,
            max_concurrent_tasks: config.max_concurrent_tasks.max(1),
            task_retention: Duration::from_secs(config.task_retention_secs),
            stale_temp_age: Duration::from_secs(config.stale_temp_secs),
        }
    }
}

/// Availability of one external engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub name: String,
    pub program: String,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl EngineStatus {
    pub fn available(&self) -> bool {
        self.version.is_some()
    }
}

/// Entry point for callers: submit, observe, shut down
pub struct SubmitInteractor {
    registry: Arc<TaskRegistry>,
    pipeline: Arc<PipelineInteractor>,
    resolver: Arc<StreamResolver>,
    process: Arc<dyn ProcessPort>,
    engines: EngineConfig,
    reservations: OutputReservations,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    policy: SubmitPolicy,
}

impl SubmitInteractor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        pipeline: Arc<PipelineInteractor>,
        resolver: Arc<StreamResolver>,
        process: Arc<dyn ProcessPort>,
        engines: EngineConfig,
        policy: SubmitPolicy,
    ) -> Self {
        Self {
            registry,
            pipeline,
            resolver,
            process,
            engines,
            reservations: OutputReservations::new(),
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(policy.max_concurrent_tasks.max(1))),
            shutdown: CancellationToken::new(),
            policy,
        }
    }

    /// Accept a request and start it in the background.
    ///
    /// Returns as soon as the task is registered; progress is read through
    /// [`SubmitInteractor::subscribe`]. Must be called inside a Tokio runtime.
    pub fn submit(&self, request: ClipRequest) -> ClipperResult<TaskId> {
        if self.tracker.is_closed() {
            return Err(ClipperError::Internal {
                message: "not accepting new tasks".to_string(),
            });
        }
        self.validate(&request)?;

        let task_id = generate_task_id(request.mode);
        self.registry.register(&task_id, request.mode)?;

        let base = sanitize_filename(&request.base_filename);
        let reservation = self.reservations.reserve(&base, &task_id, |candidate: &str| {
            delivered_output_names(&request, candidate)
        });

        let message = match request.mode {
            ClipMode::Single => "Starting...".to_string(),
            ClipMode::Multi => format!(
                "Starting multi-clip processing ({} clips)...",
                request.intervals.len()
            ),
        };
        self.registry
            .publish(ProgressEvent::new(task_id.clone(), TaskState::Starting, 0, message))?;

        info!(
            task_id = %task_id,
            mode = ?request.mode,
            intervals = request.intervals.len(),
            concatenate = request.concatenate,
            "Task accepted"
        );

        let context = TaskContext {
            task_id: task_id.clone(),
            request,
            base: reservation.base().to_string(),
        };
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);

        self.tracker.spawn(async move {
            // Held until the task ends so no other task takes the same names
            let _reservation = reservation;
            let _permit = permits.acquire_owned().await.ok();
            pipeline.execute(&context).await;
        });

        Ok(task_id)
    }

    fn validate(&self, request: &ClipRequest) -> Result<(), DomainError> {
        if request.source_ref.trim().is_empty() {
            return Err(DomainError::BadArgs("source reference is required".to_string()));
        }
        if request.intervals.is_empty() {
            return Err(DomainError::BadArgs("at least one interval is required".to_string()));
        }
        if request.mode == ClipMode::Single && request.intervals.len() != 1 {
            return Err(DomainError::BadArgs(format!(
                "single mode takes exactly one interval, got {}",
                request.intervals.len()
            )));
        }
        if request.intervals.len() > self.policy.max_intervals {
            return Err(DomainError::BadArgs(format!(
                "at most {} intervals are allowed, got {}",
                self.policy.max_intervals,
                request.intervals.len()
            )));
        }
        Ok(())
    }

    /// Observe a task; replaces any existing observer of the same task
    pub fn subscribe(&self, task_id: &TaskId) -> ClipperResult<Subscription> {
        Ok(self.registry.subscribe(task_id)?)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.registry.unsubscribe(subscription);
    }

    pub fn snapshot(&self, task_id: &TaskId) -> Option<TaskSnapshot> {
        self.registry.snapshot(task_id)
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Periodically evict finished tasks and sweep orphaned intermediates
    pub fn spawn_maintenance(&self, every: Duration) {
        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.clone();
        let output_dir = self.pipeline.output_dir().clone();
        let retention = self.policy.task_retention;
        let stale_age = self.policy.stale_temp_age;

        self.tracker.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.evict_finished(retention);
                        let dir = output_dir.clone();
                        let swept = tokio::task::spawn_blocking(move || {
                            sweep_stale_intermediates(&dir, stale_age)
                        })
                        .await;
                        if let Err(e) = swept {
                            warn!("Stale intermediate sweep failed: {}", e);
                        }
                    }
                }
            }
            debug!("Maintenance loop stopped");
        });
    }

    /// Stop accepting tasks and wait for running ones to publish their terminal event
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All tasks finished");
    }

    /// Preview metadata for a source; placeholders when the lookup fails
    pub async fn video_info(&self, source_ref: &str) -> VideoInfo {
        self.resolver.info(source_ref).await
    }

    /// Probe both engines for a version line
    pub async fn check_engines(&self) -> Vec<EngineStatus> {
        let probes = [
            ("yt-dlp", self.engines.ytdlp_path.as_str(), "--version"),
            ("ffmpeg", self.engines.ffmpeg_path.as_str(), "-version"),
        ];

        let mut statuses = Vec::with_capacity(probes.len());
        for (name, program, flag) in probes {
            let status = match self.process.probe_version(program, flag).await {
                Ok(version) => EngineStatus {
                    name: name.to_string(),
                    program: program.to_string(),
                    version: Some(version),
                    error: None,
                },
                Err(e) => EngineStatus {
                    name: name.to_string(),
                    program: program.to_string(),
                    version: None,
                    error: Some(e.to_string()),
                },
            };
            statuses.push(status);
        }
        statuses
    }
}
