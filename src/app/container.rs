use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::adapters::toml_config::ClipperConfig;
use crate::adapters::TokioProcessAdapter;
use crate::app::{
    pipeline_interactor::PipelineInteractor,
    submit_interactor::{SubmitInteractor, SubmitPolicy},
};
use crate::engine::{ClipExecutor, Concatenator, EngineConfig, StreamResolver};
use crate::error::{ClipperError, ClipperResult};
use crate::output::OutputVerifier;
use crate::ports::ProcessPort;
use crate::registry::TaskRegistry;

pub trait AppContainer: Send + Sync {
    fn submit_interactor(&self) -> Arc<SubmitInteractor>;
    fn registry(&self) -> Arc<TaskRegistry>;
}

pub struct DefaultAppContainer {
    registry: Arc<TaskRegistry>,
    submit_interactor: Arc<SubmitInteractor>,
    output_dir: PathBuf,
}

impl DefaultAppContainer {
    /// Wire the real process adapter
    pub fn new(config: &ClipperConfig) -> ClipperResult<Self> {
        Self::with_process(config, Arc::new(TokioProcessAdapter::new()))
    }

    /// Wire an arbitrary process port, e.g. a scripted one in tests
    pub fn with_process(config: &ClipperConfig, process_port: Arc<dyn ProcessPort>) -> ClipperResult<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.output_dir).map_err(|e| ClipperError::Config {
            message: format!(
                "Cannot create output directory {}: {}",
                config.output_dir.display(),
                e
            ),
        })?;
        let output_dir = config.output_dir.canonicalize()?;

        let engine_config = EngineConfig::from_config(config);
        let registry = Arc::new(TaskRegistry::new());

        let resolver = Arc::new(StreamResolver::new(
            Arc::clone(&process_port),
            engine_config.clone(),
        ));

        let pipeline_interactor = Arc::new(PipelineInteractor::new(
            Arc::clone(&registry),
            Arc::clone(&resolver),
            Arc::new(ClipExecutor::new(
                Arc::clone(&process_port),
                engine_config.clone(),
            )),
            Arc::new(Concatenator::new(
                Arc::clone(&process_port),
                engine_config.clone(),
            )),
            OutputVerifier::new(config.min_output_bytes),
            output_dir.clone(),
        ));

        let submit_interactor = Arc::new(SubmitInteractor::new(
            Arc::clone(&registry),
            pipeline_interactor,
            resolver,
            Arc::clone(&process_port),
            engine_config,
            SubmitPolicy::from_config(config),
        ));

        info!("Output directory: {}", output_dir.display());

        Ok(Self {
            registry,
            submit_interactor,
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

impl AppContainer for DefaultAppContainer {
    fn submit_interactor(&self) -> Arc<SubmitInteractor> {
        Arc::clone(&self.submit_interactor)
    }

    fn registry(&self) -> Arc<TaskRegistry> {
        Arc::clone(&self.registry)
    }
}
