// Application layer - Use case interactors

pub mod container;
pub mod pipeline_interactor;
pub mod submit_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use pipeline_interactor::{PipelineInteractor, TaskContext};
pub use submit_interactor::{EngineStatus, SubmitInteractor, SubmitPolicy};
