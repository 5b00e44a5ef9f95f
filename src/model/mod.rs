mod config;
mod errors;
mod retrain;
mod scheduler;
mod storage;
mod sync;
mod types;

pub use errors::ModelError;
pub use retrain::{ModelTrainer, RetrainCoordinator, TrainedArtifact};
pub use scheduler::SyncScheduler;
pub use storage::ModelStore;
pub use sync::ModelSyncManager;
pub use types::{LoadedModel, ModelVersion, SyncOutcome};

#[cfg(test)]
pub(crate) use sync::tests::MockGateway;

pub async fn init() -> Result<(), ModelError> {
    ModelStore::init().await
}
