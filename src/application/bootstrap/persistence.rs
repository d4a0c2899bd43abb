use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::ml::ModelSlot;
use crate::config::Config;
use crate::domain::repositories::{ModelArtifactStore, ObservationRepository};
use crate::infrastructure::model_artifacts::JsonModelArtifactStore;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::SqliteObservationRepository;

pub struct PersistenceHandle {
    pub db: Database,
    pub observation_repository: Arc<dyn ObservationRepository>,
    pub artifacts: Arc<dyn ModelArtifactStore>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(config: &Config) -> Result<PersistenceHandle> {
        let db_url = &config.storage.database_url;
        info!("Initializing Database at {}", db_url);

        let db = Database::new(db_url)
            .await
            .context("Failed to initialize database")?;

        let observation_repository = Arc::new(SqliteObservationRepository::new(
            db.pool.clone(),
            config.storage.auxiliary_arity,
        ));
        let artifacts = Arc::new(JsonModelArtifactStore::new(&config.model.model_path));

        Ok(PersistenceHandle {
            db,
            observation_repository,
            artifacts,
        })
    }

    /// Seed the in-process slot from the persisted artifact.
    ///
    /// An unreadable artifact is logged and ignored; the trainer will
    /// produce a fresh model once enough history exists.
    pub async fn load_model(artifacts: &dyn ModelArtifactStore) -> ModelSlot {
        match artifacts.load().await {
            Ok(Some(model)) => {
                info!(
                    "Resuming with model v{} trained at {}",
                    model.version, model.trained_at
                );
                ModelSlot::with_model(model)
            }
            Ok(None) => {
                info!("No persisted model, starting without one");
                ModelSlot::new()
            }
            Err(e) => {
                warn!("Ignoring unreadable model artifact: {}", e);
                ModelSlot::new()
            }
        }
    }
}
