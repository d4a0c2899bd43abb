//! File-backed persistence for the current regression model.
//!
//! The slot is a single JSON document. A save writes a sibling temp file,
//! reads it back, and only then renames it over the slot, so a crash or a
//! bad write never leaves a half-written model behind.

use crate::domain::errors::ArtifactError;
use crate::domain::ml::Model;
use crate::domain::repositories::ModelArtifactStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub struct JsonModelArtifactStore {
    file_path: PathBuf,
}

impl JsonModelArtifactStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn io_error(path: &Path, err: impl std::fmt::Display) -> ArtifactError {
        ArtifactError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl ModelArtifactStore for JsonModelArtifactStore {
    async fn load(&self) -> Result<Option<Model>, ArtifactError> {
        if !fs::try_exists(&self.file_path)
            .await
            .map_err(|e| Self::io_error(&self.file_path, e))?
        {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .await
            .map_err(|e| Self::io_error(&self.file_path, e))?;
        let model: Model = serde_json::from_str(&content)?;

        info!(
            "Loaded model v{} from {:?} (trained {})",
            model.version, self.file_path, model.trained_at
        );
        Ok(Some(model))
    }

    async fn save(&self, model: &Model) -> Result<(), ArtifactError> {
        let content = serde_json::to_string_pretty(model)?;

        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }

        let temp_path = self.file_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Self::io_error(&temp_path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Self::io_error(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::io_error(&temp_path, e))?;
        drop(file);

        // Read back before replacing the previous artifact
        let written = fs::read_to_string(&temp_path)
            .await
            .map_err(|e| Self::io_error(&temp_path, e))?;
        let verified: Model =
            serde_json::from_str(&written).map_err(|e| ArtifactError::Unreadable {
                path: temp_path.display().to_string(),
                reason: e.to_string(),
            })?;
        if verified.version != model.version || verified.feature_spec != model.feature_spec {
            let _ = fs::remove_file(&temp_path).await;
            return Err(ArtifactError::Unreadable {
                path: temp_path.display().to_string(),
                reason: "read-back does not match the model being saved".to_string(),
            });
        }

        fs::rename(&temp_path, &self.file_path)
            .await
            .map_err(|e| Self::io_error(&self.file_path, e))?;

        info!("Saved model v{} to {:?}", model.version, self.file_path);
        Ok(())
    }
}
