use crate::domain::ml::Model;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum PublishError {
    #[error("Model v{offered} is not newer than current v{current}")]
    StaleVersion { current: u64, offered: u64 },
}

/// The in-process reference to the model in use.
///
/// The lock guards only the pointer: readers clone the `Arc` and release it,
/// the publisher swaps in a new `Arc`. A reader therefore always holds one
/// complete model, never a mix of two.
#[derive(Default)]
pub struct ModelSlot {
    current: RwLock<Option<Arc<Model>>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: Model) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Snapshot of the current model
    pub fn current(&self) -> Option<Arc<Model>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn version(&self) -> Option<u64> {
        self.current().map(|m| m.version)
    }

    /// Install `model` as current. Versions must strictly increase.
    pub fn publish(&self, model: Model) -> Result<Arc<Model>, PublishError> {
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = slot.as_ref()
            && model.version <= existing.version
        {
            return Err(PublishError::StaleVersion {
                current: existing.version,
                offered: model.version,
            });
        }

        let published = Arc::new(model);
        *slot = Some(published.clone());
        drop(slot);

        info!("ModelSlot: now serving model v{}", published.version);
        Ok(published)
    }
}
