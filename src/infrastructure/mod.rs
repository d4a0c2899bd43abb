pub mod model_artifacts;
pub mod notifiers;
pub mod observability;
pub mod persistence;
pub mod repositories;
pub mod sources;

pub use model_artifacts::JsonModelArtifactStore;
pub use notifiers::{ChannelNotifier, LogNotifier, NotifierRegistry};
pub use repositories::{InMemoryModelArtifactStore, InMemoryObservationRepository};
