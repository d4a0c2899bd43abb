pub mod feature_registry;
pub mod model;

pub use model::{LinearParameters, Model, ValidationMetrics};
