pub mod fitter;
pub mod model_slot;
pub mod trainer;

pub use fitter::{RegressionFitter, SmartcoreLinearFitter};
pub use model_slot::{ModelSlot, PublishError};
pub use trainer::{ModelTrainer, TrainerSettings};
