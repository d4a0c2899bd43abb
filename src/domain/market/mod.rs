pub mod alert;
pub mod observation;

pub use alert::{Alert, DeviationKind};
pub use observation::Observation;
