pub mod opportunity_detector;

pub use opportunity_detector::{DetectorSettings, OpportunityDetector};
