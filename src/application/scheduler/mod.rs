pub mod cycle;
pub mod job_scheduler;

pub use cycle::{CycleComponents, CycleOutcome, CycleReport, CycleSettings, MonitorCycle, TrainingOutcome};
pub use job_scheduler::{JobScheduler, TickOutcome};
