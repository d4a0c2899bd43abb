// Startup wiring for persistence
pub mod bootstrap;

// Deviation and divergence checks
pub mod detection;

// Model fitting and publication
pub mod ml;

// Query surface
pub mod monitoring;

// Periodic acquire/train/detect cycle
pub mod scheduler;

// System orchestrator
pub mod system;
