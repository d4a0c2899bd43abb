// Observation samples and alert events
pub mod market;

// Regression model artifact
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Query surface snapshot
pub mod status;

// Domain-specific error types
pub mod errors;
