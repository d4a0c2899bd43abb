// Read-only views for external callers
pub mod status_service;

pub use status_service::StatusService;
