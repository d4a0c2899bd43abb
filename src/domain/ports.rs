use crate::domain::errors::{FetchError, NotifyError};
use crate::domain::market::{Alert, Observation};
use async_trait::async_trait;

/// Data acquisition port. One call yields one terminal result; any retrying
/// across upstream endpoints happens inside the implementation.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self) -> Result<Observation, FetchError>;

    /// Source name for logs
    fn name(&self) -> &str;

    /// Number of auxiliary signals every observation carries, when fixed
    fn auxiliary_arity(&self) -> Option<usize> {
        None
    }
}

/// Notification port. Failures are reported, never retried by the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;

    fn name(&self) -> &str;
}
