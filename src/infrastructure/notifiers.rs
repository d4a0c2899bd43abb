//! Notifier port implementations.

use crate::domain::errors::NotifyError;
use crate::domain::market::Alert;
use crate::domain::ports::Notifier;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Writes every alert to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        warn!(
            alert_id = %alert.id,
            kind = %alert.deviation_kind,
            "ALERT: {}",
            alert
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Hands alerts to an external transport over a bounded channel.
///
/// Never waits on the receiver: a full channel is reported as a failure so a
/// slow consumer cannot stall the monitoring cycle.
pub struct ChannelNotifier {
    sender: mpsc::Sender<Alert>,
    capacity: usize,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                capacity: capacity.max(1),
            },
            receiver,
        )
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.sender.try_send(alert.clone()).map_err(|e| match e {
            TrySendError::Full(_) => NotifyError::ChannelFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => NotifyError::ChannelClosed,
        })
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Serializes each alert from a `ChannelNotifier` receiver and passes the
/// JSON line to `sink`. Returns once every sender is gone and the queue is
/// drained, with the number of alerts forwarded.
pub async fn forward_json_lines(
    mut receiver: mpsc::Receiver<Alert>,
    mut sink: impl FnMut(String),
) -> usize {
    let mut forwarded = 0;
    while let Some(alert) = receiver.recv().await {
        match serde_json::to_string(&alert) {
            Ok(json) => {
                sink(json);
                forwarded += 1;
            }
            Err(e) => warn!("Failed to serialize alert {}: {}", alert.id, e),
        }
    }
    forwarded
}

/// Broadcasts each alert to every registered notifier.
///
/// All notifiers are attempted; the first failure is returned after the
/// others have had their turn.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierRegistry {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(alert).await {
                warn!("Notifier {} failed: {}", notifier.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "registry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::DeviationKind;
    use chrono::Utc;

    fn alert() -> Alert {
        Alert::new(DeviationKind::BelowThreshold, Utc::now(), 97.0, None, 98.57)
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new(4);
        let sent = alert();
        notifier.notify(&sent).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, sent.id);
    }

    #[tokio::test]
    async fn test_channel_notifier_full_and_closed() {
        let (notifier, rx) = ChannelNotifier::new(1);
        notifier.notify(&alert()).await.unwrap();
        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotifyError::ChannelFull { capacity: 1 })
        ));

        drop(rx);
        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotifyError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_forwarder_drains_queue_after_senders_drop() {
        let (channel, rx) = ChannelNotifier::new(8);
        let mut registry = NotifierRegistry::new();
        registry.register(Arc::new(channel));

        let first = alert();
        let second = alert();
        registry.notify(&first).await.unwrap();
        registry.notify(&second).await.unwrap();
        drop(registry);

        let mut lines = Vec::new();
        let forwarded = forward_json_lines(rx, |line| lines.push(line)).await;

        assert_eq!(forwarded, 2);
        assert!(lines[0].contains(&first.id.to_string()));
        assert!(lines[1].contains(&second.id.to_string()));
    }

    #[tokio::test]
    async fn test_registry_reaches_every_notifier() {
        let (closed, rx) = ChannelNotifier::new(1);
        drop(rx);
        let (open, mut open_rx) = ChannelNotifier::new(1);

        let mut registry = NotifierRegistry::new();
        registry.register(Arc::new(LogNotifier));
        registry.register(Arc::new(closed));
        registry.register(Arc::new(open));
        assert_eq!(registry.len(), 3);

        let result = registry.notify(&alert()).await;
        assert!(matches!(result, Err(NotifyError::ChannelClosed)));
        // The failing notifier did not stop delivery to the next one
        assert!(open_rx.try_recv().is_ok());
    }
}
