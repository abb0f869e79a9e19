//! # Margin Alert Dispatch
//!
//! Alerts are sent from a detached task so a slow or failing sink never
//! holds up the customer's edit. Failures are logged and dropped.
//!
//! ```text
//! refresh_cost_estimate ──► dispatch_margin_alert ──► tokio::spawn ──► AlertSink
//!         │                         │                                    │
//!         ▼                         ▼                                    ▼
//!   returns at once           AlertHandle (abort)              warn! on failure
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::providers::{AlertSink, MarginAlert};

/// Handle to an in-flight alert delivery.
#[derive(Debug)]
pub struct AlertHandle {
    alert_id: String,
    task: JoinHandle<()>,
}

impl AlertHandle {
    pub fn alert_id(&self) -> &str {
        &self.alert_id
    }

    /// Cancels delivery if it has not completed yet.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for delivery to finish (or to be cancelled).
    pub async fn wait(self) {
        if let Err(err) = self.task.await {
            if !err.is_cancelled() {
                warn!(alert_id = %self.alert_id, error = %err, "Margin alert task panicked");
            }
        }
    }
}

/// Sends `alert` to `sink` from a detached task.
pub fn dispatch_margin_alert(sink: Arc<dyn AlertSink>, alert: MarginAlert) -> AlertHandle {
    let alert_id = alert.alert_id.clone();
    let task = tokio::spawn(async move {
        let alert_id = alert.alert_id.clone();
        let order_id = alert.order_id.clone();
        match sink.notify_margin_alert(alert).await {
            Ok(()) => debug!(alert_id = %alert_id, order_id = %order_id, "Margin alert delivered"),
            Err(err) => warn!(
                alert_id = %alert_id,
                order_id = %order_id,
                error = %err,
                "Failed to deliver margin alert"
            ),
        }
    });

    AlertHandle { alert_id, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tillwise_core::{MarginVerdict, Money};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<MarginAlert>>,
    }

    #[async_trait]
    impl AlertSink for Recorder {
        async fn notify_margin_alert(&self, alert: MarginAlert) -> Result<(), ProviderError> {
            self.seen.lock().await.push(alert);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl AlertSink for Broken {
        async fn notify_margin_alert(&self, _alert: MarginAlert) -> Result<(), ProviderError> {
            Err(ProviderError::new("smtp down"))
        }
    }

    struct Slow;

    #[async_trait]
    impl AlertSink for Slow {
        async fn notify_margin_alert(&self, _alert: MarginAlert) -> Result<(), ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn alert() -> MarginAlert {
        MarginAlert {
            alert_id: "alert-1".into(),
            order_id: "ord-1".into(),
            store_id: "store-1".into(),
            verdict: MarginVerdict::Exceeded,
            estimate: Money::from_cents(1200),
            price: Money::from_cents(1000),
            subject: MarginAlert::subject_for(MarginVerdict::Exceeded, "ord-1"),
        }
    }

    #[tokio::test]
    async fn test_alert_is_delivered() {
        let sink = Arc::new(Recorder::default());
        let handle = dispatch_margin_alert(sink.clone(), alert());
        assert_eq!(handle.alert_id(), "alert-1");
        handle.wait().await;

        let seen = sink.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].order_id, "ord-1");
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let handle = dispatch_margin_alert(Arc::new(Broken), alert());
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_cancels_delivery() {
        let handle = dispatch_margin_alert(Arc::new(Slow), alert());
        handle.abort();
        tokio::task::yield_now().await;
        handle.wait().await;
    }
}
