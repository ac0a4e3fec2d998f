use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

/// Delivery seam for notifications. Implementations may block.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &str) -> anyhow::Result<()>;
}

/// Stands in for a slow external channel: waits `delay`, then logs.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedNotifier {
    delay: Duration,
}

impl SimulatedNotifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Notifier for SimulatedNotifier {
    fn send(&self, message: &str) -> anyhow::Result<()> {
        thread::sleep(self.delay);
        info!(message, delay_ms = self.delay.as_millis() as u64, "notification sent");
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationWorker {
    notifier: Arc<dyn Notifier>,
}

impl NotificationWorker {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn run(&self, message: &str) -> anyhow::Result<()> {
        self.notifier
            .send(message)
            .with_context(|| format!("failed to send notification `{message}`"))
    }
}
