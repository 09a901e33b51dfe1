//! User-visible failure notifications.
//!
//! The cart store never returns errors from its notifying operations; it
//! hands the user-facing message to a [`Notifier`] and moves on.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Surfaces a failure message to the user. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify_error(&self, message: &str) {
        (**self).notify_error(message);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(target: "rocketshoes::notify", notification = message, "User notification");
    }
}

/// Broadcasts notifications to any number of UI subscribers.
///
/// Messages sent while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: broadcast::Sender<String>,
}

impl ChannelNotifier {
    /// Create a notifier buffering up to `capacity` messages per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every message sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify_error(&self, message: &str) {
        if self.sender.send(message.to_string()).is_err() {
            tracing::debug!(notification = message, "Notification dropped, no subscribers");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers_to_subscribers() {
        let notifier = ChannelNotifier::new(8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.notify_error("Error adding product");

        assert_eq!(first.recv().await.unwrap(), "Error adding product");
        assert_eq!(second.recv().await.unwrap(), "Error adding product");
    }

    #[test]
    fn test_notifiers_work_behind_arc() {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        notifier.notify_error("Requested quantity is out of stock");

        let channel = Arc::new(ChannelNotifier::new(1));
        let mut rx = channel.subscribe();
        Arc::clone(&channel).notify_error("Error changing product quantity");
        assert_eq!(rx.try_recv().unwrap(), "Error changing product quantity");
    }

    #[test]
    fn test_channel_notifier_without_subscribers_does_not_panic() {
        let notifier = ChannelNotifier::new(0);
        notifier.notify_error("Error removing product");
    }
}
