//! Message-delivery capability and broadcast fan-out.
//!
//! The surrounding transport implements [`Notifier`]; the core only ever
//! asks it to deliver a line of text to a user. Delivery can fail (the
//! user blocked the channel); per-recipient failures are swallowed and
//! counted, never propagated into the operation that triggered the
//! notification.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use dragonfruit_core::UserId;

/// Errors a [`Notifier`] may report for a single recipient.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The recipient cannot be reached (e.g., blocked the channel).
    #[error("recipient {0} unreachable")]
    Unreachable(UserId),

    /// The transport itself failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// "Deliver a message to a user" capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `user`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message could not be delivered to
    /// this recipient.
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError>;
}

/// Outcome of a broadcast: how many recipients were reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `text` to every recipient, swallowing per-recipient failures.
///
/// Failures are logged and counted in the returned report; the broadcast
/// itself never fails.
pub async fn broadcast(
    notifier: &dyn Notifier,
    recipients: &[UserId],
    text: &str,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for user in recipients {
        match notifier.notify(*user, text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "broadcast delivery failed");
                report.failed += 1;
            }
        }
    }
    report
}

/// In-memory [`Notifier`] for development and testing.
///
/// Records every delivered message and can be told to treat specific users
/// as unreachable.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
    unreachable: Mutex<HashSet<UserId>>,
}

impl RecordingNotifier {
    /// Create a notifier that delivers to everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as unreachable; deliveries to them will fail.
    pub fn set_unreachable(&self, user: UserId) {
        if let Ok(mut unreachable) = self.unreachable.lock() {
            unreachable.insert(user);
        }
    }

    /// All messages delivered so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to one user, in order.
    #[must_use]
    pub fn sent_to(&self, user: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        let unreachable = self
            .unreachable
            .lock()
            .map(|u| u.contains(&user))
            .unwrap_or(false);
        if unreachable {
            return Err(NotifyError::Unreachable(user));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((user, text.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_counts_failures() {
        let notifier = RecordingNotifier::new();
        notifier.set_unreachable(UserId::new(2));

        let report = broadcast(
            &notifier,
            &[UserId::new(1), UserId::new(2), UserId::new(3)],
            "new order",
        )
        .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(notifier.sent_to(UserId::new(1)), vec!["new order"]);
        assert!(notifier.sent_to(UserId::new(2)).is_empty());
    }
}
