//! "A place to send a reply" capability for the checkout dialogue.
//!
//! A user action arrives either as a button press (callback-originated,
//! where the transport can edit the message the button was attached to) or
//! as a plain text message (message-originated, where it can only send a
//! new message). The dialogue doesn't care which: it writes prompts through
//! a [`ReplySink`] and lets the variant decide whether "edit or reply"
//! means an edit or a fresh message.

use std::sync::Arc;

use async_trait::async_trait;

use dragonfruit_core::UserId;

use crate::notify::{Notifier, NotifyError};

/// Somewhere a reply to the acting user can be sent.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send a new message.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the reply could not be delivered.
    async fn reply(&self, text: &str) -> Result<(), NotifyError>;

    /// Edit the originating message if the transport supports it,
    /// otherwise send a new one.
    ///
    /// The default falls back to [`reply`](ReplySink::reply);
    /// callback-originated sinks override it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the reply could not be delivered.
    async fn edit_or_reply(&self, text: &str) -> Result<(), NotifyError> {
        self.reply(text).await
    }
}

/// A [`ReplySink`] that delivers replies through the plain [`Notifier`]
/// capability.
///
/// Suitable for message-originated actions and for transports without an
/// edit primitive; `edit_or_reply` falls back to sending a new message.
pub struct NotifierReply {
    notifier: Arc<dyn Notifier>,
    user: UserId,
}

impl NotifierReply {
    /// Create a sink replying to `user` through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, user: UserId) -> Self {
        Self { notifier, user }
    }
}

#[async_trait]
impl ReplySink for NotifierReply {
    async fn reply(&self, text: &str) -> Result<(), NotifyError> {
        self.notifier.notify(self.user, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    #[tokio::test]
    async fn test_notifier_reply_delivers_to_user() {
        let notifier = Arc::new(RecordingNotifier::new());
        let sink = NotifierReply::new(notifier.clone(), UserId::new(5));

        sink.reply("hello").await.expect("delivers");
        sink.edit_or_reply("again").await.expect("falls back to reply");

        assert_eq!(notifier.sent_to(UserId::new(5)), vec!["hello", "again"]);
    }
}
