//! Push notification dispatch.
//!
//! Decodes a push payload, raises a notification through a [`Notifier`],
//! and turns the user's action choice into a navigation. Bad payloads and
//! sink failures are logged and swallowed; a push must never take the
//! layer down.

use std::sync::Arc;

use offcache_core::Error;
use offcache_core::push::{ACTION_CLOSE, ACTION_OPEN, PendingNotification, decode_payload};
use url::Url;

/// The platform side: shows notifications and opens windows.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Display a notification.
    async fn show(&self, notification: &PendingNotification) -> Result<(), Error>;

    /// Focus or open a client at `url`.
    async fn navigate(&self, url: &Url) -> Result<(), Error>;
}

/// What the user did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// The `open` button, or a click on the notification body.
    Open,
    Close,
    Other(String),
}

impl UserAction {
    pub fn parse(action: &str) -> Self {
        match action.trim() {
            "" | ACTION_OPEN => UserAction::Open,
            ACTION_CLOSE => UserAction::Close,
            other => UserAction::Other(other.to_string()),
        }
    }
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    origin: Url,
}

impl NotificationDispatcher {
    /// `origin` resolves relative target URLs in payloads.
    pub fn new(notifier: Arc<dyn Notifier>, origin: Url) -> Self {
        Self { notifier, origin }
    }

    /// Decode `data` and show the resulting notification.
    ///
    /// Returns the notification that was shown, or `None` if the payload
    /// was malformed or the notifier refused it.
    pub async fn dispatch(&self, data: &[u8]) -> Option<PendingNotification> {
        let payload = match decode_payload(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(bytes = data.len(), "ignoring push: {e}");
                return None;
            }
        };

        let notification = PendingNotification::from_payload(payload);
        match self.notifier.show(&notification).await {
            Ok(()) => {
                tracing::info!(title = %notification.title, url = %notification.url, "notification shown");
                Some(notification)
            }
            Err(e) => {
                tracing::warn!(title = %notification.title, "notification could not be shown: {e}");
                None
            }
        }
    }

    /// React to an action chosen on `notification`.
    ///
    /// Returns the URL navigated to, if any.
    pub async fn handle_action(&self, action: &str, notification: &PendingNotification) -> Option<Url> {
        match UserAction::parse(action) {
            UserAction::Open => {
                let target = match self.origin.join(&notification.url) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(url = %notification.url, "bad notification target, opening root: {e}");
                        self.origin.clone()
                    }
                };
                if let Err(e) = self.notifier.navigate(&target).await {
                    tracing::warn!(url = %target, "navigation failed: {e}");
                    return None;
                }
                Some(target)
            }
            UserAction::Close => None,
            UserAction::Other(action) => {
                tracing::debug!(%action, "no handler for notification action");
                None
            }
        }
    }
}
