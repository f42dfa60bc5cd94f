//! Notification sink for the stdio server.
//!
//! There is no display attached, so notifications and navigations are
//! recorded as structured log events.

use offcache_client::Notifier;
use offcache_core::Error;
use offcache_core::push::PendingNotification;
use url::Url;

pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &PendingNotification) -> Result<(), Error> {
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            url = %notification.url,
            tag = %notification.tag,
            ?actions,
            "notification"
        );
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "navigate");
        Ok(())
    }
}
