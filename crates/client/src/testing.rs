//! In-process stand-ins for the network and the notification sink.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use offcache_core::push::PendingNotification;
use offcache_core::{Error, InterceptRequest, Response};
use url::Url;

use crate::fetch::Network;
use crate::notify::Notifier;

enum Reply {
    Serve(Response),
    Fail,
    Hang,
}

/// Scripted network: answers per URL, records every call.
#[derive(Default)]
pub(crate) struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(&self, url: &str, response: Response) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Serve(response));
    }

    pub(crate) fn serve_text(&self, url: &str, body: &str) {
        self.serve(url, Response::plain(200, body));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    pub(crate) fn hang(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Hang);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("{url}: offline")));
        }

        let hang = matches!(self.replies.lock().unwrap().get(&url), Some(Reply::Hang));
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return Err(Error::NetworkFailure(format!("{url}: never answered")));
        }

        match self.replies.lock().unwrap().get(&url) {
            Some(Reply::Serve(response)) => Ok(response.clone()),
            Some(Reply::Fail) | Some(Reply::Hang) => Err(Error::NetworkFailure(format!("{url}: connection refused"))),
            None => Ok(Response::plain(404, "Not Found")),
        }
    }
}

/// Notification sink that remembers what it was asked to do.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) shown: Mutex<Vec<PendingNotification>>,
    pub(crate) navigations: Mutex<Vec<Url>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &PendingNotification) -> Result<(), Error> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<(), Error> {
        self.navigations.lock().unwrap().push(url.clone());
        Ok(())
    }
}
