//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use offcache_client::{Network, Notifier, Worker};
use offcache_core::push::PendingNotification;
use offcache_core::{AppConfig, Error, InterceptRequest, Response, StoreRegistry};
use rmcp::model::CallToolResult;
use url::Url;

pub(crate) const ORIGIN: &str = "https://app.example";

/// Serves fixed bodies by URL; unknown URLs fail like a dropped connection.
#[derive(Default)]
pub(crate) struct FixedNetwork {
    pages: Mutex<HashMap<String, Response>>,
}

impl FixedNetwork {
    pub(crate) fn serve(&self, path: &str, body: &str) {
        let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
        self.pages.lock().unwrap().insert(url.to_string(), Response::plain(200, body));
    }

    pub(crate) fn clear(&self) {
        self.pages.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl Network for FixedNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<Response, Error> {
        self.pages
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::NetworkFailure(format!("{}: unreachable", request.url)))
    }
}

#[derive(Default)]
pub(crate) struct NullNotifier {
    pub(crate) navigations: Mutex<Vec<Url>>,
}

#[async_trait::async_trait]
impl Notifier for NullNotifier {
    async fn show(&self, _notification: &PendingNotification) -> Result<(), Error> {
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<(), Error> {
        self.navigations.lock().unwrap().push(url.clone());
        Ok(())
    }
}

pub(crate) fn config() -> AppConfig {
    AppConfig {
        app_id: "app".into(),
        generation: 1,
        origin: ORIGIN.into(),
        static_manifest: vec!["/".into(), "/styles.css".into(), "/offline.html".into()],
        revalidate_on_hit: false,
        ..Default::default()
    }
}

/// A worker whose manifest is reachable but not yet deployed.
pub(crate) async fn worker() -> (Arc<Worker>, Arc<FixedNetwork>) {
    let network = Arc::new(FixedNetwork::default());
    network.serve("/", "root");
    network.serve("/styles.css", "body {}");
    network.serve("/offline.html", "offline");

    let registry = StoreRegistry::open_in_memory().await.unwrap();
    let worker = Worker::new(config(), registry, network.clone(), Arc::new(NullNotifier::default())).unwrap();
    (Arc::new(worker), network)
}

/// A worker with generation 1 active.
pub(crate) async fn deployed_worker() -> (Arc<Worker>, Arc<FixedNetwork>) {
    let (worker, network) = worker().await;
    worker.start().await.unwrap();
    (worker, network)
}

/// Decode the JSON text content of a tool result.
pub(crate) fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
