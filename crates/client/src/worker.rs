//! Event scheduler for the request-cache layer.
//!
//! Every unit of work arrives as a [`WorkerEvent`] and may run concurrently
//! with any other. The only ordering guarantee is the activation barrier:
//! an intercepted request reads the generation pointer under a shared lock
//! held for its whole strategy, and activation takes the exclusive lock, so
//! activation waits for in-flight requests and later requests see the new
//! generation.

use std::sync::Arc;

use offcache_core::push::PendingNotification;
use offcache_core::{
    AppConfig, ConfigError, Error, Generation, InterceptRequest, RouteTable, Served, StoreRegistry,
};
use tokio::task::JoinHandle;
use url::Url;

use crate::fallback::FallbackResolver;
use crate::fetch::{Network, is_fetchable};
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleController, RegistryState};
use crate::notify::{NotificationDispatcher, Notifier};
use crate::strategy::{StrategyExecutor, StrategyOptions};

/// The closed set of things the layer reacts to.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install(Generation),
    Activate,
    Intercept(InterceptRequest),
    /// Raw push message bytes.
    Push(Vec<u8>),
    NotificationAction { action: String, notification: PendingNotification },
}

#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Served(Served),
    /// The notification shown, if the payload was usable.
    Notified(Option<PendingNotification>),
    /// The URL navigated to, if the action opened one.
    Navigated(Option<Url>),
}

pub struct Worker {
    config: AppConfig,
    registry: StoreRegistry,
    routes: RouteTable,
    strategy: StrategyExecutor,
    lifecycle: LifecycleController,
    notifications: NotificationDispatcher,
}

impl Worker {
    pub fn new(
        config: AppConfig, registry: StoreRegistry, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        let routes = config.route_table()?;
        let fallback = FallbackResolver::from_config(registry.clone(), &config)?;
        let strategy =
            StrategyExecutor::new(registry.clone(), Arc::clone(&network), fallback, StrategyOptions::from(&config));
        let lifecycle = LifecycleController::from_config(registry.clone(), network, &config)?;
        let notifications = NotificationDispatcher::new(notifier, config.origin_url()?);

        Ok(Self { config, registry, routes, strategy, lifecycle, notifications })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> RegistryState {
        self.lifecycle.snapshot().await
    }

    /// Generation requests are currently routed to.
    pub async fn active_generation(&self) -> Option<Generation> {
        self.lifecycle.snapshot().await.active
    }

    /// Route one event to its handler.
    pub async fn handle(&self, event: WorkerEvent) -> Result<WorkerOutcome, Error> {
        match event {
            WorkerEvent::Install(generation) => self.install(generation).await.map(WorkerOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(WorkerOutcome::Activated),
            WorkerEvent::Intercept(request) => Ok(WorkerOutcome::Served(self.intercept(request).await)),
            WorkerEvent::Push(data) => Ok(WorkerOutcome::Notified(self.push(&data).await)),
            WorkerEvent::NotificationAction { action, notification } => {
                Ok(WorkerOutcome::Navigated(self.notification_action(&action, &notification).await))
            }
        }
    }

    /// Handle `event` on its own task.
    pub fn spawn(self: &Arc<Self>, event: WorkerEvent) -> JoinHandle<Result<WorkerOutcome, Error>> {
        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.handle(event).await })
    }

    pub async fn install(&self, generation: Generation) -> Result<InstallReport, Error> {
        self.lifecycle.install(generation).await
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.activate().await
    }

    /// Install and immediately activate, without waiting for clients to go idle.
    pub async fn deploy(&self, generation: Generation) -> Result<ActivationReport, Error> {
        self.install(generation).await?;
        self.activate().await
    }

    /// Bring the layer up after a restart.
    ///
    /// Generations never move backwards. The newest generation found in the
    /// registry is adopted when it is at least the configured one and its
    /// static store is complete; otherwise a generation past both is deployed.
    pub async fn start(&self) -> Result<Generation, Error> {
        let configured = self.config.current_generation();
        let newest = self
            .lifecycle
            .newest_generation(&configured.app_id)
            .await?
            .filter(|found| found.number >= configured.number);

        let candidate = newest.clone().unwrap_or_else(|| configured.clone());
        if self.lifecycle.restore(&candidate).await?.is_some() {
            return Ok(candidate);
        }

        let target = match newest {
            Some(found) => Generation::new(found.app_id, found.number.saturating_add(1)),
            None => configured,
        };
        self.deploy(target.clone()).await?;
        Ok(target)
    }

    /// Serve one request. Never fails; the worst case is a synthetic response.
    pub async fn intercept(&self, request: InterceptRequest) -> Served {
        if !is_fetchable(&request.url) {
            tracing::debug!(url = %request.url, "non-fetchable scheme, passing through");
            return self.strategy.passthrough(&request, None).await;
        }

        let state = self.lifecycle.read_state().await;
        let Some(generation) = state.active.as_ref() else {
            tracing::debug!(url = %request.url, "no active generation, passing through");
            return self.strategy.passthrough(&request, None).await;
        };

        if !request.is_safe_method() {
            tracing::debug!(method = %request.method, url = %request.url, "mutating request bypasses cache");
            return self.strategy.passthrough(&request, Some(generation)).await;
        }

        let class = self.routes.classify(&request);
        tracing::debug!(url = %request.url, ?class, %generation, "intercepted");
        self.strategy.execute(&request, class, generation).await
    }

    /// Trim the active dynamic store to `max_entries`, or to the configured ceiling.
    ///
    /// Returns the store name and how many entries were removed.
    pub async fn purge(&self, max_entries: Option<usize>) -> Result<(String, u64), Error> {
        let state = self.lifecycle.read_state().await;
        let Some(generation) = state.active.as_ref() else {
            return Err(Error::CacheMiss("no active generation".into()));
        };

        let store = generation.dynamic_store();
        let max = max_entries.unwrap_or(self.config.max_dynamic_entries);
        let removed = self.registry.enforce_limit(&store, max).await?;
        tracing::info!(%store, max, removed, "purged dynamic store");
        Ok((store, removed))
    }

    pub async fn push(&self, data: &[u8]) -> Option<PendingNotification> {
        self.notifications.dispatch(data).await
    }

    pub async fn notification_action(&self, action: &str, notification: &PendingNotification) -> Option<Url> {
        self.notifications.handle_action(action, notification).await
    }
}
