//! Generation lifecycle: Installing → Activating → Active.
//!
//! ### Install
//! Every manifest asset is fetched before anything is written. Only when all
//! of them succeed is the static store populated, in a single transaction.
//! Any failure discards the new static store and leaves the active
//! generation untouched.
//!
//! ### Activate
//! Runs under the state write lock: stores not owned by the new generation
//! are deleted, the dynamic store is trimmed to its ceiling, and only then
//! is the generation pointer swapped. Requests hold the read lock for the
//! whole strategy, so each one is served entirely by one generation.

use std::sync::Arc;
use std::time::Duration;

use offcache_core::{AppConfig, ConfigError, Error, Generation, InterceptRequest, RequestIdentity, Response, StoreRegistry};
use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No generation has finished activating yet, or one is being installed.
    Installing,
    /// Old stores are being deleted and the dynamic store trimmed.
    Activating,
    /// Steady state; requests use `active`.
    Active,
}

/// The only mutable state shared by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryState {
    pub phase: Phase,
    /// Generation requests are routed to.
    pub active: Option<Generation>,
    /// Generation whose static store is populated and waiting to activate.
    pub installed: Option<Generation>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self { phase: Phase::Installing, active: None, installed: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub generation: Generation,
    pub assets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub generation: Generation,
    pub deleted_stores: Vec<String>,
    pub evicted: u64,
}

pub struct LifecycleController {
    registry: StoreRegistry,
    network: Arc<dyn Network>,
    manifest: Vec<Url>,
    max_dynamic_entries: usize,
    timeout: Duration,
    state: RwLock<RegistryState>,
}

impl LifecycleController {
    pub fn new(
        registry: StoreRegistry, network: Arc<dyn Network>, manifest: Vec<Url>, max_dynamic_entries: usize,
        timeout: Duration,
    ) -> Self {
        Self { registry, network, manifest, max_dynamic_entries, timeout, state: RwLock::new(RegistryState::default()) }
    }

    /// Build from configuration, resolving manifest paths against the origin.
    pub fn from_config(
        registry: StoreRegistry, network: Arc<dyn Network>, config: &AppConfig,
    ) -> Result<Self, ConfigError> {
        let manifest = config
            .static_manifest
            .iter()
            .map(|path| config.resolve(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(registry, network, manifest, config.max_dynamic_entries, config.timeout()))
    }

    /// Shared view of the state. Holding it delays activation.
    pub async fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().await
    }

    /// Snapshot of the current state.
    pub async fn snapshot(&self) -> RegistryState {
        self.state.read().await.clone()
    }

    /// Newest generation of `app_id` that still has a store in the registry.
    pub async fn newest_generation(&self, app_id: &str) -> Result<Option<Generation>, Error> {
        let names = self.registry.store_names().await?;
        Ok(names
            .iter()
            .filter_map(|name| Generation::parse_store_name(name))
            .filter(|generation| generation.app_id == app_id)
            .max_by_key(|generation| generation.number))
    }

    /// Adopt `generation` after a restart if its static store survived intact.
    ///
    /// Goes through the same cleanup and trim as [`activate`](Self::activate)
    /// before the pointer moves. Returns `None` when the static store is
    /// missing or incomplete.
    pub async fn restore(&self, generation: &Generation) -> Result<Option<ActivationReport>, Error> {
        let names = self.registry.store_names().await?;
        if !names.contains(&generation.static_store()) {
            return Ok(None);
        }

        let count = self.registry.count(&generation.static_store()).await?;
        if count < self.manifest.len() {
            tracing::info!(%generation, count, expected = self.manifest.len(), "static store incomplete, not restoring");
            return Ok(None);
        }

        let mut state = self.state.write().await;
        let report = self.claim(&mut state, generation.clone()).await?;
        tracing::info!(%generation, "restored active generation");
        Ok(Some(report))
    }

    /// Populate `generation`'s static store from the manifest, all or nothing.
    pub async fn install(&self, generation: Generation) -> Result<InstallReport, Error> {
        {
            let mut state = self.state.write().await;
            if let Some(active) = &state.active
                && active.app_id == generation.app_id
                && generation.number <= active.number
            {
                return Err(Error::InvalidInput(format!(
                    "generation {} is not newer than active generation {}",
                    generation.number, active.number
                )));
            }
            state.phase = Phase::Installing;
        }

        tracing::info!(%generation, assets = self.manifest.len(), "installing");
        let store = generation.static_store();

        let result = match self.fetch_manifest().await {
            Ok(entries) => self
                .registry
                .populate(&store, entries)
                .await
                .map_err(|e| Error::InstallPopulationFailure(format!("static store write failed: {e}"))),
            Err(e) => Err(e),
        };

        let mut state = self.state.write().await;
        if state.active.is_some() {
            state.phase = Phase::Active;
        }
        match result {
            Ok(assets) => {
                state.installed = Some(generation.clone());
                tracing::info!(%generation, assets, "installed");
                Ok(InstallReport { generation, assets })
            }
            Err(e) => {
                if let Err(cleanup) = self.registry.delete_store(&store).await {
                    tracing::warn!(%store, "failed to discard partial static store: {cleanup}");
                }
                // A previous install of this generation lost its store above.
                if state.installed.as_ref() == Some(&generation) {
                    state.installed = None;
                }
                tracing::warn!(%generation, "install failed, keeping previous generation: {e}");
                Err(e)
            }
        }
    }

    /// Switch to the installed generation.
    ///
    /// Holds the state write lock from the first deletion until the pointer
    /// swap, so no request can observe a half-migrated registry.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut state = self.state.write().await;
        let Some(generation) = state.installed.clone() else {
            return Err(Error::ActivationFailed("no installed generation".into()));
        };
        self.claim(&mut state, generation).await
    }

    /// Retire every other store, trim the dynamic store, then swap the pointer.
    ///
    /// The caller holds the write lock for the whole call.
    async fn claim(&self, state: &mut RegistryState, generation: Generation) -> Result<ActivationReport, Error> {
        let previous_phase = state.phase;
        state.phase = Phase::Activating;
        tracing::info!(%generation, "activating");

        match self.retire_and_trim(&generation).await {
            Ok((deleted_stores, evicted)) => {
                state.active = Some(generation.clone());
                state.installed = None;
                state.phase = Phase::Active;
                tracing::info!(
                    %generation,
                    deleted = deleted_stores.len(),
                    evicted,
                    "activated, clients claimed"
                );
                Ok(ActivationReport { generation, deleted_stores, evicted })
            }
            Err(e) => {
                state.phase = if state.active.is_some() { Phase::Active } else { previous_phase };
                tracing::warn!(%generation, "activation failed: {e}");
                Err(Error::ActivationFailed(e.to_string()))
            }
        }
    }

    async fn retire_and_trim(&self, generation: &Generation) -> Result<(Vec<String>, u64), Error> {
        let mut deleted = Vec::new();
        for name in self.registry.store_names().await? {
            if !generation.owns(&name) {
                self.registry.delete_store(&name).await?;
                tracing::debug!(store = %name, "deleted stale store");
                deleted.push(name);
            }
        }

        let dynamic = generation.dynamic_store();
        self.registry.open_store(&dynamic).await?;
        let evicted = self.registry.enforce_limit(&dynamic, self.max_dynamic_entries).await?;
        Ok((deleted, evicted))
    }

    /// Fetch every manifest asset concurrently, preserving manifest order.
    async fn fetch_manifest(&self) -> Result<Vec<(RequestIdentity, Response)>, Error> {
        let mut tasks = JoinSet::new();
        for (index, url) in self.manifest.iter().enumerate() {
            let network = Arc::clone(&self.network);
            let request = InterceptRequest::get(url.clone());
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = match tokio::time::timeout(timeout, network.fetch(&request)).await {
                    Ok(Ok(response)) if response.is_success() => Ok(response),
                    Ok(Ok(response)) => Err(format!("{}: status {}", request.url, response.status)),
                    Ok(Err(e)) => Err(format!("{}: {e}", request.url)),
                    Err(_) => Err(format!("{}: timed out", request.url)),
                };
                (index, request, result)
            });
        }

        let mut fetched: Vec<Option<(RequestIdentity, Response)>> = vec![None; self.manifest.len()];
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, request, Ok(response))) => fetched[index] = Some((request.identity(), response)),
                Ok((_, _, Err(reason))) => failures.push(reason),
                Err(e) => failures.push(format!("fetch task failed: {e}")),
            }
        }

        if !failures.is_empty() {
            failures.sort();
            return Err(Error::InstallPopulationFailure(failures.join("; ")));
        }

        Ok(fetched.into_iter().flatten().collect())
    }
}
