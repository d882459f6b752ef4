//! One end-to-end sync run.
//!
//! Load prior state, pick full or incremental mode, fetch from the registry,
//! merge, enrich the affected subset, recompute derived fields, persist.
//! Nothing is written until the very end, so a failed run leaves the previous
//! snapshot in place.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{apply_computed_fields, ServerRecord, SyncConfig, SyncState};
use crate::enrichers::EnricherContext;
use crate::registry::ServerEntry;
use crate::repository::{SnapshotRepository, SyncStateRepository};
use crate::service::enrichment_coordinator::EnrichmentCoordinator;
use crate::service::registry_api_client::RegistryApiClient;
use crate::service::resilient_fetch::HttpFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    /// Only entries updated at or after `since`
    Incremental { since: DateTime<Utc> },
}

impl SyncMode {
    pub fn is_full(&self) -> bool {
        matches!(self, SyncMode::Full)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Full => f.write_str("full"),
            SyncMode::Incremental { since } => write!(f, "incremental since {}", since),
        }
    }
}

/// Full when forced, on first run, or once the last full sync is too old.
pub fn decide_mode(config: &SyncConfig, state: Option<&SyncState>, now: DateTime<Utc>) -> SyncMode {
    if config.force_full {
        return SyncMode::Full;
    }
    match state {
        None => SyncMode::Full,
        Some(state) if now - state.last_full_sync_at > config.full_sync_interval => SyncMode::Full,
        Some(state) => SyncMode::Incremental {
            since: state.last_sync_at,
        },
    }
}

/// What [`merge_entries`] did to the collection
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub upserted: usize,
    pub deleted: usize,
    /// Names of records upserted by this merge
    pub touched: BTreeSet<String>,
}

/// Fold fetched entries into the name-keyed collection.
///
/// Registry fields are replaced wholesale, prior enrichment is carried over
/// and `deleted` entries drop the record entirely.
pub fn merge_entries(
    collection: &mut BTreeMap<String, ServerRecord>,
    entries: Vec<ServerEntry>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for entry in entries {
        let mut record = entry.into_record();

        if record.is_deleted() {
            if collection.remove(&record.name).is_some() {
                debug!(name = %record.name, "[Sync] Removing deleted server");
                outcome.deleted += 1;
            }
            outcome.touched.remove(&record.name);
            continue;
        }

        if let Some(previous) = collection.remove(&record.name) {
            record.enrichment = previous.enrichment;
        }
        outcome.touched.insert(record.name.clone());
        outcome.upserted += 1;
        collection.insert(record.name.clone(), record);
    }

    outcome
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub fetched: usize,
    pub upserted: usize,
    pub deleted: usize,
    pub enriched: usize,
    pub skipped_fresh: usize,
    pub total: usize,
}

pub struct SyncOrchestrator {
    config: SyncConfig,
    registry: RegistryApiClient,
    coordinator: EnrichmentCoordinator,
    snapshots: Arc<dyn SnapshotRepository>,
    sync_state: Arc<dyn SyncStateRepository>,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        registry: RegistryApiClient,
        coordinator: EnrichmentCoordinator,
        snapshots: Arc<dyn SnapshotRepository>,
        sync_state: Arc<dyn SyncStateRepository>,
    ) -> Self {
        Self {
            config,
            registry,
            coordinator,
            snapshots,
            sync_state,
        }
    }

    /// Wire the registry client and the built-in enrichers from `config`.
    pub fn from_config(
        config: SyncConfig,
        snapshots: Arc<dyn SnapshotRepository>,
        sync_state: Arc<dyn SyncStateRepository>,
    ) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.retry).context("Failed to build HTTP client")?;
        let registry = RegistryApiClient::new(config.registry_url.clone(), fetcher.clone())
            .with_page_size(config.page_size)
            .with_page_delay(config.page_delay);
        let coordinator = EnrichmentCoordinator::with_default_enrichers(EnricherContext::new(
            fetcher,
            config.endpoints.clone(),
            config.credentials.clone(),
        ));

        Ok(Self::new(config, registry, coordinator, snapshots, sync_state))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync. Any error aborts before anything is persisted.
    pub async fn run(&self) -> Result<SyncReport> {
        let started_at = Utc::now();

        let prior = self
            .snapshots
            .load()
            .await
            .context("Failed to load snapshot")?;
        let previous_state = self
            .sync_state
            .load()
            .await
            .context("Failed to load sync state")?;
        info!(
            "[Sync] Loaded {} servers from snapshot (last sync: {})",
            prior.len(),
            previous_state
                .as_ref()
                .map(|s| s.last_sync_at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );

        let mode = decide_mode(&self.config, previous_state.as_ref(), started_at);
        info!("[Sync] Starting {} sync", mode);

        let entries = match mode {
            SyncMode::Full => self.registry.fetch_all_servers().await,
            SyncMode::Incremental { since } => self.registry.fetch_updated_servers(since).await,
        }
        .context("Failed to fetch servers from registry")?;
        let fetched = entries.len();

        let mut collection: BTreeMap<String, ServerRecord> =
            prior.into_iter().map(|r| (r.name.clone(), r)).collect();
        let merge = merge_entries(&mut collection, entries);
        info!(
            "[Sync] Merged {} entries: {} upserted, {} deleted",
            fetched, merge.upserted, merge.deleted
        );

        let subset: Vec<ServerRecord> = if mode.is_full() {
            std::mem::take(&mut collection).into_values().collect()
        } else {
            merge
                .touched
                .iter()
                .filter_map(|name| collection.remove(name))
                .collect()
        };
        let (enriched, stats) = self
            .coordinator
            .enrich_many(subset, &self.config.enrich)
            .await;
        for record in enriched {
            collection.insert(record.name.clone(), record);
        }

        apply_computed_fields(collection.values_mut());
        // BTreeMap iteration is already sorted by name
        let records: Vec<ServerRecord> = collection.into_values().collect();

        self.snapshots
            .save(&records)
            .await
            .context("Failed to save snapshot")?;
        let state = SyncState::after_run(
            previous_state.as_ref(),
            started_at,
            mode.is_full(),
            records.len(),
        );
        self.sync_state
            .save(&state)
            .await
            .context("Failed to save sync state")?;

        let report = SyncReport {
            mode,
            fetched,
            upserted: merge.upserted,
            deleted: merge.deleted,
            enriched: stats.enriched,
            skipped_fresh: stats.skipped_fresh,
            total: records.len(),
        };
        info!(
            "[Sync] Finished {} sync: {} fetched, {} enriched, {} fresh, {} total",
            report.mode, report.fetched, report.enriched, report.skipped_fresh, report.total
        );
        Ok(report)
    }
}
