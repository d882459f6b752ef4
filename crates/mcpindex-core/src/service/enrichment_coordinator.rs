//! Enrichment coordinator.
//!
//! Runs the registered enrichers over server records. Per record, sources run
//! one after another with a pause between calls; across records, a bounded
//! pool of workers pulls from a shared queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{EnrichOptions, Enrichment, ServerRecord, SourceKind};
use crate::enrichers::{default_enrichers, Enricher, EnricherContext};

/// Counts from one [`EnrichmentCoordinator::enrich_many`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub enriched: usize,
    pub skipped_fresh: usize,
}

pub struct EnrichmentCoordinator {
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl EnrichmentCoordinator {
    pub fn new(enrichers: Vec<Arc<dyn Enricher>>) -> Self {
        Self { enrichers }
    }

    /// Coordinator over every built-in source
    pub fn with_default_enrichers(ctx: EnricherContext) -> Self {
        Self::new(default_enrichers(ctx))
    }

    pub fn enrichers(&self) -> &[Arc<dyn Enricher>] {
        &self.enrichers
    }

    /// Enrich a single record, or return it untouched if still fresh.
    pub async fn enrich_one(&self, record: ServerRecord, options: &EnrichOptions) -> ServerRecord {
        if is_fresh(&record, options, Utc::now()) {
            debug!(name = %record.name, "[Enrich] Still fresh, skipping");
            return record;
        }
        self.run_pipeline(record, options).await
    }

    /// Enrich many records with at most `options.concurrency` in flight.
    ///
    /// Output order matches input order.
    pub async fn enrich_many(
        &self,
        records: Vec<ServerRecord>,
        options: &EnrichOptions,
    ) -> (Vec<ServerRecord>, EnrichmentStats) {
        let now = Utc::now();
        let total = records.len();
        let mut stats = EnrichmentStats::default();
        let mut slots: Vec<Option<ServerRecord>> = Vec::with_capacity(total);
        let mut pending = VecDeque::new();

        for (idx, record) in records.into_iter().enumerate() {
            if is_fresh(&record, options, now) {
                stats.skipped_fresh += 1;
                slots.push(Some(record));
            } else {
                slots.push(None);
                pending.push_back((idx, record));
            }
        }

        let queued = pending.len();
        if queued == 0 {
            info!("[Enrich] All {} servers are fresh, nothing to do", total);
            return (slots.into_iter().flatten().collect(), stats);
        }

        let workers = options.concurrency.max(1).min(queued);
        info!(
            "[Enrich] Enriching {} of {} servers with {} workers ({} fresh)",
            queued, total, workers, stats.skipped_fresh
        );

        let queue = Mutex::new(pending);
        let completed = AtomicUsize::new(0);
        let cooldown = options.worker_cooldown();

        let run_worker = |worker: usize| {
            let queue = &queue;
            let completed = &completed;
            async move {
                let mut done = Vec::new();
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((idx, record)) = next else {
                        break;
                    };
                    if !done.is_empty() && !cooldown.is_zero() {
                        tokio::time::sleep(cooldown).await;
                    }

                    let name = record.name.clone();
                    let enriched = self.run_pipeline(record, options).await;
                    let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(worker, name = %name, "[Enrich] Progress {}/{}", n, queued);
                    done.push((idx, enriched));
                }
                done
            }
        };

        let finished = join_all((0..workers).map(run_worker)).await;
        for (idx, record) in finished.into_iter().flatten() {
            slots[idx] = Some(record);
        }
        stats.enriched = queued;

        info!(
            "[Enrich] Done: {} enriched, {} skipped as fresh",
            stats.enriched, stats.skipped_fresh
        );
        (slots.into_iter().flatten().collect(), stats)
    }

    /// Run every applicable source in order and replace the record's enrichment.
    async fn run_pipeline(&self, mut record: ServerRecord, options: &EnrichOptions) -> ServerRecord {
        let mut enrichment = Enrichment::default();
        let mut calls = 0usize;

        for enricher in &self.enrichers {
            let kind = enricher.kind();
            if !enricher.applies_to(&record) {
                continue;
            }
            if calls > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            calls += 1;

            match enricher.enrich(&record).await {
                Ok(Some(data)) => {
                    debug!(name = %record.name, source = %kind, "[Enrich] Source data collected");
                    enrichment.apply(data);
                }
                Ok(None) => {
                    debug!(name = %record.name, source = %kind, "[Enrich] Source returned nothing");
                }
                Err(e) => {
                    warn!(name = %record.name, source = %kind, "[Enrich] Source failed: {}", e);
                }
            }
        }

        let dropped = dropped_sources(&record.enrichment, &enrichment);
        if !dropped.is_empty() {
            let dropped: Vec<&str> = dropped.iter().map(|k| k.as_str()).collect();
            warn!(
                name = %record.name,
                "[Enrich] Previously collected data lost for: {}",
                dropped.join(", ")
            );
        }

        enrichment.last_enriched_at = Some(Utc::now());
        record.enrichment = enrichment;
        record
    }
}

/// Sources that had data in `previous` but have none in `next`.
fn dropped_sources(previous: &Enrichment, next: &Enrichment) -> Vec<SourceKind> {
    let kept = next.sources();
    previous
        .sources()
        .into_iter()
        .filter(|kind| !kept.contains(kind))
        .collect()
}

fn is_fresh(record: &ServerRecord, options: &EnrichOptions, now: DateTime<Utc>) -> bool {
    options.skip_if_fresh && record.enrichment.is_fresh(now, options.max_age)
}
