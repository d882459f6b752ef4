//! Merge and enrichment-subset behaviour with in-memory repositories

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mcpindex_core::enrichers::Enricher;
use mcpindex_core::{
    EnrichmentCoordinator, GithubData, RegistryApiClient, SourceData, SyncMode, SyncOrchestrator,
};
use pretty_assertions::assert_eq;
use tests::{
    fixtures, registry, MockSnapshotRepository, MockSyncStateRepository, ServerRecord,
    StaticEnricher, SyncConfig, SyncState,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    orchestrator: SyncOrchestrator,
    snapshots: Arc<MockSnapshotRepository>,
    sync_state: Arc<MockSyncStateRepository>,
    enricher: Arc<StaticEnricher>,
}

fn harness(
    mock_server: &MockServer,
    prior: Vec<ServerRecord>,
    state: Option<SyncState>,
) -> Harness {
    let dir = std::env::temp_dir();
    let config: SyncConfig = fixtures::sync_config(&dir, &mock_server.uri());

    let snapshots = Arc::new(MockSnapshotRepository::new().with_records(prior));
    let sync_state = Arc::new(match state {
        Some(state) => MockSyncStateRepository::new().with_state(state),
        None => MockSyncStateRepository::new(),
    });
    let enricher = Arc::new(StaticEnricher::new(SourceData::Github(GithubData {
        stars: 7,
        ..Default::default()
    })));

    let registry = RegistryApiClient::new(config.registry_url.clone(), fixtures::fetcher())
        .with_page_delay(Duration::ZERO);
    let coordinator = EnrichmentCoordinator::new(vec![enricher.clone() as Arc<dyn Enricher>]);
    let orchestrator = SyncOrchestrator::new(
        config,
        registry,
        coordinator,
        snapshots.clone(),
        sync_state.clone(),
    );

    Harness {
        orchestrator,
        snapshots,
        sync_state,
        enricher,
    }
}

/// Prior state that puts the next run in incremental mode
fn recent_state() -> SyncState {
    SyncState::after_run(None, Utc::now() - chrono::Duration::hours(1), true, 2)
}

fn record_with_stars(name: &str, stars: u64, enriched_hours_ago: i64) -> ServerRecord {
    let mut record = ServerRecord::new(name);
    record.version = "1.0.0".to_string();
    record.enrichment.github = Some(GithubData {
        stars,
        ..Default::default()
    });
    record.enrichment.last_enriched_at =
        Some(Utc::now() - chrono::Duration::hours(enriched_hours_ago));
    record
}

async fn mount_page(mock_server: &MockServer, entries: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/v0/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(registry::page(entries, None)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_registry_update_keeps_fresh_enrichment() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, vec![registry::entry("acme/a", "2.0.0", "active")]).await;

    let h = harness(
        &mock_server,
        vec![record_with_stars("acme/a", 42, 1)],
        Some(recent_state()),
    );
    let report = h.orchestrator.run().await.unwrap();

    assert!(matches!(report.mode, SyncMode::Incremental { .. }));
    assert_eq!(report.skipped_fresh, 1);
    assert_eq!(h.enricher.calls(), 0);

    let saved = h.snapshots.records();
    assert_eq!(saved[0].version, "2.0.0");
    assert_eq!(saved[0].enrichment.github.as_ref().map(|g| g.stars), Some(42));
    assert_eq!(saved[0].computed.stars, Some(42));
}

#[tokio::test]
async fn test_incremental_enriches_only_fetched_records() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, vec![registry::entry("acme/a", "2.0.0", "active")]).await;

    let h = harness(
        &mock_server,
        vec![
            record_with_stars("acme/a", 1, 48),
            record_with_stars("acme/b", 2, 48),
        ],
        Some(recent_state()),
    );
    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(report.enriched, 1);
    assert_eq!(h.enricher.calls(), 1);

    let saved = h.snapshots.records();
    let names: Vec<&str> = saved.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["acme/a", "acme/b"]);
    assert_eq!(saved[0].computed.stars, Some(7));
    // untouched record keeps its stale enrichment but gets derived fields
    assert_eq!(saved[1].computed.stars, Some(2));
    assert_eq!(saved[1].computed.organization.as_deref(), Some("acme"));
}

#[tokio::test]
async fn test_full_sync_enriches_everything_and_sorts() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        vec![
            registry::entry("zeta/x", "1.0.0", "active"),
            registry::entry("acme/y", "1.0.0", "active"),
        ],
    )
    .await;

    let h = harness(&mock_server, Vec::new(), None);
    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(report.enriched, 2);

    let names: Vec<String> = h.snapshots.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["acme/y", "zeta/x"]);

    let state = h.sync_state.state().unwrap();
    assert_eq!(state.total_servers, 2);
    assert_eq!(state.last_full_sync_at, state.last_sync_at);
}

#[tokio::test]
async fn test_failed_fetch_persists_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/servers"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server, vec![record_with_stars("acme/a", 1, 1)], None);

    assert!(h.orchestrator.run().await.is_err());
    assert_eq!(h.snapshots.save_count(), 0);
    assert!(h.sync_state.state().is_none());
}
