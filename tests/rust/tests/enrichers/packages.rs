//! Package registry enrichment: npm, PyPI and NuGet

use mcpindex_core::enrichers::{Enricher, NpmEnricher, NugetEnricher, PypiEnricher};
use mcpindex_core::{Package, RegistryType, ServerRecord, SourceData};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::fixtures;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn with_package(registry_type: RegistryType, identifier: &str) -> ServerRecord {
    ServerRecord::new("acme/tool").with_package(Package::new(registry_type, identifier))
}

// =============================================================================
// npm
// =============================================================================

async fn mount_npm_packument(mock_server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dist-tags": {"latest": "1.2.0"},
            "time": {
                "modified": "2025-09-20T00:00:00Z",
                "1.2.0": "2025-09-15T12:00:00.000Z"
            },
            "maintainers": [{"name": "ada", "email": "ada@example.com"}],
            "keywords": ["mcp"],
            "homepage": "https://acme.dev"
        })))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_npm_metadata_and_downloads() {
    let mock_server = MockServer::start().await;
    mount_npm_packument(&mock_server, "/acme-tool").await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/last-month/acme-tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"downloads": 5000})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/point/last-week/acme-tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"downloads": 1200})))
        .mount(&mock_server)
        .await;

    let enricher = NpmEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Npm, "acme-tool");

    let Some(SourceData::Npm(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected npm data");
    };
    assert_eq!(data.monthly_downloads, Some(5000));
    assert_eq!(data.weekly_downloads, Some(1200));
    assert_eq!(data.latest_version.as_deref(), Some("1.2.0"));
    assert_eq!(
        data.published_at.map(|t| t.to_rfc3339()),
        Some("2025-09-15T12:00:00+00:00".to_string())
    );
    assert_eq!(data.maintainers, vec!["ada"]);
    assert_eq!(data.homepage.as_deref(), Some("https://acme.dev"));
}

#[tokio::test]
async fn test_npm_download_failure_degrades_only_counts() {
    let mock_server = MockServer::start().await;
    mount_npm_packument(&mock_server, "/acme-tool").await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/last-month/acme-tool"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/point/last-week/acme-tool"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let enricher = NpmEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Npm, "acme-tool");

    let Some(SourceData::Npm(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected npm data");
    };
    assert_eq!(data.monthly_downloads, None);
    assert_eq!(data.weekly_downloads, None);
    assert_eq!(data.latest_version.as_deref(), Some("1.2.0"));
}

#[tokio::test]
async fn test_npm_missing_package_is_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme-tool"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/point/last-month/acme-tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"downloads": 5})))
        .mount(&mock_server)
        .await;

    let enricher = NpmEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Npm, "acme-tool");

    assert!(enricher.enrich(&record).await.unwrap().is_none());
}

#[tokio::test]
async fn test_npm_scoped_name_is_escaped_for_packument() {
    let mock_server = MockServer::start().await;
    mount_npm_packument(&mock_server, "/@acme%2Ftool").await;

    let enricher = NpmEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Npm, "@acme/tool");

    let result = enricher.enrich(&record).await.unwrap();
    assert!(matches!(result, Some(SourceData::Npm(_))));
}

// =============================================================================
// PyPI
// =============================================================================

#[tokio::test]
async fn test_pypi_metadata_and_downloads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pypi/Acme-Tool/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "info": {
                "version": "0.4.1",
                "author": "Ada, Grace",
                "maintainer": "Grace",
                "keywords": "mcp, llm",
                "home_page": "",
                "project_urls": {"Homepage": "https://acme.dev/py"}
            },
            "urls": [
                {"upload_time_iso_8601": "2025-08-01T00:00:00Z"},
                {"upload_time_iso_8601": "2025-08-02T00:00:00Z"}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/packages/acme-tool/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"last_day": 10, "last_week": 70, "last_month": 300},
            "package": "acme-tool",
            "type": "recent_downloads"
        })))
        .mount(&mock_server)
        .await;

    let enricher = PypiEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Pypi, "Acme-Tool");

    let Some(SourceData::Pypi(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected pypi data");
    };
    assert_eq!(data.monthly_downloads, Some(300));
    assert_eq!(data.weekly_downloads, Some(70));
    assert_eq!(data.latest_version.as_deref(), Some("0.4.1"));
    assert_eq!(data.authors, vec!["Ada", "Grace"]);
    assert_eq!(data.keywords, vec!["mcp", "llm"]);
    assert_eq!(data.homepage.as_deref(), Some("https://acme.dev/py"));
    assert_eq!(
        data.published_at.map(|t| t.to_rfc3339()),
        Some("2025-08-02T00:00:00+00:00".to_string())
    );
}

// =============================================================================
// NuGet
// =============================================================================

#[tokio::test]
async fn test_nuget_search_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("q", "packageid:Acme.Mcp"))
        .and(query_param("take", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalHits": 1,
            "data": [{
                "id": "acme.mcp",
                "version": "2.0.0",
                "totalDownloads": 8000,
                "authors": ["Acme"],
                "tags": ["mcp"],
                "projectUrl": "https://acme.dev/nuget",
                "verified": true
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let enricher = NugetEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Nuget, "Acme.Mcp");

    let Some(SourceData::Nuget(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected nuget data");
    };
    assert_eq!(data.total_downloads, 8000);
    assert_eq!(data.latest_version.as_deref(), Some("2.0.0"));
    assert!(data.verified);
}

#[tokio::test]
async fn test_nuget_no_matching_id_is_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalHits": 1,
            "data": [{"id": "Acme.Other", "totalDownloads": 1}]
        })))
        .mount(&mock_server)
        .await;

    let enricher = NugetEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = with_package(RegistryType::Nuget, "Acme.Mcp");

    assert!(enricher.enrich(&record).await.unwrap().is_none());
}

#[tokio::test]
async fn test_package_enrichers_skip_other_registries() {
    let ctx = fixtures::enricher_context("http://127.0.0.1:9");
    let record = with_package(RegistryType::Oci, "acme/tool");

    assert!(!NpmEnricher::new(ctx.clone()).applies_to(&record));
    assert!(!PypiEnricher::new(ctx.clone()).applies_to(&record));
    assert!(!NugetEnricher::new(ctx).applies_to(&record));
}
