//! Release-asset enrichment for MCP bundle packages

use mcpindex_core::enrichers::{Enricher, ReleaseEnricher};
use mcpindex_core::{Package, RegistryType, ServerRecord, SourceData};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::fixtures;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bundle(identifier: &str) -> ServerRecord {
    ServerRecord::new("acme/tool").with_package(Package::new(RegistryType::Mcpb, identifier))
}

#[tokio::test]
async fn test_github_tagged_release() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/releases/tags/v1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html_url": "https://github.com/acme/tool/releases/tag/v1.0.0",
            "tag_name": "v1.0.0",
            "prerelease": false,
            "published_at": "2025-09-01T00:00:00Z",
            "assets": [
                {"name": "tool-darwin-arm64.mcpb", "size": 1000, "download_count": 30},
                {"name": "tool-linux-x86_64.mcpb", "size": 2000, "download_count": 12},
                {"name": "tool-win32-x64.mcpb", "size": 3000, "download_count": 8},
                {"name": "SHA256SUMS", "size": 10, "download_count": 0}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let enricher = ReleaseEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record =
        bundle("https://github.com/acme/tool/releases/download/v1.0.0/tool-darwin-arm64.mcpb");
    assert!(enricher.applies_to(&record));

    let Some(SourceData::Release(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected release data");
    };
    assert_eq!(data.tag_name, "v1.0.0");
    assert_eq!(data.download_count, Some(50));
    assert_eq!(data.total_size, Some(6010));
    assert_eq!(data.platforms, vec!["darwin-arm64", "linux-x64", "windows-x64"]);
}

#[tokio::test]
async fn test_github_latest_release() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html_url": "https://github.com/acme/tool/releases/tag/v2.0.0",
            "tag_name": "v2.0.0",
            "assets": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let enricher = ReleaseEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record = bundle("https://github.com/acme/tool/releases/latest/download/tool.mcpb");

    let Some(SourceData::Release(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected release data");
    };
    assert_eq!(data.tag_name, "v2.0.0");
    assert_eq!(data.download_count, Some(0));
}

#[tokio::test]
async fn test_gitlab_release_has_no_download_counts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/acme%2Fgroup%2Ftool/releases/v3.1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v3.1.0",
            "released_at": "2025-07-01T00:00:00Z",
            "upcoming_release": false,
            "_links": {"self": "https://gitlab.com/acme/group/tool/-/releases/v3.1.0"},
            "assets": {
                "count": 1,
                "links": [{"name": "tool-linux-arm64.mcpb", "url": "https://gitlab.com/x"}]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let enricher = ReleaseEnricher::new(fixtures::enricher_context(&mock_server.uri()));
    let record =
        bundle("https://gitlab.com/acme/group/tool/-/releases/v3.1.0/downloads/tool.mcpb");

    let Some(SourceData::Release(data)) = enricher.enrich(&record).await.unwrap() else {
        panic!("expected release data");
    };
    assert_eq!(data.download_count, None);
    assert_eq!(data.platforms, vec!["linux-arm64"]);
    assert_eq!(
        data.release_url,
        "https://gitlab.com/acme/group/tool/-/releases/v3.1.0"
    );
}

#[tokio::test]
async fn test_unrecognized_bundle_url_does_not_apply() {
    let enricher = ReleaseEnricher::new(fixtures::enricher_context("http://127.0.0.1:9"));
    assert!(!enricher.applies_to(&bundle("https://cdn.example.com/tool.mcpb")));
}
