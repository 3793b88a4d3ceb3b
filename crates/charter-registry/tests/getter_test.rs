//! Integration tests for chart retrieval.
//!
//! The getter is exercised against in-memory fakes for the registry client
//! and codec, and end to end against a temporary `LocalRegistry`.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use charter_core::{archive, Chart};
use tempfile::TempDir;
use url::Url;

use charter_registry::{
    ArchiveCodecPort, CacheConfig, ChartCache, Getter, GetterError, LocalRegistry, PortError,
    Reference, RegistryClientPort, RegistryError,
};

fn test_chart() -> Chart {
    Chart::builder("testchart")
        .version("0.1.0")
        .description("A chart for testing")
        .add_file("values.yaml", "replicas: 1\n")
        .add_file("templates/service.yaml", "kind: Service\n")
        .build()
        .unwrap()
}

// =============================================================================
// Fakes
// =============================================================================

/// Returns the same chart for every reference and records what it was asked for.
#[derive(Default)]
struct FakeClient {
    pulled: Mutex<Vec<String>>,
    loads: AtomicUsize,
}

impl FakeClient {
    fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClientPort for FakeClient {
    async fn pull(&self, reference: &Reference) -> Result<(), PortError> {
        self.pulled.lock().unwrap().push(reference.to_string());
        Ok(())
    }

    async fn load(&self, _reference: &Reference) -> Result<Chart, PortError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(test_chart())
    }
}

struct FailingPull {
    loads: AtomicUsize,
}

#[async_trait]
impl RegistryClientPort for FailingPull {
    async fn pull(&self, _reference: &Reference) -> Result<(), PortError> {
        Err("connection refused".into())
    }

    async fn load(&self, _reference: &Reference) -> Result<Chart, PortError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(test_chart())
    }
}

struct FailingLoad;

#[async_trait]
impl RegistryClientPort for FailingLoad {
    async fn pull(&self, _reference: &Reference) -> Result<(), PortError> {
        Ok(())
    }

    async fn load(&self, _reference: &Reference) -> Result<Chart, PortError> {
        Err("chart not in cache".into())
    }
}

/// Writes a few bytes, then fails.
struct FailingCodec;

impl ArchiveCodecPort for FailingCodec {
    fn encode(&self, _chart: &Chart, out: &mut dyn Write) -> Result<(), PortError> {
        out.write_all(b"partial")?;
        Err("disk full".into())
    }
}

fn local_registry(dir: &TempDir) -> LocalRegistry {
    let cache = ChartCache::new(CacheConfig::new(dir.path().join("cache"))).unwrap();
    LocalRegistry::new(dir.path().join("registry"), cache)
}

// =============================================================================
// Tag Precedence Tests
// =============================================================================

#[tokio::test]
async fn test_embedded_tag_wins_over_version() {
    let getter = Getter::new(FakeClient::default());

    let retrieved = getter
        .get("oci://localhost:5000/testrepo/testchart:1.2.3", Some("9.9.9"))
        .await
        .unwrap();

    assert_eq!(retrieved.reference.tag(), "1.2.3");
    assert_eq!(
        getter.client().pulled(),
        vec!["localhost:5000/testrepo/testchart:1.2.3"]
    );
}

#[tokio::test]
async fn test_version_used_for_untagged_locator() {
    let getter = Getter::new(FakeClient::default());

    let retrieved = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap();

    assert_eq!(
        retrieved.reference.to_string(),
        "localhost:5000/testrepo/testchart:0.1.0"
    );
    assert_eq!(retrieved.metadata.name, "testchart");
}

#[tokio::test]
async fn test_missing_version_never_reaches_client() {
    let getter = Getter::new(FakeClient::default());

    for version in [None, Some("")] {
        let err = getter
            .get("oci://localhost:5000/testrepo/testchart", version)
            .await
            .unwrap_err();
        assert!(matches!(err, GetterError::MissingVersion { .. }), "{err:?}");
    }

    assert!(getter.client().pulled().is_empty());
}

#[tokio::test]
async fn test_get_url_matches_get() {
    let getter = Getter::new(FakeClient::default());
    let url = Url::parse("oci://localhost:5000/testrepo/testchart").unwrap();

    let from_url = getter.get_url(&url, Some("0.1.0")).await.unwrap();
    let from_str = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap();

    assert_eq!(from_url, from_str);
}

#[tokio::test]
async fn test_malformed_locators_rejected() {
    let getter = Getter::new(FakeClient::default());

    let err = getter.get("oci:///testchart:1.0.0", None).await.unwrap_err();
    assert!(matches!(err, GetterError::MalformedLocator { .. }), "{err:?}");

    let err = getter
        .get("oci://localhost:5000/TestRepo/testchart", Some("1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, GetterError::MalformedReference { .. }), "{err:?}");

    let err = getter
        .get("oci://localhost:5000/testrepo/testchart:", Some("1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, GetterError::MalformedReference { .. }), "{err:?}");

    assert!(getter.client().pulled().is_empty());
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_content_is_encoded_chart() {
    let getter = Getter::new(FakeClient::default());

    let retrieved = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap();

    assert_eq!(archive::from_bytes(&retrieved.content).unwrap(), test_chart());
}

#[tokio::test]
async fn test_repeated_get_is_byte_identical() {
    let getter = Getter::new(FakeClient::default());
    let locator = "oci://localhost:5000/testrepo/testchart";

    let first = getter.get(locator, Some("0.1.0")).await.unwrap();
    let second = getter.get(locator, Some("0.1.0")).await.unwrap();

    assert_eq!(first.content, second.content);
    // No memoization in the getter: the chain ran twice.
    assert_eq!(getter.client().pulled().len(), 2);
    assert_eq!(getter.client().loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pull_failure_is_surfaced() {
    let getter = Getter::new(FailingPull {
        loads: AtomicUsize::new(0),
    });

    let err = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap_err();

    match &err {
        GetterError::PullFailed { reference, source } => {
            assert_eq!(reference, "localhost:5000/testrepo/testchart:0.1.0");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("expected PullFailed, got {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(getter.client().loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_failure_is_surfaced() {
    let getter = Getter::new(FailingLoad);

    let err = getter
        .get("oci://localhost:5000/testrepo/testchart:0.1.0", None)
        .await
        .unwrap_err();

    assert!(matches!(err, GetterError::LoadFailed { .. }), "{err:?}");
}

#[tokio::test]
async fn test_encode_failure_returns_no_content() {
    let getter = Getter::with_codec(FakeClient::default(), FailingCodec);

    let err = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap_err();

    match err {
        GetterError::EncodeFailed { source, .. } => assert_eq!(source.to_string(), "disk full"),
        other => panic!("expected EncodeFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_getter_shared_across_tasks() {
    let getter = Arc::new(Getter::new(Arc::new(FakeClient::default())));

    let handles: Vec<_> = ["0.1.0", "0.2.0", "0.3.0"]
        .into_iter()
        .map(|version| {
            let getter = Arc::clone(&getter);
            tokio::spawn(async move {
                getter
                    .get("oci://localhost:5000/testrepo/testchart", Some(version))
                    .await
                    .map(|r| r.reference.tag().to_string())
            })
        })
        .collect();

    let mut tags = Vec::new();
    for handle in handles {
        tags.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(tags, vec!["0.1.0", "0.2.0", "0.3.0"]);
}

// =============================================================================
// Filename Tests
// =============================================================================

#[test]
fn test_filename_uses_version_argument_not_embedded_tag() {
    let getter = Getter::new(FakeClient::default());
    let url = Url::parse("oci://localhost:5000/testrepo/testchart:latest").unwrap();

    // The name follows the caller's version even though `get` would pull
    // `latest` for this locator.
    assert_eq!(getter.filename(&url, "0.1.0"), "testchart-0.1.0.tgz");
}

// =============================================================================
// Local Registry Tests
// =============================================================================

#[tokio::test]
async fn test_push_then_get_from_local_registry() {
    let dir = TempDir::new().unwrap();
    let registry = local_registry(&dir);
    let reference = Reference::new("localhost:5000", "testrepo/testchart", "0.1.0").unwrap();
    let digest = registry.push(&reference, &test_chart()).await.unwrap();

    let getter = Getter::new(registry);
    let retrieved = getter
        .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
        .await
        .unwrap();

    assert_eq!(archive::sha256_digest(&retrieved.content), digest);
    assert_eq!(retrieved.metadata, test_chart().metadata);
    assert!(getter.client().cache().get(&reference).unwrap().is_some());
}

#[tokio::test]
async fn test_get_unknown_chart_from_local_registry() {
    let dir = TempDir::new().unwrap();
    let getter = Getter::new(local_registry(&dir));

    let err = getter
        .get("oci://localhost:5000/testrepo/missing:1.0.0", None)
        .await
        .unwrap_err();

    let GetterError::PullFailed { source, .. } = err else {
        panic!("expected PullFailed");
    };
    let registry_err = source.downcast_ref::<RegistryError>().unwrap();
    assert!(matches!(registry_err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn test_load_without_pull_reports_not_pulled() {
    let dir = TempDir::new().unwrap();
    let registry = local_registry(&dir);
    let reference = Reference::new("localhost:5000", "testrepo/testchart", "0.1.0").unwrap();
    registry.push(&reference, &test_chart()).await.unwrap();

    let err = registry.load(&reference).await.unwrap_err();
    let registry_err = err.downcast_ref::<RegistryError>().unwrap();
    assert!(matches!(registry_err, RegistryError::NotPulled { .. }));
}

#[tokio::test]
async fn test_corrupt_store_surfaces_checksum_mismatch() {
    let dir = TempDir::new().unwrap();
    let registry = local_registry(&dir);
    let reference = Reference::new("localhost:5000", "testrepo/testchart", "0.1.0").unwrap();
    registry.push(&reference, &test_chart()).await.unwrap();

    let archive_path = dir
        .path()
        .join("registry/localhost_5000/testrepo/testchart/0.1.0/chart.tgz");
    let mut data = std::fs::read(&archive_path).unwrap();
    data[20] ^= 0x01;
    std::fs::write(&archive_path, data).unwrap();

    let getter = Getter::new(registry);
    let err = getter
        .get("oci://localhost:5000/testrepo/testchart:0.1.0", None)
        .await
        .unwrap_err();

    let GetterError::PullFailed { source, .. } = err else {
        panic!("expected PullFailed");
    };
    assert!(matches!(
        source.downcast_ref::<RegistryError>(),
        Some(RegistryError::ChecksumMismatch { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_of_one_reference() {
    let dir = TempDir::new().unwrap();
    let registry = local_registry(&dir);
    let reference = Reference::new("localhost:5000", "testrepo/testchart", "0.1.0").unwrap();
    let digest = registry.push(&reference, &test_chart()).await.unwrap();
    let getter = Arc::new(Getter::new(registry));

    for _ in 0..10 {
        // Every round starts from a cold cache.
        getter.client().cache().clear().unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let getter = Arc::clone(&getter);
                tokio::spawn(async move {
                    getter
                        .get("oci://localhost:5000/testrepo/testchart:0.1.0", None)
                        .await
                        .map(|r| r.content)
                })
            })
            .collect();

        for handle in handles {
            let content = handle.await.unwrap().unwrap();
            assert_eq!(archive::sha256_digest(&content), digest);
        }
    }
}

#[tokio::test]
async fn test_get_with_cache_smaller_than_chart() {
    let dir = TempDir::new().unwrap();
    let cache =
        ChartCache::new(CacheConfig::new(dir.path().join("cache")).with_max_size(100)).unwrap();
    let registry = LocalRegistry::new(dir.path().join("registry"), cache);

    let chart = Chart::builder("testchart")
        .version("0.1.0")
        .add_file("values.yaml", vec![b'x'; 4096])
        .build()
        .unwrap();
    let reference = Reference::new("localhost:5000", "testrepo/testchart", "0.1.0").unwrap();
    registry.push(&reference, &chart).await.unwrap();

    let getter = Getter::new(registry);
    let retrieved = getter
        .get("oci://localhost:5000/testrepo/testchart:0.1.0", None)
        .await
        .unwrap();

    assert_eq!(archive::from_bytes(&retrieved.content).unwrap(), chart);
}
