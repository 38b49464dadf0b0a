use axum::body::Body;
use axum::http::{Request, StatusCode};
use kube_usage_exporter::{
    exposition, load_config_with_env, AppState, ClusterClient, Collector, ExporterError,
    MetricRecord, MockEnvironment,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;

fn pod_list_body() -> serde_json::Value {
    json!({
        "kind": "PodList",
        "apiVersion": "v1",
        "metadata": {},
        "items": [
            {
                "metadata": {"name": "web-1", "namespace": "default"},
                "spec": {
                    "containers": [{
                        "name": "app",
                        "resources": {
                            "limits": {"memory": "256Mi", "cpu": "1"}
                        }
                    }]
                },
                "status": {"phase": "Running"}
            },
            {
                "metadata": {"name": "web-2", "namespace": "default"},
                "spec": {"containers": [{"name": "app"}]},
                "status": {"phase": "Running"}
            },
            {
                "metadata": {"name": "done-1", "namespace": "default"},
                "spec": {"containers": [{"name": "app"}]},
                "status": {"phase": "Succeeded"}
            }
        ]
    })
}

fn pod_metrics_body(name: &str, memory: &str, cpu: &str) -> serde_json::Value {
    json!({
        "kind": "PodMetrics",
        "apiVersion": "metrics.k8s.io/v1beta1",
        "metadata": {"name": name, "namespace": "default"},
        "timestamp": "2024-04-01T12:00:00Z",
        "containers": [
            {"name": "app", "usage": {"memory": memory, "cpu": cpu}}
        ]
    })
}

async fn mock_cluster(server: &mut mockito::Server) {
    server
        .mock("GET", "/api/v1/namespaces/default/pods")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pod_list_body().to_string())
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/apis/metrics.k8s.io/v1beta1/namespaces/default/pods/web-1",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pod_metrics_body("web-1", "128Mi", "250m").to_string())
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/apis/metrics.k8s.io/v1beta1/namespaces/default/pods/web-2",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pod_metrics_body("web-2", "64Mi", "100m").to_string())
        .create_async()
        .await;
    // A terminal pod must never be fetched
    server
        .mock(
            "GET",
            "/apis/metrics.k8s.io/v1beta1/namespaces/default/pods/done-1",
        )
        .expect(0)
        .create_async()
        .await;
}

fn pod_label<'a>(record: &'a MetricRecord) -> &'a str {
    record
        .labels
        .iter()
        .find(|(key, _)| key == "pod")
        .map(|(_, value)| value.as_str())
        .unwrap_or("")
}

#[tokio::test]
async fn test_collection_cycle_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    mock_cluster(&mut server).await;

    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let collector = Collector::new(client, 4);
    let records = collector.collect(&["default".to_string()]).await.unwrap();

    // web-1: two usage gauges + two limit rates; web-2: two usage gauges;
    // done-1 is terminal and contributes nothing
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| pod_label(r) != "done-1"));

    let web1: Vec<&MetricRecord> = records.iter().filter(|r| pod_label(r) == "web-1").collect();
    assert_eq!(web1.len(), 4);
    let limit_rate = web1
        .iter()
        .find(|r| r.name == "memory_limit_rate")
        .unwrap();
    assert_eq!(limit_rate.value, 0.5);
    let cpu_rate = web1.iter().find(|r| r.name == "cpu_limit_rate").unwrap();
    assert_eq!(cpu_rate.value, 0.25);

    let web2: Vec<&MetricRecord> = records.iter().filter(|r| pod_label(r) == "web-2").collect();
    assert_eq!(web2.len(), 2);
}

#[tokio::test]
async fn test_one_failing_pod_fails_the_whole_cycle() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/namespaces/default/pods")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pod_list_body().to_string())
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/apis/metrics.k8s.io/v1beta1/namespaces/default/pods/web-1",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pod_metrics_body("web-1", "128Mi", "250m").to_string())
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/apis/metrics.k8s.io/v1beta1/namespaces/default/pods/web-2",
        )
        .with_status(500)
        .create_async()
        .await;

    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let collector = Collector::new(client, 4);
    let err = collector
        .collect(&["default".to_string()])
        .await
        .unwrap_err();

    // No partial metric set, just the failure
    assert!(matches!(
        err,
        ExporterError::UpstreamStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_listing_failure_propagates() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/namespaces/default/pods")
        .with_status(401)
        .create_async()
        .await;

    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let collector = Collector::new(client, 4);
    let err = collector
        .collect(&["default".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExporterError::UpstreamStatus { status: 401, .. }
    ));
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = mockito::Server::new_async().await;
    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(Collector::new(client, 4)),
        vec!["default".to_string()],
    ));
    let app = kube_usage_exporter::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_serves_exposition_document() {
    let mut server = mockito::Server::new_async().await;
    mock_cluster(&mut server).await;

    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(Collector::new(client, 4)),
        vec!["default".to_string()],
    ));
    let app = kube_usage_exporter::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics?namespace=default")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("# HELP memory_usage"));
    assert!(text.contains("# TYPE memory_usage gauge"));
    assert!(text.contains("memory_usage{pod=\"web-1\",container=\"app\",namespace=\"default\"}"));
    assert!(text.contains("cpu_usage{pod=\"web-2\",container=\"app\",namespace=\"default\"}"));
}

#[tokio::test]
async fn test_metrics_endpoint_maps_upstream_failure_to_502() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/namespaces/default/pods")
        .with_status(503)
        .create_async()
        .await;

    let client = ClusterClient::new(&server.url(), "test-token", false).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(Collector::new(client, 4)),
        vec!["default".to_string()],
    ));
    let app = kube_usage_exporter::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("503"));
}

/// Parse exposition sample lines back into (name, sorted labels, value,
/// timestamp) tuples.
fn parse_samples(text: &str) -> BTreeSet<(String, Vec<(String, String)>, String, String)> {
    let mut samples = BTreeSet::new();
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        let (name_and_labels, rest) = match line.find("} ") {
            Some(idx) => (&line[..idx], &line[idx + 2..]),
            None => {
                let mut parts = line.splitn(2, ' ');
                (parts.next().unwrap(), parts.next().unwrap())
            }
        };

        let (name, labels) = match name_and_labels.find('{') {
            Some(idx) => {
                let raw = &name_and_labels[idx + 1..];
                let mut labels: Vec<(String, String)> = raw
                    .split("\",")
                    .map(|pair| {
                        let mut kv = pair.splitn(2, "=\"");
                        let key = kv.next().unwrap().to_string();
                        let value = kv.next().unwrap().trim_end_matches('"').to_string();
                        (key, value)
                    })
                    .collect();
                labels.sort();
                (name_and_labels[..idx].to_string(), labels)
            }
            None => (name_and_labels.to_string(), Vec::new()),
        };

        let mut rest = rest.split(' ');
        let value = rest.next().unwrap().to_string();
        let timestamp = rest.next().unwrap().to_string();
        samples.insert((name, labels, value, timestamp));
    }
    samples
}

#[test]
fn test_exposition_round_trip() {
    let labels = |pod: &str| {
        vec![
            ("pod".to_string(), pod.to_string()),
            ("container".to_string(), "app".to_string()),
            ("namespace".to_string(), "default".to_string()),
        ]
    };
    let records = vec![
        MetricRecord::gauge("memory_usage", "bytes", labels("web-1"), 134217728.0, 1711972800.0),
        MetricRecord::gauge("cpu_usage", "millicores", labels("web-1"), 250.0, 1711972800.0),
        MetricRecord::gauge("memory_usage", "bytes", labels("web-2"), 0.5, 1711972800.25),
        MetricRecord::gauge("memory_limit_rate", "rate", labels("web-2"), 2.0, 1711972800.0),
    ];

    let text = exposition::render(&records);
    let reparsed = parse_samples(&text);

    let expected: BTreeSet<_> = records
        .iter()
        .map(|r| {
            let mut labels = r.labels.clone();
            labels.sort();
            (
                r.name.to_string(),
                labels,
                r.value.to_string(),
                r.timestamp.to_string(),
            )
        })
        .collect();

    assert_eq!(reparsed, expected);
}

#[test]
fn test_config_for_exporter_runtime() {
    let env = MockEnvironment::new()
        .with_var("K8S_ENDPOINT", "https://cluster.local:6443")
        .with_var("K8S_TOKEN", "secret")
        .with_var("NAMESPACES", "default,monitoring")
        .with_var("CONCURRENCY", "3");

    let config = load_config_with_env(&env).unwrap();
    assert_eq!(config.namespaces, vec!["default", "monitoring"]);
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.port, 3000);
}
