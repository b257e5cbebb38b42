//! End-to-end tests: fake kubelet → fetch → decode → map → Prometheus registry.

use kubelet_summary_exporter::catalog::{data_metrics, SCRAPE_ERRORS};
use kubelet_summary_exporter::fetcher::SUMMARY_PATH;
use kubelet_summary_exporter::{map_summary, Fetcher, PullOutcome, Summary, SummaryExporter};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const EXAMPLE: &str = include_str!("testdata/example.json");
const EXAMPLE2: &str = include_str!("testdata/example2.json");
const FULL: &str = include_str!("testdata/full.json");

struct Harness {
    server: mockito::ServerGuard,
    _token: NamedTempFile,
    exporter: Arc<SummaryExporter<Fetcher>>,
    registry: Registry,
}

/// Registry entry sharing the exporter with the test.
struct Shared(Arc<SummaryExporter<Fetcher>>);

impl prometheus::core::Collector for Shared {
    fn desc(&self) -> Vec<&prometheus::core::Desc> {
        self.0.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.0.collect()
    }
}

fn harness() -> Harness {
    let server = mockito::Server::new();
    let mut token = NamedTempFile::new().expect("Failed to create token file");
    writeln!(token, "test-token").unwrap();

    let fetcher = Fetcher::new(
        format!("{}{}", server.url(), SUMMARY_PATH),
        token.path(),
        Duration::from_secs(5),
    )
    .expect("Failed to build fetcher");
    let exporter = Arc::new(SummaryExporter::new(fetcher).expect("Failed to build exporter"));

    let registry = Registry::new();
    registry
        .register(Box::new(Shared(exporter.clone())))
        .expect("Failed to register exporter");

    Harness {
        server,
        _token: token,
        exporter,
        registry,
    }
}

fn serve(h: &mut Harness, status: usize, body: &str) -> mockito::Mock {
    h.server
        .mock("GET", SUMMARY_PATH)
        .match_header("authorization", "Bearer test-token")
        .with_status(status)
        .with_body(body)
        .create()
}

/// (name, labels, value) for every data sample; the error counter is left out.
fn samples(families: &[MetricFamily]) -> Vec<(String, HashMap<String, String>, f64)> {
    let mut out = Vec::new();
    for family in families {
        if family.get_name() == SCRAPE_ERRORS.name {
            continue;
        }
        for metric in family.get_metric() {
            let labels = metric
                .get_label()
                .iter()
                .map(|l| (l.get_name().to_string(), l.get_value().to_string()))
                .collect();
            out.push((family.get_name().to_string(), labels, metric.get_gauge().value()));
        }
    }
    out
}

/// Error counter value per `type`, empty when the family is missing.
fn error_counts(families: &[MetricFamily]) -> HashMap<String, f64> {
    families
        .iter()
        .filter(|f| f.get_name() == SCRAPE_ERRORS.name)
        .flat_map(|f| f.get_metric())
        .map(|m| (m.get_label()[0].get_value().to_string(), m.get_counter().value()))
        .collect()
}

fn counts(request: f64, status: f64, read: f64, parse: f64) -> HashMap<String, f64> {
    [
        ("request error", request),
        ("status error", status),
        ("read body error", read),
        ("parse body error", parse),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_scenario_container_rootfs_only() {
    let mut h = harness();
    let mock = serve(&mut h, 200, EXAMPLE);

    let families = h.registry.gather();
    let mut got = samples(&families);
    got.sort_by(|a, b| a.0.cmp(&b.0));

    let expected_labels = labels(&[
        ("node", "ip-172-20-125-125.ec2.internal"),
        ("namespace", "kube-system"),
        ("pod", "aws-xray-daemon-bpmqx"),
        ("container", "aws-xray-daemon"),
    ]);
    assert_eq!(
        got,
        vec![
            (
                "kubelet_summary_container_fs_limit_bytes".to_string(),
                expected_labels.clone(),
                107361579008.0
            ),
            (
                "kubelet_summary_container_fs_usage_bytes".to_string(),
                expected_labels,
                0.0
            ),
        ]
    );
    assert_eq!(error_counts(&families), counts(0.0, 0.0, 0.0, 0.0));
    mock.assert();
}

#[test]
fn test_second_example_labels() {
    let mut h = harness();
    let _mock = serve(&mut h, 200, EXAMPLE2);

    let got = samples(&h.registry.gather());
    assert_eq!(got.len(), 2);
    for (_, l, _) in &got {
        assert_eq!(l["node"], "ip-172-20-96-152.ec2.internal");
        assert_eq!(l["namespace"], "rmux");
        assert_eq!(l["pod"], "appcache-us-east-1f-6599bdfbcd-lf9j6");
        assert_eq!(l["container"], "rmux");
    }
}

#[test]
fn test_scenario_non_json_body() {
    let mut h = harness();
    let _mock = serve(&mut h, 200, "<html>not json</html>");

    let families = h.registry.gather();
    assert!(samples(&families).is_empty());
    assert_eq!(error_counts(&families), counts(0.0, 0.0, 0.0, 1.0));
    assert!(!h.exporter.last_pull().unwrap().outcome.is_success());
}

#[test]
fn test_scenario_service_unavailable() {
    let mut h = harness();
    let _mock = serve(&mut h, 503, EXAMPLE);

    let families = h.registry.gather();
    assert!(samples(&families).is_empty());
    assert_eq!(error_counts(&families), counts(0.0, 1.0, 0.0, 0.0));
}

#[test]
fn test_scenario_single_accelerator() {
    let mut h = harness();
    let _mock = serve(
        &mut h,
        200,
        r#"{
            "node": {"nodeName": "gpu-node"},
            "pods": [{
                "podRef": {"name": "trainer-0", "namespace": "ml"},
                "containers": [{
                    "name": "trainer",
                    "accelerators": [{
                        "make": "nvidia", "model": "tesla-v100", "id": "GPU-42",
                        "memoryTotal": 16000000000, "memoryUsed": 1000, "dutyCycle": 93
                    }]
                }]
            }]
        }"#,
    );

    let got = samples(&h.registry.gather());
    assert_eq!(got.len(), 3);

    let expected = labels(&[
        ("node", "gpu-node"),
        ("namespace", "ml"),
        ("pod", "trainer-0"),
        ("container", "trainer"),
        ("id", "GPU-42"),
        ("model", "tesla-v100"),
        ("make", "nvidia"),
    ]);
    for (_, l, _) in &got {
        assert_eq!(l, &expected);
    }

    let by_name: HashMap<_, _> = got.iter().map(|(n, _, v)| (n.as_str(), *v)).collect();
    assert_eq!(by_name["kubelet_summary_container_accelerator_memory_used"], 1000.0);
    assert_eq!(by_name["kubelet_summary_container_accelerator_memory_total"], 16000000000.0);
    assert_eq!(by_name["kubelet_summary_container_accelerator_duty_cycle"], 93.0);
}

#[test]
fn test_error_counter_is_monotonic_across_classes() {
    let mut h = harness();
    let unavailable = h
        .server
        .mock("GET", SUMMARY_PATH)
        .with_status(503)
        .expect(2)
        .create();

    h.registry.gather();
    h.registry.gather();
    unavailable.assert();
    unavailable.remove();

    let _mock = serve(&mut h, 200, "{not json");
    let errors = error_counts(&h.registry.gather());

    assert_eq!(errors, counts(0.0, 2.0, 0.0, 1.0));
    assert_eq!(h.exporter.error_total(), 3.0);
}

#[test]
fn test_success_after_failure_keeps_counter_and_emits_data() {
    let mut h = harness();
    let failing = serve(&mut h, 500, "");
    h.registry.gather();
    failing.remove();

    let _mock = serve(&mut h, 200, EXAMPLE);
    let families = h.registry.gather();

    assert_eq!(samples(&families).len(), 2);
    assert_eq!(error_counts(&families), counts(0.0, 1.0, 0.0, 0.0));
    assert_eq!(
        h.exporter.last_pull().unwrap().outcome,
        PullOutcome::Collected { observations: 2 }
    );
}

#[test]
fn test_full_document_covers_catalog() {
    let summary = Summary::parse(FULL.as_bytes()).expect("fixture should parse");
    let observations = map_summary(&summary);

    let mapped: BTreeSet<&str> = observations.iter().map(|o| o.metric.name).collect();
    let catalog: BTreeSet<&str> = data_metrics().iter().map(|d| d.name).collect();
    assert_eq!(mapped, catalog);

    for observation in &observations {
        assert_eq!(
            observation.labels.len(),
            observation.metric.labels.len(),
            "label arity for {}",
            observation.metric.name
        );
        assert_eq!(observation.label("node"), Some("node-a"));
    }
}

#[test]
fn test_full_document_through_registry() {
    let mut h = harness();
    let _mock = serve(&mut h, 200, FULL);

    let families = h.registry.gather();
    let got = samples(&families);
    assert_eq!(error_counts(&families), counts(0.0, 0.0, 0.0, 0.0));

    let find = |name: &str| {
        got.iter()
            .find(|(n, _, _)| n == name)
            .unwrap_or_else(|| panic!("missing {}", name))
    };

    let (_, l, v) = find("kubelet_summary_pod_volume_health_status");
    assert_eq!(*v, 1.0);
    assert_eq!(l["volume_name"], "data");
    assert_eq!(l["namespace"], "shop");

    let (_, l, v) = find("kubelet_summary_node_system_container_accelerator_duty_cycle");
    assert_eq!(*v, 7.0);
    assert_eq!(l["container"], "kubelet");
    assert_eq!(l["id"], "GPU-0");

    let (_, _, v) = find("kubelet_summary_node_rlimit_max_pid");
    assert_eq!(*v, 4194304.0);

    let (_, l, v) = find("kubelet_summary_pod_interface_tx_bytes");
    assert_eq!(*v, 2000.0);
    assert_eq!(l["name"], "eth0");

    let (_, _, v) = find("kubelet_summary_node_swap_usage_bytes");
    assert_eq!(*v, 0.0);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("# TYPE kubelet_summary_pod_process_count gauge"));
    assert!(text.contains(
        "kubelet_summary_pod_process_count{namespace=\"shop\",node=\"node-a\",pod=\"web-7d4b9c-x2x1z\"} 4"
    ));
    assert!(text.contains("# TYPE kubelet_summary_exporter_errors counter"));
    assert!(text.contains("kubelet_summary_exporter_errors{type=\"request error\"} 0"));
}

#[test]
fn test_absent_leaves_are_not_emitted() {
    let mut h = harness();
    let _mock = serve(
        &mut h,
        200,
        r#"{"node": {"nodeName": "n1", "memory": {"usageBytes": 0}, "cpu": {}}}"#,
    );

    let got = samples(&h.registry.gather());
    assert_eq!(
        got,
        vec![(
            "kubelet_summary_node_memory_usage_bytes".to_string(),
            labels(&[("node", "n1")]),
            0.0
        )]
    );
}
