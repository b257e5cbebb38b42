//! Integration tests for the kubelet client against a fake kubelet.

use kubelet_summary_exporter::fetcher::SUMMARY_PATH;
use kubelet_summary_exporter::{FailureClass, FetchError, Fetcher, SummarySource};
use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

fn token_file(token: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create token file");
    writeln!(file, "{}", token).unwrap();
    file
}

fn fetcher_for(server: &mockito::Server, token: &NamedTempFile) -> Fetcher {
    Fetcher::new(
        format!("{}{}", server.url(), SUMMARY_PATH),
        token.path(),
        Duration::from_secs(5),
    )
    .expect("Failed to build fetcher")
}

#[test]
fn test_fetch_sends_bearer_token() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", SUMMARY_PATH)
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"node": {"nodeName": "n1"}}"#)
        .create();

    let token = token_file("secret-token");
    let body = fetcher_for(&server, &token).fetch().expect("fetch should succeed");

    assert_eq!(body, br#"{"node": {"nodeName": "n1"}}"#.to_vec());
    mock.assert();
}

#[test]
fn test_token_is_reread_on_every_fetch() {
    let mut server = mockito::Server::new();
    let old = server
        .mock("GET", SUMMARY_PATH)
        .match_header("authorization", "Bearer old-token")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create();
    let new = server
        .mock("GET", SUMMARY_PATH)
        .match_header("authorization", "Bearer new-token")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create();

    let token = token_file("old-token");
    let fetcher = fetcher_for(&server, &token);
    fetcher.fetch().expect("first fetch should succeed");

    std::fs::write(token.path(), "new-token\n").unwrap();
    fetcher.fetch().expect("second fetch should succeed");

    old.assert();
    new.assert();
}

#[test]
fn test_non_success_status_is_status_error() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", SUMMARY_PATH)
        .with_status(503)
        .with_body("kubelet is starting")
        .create();

    let token = token_file("t");
    let err = fetcher_for(&server, &token).fetch().unwrap_err();

    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503), "got {:?}", err);
    assert_eq!(err.class(), Some(FailureClass::Status));
    mock.assert();
}

#[test]
fn test_unauthorized_is_status_error() {
    let mut server = mockito::Server::new();
    server.mock("GET", SUMMARY_PATH).with_status(401).create();

    let token = token_file("wrong");
    let err = fetcher_for(&server, &token).fetch().unwrap_err();
    assert_eq!(err.class(), Some(FailureClass::Status));
}

#[test]
fn test_connection_refused_is_request_error() {
    let token = token_file("t");
    let fetcher = Fetcher::new(
        "http://127.0.0.1:1/stats/summary",
        token.path(),
        Duration::from_secs(2),
    )
    .unwrap();

    let err = fetcher.fetch().unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
    assert_eq!(err.class(), Some(FailureClass::Request));
}

#[test]
fn test_silent_kubelet_times_out_as_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold the connection without ever answering.
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_secs(5));
            drop(stream);
        }
    });

    let token = token_file("t");
    let fetcher = Fetcher::new(
        format!("http://{}{}", addr, SUMMARY_PATH),
        token.path(),
        Duration::from_millis(300),
    )
    .unwrap();

    let started = Instant::now();
    let err = fetcher.fetch().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
    assert_eq!(err.class(), Some(FailureClass::Request));
    assert!(!err.is_fatal());
}

#[test]
fn test_for_node_builds_https_url() {
    let fetcher = Fetcher::for_node(
        "ip-172-20-125-125.ec2.internal",
        10250,
        "/var/run/secrets/kubernetes.io/serviceaccount/token",
        Duration::from_secs(10),
    )
    .unwrap();
    assert_eq!(
        fetcher.url(),
        "https://ip-172-20-125-125.ec2.internal:10250/stats/summary"
    );
}
