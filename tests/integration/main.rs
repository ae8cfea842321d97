//! Integration tests for Trellis
//!
//! These tests verify that multiple systems work together correctly.

use serde_json::json;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trellis_bridge::{Bridge, BroadcastScheduler};
use trellis_core::{path, Resolution};
use trellis_model::{Config, GraphOps, Model};

fn trellis(dir: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(["--config", "missing.toml"])
        .args(args)
        .current_dir(dir.path())
        .env_remove("TRELLIS_ROUTER")
        .env_remove("TRELLIS_TIMEOUT_MS")
        .output()
        .expect("Failed to execute trellis")
}

fn backend_file(dir: &TempDir) -> String {
    let seed = json!({
        "lists": { "0": { "$type": "ref", "value": ["items", 7] } },
        "items": { "7": { "name": "widget" } }
    });
    let path = dir.path().join("backend.json");
    std::fs::write(&path, seed.to_string()).unwrap();
    path.display().to_string()
}

/// Serve one HTTP request with `body`, handing back the raw request head.
async fn serve_once(body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let mut read = 0;
        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf[read..]).await.unwrap();
            if n == 0 {
                break;
            }
            read += n;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&buf[..read]).into_owned()
    });
    (format!("http://{addr}/model.json"), handle)
}

#[test]
fn test_cli_invocation() {
    let dir = TempDir::new().unwrap();
    let output = trellis(&dir, &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trellis"));
    assert!(stdout.contains("Query and watch a JSON graph"));
}

#[test]
fn test_cli_get_follows_references() {
    let dir = TempDir::new().unwrap();
    let backend = backend_file(&dir);

    let output = trellis(&dir, &["--backend", &backend, "get", "lists", "0", "name"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "\"widget\"");

    let output = trellis(&dir, &["--backend", &backend, "get", "--parse", "lists[0].name"]);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, json!({ "json": { "lists": { "0": { "name": "widget" } } } }));
}

#[test]
fn test_cli_watch_settles() {
    let dir = TempDir::new().unwrap();
    let backend = backend_file(&dir);

    let output = trellis(&dir, &["--backend", &backend, "watch", "lists[0].name", "--wait", "2"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("lists[0].name = unavailable"));
    assert!(stdout.contains("lists[0].name = \"widget\""));
}

#[test]
fn test_cli_reports_bad_path() {
    let dir = TempDir::new().unwrap();
    let output = trellis(&dir, &["get", "--parse", "a[1..2]"]);
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_http_source_end_to_end() {
    let body = json!({
        "jsonGraph": {
            "user": { "$type": "ref", "value": ["usersById", 42] },
            "usersById": { "42": { "name": "Ada" } }
        },
        "paths": [["user", "name"]]
    });
    let (router, request) = serve_once(body.to_string()).await;
    let model = Model::from_config(&mut Config::new().with_router(router).with_header("x-session", "abc"));

    let name = model.get_value(&path!["user", "name"]).await.unwrap();
    assert_eq!(name, Resolution::Present(json!("Ada")));

    let head = request.await.unwrap();
    assert!(head.starts_with("GET /model.json?"));
    assert!(head.contains("method=get"));
    assert!(head.to_lowercase().contains("x-session: abc"));
}

#[tokio::test]
async fn test_bridge_over_chained_models() {
    let upstream = Model::seeded(&json!({ "todos": { "0": { "title": "write tests" } } }), None);
    let scheduler = Arc::new(BroadcastScheduler::default());
    let mut signals = scheduler.subscribe();
    let bridge = Bridge::new(Config::new().with_source(upstream.as_data_source()), scheduler).unwrap();

    assert_eq!(bridge.read(["todos", "0", "title"]), Resolution::Unavailable);
    signals.recv().await.unwrap();
    assert_eq!(bridge.read(["todos", "0", "title"]), Resolution::Present(json!("write tests")));

    let done = bridge.two_way("todos[0].done").unwrap();
    done.set(true);
    signals.recv().await.unwrap();
    assert_eq!(
        upstream.extract(&path!["todos", 0, "done"]),
        Resolution::Present(json!(true))
    );
}
