//! Unit tests for trellis-source

use crate::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use trellis_core::{path, Graph, JsonGraphEnvelope, PathValue, Resolution};

fn catalogue() -> LocalSource {
    LocalSource::from_json(&json!({
        "lists": { "0": { "$type": "ref", "value": ["items", 7] } },
        "items": { "7": { "name": "widget", "price": 3 }, "8": { "name": "gadget" } }
    }))
}

#[test]
fn test_source_creation() {
    let http = create_source(SourceSpec::Http {
        router: "/model.json".to_string(),
        timeout: Some(Duration::from_secs(5)),
        headers: BTreeMap::new(),
    });
    assert_eq!(http.name(), "http");

    let local = create_source(SourceSpec::Local(Graph::new().shared()));
    assert_eq!(local.name(), "local");
}

#[test]
fn test_local_get_answers_with_references() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let source = catalogue();
        let paths = vec![path!["lists", 0, "name"]];

        let envelope = source.get(&paths).await.unwrap();

        assert_eq!(envelope.paths, paths);
        assert_eq!(
            envelope.json_graph,
            json!({
                "lists": { "0": { "$type": "ref", "value": ["items", 7] } },
                "items": { "7": { "name": "widget" } }
            })
        );
    });
}

#[tokio::test]
async fn test_local_set_writes_through() {
    let source = catalogue();
    let envelope =
        JsonGraphEnvelope::from_path_values(&[PathValue::new(["items", "8", "price"], 5).unwrap()]).unwrap();

    let stored = source.set(envelope).await.unwrap();

    assert_eq!(
        stored.json_graph,
        json!({ "items": { "8": { "price": 5 } } })
    );
    assert_eq!(
        source.graph().read().extract(&path!["items", 8, "price"]),
        Resolution::Present(json!(5))
    );
}

#[tokio::test]
async fn test_local_call_is_unsupported() {
    let source = catalogue();
    let request = CallRequest::new(path!["items", "add"], vec![json!("gizmo")]);

    let err = source.call(&request).await.unwrap_err();
    assert!(matches!(err, SourceError::Unsupported { operation: "call", .. }));
}

#[test]
fn test_http_get_query_encoding() {
    let query = HttpDataSource::get_query(&[path!["lists", 0, "name"], path!["user"]]).unwrap();

    assert_eq!(
        query,
        vec![
            ("paths", r#"[["lists",0,"name"],["user"]]"#.to_string()),
            ("method", "get".to_string()),
        ]
    );
}

#[test]
fn test_http_set_form_encoding() {
    let envelope = JsonGraphEnvelope::from_path_values(&[PathValue::new("user.name", "ada").unwrap()]).unwrap();

    let form = HttpDataSource::set_form(&envelope).unwrap();

    assert_eq!(form[0].0, "jsonGraph");
    let body: serde_json::Value = serde_json::from_str(&form[0].1).unwrap();
    assert_eq!(
        body,
        json!({ "jsonGraph": { "user": { "name": "ada" } }, "paths": [["user", "name"]] })
    );
    assert_eq!(form[1], ("method", "set".to_string()));
}

#[test]
fn test_http_call_form_encoding() {
    let request = CallRequest::new(path!["lists", "push"], vec![json!({ "name": "gizmo" })])
        .with_ref_suffixes(vec![path!["name"]])
        .with_this_paths(vec![path!["length"]]);

    let form = HttpDataSource::call_form(&request).unwrap();

    insta::assert_debug_snapshot!(form, @r#"
    [
        (
            "method",
            "call",
        ),
        (
            "callPath",
            "[\"lists\",\"push\"]",
        ),
        (
            "arguments",
            "[{\"name\":\"gizmo\"}]",
        ),
        (
            "pathSuffixes",
            "[[\"name\"]]",
        ),
        (
            "paths",
            "[[\"length\"]]",
        ),
    ]
    "#);
}

#[tokio::test]
async fn test_http_bad_router_fails_on_request() {
    let mut headers = BTreeMap::new();
    headers.insert("x-session".to_string(), "abc".to_string());
    let source = HttpDataSource::new("/model.json")
        .with_timeout(Some(Duration::from_millis(250)))
        .with_headers(headers);

    // Construction accepts anything; the request itself reports the problem
    assert_eq!(source.router(), "/model.json");
    assert_eq!(source.timeout(), Some(Duration::from_millis(250)));
    assert_eq!(source.headers().get("x-session").map(String::as_str), Some("abc"));

    let err = source.get(&[path!["a"]]).await.unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}
