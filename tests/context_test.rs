//! Integration tests for execution contexts and the response protocol.

mod common;

use common::TestFixture;
use serde_json::json;
use sqlbox::context::Response;
use sqlbox::marshal::Marshaled;
use sqlbox::query::{Cell, QueryOutput};

fn output(response: Response) -> QueryOutput {
    match response {
        Response::Results(output) => output,
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ready_signal_precedes_responses() {
    let fixture = TestFixture::new();
    let mut context = fixture.spawn("");

    let first = context.recv().await.expect("context closed early");
    assert!(first.is_ready());
    assert_eq!(serde_json::to_string(&first).unwrap(), "null");

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_select_one_yields_single_batch() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let out = output(context.request("SELECT 1").await.unwrap());
    assert_eq!(out.results.len(), 1);
    assert_eq!(out.results[0].columns, vec!["1".to_string()]);
    assert_eq!(out.results[0].rows, vec![vec![Cell::Integer(1)]]);
    assert!(out.elapsed >= 0.0);

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_ddl_yields_no_batches() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let out = output(context.request("CREATE TABLE t (x)").await.unwrap());
    assert!(out.results.is_empty());

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_batches_follow_statement_order() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let out = output(context.request("SELECT 1; SELECT 2, 3;").await.unwrap());
    assert_eq!(out.results.len(), 2);
    assert_eq!(out.results[0].rows, vec![vec![Cell::Integer(1)]]);
    assert_eq!(out.results[1].columns.len(), 2);
    assert_eq!(
        out.results[1].rows,
        vec![vec![Cell::Integer(2), Cell::Integer(3)]]
    );

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_elapsed_is_truncated_to_millis() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let out = output(
        context
            .request("WITH RECURSIVE c(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM c WHERE n < 20000) SELECT count(*) FROM c")
            .await
            .unwrap(),
    );
    let millis = out.elapsed * 1000.0;
    assert!((millis - millis.round()).abs() < 1e-6);

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_error_response_then_context_keeps_serving() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let response = context.request("SELECT * FROM missing").await.unwrap();
    match response.error() {
        Some(Marshaled::Envelope(envelope)) => {
            assert_eq!(envelope.name, "SQLiteError");
            assert!(envelope.message.contains("no such table"));
            assert!(envelope.properties.contains_key("code"));
        }
        other => panic!("expected an error envelope, got {other:?}"),
    }

    let out = output(context.request("SELECT 2").await.unwrap());
    assert_eq!(out.results[0].rows, vec![vec![Cell::Integer(2)]]);

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failing_statement_discards_earlier_batches() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let response = context
        .request("SELECT 1; SELECT * FROM missing; SELECT 3;")
        .await
        .unwrap();
    assert!(response.error().is_some());

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_response_json_shape() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let response = context.request("SELECT 'a' AS s, NULL AS n").await.unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["results"], json!([{ "columns": ["s", "n"], "rows": [["a", null]] }]));
    assert!(value["elapsed"].is_number());

    let response = context.request("SELEC 1").await.unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["error"]["name"], "SQLiteError");
    assert!(value["error"]["message"].is_string());

    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_directory_driver_persists_between_contexts() {
    let fixture = TestFixture::new();

    let mut context = fixture.start("config=directory&dbName=app").await;
    output(
        context
            .request("CREATE TABLE notes (body TEXT); INSERT INTO notes VALUES ('kept');")
            .await
            .unwrap(),
    );
    context.shutdown().await.unwrap();

    assert!(fixture.namespace().files_dir().join("app").exists());

    let mut context = fixture.start("config=directory&dbName=app").await;
    let out = output(context.request("SELECT body FROM notes").await.unwrap());
    assert_eq!(out.results[0].rows, vec![vec![Cell::Text("kept".to_string())]]);
    context.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_build_reports_startup_error() {
    let fixture = TestFixture::new();
    let mut context = fixture.spawn("build=nope");

    match context.ready().await {
        Err(Marshaled::Envelope(envelope)) => {
            assert_eq!(envelope.name, "ConfigError");
            assert_eq!(envelope.properties["key"], json!("nope"));
            assert_eq!(envelope.properties["available"], json!(["default", "cipher"]));
        }
        other => panic!("expected a startup error, got {other:?}"),
    }
    assert!(context.recv().await.is_none());
}

#[tokio::test]
async fn test_regexp_helpers_available() {
    let fixture = TestFixture::new();
    let mut context = fixture.start("").await;

    let out = output(
        context
            .request("SELECT 'sqlbox' REGEXP '^sql', regexp_replace('-', 'a-b-c', '+', 'g')")
            .await
            .unwrap(),
    );
    assert_eq!(
        out.results[0].rows,
        vec![vec![Cell::Integer(1), Cell::Text("a+b+c".to_string())]]
    );

    context.shutdown().await.unwrap();
}
