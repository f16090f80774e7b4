use std::path::Path;
use std::sync::Arc;

use ais_api::{FileCatalog, PARTITION_EXTENSION, Record};
use ais_collector::{PartitionWriter, RecordBuffer};
use ais_query_server::{AppState, DuckDbEngine, QueryGateway, router};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

fn write(dir: &Path, name: &str, records: &[Record]) {
    let writer = PartitionWriter::open(dir, 100).unwrap();
    writer.write(records, &dir.join(name)).unwrap();
}

fn fixtures(dir: &Path) {
    let day1 = Utc.with_ymd_and_hms(2023, 9, 1, 8, 0, 0).unwrap();
    let day2 = Utc.with_ymd_and_hms(2023, 9, 2, 9, 0, 0).unwrap();
    write(
        dir,
        "2023-09-01_08-00-00.parquet",
        &[
            Record::new(day1, "273450000", r#"{"n":1}"#),
            Record::new(day1 + Duration::seconds(1), "111111111", r#"{"n":2}"#),
        ],
    );
    write(
        dir,
        "2023-09-02_09-00-00.parquet",
        &[
            Record::new(day2, "273450000", r#"{"n":3}"#),
            Record::new(day2 + Duration::seconds(1), "222222222", r#"{"n":4}"#),
        ],
    );
    write(
        dir,
        "2023-09-05_00-00-00.parquet",
        &[Record::new(Utc.with_ymd_and_hms(2023, 9, 5, 0, 0, 0).unwrap(), "999999999", "{}")],
    );
}

fn app(dir: &Path) -> axum::Router {
    let engine = Arc::new(DuckDbEngine::open_in_memory().unwrap());
    let gateway = QueryGateway::new(FileCatalog::new(dir, PARTITION_EXTENSION), engine, 10);
    let buffer = Arc::new(RecordBuffer::new(10));
    buffer.append(Record::new(Utc::now(), "1", "{}"));
    router(AppState {
        gateway,
        buffer: Some(buffer),
    })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn ship_history_across_days() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/ships/273450000?from=2023-09-01&to=2023-09-03").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["timestamp"], "2023-09-01T08:00:00.000Z");
    assert_eq!(rows[0]["mmsi"], 273450000);
    assert_eq!(rows[0]["raw_data"], r#"{"n":1}"#);
    assert_eq!(rows[1]["raw_data"], r#"{"n":3}"#);
}

#[tokio::test]
async fn distinct_keys_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/ships/mmsi?from=2023-09-01&to=2023-09-02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([111111111, 222222222, 273450000]));
}

#[tokio::test]
async fn latest_newest_first_with_limit() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/latest?from=2023-09-01&to=2023-09-02&limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let raw: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["raw_data"].as_str().unwrap())
        .collect();
    assert_eq!(raw, [r#"{"n":4}"#, r#"{"n":3}"#, r#"{"n":2}"#]);
}

#[tokio::test]
async fn stats_counts_recent_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let name = now.format("%Y-%m-%d_00-00-00.parquet").to_string();
    write(
        tmp.path(),
        &name,
        &[
            Record::new(now - Duration::hours(3), "1", "{}"),
            Record::new(now - Duration::minutes(30), "2", "{}"),
            Record::new(now - Duration::seconds(5), "3", "{}"),
        ],
    );

    let (status, body) = get(app(tmp.path()), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_today"], 3);
    assert_eq!(body["last_hour"], 2);
    assert_eq!(body["last_minute"], 1);
    assert_eq!(body["average_per_minute"], 0);
}

#[tokio::test]
async fn reversed_range_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/latest?from=2023-09-03&to=2023-09-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("after"));

    let (status, _) = get(app(tmp.path()), "/stats?from=01-09-2023").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_range_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/ships/273450000?from=2023-09-03").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("no data"));
}

#[tokio::test]
async fn partitions_and_health() {
    let tmp = tempfile::tempdir().unwrap();
    fixtures(tmp.path());

    let (status, body) = get(app(tmp.path()), "/partitions?from=2023-09-01&to=2023-09-05").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| Path::new(p.as_str().unwrap()).file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "2023-09-01_08-00-00.parquet",
            "2023-09-02_09-00-00.parquet",
            "2023-09-05_00-00-00.parquet",
        ]
    );

    let (status, body) = get(app(tmp.path()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "ok", "buffered": 1}));
}
