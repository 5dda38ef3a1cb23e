use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use save_export_backend::{Backend, BackendConfig, BackendError, HttpBackend};
use save_export_core::{BackupRecord, SortableRecord};
use serde_json::{json, Value};

async fn ipc(Path(channel): Path<String>, Json(args): Json<Value>) -> Response {
    match channel.as_str() {
        "get-settings" => Json(json!({
            "language": "zh_CN",
            "pinnedGames": ["2"],
            "exportCount": 2,
            "exportPath": "/srv/exports"
        }))
        .into_response(),
        "fetch-export-table-data" => Json(json!([
            {"wiki_page_id": 1, "title": "Celeste", "backups": [{"is_permanent": true}], "backup_size": 100, "latest_backup": "today"},
            {"wiki_page_id": "2", "title": "Hades", "zh_CN": "哈迪斯", "backups": [], "backup_size": 250, "latest_backup": "yesterday"}
        ]))
        .into_response(),
        "sort-games" => {
            let mut records: Vec<SortableRecord> =
                serde_json::from_value(args[0].clone()).expect("sortable records");
            records.sort_by(|a, b| b.title_to_sort.cmp(&a.title_to_sort));
            Json(records).into_response()
        }
        "export-selected-backups" if args[2] == "/mnt/flaky" => Json(json!({
            "errors": [{"title": "Hades", "reason": "locked"}, 42, null]
        }))
        .into_response(),
        "export-selected-backups" => Json(Value::Null).into_response(),
        "operation-start-check" => Json(args[0] == "export").into_response(),
        "translate" => (StatusCode::INTERNAL_SERVER_ERROR, "no catalog").into_response(),
        _ => (StatusCode::BAD_REQUEST, format!("unknown channel {channel}")).into_response(),
    }
}

async fn start_stub() -> HttpBackend {
    let app = Router::new().route("/ipc/{channel}", post(ipc));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    HttpBackend::new(&BackendConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn record(id: &str, title: &str) -> BackupRecord {
    BackupRecord {
        id: id.to_owned(),
        title: title.to_owned(),
        localized_title: None,
        backups: Vec::new(),
        backup_size: 0,
        latest_backup: String::new(),
    }
}

#[tokio::test]
async fn test_settings_and_records_decode() {
    let backend = start_stub().await;

    let settings = backend.get_settings().await.unwrap();
    assert_eq!(settings.language, "zh_CN");
    assert_eq!(settings.pinned_games, vec!["2"]);
    assert_eq!(settings.export_count, Some(2));

    let records = backend.fetch_exportable_records().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "1");
    assert!(records[0].has_permanent_backup());
    assert_eq!(records[1].localized_title.as_deref(), Some("哈迪斯"));
}

#[tokio::test]
async fn test_sort_round_trip() {
    let backend = start_stub().await;
    let input = vec![
        SortableRecord::new(record("1", "Alpha"), "en_US"),
        SortableRecord::new(record("2", "Beta"), "en_US"),
    ];
    let sorted = backend.sort_records(input).await.unwrap();
    let ids: Vec<_> = sorted.iter().map(|s| s.record.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn test_null_export_reply_is_empty_report() {
    let backend = start_stub().await;
    let report = backend
        .start_export_operation(&["1".to_owned()], 1, "/tmp/out")
        .await
        .unwrap();
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_export_reply_with_unfamiliar_errors_still_decodes() {
    let backend = start_stub().await;
    let report = backend
        .start_export_operation(&["1".to_owned(), "2".to_owned(), "3".to_owned()], 1, "/mnt/flaky")
        .await
        .unwrap();
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors.iter().all(|e| e.id.is_none()));
}

#[tokio::test]
async fn test_start_check() {
    let backend = start_stub().await;
    assert!(backend.check_operation_may_start("export").await.unwrap());
    assert!(!backend.check_operation_may_start("import").await.unwrap());
}

#[tokio::test]
async fn test_rejection_carries_body() {
    let backend = start_stub().await;
    let err = backend.select_destination_folder().await.unwrap_err();
    let rejected = err.downcast_ref::<BackendError>().expect("backend error");
    match rejected {
        BackendError::Rejected {
            channel,
            status,
            message,
        } => {
            assert_eq!(channel, "select-path");
            assert_eq!(*status, 400);
            assert!(message.contains("unknown channel"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_translate_falls_back_to_key() {
    let backend = start_stub().await;
    let text = backend
        .translate("summary.total_export_failed", &[("failed_count", "2".to_owned())])
        .await;
    assert_eq!(text, "summary.total_export_failed");
}
