use std::sync::Arc;
use tokio::sync::mpsc;

use canvass::api::client::{ApiClient, AuthTokens};
use canvass::api::transport::mock::MockTransport;
use canvass::domain::bulk_upload::JobStatus;
use canvass::services::bulk_import::{BulkImportService, ImportEvent};
use canvass::services::error_handling::CanvassError;
use canvass::utils::CancelToken;

const STATUS_PATH: &str = "/users/bulk-upload/job-1/status/";

fn service(transport: &MockTransport) -> BulkImportService {
    let api = ApiClient::new("http://backend", Arc::new(transport.clone()));
    api.session().set_tokens(AuthTokens {
        access_token: "tok".to_string(),
        refresh_token: None,
    });
    BulkImportService::new(Arc::new(api))
}

fn job_json(
    status: &str,
    total: u64,
    processed: u64,
    success: u64,
    failed: u64,
    errors: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "job_id": "job-1",
        "status": status,
        "file_name": "users.csv",
        "total_rows": total,
        "processed_rows": processed,
        "success_count": success,
        "failed_count": failed,
        "progress_percentage": if total == 0 { 0.0 } else { processed as f64 / total as f64 * 100.0 },
        "validation_errors": errors,
        "started_at": null,
        "completed_at": null,
        "created_at": null
    })
}

fn accept_upload(transport: &MockTransport) {
    transport.respond_json(
        "/users/bulk-upload/",
        200,
        serde_json::json!({"job_id": "job-1"}),
    );
}

async fn drain(rx: &mut mpsc::Receiver<ImportEvent>) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_template_round_trip_all_rows_succeed() {
    let transport = MockTransport::new();
    accept_upload(&transport);
    transport.respond_json(STATUS_PATH, 200, job_json("pending", 0, 0, 0, 0, &[]));
    transport.respond_json(STATUS_PATH, 200, job_json("processing", 3, 1, 1, 0, &[]));
    transport.respond_json(STATUS_PATH, 200, job_json("completed", 3, 3, 3, 0, &[]));

    let csv = "name,email,role,phone,city,constituency\n\
               Ada,ada@example.com,admin,,Springfield,North\n\
               Ben,ben@example.com,viewer,,Springfield,South\n\
               Cal,cal@example.com,volunteer,,Springfield,East\n";

    let (tx, mut rx) = mpsc::channel(64);
    let outcome = service(&transport)
        .start_import("users.csv", csv.as_bytes().to_vec(), tx, CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.succeeded());
    assert_eq!(outcome.job.success_count, outcome.job.total_rows);
    assert_eq!(outcome.job.failed_count, 0);
    assert!(!outcome.error_report_available());
    assert_eq!(
        outcome.summary_lines(),
        vec!["3 user(s) created successfully.".to_string()]
    );

    // Exactly one fetch per scripted snapshot; polling stopped at terminal.
    assert_eq!(transport.calls_to(STATUS_PATH), 3);

    let events = drain(&mut rx).await;
    let completions = events
        .iter()
        .filter(|e| matches!(e, ImportEvent::Completed(_)))
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_three_row_import_with_one_invalid_role() {
    let transport = MockTransport::new();
    accept_upload(&transport);
    transport.respond_json(
        STATUS_PATH,
        200,
        job_json("completed", 3, 3, 2, 1, &["Row 2: invalid role"]),
    );

    let (tx, _rx) = mpsc::channel(64);
    let outcome = service(&transport)
        .start_import(
            "users.csv",
            b"name,email,role,phone,city,constituency\n".to_vec(),
            tx,
            CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.summary_lines(),
        vec![
            "2 user(s) created successfully.".to_string(),
            "1 user(s) failed.".to_string(),
        ]
    );
    assert!(outcome.error_report_available());
    assert_eq!(outcome.job.validation_errors, vec!["Row 2: invalid role"]);
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_strictly_after_first_terminal_tick() {
    let transport = MockTransport::new();
    transport.respond_json(STATUS_PATH, 200, job_json("processing", 5, 2, 2, 0, &[]));
    transport.respond_json(STATUS_PATH, 200, job_json("completed", 5, 5, 5, 0, &[]));
    // A stale sticky response that must never be fetched.
    transport.respond_json_forever(STATUS_PATH, 200, job_json("processing", 5, 2, 2, 0, &[]));

    let (tx, _rx) = mpsc::channel(64);
    let outcome = service(&transport)
        .poll_job("job-1", tx, CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.job.status, JobStatus::Completed);
    assert_eq!(transport.calls_to(STATUS_PATH), 2);
}

#[tokio::test(start_paused = true)]
async fn test_job_level_failure_is_not_a_request_failure() {
    let transport = MockTransport::new();
    transport.respond_json(
        STATUS_PATH,
        200,
        job_json("failed", 3, 3, 0, 3, &["Row 1: duplicate email"]),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let outcome = service(&transport)
        .poll_job("job-1", tx, CancelToken::new())
        .await
        .unwrap();

    assert!(!outcome.succeeded());
    assert!(outcome.error_report_available());

    let events = drain(&mut rx).await;
    assert!(events.iter().any(|e| matches!(e, ImportEvent::Failed(_))));
    assert!(!events.iter().any(|e| matches!(e, ImportEvent::Completed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_first_fetch_failure_stops_before_polling_starts() {
    let transport = MockTransport::new();
    transport.fail_once(STATUS_PATH, "connection refused");

    let (tx, mut rx) = mpsc::channel(64);
    let result = service(&transport)
        .poll_job("job-1", tx, CancelToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(transport.calls_to(STATUS_PATH), 1);
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_later_poll_failure_preserves_last_snapshot() {
    let transport = MockTransport::new();
    transport.respond_json(STATUS_PATH, 200, job_json("processing", 10, 4, 4, 0, &[]));
    transport.fail_once(STATUS_PATH, "connection reset");

    let (tx, mut rx) = mpsc::channel(64);
    let result = service(&transport)
        .poll_job("job-1", tx, CancelToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(transport.calls_to(STATUS_PATH), 2);

    // The last known-good snapshot was delivered before the failure.
    let events = drain(&mut rx).await;
    match events.last() {
        Some(ImportEvent::Snapshot(job)) => assert_eq!(job.processed_rows, 4),
        other => panic!("expected a snapshot event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_rejection_surfaces_server_message_and_never_polls() {
    let transport = MockTransport::new();
    transport.respond_json(
        "/users/bulk-upload/",
        400,
        serde_json::json!({"error": "Duplicate emails are not allowed"}),
    );

    let (tx, _rx) = mpsc::channel(64);
    let err = service(&transport)
        .start_import(
            "users.csv",
            b"name,email,role,phone,city,constituency\n".to_vec(),
            tx,
            CancelToken::new(),
        )
        .await
        .unwrap_err();

    match err.downcast_ref::<CanvassError>() {
        Some(CanvassError::Api { message, .. }) => {
            assert_eq!(message, "Duplicate emails are not allowed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(transport.calls_to("/status/"), 0);
}

#[tokio::test]
async fn test_file_validation_happens_before_any_network_call() {
    let transport = MockTransport::new();
    let service = service(&transport);

    let (tx, _rx) = mpsc::channel(64);
    let err = service
        .start_import("users.xlsx", vec![0u8; 16], tx, CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CanvassError>(),
        Some(CanvassError::Validation { .. })
    ));

    let (tx, _rx) = mpsc::channel(64);
    let err = service
        .start_import(
            "users.csv",
            vec![0u8; 6 * 1024 * 1024],
            tx,
            CancelToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CanvassError>(),
        Some(CanvassError::Validation { .. })
    ));

    assert!(transport.call_history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_inconsistent_snapshot_stops_polling() {
    let transport = MockTransport::new();
    // processed_rows > total_rows
    transport.respond_json(STATUS_PATH, 200, job_json("processing", 3, 7, 0, 0, &[]));

    let (tx, _rx) = mpsc::channel(64);
    let err = service(&transport)
        .poll_job("job-1", tx, CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CanvassError>(),
        Some(CanvassError::InvalidSnapshot { .. })
    ));
    assert_eq!(transport.calls_to(STATUS_PATH), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_workflow_fetches_nothing() {
    let transport = MockTransport::new();
    transport.respond_json_forever(STATUS_PATH, 200, job_json("processing", 3, 1, 1, 0, &[]));

    let cancel = CancelToken::new();
    cancel.cancel();

    let (tx, _rx) = mpsc::channel(64);
    let result = service(&transport).poll_job("job-1", tx, cancel).await;

    assert!(result.is_err());
    assert_eq!(transport.calls_to(STATUS_PATH), 0);
}

#[tokio::test]
async fn test_error_report_download_writes_blob() {
    let transport = MockTransport::new();
    transport.respond_bytes(
        "/users/bulk-upload/job-1/errors/",
        200,
        b"row,error\n2,invalid role\n".to_vec(),
    );

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("errors.csv");
    let path = service(&transport)
        .download_error_report("job-1", &dest)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(path).unwrap();
    assert!(contents.contains("invalid role"));
}
