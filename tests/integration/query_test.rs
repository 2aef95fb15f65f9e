//! Integration tests for query execution.

use std::sync::Arc;
use std::time::Duration;

use athena_glance::config::ConnectionConfig;
use athena_glance::credentials::{Credentials, StaticCredentialsProvider};
use athena_glance::error::AthenaError;
use athena_glance::query::{CancelHandle, JobStatus, QueryJob, QueryJobController, QueryOutcome};
use athena_glance::service::{
    MockCall, MockQueryService, QueryRequest, RawRow, ResultColumn, ResultPage,
};
use athena_glance::session::Session;
use pretty_assertions::assert_eq;

fn page(columns: Option<&[&str]>, rows: &[&[&str]], next_token: Option<&str>) -> ResultPage {
    ResultPage {
        rows: Some(rows.iter().map(|r| RawRow::from_values(r.iter().copied())).collect()),
        column_info: columns
            .map(|names| names.iter().map(|n| ResultColumn::new(*n, "varchar")).collect()),
        next_token: next_token.map(String::from),
    }
}

fn cells(rows: &[&[&str]]) -> Vec<Vec<Option<String>>> {
    rows.iter()
        .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
        .collect()
}

fn session(service: Arc<MockQueryService>) -> Session {
    let connection = ConnectionConfig {
        region: Some("us-east-1".to_string()),
        workgroup: Some("primary".to_string()),
        profile: None,
        endpoint: None,
    };
    let credentials = Credentials::new("AKIDEXAMPLE", "secret");
    Session::new(connection, Arc::new(StaticCredentialsProvider::new(credentials)))
        .with_service(service)
}

#[tokio::test(start_paused = true)]
async fn test_select_one_round_trip() {
    let service = Arc::new(
        MockQueryService::new()
            .with_statuses(["QUEUED", "RUNNING", "SUCCEEDED"])
            .with_result_pages(vec![page(Some(&["_col0"]), &[&["_col0"], &["1"]], None)]),
    );

    let result = session(service.clone())
        .run_query("select 1", &[], None)
        .await
        .unwrap()
        .and_then(QueryOutcome::into_result)
        .unwrap();

    assert_eq!(result.columns, vec!["_col0".to_string()]);
    assert_eq!(result.rows, cells(&[&["1"]]));
    assert_eq!(service.call_count("GetQueryExecution"), 3);
    assert_eq!(
        service.calls()[0],
        MockCall::StartQueryExecution(QueryRequest::new("select 1", "primary"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_polls_are_spaced_by_interval() {
    let service = MockQueryService::new()
        .with_statuses(["QUEUED", "RUNNING", "SUCCEEDED"])
        .with_result_pages(vec![page(Some(&["_col0"]), &[&["_col0"], &["1"]], None)]);

    QueryJobController::new(&service)
        .run(QueryRequest::new("select 1", "primary"), None)
        .await
        .unwrap();

    let timed = service.timed_calls();
    let start = timed[0].1;
    let polls: Vec<Duration> = timed
        .iter()
        .filter(|(call, _)| call.operation() == "GetQueryExecution")
        .map(|(_, at)| *at - start)
        .collect();
    assert_eq!(
        polls,
        vec![
            Duration::ZERO,
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_header_dropped_only_on_first_page() {
    let service = MockQueryService::new().with_result_pages(vec![
        page(Some(&["c1"]), &[&["c1"], &["a"], &["b"]], Some("t1")),
        page(None, &[&["c"]], None),
    ]);

    let result = QueryJobController::new(&service)
        .run(QueryRequest::new("select c1 from t", "primary"), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.rows, cells(&[&["a"], &["b"], &["c"]]));
    assert_eq!(
        service.calls().last(),
        Some(&MockCall::GetQueryResults {
            execution_id: "query-1".to_string(),
            next_token: Some("t1".to_string()),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_row_count_excludes_header_and_sparse_rows() {
    let mut first = page(Some(&["a", "b"]), &[&["a", "b"], &["1", "2"]], Some("t1"));
    if let Some(rows) = first.rows.as_mut() {
        rows.push(RawRow::empty());
    }
    let second = page(None, &[&["3", "4"], &["5"]], None);
    let service = MockQueryService::new().with_result_pages(vec![first, second]);

    let result = QueryJobController::new(&service)
        .run(QueryRequest::new("select a, b from t", "primary"), None)
        .await
        .unwrap()
        .unwrap();

    // 5 raw rows, minus the header, minus one sparse row
    assert_eq!(result.row_count(), 3);
    assert!(result.rows.iter().all(|row| row.len() == 2));
    assert_eq!(result.rows[2], vec![Some("5".to_string()), None]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_query_carries_reason() {
    let service = Arc::new(
        MockQueryService::new()
            .with_statuses(["QUEUED"])
            .with_failure("SYNTAX_ERROR: line 1:8: Column 'nope' cannot be resolved"),
    );

    let err = session(service.clone())
        .run_query("select nope", &[], None)
        .await
        .unwrap_err();

    match err {
        AthenaError::QueryFailed(reason) => assert!(reason.starts_with("SYNTAX_ERROR: ")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(service.call_count("GetQueryResults"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_poll_returns_no_result() {
    let service = MockQueryService::new().with_statuses(["QUEUED", "RUNNING"]);
    let controller = QueryJobController::new(&service);
    let handle = CancelHandle::new();

    let (outcome, fired) = tokio::join!(
        controller.run(QueryRequest::new("select * from big", "primary"), Some(&handle)),
        async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            handle.cancel()
        }
    );

    assert!(fired);
    assert!(outcome.unwrap().is_none());
    assert!(handle.is_finished());
    assert_eq!(service.call_count("StopQueryExecution"), 1);
    assert_eq!(service.call_count("GetQueryResults"), 0);

    // The stop goes out right away; the next poll still waits for its slot
    let timed = service.timed_calls();
    let start = timed[0].1;
    let (_, stop_at) = timed
        .iter()
        .find(|(call, _)| call.operation() == "StopQueryExecution")
        .unwrap();
    assert_eq!(*stop_at - start, Duration::from_millis(250));
    let (_, last_poll) = timed
        .iter()
        .rev()
        .find(|(call, _)| call.operation() == "GetQueryExecution")
        .unwrap();
    assert_eq!(*last_poll - start, Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_completion_is_noop() {
    let service = Arc::new(MockQueryService::with_sample_data());
    let handle = CancelHandle::new();

    let outcome = session(service.clone())
        .run_query("select 1", &[], Some(&handle))
        .await
        .unwrap();

    assert!(matches!(outcome, Some(QueryOutcome::Completed(_))));
    assert!(!handle.cancel());
    assert_eq!(service.call_count("StopQueryExecution"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_job_stopped_by_service_is_cancelled_not_missing() {
    let service = Arc::new(MockQueryService::new().with_statuses(["RUNNING", "CANCELLED"]));
    let handle = CancelHandle::new();

    let outcome = session(service.clone())
        .run_query("select * from big", &[], Some(&handle))
        .await
        .unwrap();

    assert_eq!(outcome, Some(QueryOutcome::Cancelled));
    assert!(!handle.is_cancelled());
    assert_eq!(service.call_count("StopQueryExecution"), 0);
    assert_eq!(service.call_count("GetQueryResults"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_job_is_not_polled_again() {
    let service = MockQueryService::new();
    let controller = QueryJobController::new(&service);

    let job = controller
        .submit(QueryRequest::new("select 1", "primary"), None)
        .await
        .unwrap();
    let job = controller.await_terminal(job, None).await.unwrap();
    assert_eq!(job.status(), Some(JobStatus::Succeeded));
    let polls = service.call_count("GetQueryExecution");

    let again = controller.await_terminal(job.clone(), None).await.unwrap();
    assert_eq!(again.status(), job.status());
    assert_eq!(service.call_count("GetQueryExecution"), polls);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_status_keeps_polling() {
    let service = MockQueryService::new()
        .with_statuses(["QUEUED", "PROVISIONING"])
        .with_missing_status()
        .with_statuses(["SUCCEEDED"]);
    let controller = QueryJobController::new(&service);

    let job = QueryJob::new("query-7", QueryRequest::new("select 1", "primary"));
    let job = controller.await_terminal(job, None).await.unwrap();

    assert_eq!(job.status(), Some(JobStatus::Succeeded));
    assert_eq!(service.call_count("GetQueryExecution"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_parameters_sent_in_order() {
    let service = Arc::new(MockQueryService::with_sample_data());
    let params = vec!["'2024-01-01'".to_string(), "10".to_string()];

    session(service.clone())
        .run_query("select * from t where d = ? limit ?", &params, None)
        .await
        .unwrap();

    match &service.calls()[0] {
        MockCall::StartQueryExecution(request) => {
            assert_eq!(request.parameters, params);
            assert_eq!(request.workgroup, "primary");
        }
        other => panic!("unexpected call: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_error_is_propagated() {
    let service = Arc::new(
        MockQueryService::new()
            .failing_on("StartQueryExecution", "InvalidRequestException: workgroup is disabled"),
    );

    let err = session(service.clone())
        .run_query("select 1", &[], None)
        .await
        .unwrap_err();

    assert!(matches!(err, AthenaError::Service(ref m) if m.contains("workgroup is disabled")));
    assert_eq!(service.call_count("GetQueryExecution"), 0);
}
