//! Integration tests for parsing Prime Infrastructure job responses.
//!
//! These tests validate that the prime-connector models and job operations handle payloads
//! shaped like real Prime Infrastructure responses.

use prime_connector::models::{JobResult, JobSummaryResponse, RunHistoryResponse};
use prime_connector::PrimeClientBuilder;
use prime_core::{Error, RetryPolicy};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOB_NAME: &str = "Config_Deploy_Deploy_View_11_42_30";

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> String {
    let fixture_path = fixtures_dir().join(name);
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_deserialize_job_summary() {
    let summary: JobSummaryResponse =
        serde_json::from_str(&load_fixture("job_summary.json")).unwrap();

    assert_eq!(summary.query_response.count, Some(2));
    assert_eq!(summary.query_response.entity_id.len(), 2);
    assert_eq!(
        summary.query_response.entity_id[0].id.as_deref(),
        Some("5541874")
    );

    // Only the first entity is consulted
    assert_eq!(summary.status(), Some("COMPLETED"));
    assert!(summary.is_completed());
}

#[test]
fn test_deserialize_run_history() {
    let history: RunHistoryResponse =
        serde_json::from_str(&load_fixture("run_history.json")).unwrap();

    let job = &history.mgmt_response.job[0];
    assert_eq!(job.job_name.as_deref(), Some(JOB_NAME));
    assert_eq!(job.run_instances.run_instance.len(), 2);
    assert_eq!(
        job.run_instances.run_instance[0].run_status.as_deref(),
        Some("COMPLETED")
    );

    // Most recent run comes first
    assert_eq!(history.latest_result_status(), Some("FAILURE"));
    assert_eq!(
        JobResult::from_status(history.latest_result_status().unwrap()),
        JobResult::Failure
    );
}

#[tokio::test]
async fn test_job_polling_against_fixtures() {
    let server = MockServer::start().await;
    let quoted = format!("\"{JOB_NAME}\"");

    Mock::given(method("GET"))
        .and(path("/webacs/api/v3/data/JobSummary.json"))
        .and(query_param("jobName", quoted.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("job_summary.json")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webacs/api/v3/op/jobService/runhistory.json"))
        .and(query_param("jobName", quoted.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("run_history.json")))
        .mount(&server)
        .await;

    let client = PrimeClientBuilder::new(server.uri(), "admin", "secret")
        .unwrap()
        .with_retry_policy(
            RetryPolicy::new().with_delay_range(Duration::from_millis(1), Duration::from_millis(2)),
        )
        .build()
        .unwrap();

    assert!(client.job_complete(JOB_NAME).await.unwrap());
    assert!(!client.job_successful(JOB_NAME).await.unwrap());
}

#[tokio::test]
async fn test_throttled_job_poll_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/webacs/api/v3/data/JobSummary.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Too many requests"))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webacs/api/v3/data/JobSummary.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("job_summary.json")))
        .expect(1)
        .mount(&server)
        .await;

    let client = PrimeClientBuilder::new(server.uri(), "admin", "secret")
        .unwrap()
        .with_retry_policy(
            RetryPolicy::new().with_delay_range(Duration::from_millis(1), Duration::from_millis(2)),
        )
        .build()
        .unwrap();

    assert_eq!(client.job_status(JOB_NAME).await.unwrap(), "COMPLETED");
}

#[tokio::test]
async fn test_bad_credentials_abort_polling() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let client = PrimeClientBuilder::new(server.uri(), "admin", "wrong")
        .unwrap()
        .build()
        .unwrap();

    let err = client.job_complete(JOB_NAME).await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(_)));
    assert_eq!(err.status(), Some(401));
}
