//! REST vendor adapter and webhook relay against mock servers.

use serde_json::json;
use siumai_jobs::prelude::*;
use siumai_jobs::traits::RawPages;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer) -> HttpJobEndpoints {
    HttpJobEndpoints::new(
        "acme",
        format!("{}/v1/jobs", server.uri()),
        format!("{}/v1/jobs/{{job_id}}", server.uri()),
    )
    .with_job_name_field("name")
}

fn vendor(server: &MockServer) -> HttpJobVendor<DocumentAnalysisConfig> {
    HttpJobVendor::with_client(endpoints(server), reqwest::Client::new()).with_api_key("sk-test")
}

fn config() -> JobClientConfig {
    JobClientConfig::builder()
        .poll_unit(Duration::from_millis(1))
        .max_poll_time(Duration::from_millis(200))
        .build()
        .unwrap()
}

#[tokio::test]
async fn launch_then_drain_paginated_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "name": "report-1",
            "documentKey": "in/report.pdf",
            "features": ["TABLES"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .and(query_param("next_token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "blocks": [{"BlockType": "LINE", "Text": "second"}]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "next_token": "p2",
            "blocks": [{"BlockType": "LINE", "Text": "first"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let jobs = JobOrchestrator::new(vendor(&server), DocumentNormalizer, &config()).unwrap();
    let request = DocumentAnalysisConfig::new(JobInput::stored("in/report.pdf"), [DocumentFeature::Tables])
        .with_job_name("report-1")
        .build()
        .unwrap();

    let handle = jobs.launch_job(request).await.unwrap();
    assert_eq!(handle.as_str(), "job-1");

    let JobOutcome::Succeeded { result, raw } = jobs.get_job_result(&handle).await.unwrap() else {
        panic!("expected success");
    };
    assert_eq!(raw.len(), 2);
    assert_eq!(result.text(), "first\nsecond");
}

#[tokio::test]
async fn missing_job_is_deprecated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": {"message": "Job not found"}})),
        )
        .mount(&server)
        .await;

    let jobs = JobOrchestrator::new(vendor(&server), RawPages, &config()).unwrap();
    let outcome = jobs.get_job_result(&JobHandle::new("gone")).await.unwrap();
    assert_eq!(
        outcome,
        JobOutcome::Deprecated {
            job_id: "gone".to_string(),
            message: "Job not found".to_string()
        }
    );
}

#[tokio::test]
async fn undecodable_status_is_an_internal_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let jobs = JobOrchestrator::new(vendor(&server), RawPages, &config()).unwrap();
    let err = jobs.get_job_result(&JobHandle::new("job-1")).await.unwrap_err();
    assert_eq!(err.to_string(), "Provider error (500): internal server error");
}

#[tokio::test]
async fn rejected_start_keeps_vendor_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let jobs = JobOrchestrator::new(vendor(&server), RawPages, &config()).unwrap();
    let request = DocumentAnalysisConfig::new(JobInput::stored("in/a.pdf"), [DocumentFeature::Text]);
    let err = jobs.launch_job(request).await.unwrap_err();
    match &err {
        JobError::ProviderError {
            code,
            message,
            details,
        } => {
            assert_eq!(*code, Some(429));
            assert_eq!(message, "slow down");
            assert!(details.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn polling_waits_through_pending_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "blocks": []})))
        .mount(&server)
        .await;

    let jobs = JobOrchestrator::new(vendor(&server), RawPages, &config()).unwrap();
    let outcome = jobs
        .wait_for_result(&JobHandle::new("job-1"), None)
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Succeeded { .. }));
}

#[tokio::test]
async fn webhook_relay_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/tok-1/requests"))
        .and(query_param("query", "content:corr-empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/token/tok-1/requests"))
        .and(query_param("sorting", "newest"))
        .and(query_param("query", "content:corr-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"content": "{\"id\":\"corr-1\",\"transcript\":\"hi\"}"}]
        })))
        .mount(&server)
        .await;

    let relay = WebhookRelay::new(server.uri(), "tok-1", &HttpConfig::default()).unwrap();
    assert_eq!(relay.callback_url(), format!("{}/tok-1", server.uri()));

    let pending = relay.lookup("corr-empty", &TranscriptNormalizer).await.unwrap();
    assert!(pending.is_pending());

    let JobOutcome::Succeeded { result, raw } = relay.lookup("corr-1", &TranscriptNormalizer).await.unwrap() else {
        panic!("expected success");
    };
    assert_eq!(result.text, "hi");
    assert_eq!(raw[0]["id"], "corr-1");
}

#[tokio::test]
async fn webhook_relay_garbage_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/tok-1/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"content": "not json"}]})))
        .mount(&server)
        .await;

    let relay = WebhookRelay::new(server.uri(), "tok-1", &HttpConfig::default()).unwrap();
    let err = relay.lookup("corr-1", &RawPages).await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn webhook_relay_error_without_body_uses_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/tok-1/requests"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let relay = WebhookRelay::new(server.uri(), "tok-1", &HttpConfig::default()).unwrap();
    let err = relay.lookup("corr-1", &RawPages).await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.to_string(), "Provider error (503): Service Unavailable");
}

#[tokio::test]
async fn webhook_relay_truncated_body_is_an_http_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // promises 100 bytes, sends 5, hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 100\r\n\r\nshort")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let relay = WebhookRelay::new(format!("http://{addr}"), "tok-1", &HttpConfig::default()).unwrap();
    let err = relay.lookup("corr-1", &RawPages).await.unwrap_err();
    assert!(matches!(err, JobError::HttpError(_)), "unexpected error: {err:?}");
}
