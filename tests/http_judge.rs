//! HTTP judge integration tests against a mock backend.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use verdict::consensus::{ConsensusEngine, ConsensusRequest, ConsensusStrategy, VerdictOutcome};
use verdict::judge::{HttpJudge, Judge, JudgeError};
use verdict::registry::BackendDescriptor;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn judge_for(server: &MockServer) -> HttpJudge {
    HttpJudge::new(
        "mock",
        format!("{}/evaluate", server.uri()),
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn test_successful_judgment_with_cost() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .and(body_json(json!({ "content": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "risk_score": 0.42,
            "confidence": 0.88,
            "cost": 0.003
        })))
        .expect(1)
        .mount(&server)
        .await;

    let judgment = judge_for(&server)
        .judge("hello", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(judgment.risk_score, 0.42);
    assert_eq!(judgment.confidence, 0.88);
    assert_eq!(judgment.cost, Some(0.003));
}

#[tokio::test]
async fn test_cost_is_optional() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "risk_score": 0.1, "confidence": 0.9 })),
        )
        .mount(&server)
        .await;

    let judgment = judge_for(&server)
        .judge("hello", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(judgment.cost, None);
}

#[tokio::test]
async fn test_bearer_token_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "risk_score": 0.1, "confidence": 0.9 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = judge_for(&server)
        .with_api_key("secret-key")
        .judge("hello", Duration::from_secs(5))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_error_status_maps_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = judge_for(&server)
        .judge("hello", Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        JudgeError::Upstream { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_maps_to_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "risk": "high" })))
        .mount(&server)
        .await;

    let err = judge_for(&server)
        .judge("hello", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, JudgeError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_backend_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "risk_score": 0.1, "confidence": 0.9 }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = judge_for(&server)
        .judge("hello", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_connection_refused_maps_to_network() {
    let judge = HttpJudge::new("closed", "http://127.0.0.1:9/evaluate", reqwest::Client::new());

    let err = judge
        .judge("hello", Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(matches!(err, JudgeError::Network(_)));
}

#[tokio::test]
async fn test_engine_with_http_backends() {
    let flagging = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "risk_score": 0.95, "confidence": 0.9 })),
        )
        .mount(&flagging)
        .await;

    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let engine = ConsensusEngine::default();
    engine
        .register_backend(
            BackendDescriptor::new("flagging", "mock").with_cost_per_call(0.5),
            Arc::new(judge_for(&flagging)),
        )
        .unwrap();
    engine
        .register_backend(
            BackendDescriptor::new("broken", "mock").with_cost_per_call(0.25),
            Arc::new(judge_for(&broken)),
        )
        .unwrap();

    let result = engine
        .evaluate(ConsensusRequest::new("hello", ConsensusStrategy::Weighted))
        .await
        .unwrap();

    assert!(result.is_flagged);
    assert_eq!(result.contributing_verdicts.len(), 1);
    assert_eq!(result.excluded_verdicts[0].backend_id, "broken");
    assert_eq!(result.excluded_verdicts[0].outcome, VerdictOutcome::Failure);
    assert!((result.total_cost - 0.75).abs() < 1e-9);
}
