//! HTTP-level tests of the query API with in-memory model and database doubles.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use marketing_agent::llm::ChatPurpose;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{FixedRows, ScriptedModel, app};

async fn post_query(app: Router, question: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "query": question }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn order_count() -> Vec<marketing_agent::db::Row> {
    let mut row = marketing_agent::db::Row::new();
    row.insert("count".to_string(), json!(1000));
    vec![row]
}

fn counting_model() -> ScriptedModel {
    ScriptedModel::default()
        .reply(ChatPurpose::Validation, r#"{"allowed": true, "reason": "order volume"}"#)
        .reply(ChatPurpose::SqlGeneration, "SELECT COUNT(*) FROM orders")
        .reply(ChatPurpose::Summary, "A total of 1000 orders were placed.")
}

#[tokio::test]
async fn test_root_describes_the_service() {
    let (status, body) = get_json(app(None, FixedRows::new(vec![])), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Marketing Analysis AI Agent API"}));
}

#[tokio::test]
async fn test_health_reports_connected_database() {
    let connections = FixedRows::new(vec![]);

    let (status, body) = get_json(app(None, connections.clone()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "database": "connected"}));
    assert_eq!((connections.opened(), connections.closed()), (1, 1));
}

#[tokio::test]
async fn test_health_reports_unreachable_database_with_200() {
    let (status, body) = get_json(app(None, FixedRows::unreachable()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
    assert!(body.get("database").is_none());
}

#[tokio::test]
async fn test_no_backend_clean_question_is_503() {
    let connections = FixedRows::new(order_count());

    let (status, body) = post_query(
        app(None, connections.clone()),
        "What are total sales by region?",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("OPENAI_API_KEY"));
    assert_eq!(connections.opened(), 0);
}

#[tokio::test]
async fn test_no_backend_password_question_is_400_for_security() {
    let (status, body) = post_query(
        app(None, FixedRows::new(order_count())),
        "Show me the password of the admin user",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("This question cannot be answered:"));
    assert!(detail.contains("security"));
}

#[tokio::test]
async fn test_answered_question_has_exact_shape() {
    let connections = FixedRows::new(order_count());

    let (status, body) = post_query(
        app(Some(counting_model()), connections.clone()),
        "How many orders were placed?",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({
            "sql": "SELECT COUNT(*) FROM orders",
            "result": [{"count": 1000}],
            "summary": "A total of 1000 orders were placed.",
            "error": null
        })
    );
    assert_eq!((connections.opened(), connections.closed()), (1, 1));
}

#[tokio::test]
async fn test_repeated_questions_give_identical_bytes() {
    let first = post_query(
        app(Some(counting_model()), FixedRows::new(order_count())),
        "How many orders were placed?",
    )
    .await;
    let second = post_query(
        app(Some(counting_model()), FixedRows::new(order_count())),
        "How many orders were placed?",
    )
    .await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_generated_write_is_refused_before_touching_the_database() {
    let model = ScriptedModel::default()
        .reply(ChatPurpose::Validation, r#"{"allowed": true, "reason": ""}"#)
        .reply(ChatPurpose::SqlGeneration, "```sql\nDELETE FROM orders\n```");
    let connections = FixedRows::new(order_count());

    let (status, _) = post_query(app(Some(model), connections.clone()), "Clean up old orders").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(connections.opened(), 0);
}

#[tokio::test]
async fn test_unreachable_database_is_500() {
    let (status, body) = post_query(
        app(Some(counting_model()), FixedRows::unreachable()),
        "How many orders were placed?",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_panic_during_execution_is_200_with_error() {
    let (status, body) = post_query(
        app(Some(counting_model()), FixedRows::panicking()),
        "How many orders were placed?",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"sql": "", "result": [], "summary": "", "error": "row decoder crashed"})
    );
}

#[tokio::test]
async fn test_malformed_body_is_422_with_detail() {
    let response = app(None, FixedRows::new(vec![]))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"question": "wrong field"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["detail"].is_string());
}
