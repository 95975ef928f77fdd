//! Dashboard client tests against a mock backend.

use std::sync::Arc;

use datadict_client::{ClientConfig, ClientError, DashboardClient, DbType};
use datadict_copilot::{
    BackendError, CopilotBackend, CycleOutcome, QueryMode, SessionController, Turn,
};
use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> DashboardClient {
    DashboardClient::new(ClientConfig::with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn generate_sql_posts_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sql"))
        .and(body_json(json!({"query": "top customers by revenue"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "SELECT customer_id FROM orders"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let sql = client.generate_sql("top customers by revenue").await.unwrap();
    assert_eq!(sql, "SELECT customer_id FROM orders");
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/export/9/markdown"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Source not found"})))
        .mount(&server)
        .await;

    let err = client_for(&server).export_markdown(9).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Source not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_error_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_stats().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, ref message } if message == "Unknown error"));
}

#[tokio::test]
async fn missing_response_field_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "x"})))
        .mount(&server)
        .await;

    let err = client_for(&server).generate_sql("q").await.unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
    assert!(matches!(BackendError::from(err), BackendError::Malformed(_)));
}

#[tokio::test]
async fn source_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sources"))
        .and(body_json(json!({
            "name": "crm",
            "db_type": "postgres",
            "connection_url": "postgresql://u:p@localhost:5432/crm"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "crm",
            "db_type": "postgres",
            "connection_url": "postgresql://u:p@localhost:5432/crm",
            "created_at": "2024-05-01T10:20:30.123456"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "name": "crm", "db_type": "postgres", "connection_url": "x", "created_at": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync-all"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/sources/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .create_source("crm", DbType::Postgres, "postgresql://u:p@localhost:5432/crm")
        .await
        .unwrap();
    assert_eq!(created.id, 4);
    assert_eq!(created.kind(), Some(DbType::Postgres));

    let sources = client.list_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "crm");

    client.sync_source(4).await.unwrap();
    client.sync_all().await.unwrap();
    client.delete_source(4).await.unwrap();
}

#[tokio::test]
async fn duplicate_source_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sources"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Source name already exists"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_source("crm", DbType::Mysql, "mysql+pymysql://u:p@h/db")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error (400): Source name already exists");
}

#[tokio::test]
async fn schema_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/schema/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 11,
            "source_id": 4,
            "schema_name": "public",
            "table_name": "customers",
            "columns": [
                {"name": "id", "type": "INTEGER", "tags": []},
                {"name": "email", "type": "VARCHAR", "tags": ["PII"]}
            ],
            "relationships": [],
            "ai_summary": "Customer master data.",
            "quality_metrics": {"row_count": 1000},
            "created_at": "2024-05-01T10:20:30",
            "updated_at": "2024-05-02T08:00:00"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sources": 2, "tables": 17, "pii_columns": 5, "health_score": 98.5
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tables = client.get_schema(4).await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].qualified_name(), "public.customers");
    assert_eq!(tables[0].sensitive_columns(), 1);
    assert_eq!(tables[0].ai_summary.as_deref(), Some("Customer master data."));

    let stats = client.get_stats().await.unwrap();
    assert_eq!(stats.tables, 17);
    assert_eq!(stats.pii_columns, 5);
    assert!((stats.health_score - 98.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn export_returns_markdown_text() {
    let server = MockServer::start().await;
    let markdown = "# Data Dictionary: crm\n\n## Table: customers\n";
    Mock::given(method("GET"))
        .and(path("/api/v1/export/4/markdown"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(markdown, "text/markdown"))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).export_markdown(4).await.unwrap(), markdown);
}

#[tokio::test]
async fn stream_chat_yields_body_bytes() {
    let server = MockServer::start().await;
    let answer = "The orders table links customers to products. Größe: 3 €";
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .and(body_json(json!({"query": "describe orders table"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(answer, "text/plain; charset=utf-8"))
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .stream_chat("describe orders table")
        .await
        .unwrap()
        .expect("stream body");
    let bytes: Vec<u8> = stream
        .map(|chunk| chunk.unwrap())
        .collect::<Vec<_>>()
        .await
        .concat();
    assert_eq!(String::from_utf8(bytes).unwrap(), answer);
}

#[tokio::test]
async fn stream_chat_empty_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.stream_chat("q").await.unwrap().is_none());

    let err = client
        .dispatch(QueryMode::Conversational, "q")
        .await
        .unwrap_err();
    assert_eq!(err, BackendError::MissingBody);
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let client = DashboardClient::new(ClientConfig::with_base_url("http://127.0.0.1:1")).unwrap();
    let err = client.structured_query("q").await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn custom_copilot_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "SELECT 1"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        structured_path: "/chat".to_string(),
        ..ClientConfig::with_base_url(server.uri())
    };
    let client = DashboardClient::new(config).unwrap();
    assert_eq!(client.structured_query("q").await.unwrap(), "SELECT 1");
}

// =============================================================================
// Session over HTTP
// =============================================================================

#[tokio::test]
async fn session_structured_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "SELECT name FROM customers"
        })))
        .mount(&server)
        .await;

    let session = SessionController::with_defaults(Arc::new(client_for(&server)));
    let outcome = session.submit_and_wait("list customer names").await;

    assert_eq!(outcome, CycleOutcome::Answered);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.turns.len(), 3);
    assert_eq!(snapshot.turns[2], Turn::assistant("SELECT name FROM customers"));
}

#[tokio::test]
async fn session_streamed_answer_over_http() {
    let server = MockServer::start().await;
    let answer = "顧客テーブルには 📊 メールが含まれます";
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(answer, "text/plain"))
        .mount(&server)
        .await;

    let session = SessionController::with_defaults(Arc::new(client_for(&server)));
    session.set_mode(QueryMode::Conversational);
    let outcome = session.submit_and_wait("which tables have emails").await;

    assert!(matches!(outcome, CycleOutcome::Streamed { .. }));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.turns[2], Turn::assistant(answer));
    assert!(!snapshot.streaming);
    assert!(!snapshot.busy);
}

#[tokio::test]
async fn session_server_error_becomes_error_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "model offline"})))
        .mount(&server)
        .await;

    let session = SessionController::with_defaults(Arc::new(client_for(&server)));
    session.set_mode(QueryMode::Conversational);
    let outcome = session.submit_and_wait("q").await;

    assert_eq!(
        outcome,
        CycleOutcome::Failed(BackendError::Status {
            status: 500,
            message: "model offline".into()
        })
    );
    let snapshot = session.snapshot();
    assert_eq!(snapshot.turns.len(), 3);
    assert_eq!(snapshot.turns[2].content, session.config().stream_error_message);
}
