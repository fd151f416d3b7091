use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use sales_api::{app, AppState, EntityKind, MemoryGateway};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn router(gateway: Arc<MemoryGateway>) -> Router {
    app(AppState::new(gateway), 1024 * 1024)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(app: &Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn seed_agent(app: &Router) {
    let (status, _) = send(
        app,
        Method::POST,
        "/agents",
        Some(json!({"AGENT_CODE": "A001", "AGENT_NAME": "Alice", "COMMISSION": "0.15"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_agent_then_list_it() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/agents",
        Some(json!({"AGENT_CODE": "A001", "AGENT_NAME": "Alice", "COMMISSION": "0.15"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Agent added");
    assert_eq!(body["result"]["affectedRows"], 1);
    assert_eq!(body["result"]["key"], "A001");

    let (status, rows) = send(&app, Method::GET, "/agents", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["AGENT_CODE"], "A001");
    assert_eq!(rows[0]["COMMISSION"], json!(0.15));
    assert!(rows[0]["COMMISSION"].is_f64());
    assert_eq!(rows[0]["COUNTRY"], Value::Null);
}

#[tokio::test]
async fn missing_required_field_is_rejected_without_store_write() {
    let cases = [
        ("/agents", json!({"AGENT_NAME": "Bob"}), "AGENT_CODE"),
        ("/company", json!({"COMPANY_ID": "18"}), "COMPANY_NAME"),
        ("/customer", json!({"CUST_NAME": "Holmes"}), "CUST_CODE"),
        ("/orders", json!({"ORD_AMOUNT": 1000}), "ORD_NUM"),
    ];
    for (uri, payload, field) in cases {
        let gw = Arc::new(MemoryGateway::new());
        let app = router(gw.clone());
        let (status, body) = send(&app, Method::POST, uri, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false);
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e["field"] == field), "{} should cite {}", uri, field);
        assert_eq!(gw.statements_run(), 0);
    }
}

#[tokio::test]
async fn non_numeric_order_amount_is_a_violation() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    let (status, body) = send(&app, Method::POST, "/orders", Some(json!({"ORD_AMOUNT": "abc"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    let amount = errors.iter().find(|e| e["field"] == "ORD_AMOUNT").unwrap();
    assert_eq!(amount["reason"], "ORD_AMOUNT must be a number");
    assert_eq!(amount["value"], "abc");
    // the missing key is reported alongside, not instead
    assert!(errors.iter().any(|e| e["field"] == "ORD_NUM"));
    assert!(gw.rows(EntityKind::Order).is_empty());
}

#[tokio::test]
async fn patch_changes_only_given_fields() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    seed_agent(&app).await;

    let (status, body) = send(&app, Method::PATCH, "/agents/A001", Some(json!({"COUNTRY": "USA"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Agent updated");
    assert_eq!(body["result"]["affectedRows"], 1);

    let rows = gw.rows(EntityKind::Agent);
    assert_eq!(rows[0]["COUNTRY"], "USA");
    assert_eq!(rows[0]["AGENT_NAME"], "Alice");
    assert_eq!(rows[0]["COMMISSION"], json!(0.15));
}

#[tokio::test]
async fn empty_patch_is_a_successful_no_op() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    seed_agent(&app).await;
    let before = gw.rows(EntityKind::Agent);

    let (status, body) = send(&app, Method::PATCH, "/agents/A001", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["affectedRows"], 1);
    assert_eq!(gw.rows(EntityKind::Agent), before);

    let (status, body) = send(&app, Method::PATCH, "/agents/NOPE", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["affectedRows"], 0);
}

#[tokio::test]
async fn put_requires_and_replaces_every_mutable_field() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    seed_agent(&app).await;

    let (status, body) = send(&app, Method::PUT, "/agents/A001", Some(json!({"AGENT_NAME": "Alicia"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<_> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].clone()).collect();
    assert_eq!(fields, vec![json!("WORKING_AREA"), json!("COMMISSION"), json!("PHONE_NO"), json!("COUNTRY")]);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/agents/A001",
        Some(json!({
            "AGENT_NAME": "Alicia",
            "WORKING_AREA": "London",
            "COMMISSION": 0.12,
            "PHONE_NO": "077-12346674",
            "COUNTRY": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Agent fully updated");
    let row = &gw.rows(EntityKind::Agent)[0];
    assert_eq!(row["AGENT_NAME"], "Alicia");
    assert_eq!(row["WORKING_AREA"], "London");
    assert_eq!(row["COUNTRY"], Value::Null);
}

#[tokio::test]
async fn stored_values_are_normalized_not_raw() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    let (status, _) = send(
        &app,
        Method::POST,
        "/customer",
        Some(json!({
            "CUST_CODE": " C00013 ",
            "CUST_NAME": "Holmes & <Sons>",
            "GRADE": "2",
            "OPENING_AMT": "6000.00",
            "AGENT_CODE": "A003"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, rows) = send(&app, Method::GET, "/customer", None).await;
    let row = &rows[0];
    assert_eq!(row["CUST_CODE"], "C00013");
    assert_eq!(row["CUST_NAME"], "Holmes &amp; &lt;Sons&gt;");
    assert_eq!(row["GRADE"], 2);
    assert_eq!(row["OPENING_AMT"], json!(6000.0));
    assert_eq!(row["RECEIVE_AMT"], Value::Null);
}

#[tokio::test]
async fn order_dates_round_trip_as_iso() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    let (status, _) = send(
        &app,
        Method::POST,
        "/orders",
        Some(json!({"ORD_NUM": "200100", "ORD_AMOUNT": 1000, "ADVANCE_AMOUNT": "600", "ORD_DATE": "2008-08-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, rows) = send(&app, Method::GET, "/orders", None).await;
    assert_eq!(rows[0]["ORD_DATE"], "2008-08-01");
    assert_eq!(rows[0]["ADVANCE_AMOUNT"], json!(600.0));
}

#[tokio::test]
async fn deleting_missing_key_succeeds_with_zero_rows() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    seed_agent(&app).await;

    let (status, body) = send(&app, Method::DELETE, "/agents/A001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Agent deleted");
    assert_eq!(body["result"]["affectedRows"], 1);

    let (status, body) = send(&app, Method::DELETE, "/agents/A001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["affectedRows"], 0);
}

#[tokio::test]
async fn store_failures_surface_as_500_with_message() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());
    seed_agent(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/agents",
        Some(json!({"AGENT_CODE": "A001", "AGENT_NAME": "Again"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("duplicate key"));

    gw.set_offline(true);
    let (status, body) = send(&app, Method::DELETE, "/company/18", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "connection refused");
    let (status, _) = send(&app, Method::GET, "/orders", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_entity_and_bad_bodies() {
    let app = router(Arc::new(MemoryGateway::new()));
    let (status, _) = send(&app, Method::GET, "/suppliers", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::POST, "/company", Some(json!(["not", "an", "object"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send_raw(&app, "/agents", "application/json", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("JSON"));

    let (status, body) = send_raw(&app, "/agents", "text/plain", r#"{"AGENT_CODE":"A1"}"#).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/company/18",
        Some(json!({"COMPANY_ID": "19", "COMPANY_TOWN": "Oslo"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<_> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].clone()).collect();
    assert_eq!(fields, vec![json!("COMPANY_ID"), json!("COMPANY_TOWN")]);
}

#[tokio::test]
async fn concurrent_requests_never_exceed_pool_capacity() {
    let gw = Arc::new(MemoryGateway::with_capacity(3).with_hold(Duration::from_millis(20)));
    let app = router(gw.clone());

    let mut tasks = Vec::new();
    for i in 0..12 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let payload = json!({"COMPANY_ID": format!("C{:02}", i), "COMPANY_NAME": "Acme"});
            send(&app, Method::POST, "/company", Some(payload)).await.0
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(gw.peak_connections(), 3);
    assert_eq!(gw.rows(EntityKind::Company).len(), 12);
}

#[tokio::test]
async fn pool_wait_timeout_is_a_server_error() {
    let gw = Arc::new(
        MemoryGateway::with_capacity(1)
            .with_hold(Duration::from_millis(300))
            .with_acquire_timeout(Duration::from_millis(20)),
    );
    let app = router(gw.clone());

    let first = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, Method::GET, "/agents", None).await })
    };
    let second = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, Method::GET, "/company", None).await })
    };
    let mut statuses = vec![first.await.unwrap().0, second.await.unwrap().0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR]);
}

#[tokio::test]
async fn health_ready_and_docs() {
    let gw = Arc::new(MemoryGateway::new());
    let app = router(gw.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    gw.set_offline(true);
    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");

    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/agents"]["post"].is_object());
    assert!(doc["paths"]["/orders/{key}"]["patch"].is_object());
}

#[tokio::test]
async fn docs_page_points_at_the_document() {
    let app = router(Arc::new(MemoryGateway::new()));
    let request = Request::builder().uri("/api-docs").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("SwaggerUIBundle"));
    assert!(page.contains("/api-docs/openapi.json"));
}
