//! Integration tests for the queue API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, auth,
//! and status mapping without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use clinicq_api::{AppState, AuthGate, build_router};
use clinicq_core::{Broadcaster, QueueEngine, QueuePolicy, ServingScope};
use clinicq_db::{MemoryStore, NewClinic, Store};
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "desk-token";

fn make_state(auth: AuthGate, policy: QueuePolicy) -> Arc<AppState> {
    let store = Store::Memory(MemoryStore::with_clinics(&[
        NewClinic::named("Medicina General"),
        NewClinic {
            name: String::from("Pediatría"),
            description: Some(String::from("Atención para niños")),
            color: Some(String::from("#28a745")),
        },
    ]));
    let engine = Arc::new(QueueEngine::new(store, policy));
    Arc::new(AppState::new(engine, Arc::new(Broadcaster::default()), auth))
}

fn open_router() -> Router {
    build_router(make_state(AuthGate::AllowAll, QueuePolicy::default()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn enqueue(router: &Router, name: &str, clinic_id: i64) -> Value {
    let (status, json) = send(
        router,
        post_json(
            "/api/tickets",
            &json!({
                "patientName": name,
                "patientIdentification": format!("{name}-id"),
                "clinicId": clinic_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = open_router();

    let response = router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_health() {
    let (status, json) = send(&open_router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_list_clinics() {
    let (status, json) = send(&open_router(), get("/api/clinics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["clinics"][0]["name"], "Medicina General");
    assert_eq!(json["clinics"][0]["color"], "#007bff");
    assert_eq!(json["clinics"][1]["color"], "#28a745");
}

#[tokio::test]
async fn test_create_ticket() {
    let router = open_router();
    let ticket = enqueue(&router, "Alice", 1).await;
    assert_eq!(ticket["ticketNumber"], "T-001");
    assert_eq!(ticket["state"], "waiting");
    assert_eq!(ticket["patientName"], "Alice");
    assert_eq!(ticket["clinicId"], 1);

    let second = enqueue(&router, "Bob", 2).await;
    assert_eq!(second["ticketNumber"], "T-002");
}

#[tokio::test]
async fn test_create_ticket_validation() {
    let router = open_router();

    let (status, json) = send(
        &router,
        post_json(
            "/api/tickets",
            &json!({ "patientName": "  ", "patientIdentification": "X", "clinicId": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("patientName"));

    let (status, _) = send(
        &router,
        post_json(
            "/api/tickets",
            &json!({ "patientName": "Alice", "patientIdentification": "X" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        post_json(
            "/api/tickets",
            &json!({ "patientName": "Alice", "patientIdentification": "X", "clinicId": 99 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::post("/api/tickets")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&open_router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_call_next_empty_is_not_found() {
    let (status, json) = send(&open_router(), post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let router = open_router();
    let alice = enqueue(&router, "Alice", 1).await;
    let bob = enqueue(&router, "Bob", 1).await;

    let (status, called) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(called["id"], alice["id"]);
    assert_eq!(called["state"], "serving");

    let carl = enqueue(&router, "Carl", 2).await;
    assert_eq!(carl["ticketNumber"], "T-003");

    let (status, display) = send(&router, get("/api/display")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(display["current"]["ticketNumber"], alice["ticketNumber"]);
    assert_eq!(display["current"]["patientName"], "Alice");
    assert_eq!(display["upNext"][0]["ticketNumber"], bob["ticketNumber"]);
    assert_eq!(display["upNext"][1]["ticketNumber"], carl["ticketNumber"]);
    assert_eq!(display["upNext"][1]["clinicId"], 2);

    let finish_uri = format!("/api/tickets/{}/finish", alice["id"]);
    let (status, finished) = send(&router, post(&finish_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["state"], "finished");

    let (status, again) = send(&router, post(&finish_uri)).await;
    assert_eq!(status, StatusCode::OK, "finish is idempotent");
    assert_eq!(again["state"], "finished");

    let (_, called) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(called["id"], bob["id"]);

    let (status, absent) =
        send(&router, post(&format!("/api/tickets/{}/absent", carl["id"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(absent["state"], "absent");

    let (status, waiting) = send(&router, get("/api/tickets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(waiting["count"], 0);

    let (status, _) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_waiting_list_joins_clinic() {
    let router = open_router();
    enqueue(&router, "Alice", 1).await;
    enqueue(&router, "Carl", 2).await;

    let (status, json) = send(&router, get("/api/tickets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["queue"][0]["patientName"], "Alice");
    assert_eq!(json["queue"][0]["clinicName"], "Medicina General");
    assert_eq!(json["queue"][1]["clinicName"], "Pediatría");
    assert_eq!(json["queue"][1]["clinicColor"], "#28a745");
}

#[tokio::test]
async fn test_call_next_in_clinic() {
    let router = open_router();
    enqueue(&router, "Alice", 1).await;
    let carl = enqueue(&router, "Carl", 2).await;

    let (status, called) = send(&router, post("/api/tickets/call?clinic_id=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(called["id"], carl["id"]);

    let (status, _) = send(&router, post("/api/tickets/call?clinic_id=2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_ticket() {
    let router = open_router();
    let alice = enqueue(&router, "Alice", 1).await;

    let (status, json) = send(&router, get(&format!("/api/tickets/{}", alice["id"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ticketNumber"], "T-001");

    let (status, _) = send(&router, get("/api/tickets/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_ticket_id_is_bad_request() {
    let (status, json) = send(&open_router(), post("/api/tickets/abc/finish")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_unknown_ticket_is_not_found() {
    let router = open_router();
    let (status, _) = send(&router, post("/api/tickets/42/finish")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, post("/api/tickets/42/absent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finish_waiting_ticket_is_conflict() {
    let router = open_router();
    let alice = enqueue(&router, "Alice", 1).await;
    let (status, json) =
        send(&router, post(&format!("/api/tickets/{}/finish", alice["id"]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_global_scope_conflict() {
    let router = build_router(make_state(
        AuthGate::AllowAll,
        QueuePolicy {
            serving_scope: ServingScope::Global,
            ..QueuePolicy::default()
        },
    ));
    enqueue(&router, "Alice", 1).await;
    enqueue(&router, "Bob", 2).await;

    let (status, _) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_display_empty() {
    let (status, json) = send(&open_router(), get("/api/display")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["current"].is_null());
    assert_eq!(json["upNext"], json!([]));
}

#[tokio::test]
async fn test_static_token_gates_staff_routes() {
    let router = build_router(make_state(
        AuthGate::StaticToken(String::from(TOKEN)),
        QueuePolicy::default(),
    ));

    let (status, json) = send(&router, post("/api/tickets/call")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);

    let (status, _) = send(&router, get("/api/tickets")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/api/tickets")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::post("/api/tickets")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "patientName": "Alice", "patientIdentification": "ID1", "clinicId": 1 })
                .to_string(),
        ))
        .unwrap();
    let (status, ticket) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["ticketNumber"], "T-001");
}

#[tokio::test]
async fn test_display_routes_stay_public() {
    let router = build_router(make_state(
        AuthGate::StaticToken(String::from(TOKEN)),
        QueuePolicy::default(),
    ));
    let (status, _) = send(&router, get("/api/display")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, get("/api/clinics")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_display_hides_patient_identification() {
    let router = build_router(make_state(
        AuthGate::StaticToken(String::from(TOKEN)),
        QueuePolicy::default(),
    ));
    let issue = |name: &str, id: &str| {
        Request::post("/api/tickets")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "patientName": name,
                    "patientIdentification": id,
                    "patientPhone": "555-0101",
                    "clinicId": 1,
                })
                .to_string(),
            ))
            .unwrap()
    };
    let (status, _) = send(&router, issue("Alice", "CC-123456")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&router, issue("Bob", "CC-654321")).await;
    assert_eq!(status, StatusCode::CREATED);
    let call = Request::post("/api/tickets/call")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, call).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, get("/api/tickets")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, display) = send(&router, get("/api/display")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(display["current"]["patientName"], "Alice");
    assert_eq!(display["upNext"][0]["patientName"], "Bob");

    let body = display.to_string();
    for secret in ["patientIdentification", "CC-123456", "CC-654321", "patientPhone", "555-0101"] {
        assert!(!body.contains(secret), "display leaked {secret}: {body}");
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = open_router().oneshot(get("/api/nothing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
